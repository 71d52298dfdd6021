//! Ingestion of calibrated multi-extension FITS exposures.
//!
//! Reads the `SCI` and `DQ` image extensions for each requested `EXTVER`,
//! stacks the chips top to bottom and derives the total integration time from
//! the headers.

use crate::exposure::Exposure;
use anyhow::{Context, Result};
use fitrs::{Fits, FitsData, FitsDataArray, Hdu, HeaderValue};
use std::path::Path;

/// How to turn a FITS file into an [`Exposure`].
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// `EXTVER` values of the chips to read, in stacking order.
    pub extension_versions: Vec<i32>,
    /// Detector readout time added to the integration time, seconds.
    pub readout_time: f64,
    /// Multiplier converting SCI counts to electrons.
    pub gain: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            extension_versions: vec![1],
            readout_time: 0.0,
            gain: 1.0,
        }
    }
}

pub fn read_exposure(path: &Path, options: &IngestOptions) -> Result<Exposure> {
    let fits = Fits::open(path)
        .with_context(|| format!("Failed to open FITS file: {}", path.display()))?;

    let primary = fits
        .get(0)
        .ok_or_else(|| anyhow::anyhow!("No primary HDU found in FITS file"))?;

    let mut chips = Vec::with_capacity(options.extension_versions.len());
    let mut integration_time = None;
    for &version in &options.extension_versions {
        let sci_hdu = find_extension(&fits, "SCI", version)
            .ok_or_else(|| anyhow::anyhow!("Missing SCI extension version {}", version))?;
        let dq_hdu = find_extension(&fits, "DQ", version)
            .ok_or_else(|| anyhow::anyhow!("Missing DQ extension version {}", version))?;

        let (width, height) = image_dimensions(&sci_hdu)?;
        let (dq_width, dq_height) = image_dimensions(&dq_hdu)?;
        if (width, height) != (dq_width, dq_height) {
            return Err(anyhow::anyhow!(
                "SCI ({}x{}) and DQ ({}x{}) shapes differ for version {}",
                width,
                height,
                dq_width,
                dq_height,
                version
            ));
        }

        if integration_time.is_none() {
            integration_time = Some(total_integration_time(&primary, &sci_hdu, options.readout_time)?);
        }

        let sci = read_sci(&sci_hdu, options.gain)?;
        let dq = read_dq(&dq_hdu)?;
        chips.push(Exposure::new(width, height, sci, dq, integration_time.unwrap_or(0.0))?);
    }

    let exposure = Exposure::stack(chips)?;
    tracing::info!(
        "Loaded {} ({}x{}, {:.1}s integration)",
        path.display(),
        exposure.width(),
        exposure.height(),
        exposure.integration_time()
    );
    Ok(exposure)
}

fn find_extension(fits: &Fits, name: &str, version: i32) -> Option<Hdu> {
    fits.iter().find(|hdu| {
        let name_matches = header_string(hdu, "EXTNAME")
            .map(|extname| extname.eq_ignore_ascii_case(name))
            .unwrap_or(false);
        // EXTVER defaults to 1 when absent
        let hdu_version = header_number(hdu, "EXTVER").map(|v| v as i32).unwrap_or(1);
        name_matches && hdu_version == version
    })
}

fn image_dimensions(hdu: &Hdu) -> Result<(usize, usize)> {
    let naxis = header_number(hdu, "NAXIS").ok_or_else(|| anyhow::anyhow!("Missing NAXIS header"))?;
    if naxis < 2.0 {
        return Err(anyhow::anyhow!(
            "Extension does not contain 2D image data (NAXIS={})",
            naxis
        ));
    }
    let width = header_number(hdu, "NAXIS1").ok_or_else(|| anyhow::anyhow!("Missing NAXIS1 header"))?;
    let height = header_number(hdu, "NAXIS2").ok_or_else(|| anyhow::anyhow!("Missing NAXIS2 header"))?;
    Ok((width as usize, height as usize))
}

/// `EXPTIME + FLASHDUR + readout`, keywords looked up in the primary header
/// first and the SCI header second. `FLASHDUR` defaults to zero.
fn total_integration_time(primary: &Hdu, sci: &Hdu, readout_time: f64) -> Result<f64> {
    let lookup = |key: &str| header_number(primary, key).or_else(|| header_number(sci, key));

    let exptime = lookup("EXPTIME").ok_or_else(|| anyhow::anyhow!("Missing EXPTIME header"))?;
    let flashdur = lookup("FLASHDUR").unwrap_or_else(|| {
        tracing::debug!("No FLASHDUR keyword, assuming 0");
        0.0
    });
    Ok(exptime + flashdur + readout_time)
}

/// Linear scaling from stored values to electrons.
#[derive(Debug, Clone, Copy)]
struct PixelScale {
    bscale: f64,
    bzero: f64,
    gain: f64,
}

impl PixelScale {
    /// Raw stored value, BZERO not yet applied.
    fn stored(&self, raw: f64) -> f64 {
        (raw * self.bscale + self.bzero) * self.gain
    }

    /// fitrs only yields unsigned data once BZERO = 2^31 has been added, so
    /// only BSCALE and gain remain.
    fn offset_applied(&self, value: f64) -> f64 {
        value * self.bscale * self.gain
    }
}

fn read_sci(hdu: &Hdu, gain: f64) -> Result<Vec<f64>> {
    let scale = PixelScale {
        bscale: header_number(hdu, "BSCALE").unwrap_or(1.0),
        bzero: header_number(hdu, "BZERO").unwrap_or(0.0),
        gain,
    };

    let data = match hdu.read_data() {
        FitsData::FloatingPoint32(FitsDataArray { data, .. }) => {
            data.iter().map(|&v| scale.stored(v as f64)).collect()
        }
        FitsData::FloatingPoint64(FitsDataArray { data, .. }) => {
            data.iter().map(|&v| scale.stored(v)).collect()
        }
        FitsData::IntegersI32(FitsDataArray { data, .. }) => data
            .iter()
            .map(|v| v.map(|raw| scale.stored(raw as f64)).unwrap_or(f64::NAN))
            .collect(),
        FitsData::IntegersU32(FitsDataArray { data, .. }) => data
            .iter()
            .map(|v| v.map(|value| scale.offset_applied(value as f64)).unwrap_or(f64::NAN))
            .collect(),
        FitsData::Characters(_) => {
            return Err(anyhow::anyhow!("SCI extension contains character data, not image data"));
        }
    };
    Ok(data)
}

fn read_dq(hdu: &Hdu) -> Result<Vec<u32>> {
    let bzero = header_number(hdu, "BZERO").unwrap_or(0.0) as i64;
    let data = match hdu.read_data() {
        FitsData::IntegersI32(FitsDataArray { data, .. }) => data
            .iter()
            .map(|v| v.map(|raw| dq_bits(raw, bzero)).unwrap_or(0))
            .collect(),
        FitsData::IntegersU32(FitsDataArray { data, .. }) => {
            data.iter().map(|v| v.unwrap_or(0)).collect()
        }
        _ => return Err(anyhow::anyhow!("DQ extension must contain integer data")),
    };
    Ok(data)
}

/// DQ flags from a stored 16-bit value. Unsigned arrays carry BZERO = 32768;
/// signed ones arrive sign-extended. Either way only the low 16 bits count.
fn dq_bits(raw: i32, bzero: i64) -> u32 {
    ((raw as i64 + bzero) as u32) & 0xFFFF
}

fn header_number(hdu: &Hdu, key: &str) -> Option<f64> {
    match hdu.value(key)? {
        HeaderValue::IntegerNumber(n) => Some(*n as f64),
        HeaderValue::RealFloatingNumber(f) => Some(*f),
        _ => None,
    }
}

fn header_string(hdu: &Hdu, key: &str) -> Option<String> {
    match hdu.value(key)? {
        HeaderValue::CharacterString(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

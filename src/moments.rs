//! Zeroth, first and second intensity moments of labeled objects.
//!
//! Objects are independent, so they are measured in parallel and collected
//! back in id order. Diagnostics are reported afterwards in the same order,
//! which keeps the output identical to a serial run.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ensure_len, Result};
use crate::exposure::Exposure;
use crate::labeling::LabelMap;
use crate::statistics::{Centroid, CosmicRayEvent, CosmicRayStatistics, SecondMoments};
use rayon::prelude::*;

/// Measure every object in `labels` against the exposure's SCI array and
/// derive the incident rate from its integration time.
///
/// The label map must have the exposure's width and height; equal pixel
/// counts alone are not enough.
pub fn compute_statistics(
    labels: LabelMap,
    exposure: &Exposure,
    diagnostics: &dyn Diagnostics,
) -> Result<CosmicRayStatistics> {
    ensure_len("sci width", labels.width(), exposure.width())?;
    ensure_len("sci height", labels.height(), exposure.height())?;
    let sci = exposure.sci();
    let width = labels.width();
    let integration_time = exposure.integration_time();

    let measured: Vec<(CosmicRayEvent, Vec<Diagnostic>)> = labels
        .pixels_by_id()
        .into_par_iter()
        .enumerate()
        .map(|(index, pixels)| measure_object(index as u32 + 1, pixels, sci, width))
        .collect();

    let mut events = Vec::with_capacity(measured.len());
    for (event, object_diagnostics) in measured {
        for diagnostic in object_diagnostics {
            diagnostics.report(diagnostic);
        }
        events.push(event);
    }

    let incident_rate = incident_rate(events.len(), integration_time, diagnostics);
    diagnostics.report(Diagnostic::StatisticsComputed {
        events: events.len(),
    });

    Ok(CosmicRayStatistics::new(
        incident_rate,
        integration_time,
        events,
        labels,
    ))
}

/// Events per second, NaN when nothing was integrated.
pub fn incident_rate(events: usize, integration_time: f64, diagnostics: &dyn Diagnostics) -> f64 {
    if integration_time == 0.0 {
        diagnostics.report(Diagnostic::ZeroIntegrationTime);
        return f64::NAN;
    }
    events as f64 / integration_time
}

/// Moments of one object. Positions are taken relative to the object's first
/// pixel before weighting, which keeps a single-pixel object's offsets
/// exactly zero.
pub(crate) fn measure_object(
    id: u32,
    pixels: Vec<(usize, usize)>,
    sci: &[f64],
    width: usize,
) -> (CosmicRayEvent, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let size_in_pixels = pixels.len();
    let (origin_row, origin_col) = pixels.first().copied().unwrap_or((0, 0));

    let value = |row: usize, col: usize| sci[row * width + col];
    let offset = |row: usize, col: usize| {
        (
            row as f64 - origin_row as f64,
            col as f64 - origin_col as f64,
        )
    };

    let energy: f64 = pixels.iter().map(|&(row, col)| value(row, col)).sum();

    if energy == 0.0 {
        diagnostics.push(Diagnostic::ZeroEnergy { id });
        let event = CosmicRayEvent {
            id,
            pixel_coordinates: pixels,
            energy_deposited: energy,
            centroid: None,
            second_moments: None,
            size_in_pixels,
            size_in_sigma: None,
            shape: None,
        };
        return (event, diagnostics);
    }

    // First moment
    let (mut sum_row, mut sum_col) = (0.0, 0.0);
    for &(row, col) in &pixels {
        let (d_row, d_col) = offset(row, col);
        let weight = value(row, col);
        sum_row += weight * d_row;
        sum_col += weight * d_col;
    }
    let (center_row, center_col) = (sum_row / energy, sum_col / energy);

    // Second moments about the centroid
    let mut moments = SecondMoments {
        i_xx: 0.0,
        i_yy: 0.0,
        i_xy: 0.0,
    };
    for &(row, col) in &pixels {
        let (d_row, d_col) = offset(row, col);
        let (d_row, d_col) = (d_row - center_row, d_col - center_col);
        let weight = value(row, col) / energy;
        moments.i_xx += weight * d_row * d_row;
        moments.i_yy += weight * d_col * d_col;
        moments.i_xy += weight * d_row * d_col;
    }

    let trace = moments.trace();
    let size_in_sigma = (trace / 2.0).sqrt();
    let shape = if trace == 0.0 {
        diagnostics.push(Diagnostic::UndefinedShape { id });
        None
    } else {
        Some(
            (((moments.i_xx - moments.i_yy).powi(2) + 4.0 * moments.i_xy.powi(2)) / trace.powi(2))
                .sqrt(),
        )
    };

    let event = CosmicRayEvent {
        id,
        pixel_coordinates: pixels,
        energy_deposited: energy,
        centroid: Some(Centroid {
            row: origin_row as f64 + center_row,
            col: origin_col as f64 + center_col,
        }),
        second_moments: Some(moments),
        size_in_pixels,
        size_in_sigma: Some(size_in_sigma),
        shape,
    };
    (event, diagnostics)
}

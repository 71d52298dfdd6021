use crate::error::{LabelError, Result};
use crate::structure::Structure;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target DQ bit for cosmic ray hits (HST calibration convention).
pub const DEFAULT_DQ_FLAG: u32 = 8192;
/// DQ bit marking detector defects ("bad pixel").
pub const DEFAULT_BAD_PIXEL_FLAG: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectorFamily {
    #[default]
    Ccd,
    Ir,
}

/// Options recognized by the labeling pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub detector: DetectorFamily,
    /// Build the mask from the DQ array instead of thresholding SCI.
    pub use_dq: bool,
    pub dq_flag: u32,
    pub bad_pixel_flag: u32,
    /// Exclude pixels where `bad_pixel_flag` is set as well.
    pub do_bitwise_comp: bool,
    /// Objects must cover more than this many pixels.
    pub threshold_l: i64,
    /// Objects must cover fewer than this many pixels.
    pub threshold_u: i64,
    pub structure: Structure,
    /// Reserved; no deblender exists yet.
    pub deblend: bool,
    /// Clipping level for intensity-mode thresholding, in standard deviations.
    pub clip_sigma: f64,
    pub clip_iterations: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            detector: DetectorFamily::Ccd,
            use_dq: true,
            dq_flag: DEFAULT_DQ_FLAG,
            bad_pixel_flag: DEFAULT_BAD_PIXEL_FLAG,
            do_bitwise_comp: true,
            threshold_l: 2,
            threshold_u: 1000,
            structure: Structure::eight_connected(),
            deblend: false,
            clip_sigma: 3.0,
            clip_iterations: 5,
        }
    }
}

impl LabelConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: LabelConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold_l < 0 || self.threshold_u < 0 {
            return Err(LabelError::InvalidConfig(format!(
                "thresholds must be non-negative (threshold_l={}, threshold_u={})",
                self.threshold_l, self.threshold_u
            )));
        }
        if self.threshold_l >= self.threshold_u {
            return Err(LabelError::InvalidConfig(format!(
                "threshold_l ({}) must be less than threshold_u ({})",
                self.threshold_l, self.threshold_u
            )));
        }
        if self.use_dq && self.dq_flag == 0 {
            return Err(LabelError::InvalidConfig(
                "dq_flag must select at least one bit".to_string(),
            ));
        }
        if !self.use_dq {
            if !(self.clip_sigma.is_finite() && self.clip_sigma > 0.0) {
                return Err(LabelError::InvalidConfig(format!(
                    "clip_sigma must be positive, got {}",
                    self.clip_sigma
                )));
            }
            if self.clip_iterations == 0 {
                return Err(LabelError::InvalidConfig(
                    "clip_iterations must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The exclusion bit, when the bitwise comparison is enabled.
    pub fn exclusion_flag(&self) -> Option<u32> {
        self.do_bitwise_comp.then_some(self.bad_pixel_flag)
    }

    pub fn size_bounds(&self) -> SizeBounds {
        SizeBounds {
            lower: self.threshold_l.max(0) as usize,
            upper: self.threshold_u.max(0) as usize,
        }
    }
}

/// Exclusive pixel-count window `lower < count < upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub lower: usize,
    pub upper: usize,
}

impl SizeBounds {
    pub fn contains(&self, count: usize) -> bool {
        self.lower < count && count < self.upper
    }
}

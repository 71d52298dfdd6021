//! Mask -> label -> statistics, each stage a function of its inputs.

use crate::config::{DetectorFamily, LabelConfig};
use crate::diagnostics::Diagnostics;
use crate::error::{LabelError, Result};
use crate::exposure::Exposure;
use crate::labeling::{label_and_filter, LabelMap};
use crate::mask::{dq_mask, intensity_mask, Mask};
use crate::moments::compute_statistics;
use crate::statistics::CosmicRayStatistics;

/// Build the foreground mask selected by `config.use_dq`.
pub fn build_mask(
    exposure: &Exposure,
    config: &LabelConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<Mask> {
    if config.use_dq {
        dq_mask(
            exposure.dq(),
            exposure.width(),
            exposure.height(),
            config.dq_flag,
            config.exclusion_flag(),
        )
    } else {
        intensity_mask(
            exposure.sci(),
            exposure.width(),
            exposure.height(),
            config.clip_sigma,
            config.clip_iterations,
            diagnostics,
        )
    }
}

/// Validate the configuration and produce the final, size-filtered labels.
pub fn run_labeling(
    exposure: &Exposure,
    config: &LabelConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<LabelMap> {
    config.validate()?;
    match config.detector {
        DetectorFamily::Ccd => {}
        DetectorFamily::Ir => return Err(LabelError::UnsupportedDetector(DetectorFamily::Ir)),
    }

    let mask = build_mask(exposure, config, diagnostics)?;
    Ok(label_and_filter(
        &mask,
        &config.structure,
        config.size_bounds(),
        config.deblend,
        diagnostics,
    ))
}

/// Label an exposure and measure every cosmic ray in it.
pub fn run(
    exposure: &Exposure,
    config: &LabelConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<CosmicRayStatistics> {
    let labels = run_labeling(exposure, config, diagnostics)?;
    compute_statistics(labels, exposure, diagnostics)
}

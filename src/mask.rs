//! Foreground/background masks from DQ flags or thresholded intensities.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ensure_len, Result};
use bumpalo::Bump;

/// Binary foreground mask, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self> {
        ensure_len("mask", width * height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Caller guarantees `data.len() == width * height`.
    pub(crate) fn from_parts(width: usize, height: usize, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Mask with the listed `(row, col)` pixels set.
    pub fn from_pixels(width: usize, height: usize, pixels: &[(usize, usize)]) -> Self {
        let mut data = vec![false; width * height];
        for &(row, col) in pixels {
            if row < height && col < width {
                data[row * width + col] = true;
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.width + col]
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&set| set).count()
    }
}

/// Pixels where `dq & flag != 0`, minus those also carrying `exclude`.
pub fn dq_mask(
    dq: &[u32],
    width: usize,
    height: usize,
    flag: u32,
    exclude: Option<u32>,
) -> Result<Mask> {
    ensure_len("dq", width * height, dq.len())?;
    let data = dq
        .iter()
        .map(|&value| {
            let flagged = value & flag != 0;
            match exclude {
                Some(bad) => flagged && value & bad == 0,
                None => flagged,
            }
        })
        .collect();
    Mask::new(width, height, data)
}

/// Location and scale of a sample after iterative outlier rejection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Samples surviving the final iteration.
    pub retained: usize,
}

/// Iteratively reject samples further than `sigma` standard deviations from
/// the median until nothing changes or `max_iterations` passes have run.
/// Non-finite samples are ignored. Returns `None` for an empty sample.
pub fn sigma_clipped_stats(values: &[f64], sigma: f64, max_iterations: usize) -> Option<ClippedStats> {
    // Arena for the working copy, reordered in place by sorting
    let arena = Bump::new();
    let mut active = bumpalo::collections::Vec::with_capacity_in(values.len(), &arena);
    active.extend(values.iter().copied().filter(|v| v.is_finite()));
    if active.is_empty() {
        return None;
    }
    active.sort_by(f64::total_cmp);

    for _ in 0..max_iterations {
        let median = sorted_median(&active);
        let std_dev = population_std_dev(&active);
        let low = median - sigma * std_dev;
        let high = median + sigma * std_dev;

        let before = active.len();
        active.retain(|v| *v >= low && *v <= high);
        if active.len() == before || active.is_empty() {
            break;
        }
    }

    if active.is_empty() {
        return None;
    }
    Some(ClippedStats {
        mean: mean(&active),
        median: sorted_median(&active),
        std_dev: population_std_dev(&active),
        retained: active.len(),
    })
}

/// Pixels brighter than `|median| + sigma * std` of the clipped distribution.
pub fn intensity_mask(
    sci: &[f64],
    width: usize,
    height: usize,
    sigma: f64,
    max_iterations: usize,
    diagnostics: &dyn Diagnostics,
) -> Result<Mask> {
    ensure_len("sci", width * height, sci.len())?;
    let Some(stats) = sigma_clipped_stats(sci, sigma, max_iterations) else {
        diagnostics.report(Diagnostic::EmptyImage);
        return Mask::new(width, height, vec![false; sci.len()]);
    };
    if stats.std_dev == 0.0 {
        diagnostics.report(Diagnostic::ZeroVariance {
            median: stats.median,
        });
    }

    let threshold = stats.median.abs() + sigma * stats.std_dev;
    tracing::debug!(
        "Intensity threshold {:.3} (median {:.3}, std {:.3}, {} samples retained)",
        threshold,
        stats.median,
        stats.std_dev,
        stats.retained
    );
    let data = sci.iter().map(|&value| value > threshold).collect();
    Mask::new(width, height, data)
}

fn sorted_median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64]) -> f64 {
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

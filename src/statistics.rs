use crate::labeling::LabelMap;
use serde::Serialize;

/// Intensity-weighted mean position, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub row: f64,
    pub col: f64,
}

/// Intensity-normalized inertia tensor about the centroid. `i_xx` runs along
/// rows, `i_yy` along columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecondMoments {
    pub i_xx: f64,
    pub i_yy: f64,
    pub i_xy: f64,
}

impl SecondMoments {
    pub fn trace(&self) -> f64 {
        self.i_xx + self.i_yy
    }
}

/// Statistics of a single labeled strike.
///
/// Undefined quantities are `None`: centroid and moments when the deposited
/// energy is zero, shape when the second moments vanish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CosmicRayEvent {
    pub id: u32,
    pub pixel_coordinates: Vec<(usize, usize)>,
    pub energy_deposited: f64,
    pub centroid: Option<Centroid>,
    pub second_moments: Option<SecondMoments>,
    pub size_in_pixels: usize,
    /// RMS spread of the energy distribution.
    pub size_in_sigma: Option<f64>,
    /// 0 for circular distributions, 1 for a line.
    pub shape: Option<f64>,
}

/// Everything computed for one exposure. Built once by
/// [`crate::moments::compute_statistics`]; read-only afterwards.
#[derive(Debug, Clone)]
pub struct CosmicRayStatistics {
    incident_rate: f64,
    integration_time: f64,
    events: Vec<CosmicRayEvent>,
    label_map: LabelMap,
}

impl CosmicRayStatistics {
    pub(crate) fn new(
        incident_rate: f64,
        integration_time: f64,
        events: Vec<CosmicRayEvent>,
        label_map: LabelMap,
    ) -> Self {
        Self {
            incident_rate,
            integration_time,
            events,
            label_map,
        }
    }

    /// Events per second; NaN when the integration time is zero.
    pub fn incident_rate(&self) -> f64 {
        self.incident_rate
    }

    pub fn integration_time(&self) -> f64 {
        self.integration_time
    }

    /// Events ordered by label id.
    pub fn events(&self) -> &[CosmicRayEvent] {
        &self.events
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn label_ids(&self) -> Vec<u32> {
        self.events.iter().map(|event| event.id).collect()
    }

    /// Coordinates of every affected pixel, event by event.
    pub fn affected_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.events
            .iter()
            .flat_map(|event| event.pixel_coordinates.iter().copied())
    }

    pub fn total_energy(&self) -> f64 {
        self.events.iter().map(|event| event.energy_deposited).sum()
    }

    pub fn summary(&self) -> ExposureSummary {
        ExposureSummary {
            event_count: self.events.len(),
            incident_rate: self.incident_rate,
            mean_shape: nan_mean(self.events.iter().filter_map(|e| e.shape)),
            mean_size_in_sigma: nan_mean(self.events.iter().filter_map(|e| e.size_in_sigma)),
            mean_size_in_pixels: nan_mean(self.events.iter().map(|e| e.size_in_pixels as f64)),
            mean_energy_deposited: nan_mean(self.events.iter().map(|e| e.energy_deposited)),
        }
    }
}

/// Per-exposure row for trending reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExposureSummary {
    pub event_count: usize,
    pub incident_rate: f64,
    pub mean_shape: f64,
    pub mean_size_in_sigma: f64,
    pub mean_size_in_pixels: f64,
    pub mean_energy_deposited: f64,
}

/// Mean of the finite values; NaN if there are none.
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean_skips_non_finite() {
        let mean = nan_mean([1.0, f64::NAN, 3.0, f64::INFINITY].into_iter());
        assert_eq!(mean, 2.0);
        assert!(nan_mean(std::iter::empty()).is_nan());
    }

    #[test]
    fn test_trace() {
        let moments = SecondMoments {
            i_xx: 1.5,
            i_yy: 0.5,
            i_xy: 0.25,
        };
        assert_eq!(moments.trace(), 2.0);
    }
}

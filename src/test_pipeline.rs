// End-to-end checks on synthetic exposures: noisy backgrounds with injected
// cosmic ray tracks, flagged the way the calibration pipeline flags them.

#[cfg(test)]
mod tests {
    use crate::config::{LabelConfig, SizeBounds};
    use crate::diagnostics::{Diagnostic, NullDiagnostics, RecordingDiagnostics};
    use crate::exposure::Exposure;
    use crate::labeling::{label, label_and_filter, size_filter, LabelMap};
    use crate::mask::Mask;
    use crate::pipeline::{run, run_labeling};
    use crate::structure::Structure;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    const CR_FLAG: u32 = 8192;
    const BAD_PIXEL: u32 = 4;

    struct SyntheticExposure {
        width: usize,
        height: usize,
        sci: Vec<f64>,
        dq: Vec<u32>,
        tracks: Vec<SyntheticTrack>,
    }

    #[derive(Debug, Clone)]
    struct SyntheticTrack {
        pixels: Vec<(usize, usize)>,
        energy: f64,
    }

    impl SyntheticExposure {
        /// Background level with uniform noise of the given peak-to-peak width
        fn new(width: usize, height: usize, background: f64, noise: f64, seed: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            let sci = (0..width * height)
                .map(|_| background + (rng.gen::<f64>() - 0.5) * noise)
                .collect();
            Self {
                width,
                height,
                sci,
                dq: vec![0; width * height],
                tracks: Vec::new(),
            }
        }

        /// Straight track from `start`, `length` pixels along `(d_row, d_col)`
        fn add_track(&mut self, start: (usize, usize), step: (isize, isize), length: usize, per_pixel: f64) {
            let mut pixels = Vec::with_capacity(length);
            let mut energy = 0.0;
            for i in 0..length {
                let row = (start.0 as isize + step.0 * i as isize) as usize;
                let col = (start.1 as isize + step.1 * i as isize) as usize;
                let idx = row * self.width + col;
                // Brighter towards the middle of the track
                let phase = (i + 1) as f64 * std::f64::consts::PI / (length + 1) as f64;
                let value = per_pixel * (1.0 + 0.5 * phase.sin());
                self.sci[idx] += value;
                self.dq[idx] |= CR_FLAG;
                energy += self.sci[idx];
                pixels.push((row, col));
            }
            self.tracks.push(SyntheticTrack { pixels, energy });
        }

        /// Static defect that the DQ array also flags as a hit
        fn add_hot_pixel(&mut self, row: usize, col: usize) {
            let idx = row * self.width + col;
            self.sci[idx] += 5000.0;
            self.dq[idx] |= CR_FLAG | BAD_PIXEL;
        }

        fn exposure(&self, integration_time: f64) -> Exposure {
            Exposure::new(
                self.width,
                self.height,
                self.sci.clone(),
                self.dq.clone(),
                integration_time,
            )
            .unwrap()
        }
    }

    fn random_mask(width: usize, height: usize, density: f64, seed: u64) -> Mask {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..width * height).map(|_| rng.gen_bool(density)).collect();
        Mask::new(width, height, data).unwrap()
    }

    fn foreground(labels: &LabelMap) -> HashSet<(usize, usize)> {
        let mut pixels = HashSet::new();
        for row in 0..labels.height() {
            for col in 0..labels.width() {
                if labels.get(row, col) > 0 {
                    pixels.insert((row, col));
                }
            }
        }
        pixels
    }

    #[test]
    fn test_tracks_recovered_and_hot_pixels_excluded() {
        let mut image = SyntheticExposure::new(64, 48, 20.0, 6.0, 7);
        image.add_track((5, 5), (0, 1), 8, 400.0);
        image.add_track((20, 30), (1, 1), 6, 300.0);
        image.add_track((40, 10), (-1, 1), 5, 250.0);
        image.add_hot_pixel(30, 50);
        image.add_hot_pixel(31, 50);

        let stats = run(&image.exposure(600.0), &LabelConfig::default(), &NullDiagnostics).unwrap();

        assert_eq!(stats.events().len(), 3);
        for (event, track) in stats.events().iter().zip(&image.tracks) {
            // Events list their pixels in raster order
            let mut expected = track.pixels.clone();
            expected.sort();
            assert_eq!(event.pixel_coordinates, expected);
            assert_eq!(event.size_in_pixels, track.pixels.len());
            assert!((event.energy_deposited - track.energy).abs() < 1e-9);
            // Straight tracks are strongly elongated
            assert!(event.shape.unwrap() > 0.99);
        }
        assert!((stats.incident_rate() - 3.0 / 600.0).abs() < 1e-12);
        assert!(!stats.affected_pixels().any(|p| p == (30, 50)));
    }

    #[test]
    fn test_horizontal_track_centroid() {
        let mut image = SyntheticExposure::new(32, 32, 0.0, 0.0, 1);
        image.add_track((10, 4), (0, 1), 9, 100.0);

        let stats = run(&image.exposure(100.0), &LabelConfig::default(), &NullDiagnostics).unwrap();
        let event = &stats.events()[0];
        let centroid = event.centroid.unwrap();

        // Symmetric brightness profile about the middle pixel
        assert!((centroid.row - 10.0).abs() < 1e-9);
        assert!((centroid.col - 8.0).abs() < 1e-9);
        let moments = event.second_moments.unwrap();
        assert_eq!(moments.i_xx, 0.0);
        assert!(moments.i_xy.abs() < 1e-9);
        assert!((event.size_in_sigma.unwrap() - (moments.i_yy / 2.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_partition_property() {
        let structure = Structure::eight_connected();
        let bounds = SizeBounds { lower: 1, upper: 12 };
        for seed in 0..5 {
            let mask = random_mask(40, 30, 0.15, seed);
            let labels = label_and_filter(&mask, &structure, bounds, false, &NullDiagnostics);

            let mut seen = HashSet::new();
            for pixels in labels.pixels_by_id() {
                for pixel in pixels {
                    // Pairwise disjoint
                    assert!(seen.insert(pixel));
                    // Subset of the input foreground
                    assert!(mask.get(pixel.0, pixel.1));
                }
            }
            assert_eq!(seen, foreground(&labels));

            // Final labels cover exactly the size-filtered mask
            let filtered = size_filter(&label(&mask, &structure), bounds, &NullDiagnostics);
            assert_eq!(labels.to_mask(), filtered);
            assert_eq!(seen.len(), filtered.foreground_count());
        }
    }

    #[test]
    fn test_size_threshold_property() {
        let bounds = SizeBounds { lower: 2, upper: 6 };
        for seed in 10..15 {
            let mask = random_mask(50, 50, 0.2, seed);
            let labels = label_and_filter(
                &mask,
                &Structure::four_connected(),
                bounds,
                false,
                &NullDiagnostics,
            );
            for &count in &labels.pixel_counts()[1..] {
                assert!(bounds.contains(count), "component of {} pixels kept", count);
            }
        }
    }

    #[test]
    fn test_components_are_maximal() {
        // No two distinct final labels touch under the structure used
        let mask = random_mask(30, 30, 0.25, 99);
        let structure = Structure::eight_connected();
        let labels = label_and_filter(
            &mask,
            &structure,
            SizeBounds { lower: 0, upper: 1000 },
            false,
            &NullDiagnostics,
        );
        for row in 0..labels.height() {
            for col in 0..labels.width() {
                let id = labels.get(row, col);
                if id == 0 {
                    continue;
                }
                for (d_row, d_col) in [(0isize, 1isize), (1, -1), (1, 0), (1, 1)] {
                    let n_row = row as isize + d_row;
                    let n_col = col as isize + d_col;
                    if n_row < 0 || n_col < 0 || n_row >= 30 || n_col >= 30 {
                        continue;
                    }
                    let neighbor = labels.get(n_row as usize, n_col as usize);
                    assert!(neighbor == 0 || neighbor == id);
                }
            }
        }
    }

    #[test]
    fn test_relabeling_is_idempotent() {
        let bounds = SizeBounds { lower: 1, upper: 8 };
        let structure = Structure::eight_connected();
        for seed in 20..25 {
            let mask = random_mask(40, 40, 0.1, seed);
            let first = label_and_filter(&mask, &structure, bounds, false, &NullDiagnostics);
            let second =
                label_and_filter(&first.to_mask(), &structure, bounds, false, &NullDiagnostics);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_energy_conservation() {
        let image = SyntheticExposure::new(40, 40, 15.0, 10.0, 3);
        let mut dq = image.dq.clone();
        let mut rng = StdRng::seed_from_u64(5);
        for value in dq.iter_mut() {
            if rng.gen_bool(0.08) {
                *value |= CR_FLAG;
            }
        }
        let exposure = Exposure::new(40, 40, image.sci.clone(), dq, 100.0).unwrap();
        let config = LabelConfig {
            threshold_l: 0,
            ..LabelConfig::default()
        };

        let stats = run(&exposure, &config, &NullDiagnostics).unwrap();
        let expected: f64 = foreground(stats.label_map())
            .iter()
            .map(|&(row, col)| exposure.sci()[row * 40 + col])
            .sum();
        assert!((stats.total_energy() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_single_pixel_events_have_undefined_shape() {
        let mut image = SyntheticExposure::new(10, 10, 0.0, 0.0, 0);
        image.add_track((2, 2), (0, 1), 1, 80.0);
        image.add_track((7, 7), (0, 1), 1, 60.0);
        let config = LabelConfig {
            threshold_l: 0,
            ..LabelConfig::default()
        };
        let diagnostics = RecordingDiagnostics::new();

        let stats = run(&image.exposure(10.0), &config, &diagnostics).unwrap();

        assert_eq!(stats.events().len(), 2);
        for event in stats.events() {
            assert_eq!(event.size_in_sigma, Some(0.0));
            assert_eq!(event.shape, None);
        }
        assert!(diagnostics.contains(|d| *d == Diagnostic::UndefinedShape { id: 1 }));
        assert!(diagnostics.contains(|d| *d == Diagnostic::UndefinedShape { id: 2 }));
        assert!(stats.summary().mean_shape.is_nan());
        assert_eq!(stats.summary().mean_size_in_pixels, 1.0);
    }

    #[test]
    fn test_empty_exposure() {
        let image = SyntheticExposure::new(16, 16, 10.0, 2.0, 11);
        let diagnostics = RecordingDiagnostics::new();
        let stats = run(&image.exposure(50.0), &LabelConfig::default(), &diagnostics).unwrap();

        assert!(stats.events().is_empty());
        assert_eq!(stats.incident_rate(), 0.0);
        assert_eq!(stats.summary().event_count, 0);
        assert!(diagnostics.contains(|d| *d == Diagnostic::EmptyImage));
    }

    #[test]
    fn test_deterministic_labels() {
        let mut image = SyntheticExposure::new(64, 64, 30.0, 8.0, 21);
        for i in 0..6 {
            image.add_track((3 + i * 10, 3 + i * 8), (1, 1), 3 + i, 200.0);
        }
        let exposure = image.exposure(300.0);
        let config = LabelConfig::default();

        let a = run_labeling(&exposure, &config, &NullDiagnostics).unwrap();
        let b = run_labeling(&exposure, &config, &NullDiagnostics).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.count(), 6);
    }

    #[test]
    fn test_multi_chip_exposure() {
        let mut top = SyntheticExposure::new(20, 10, 5.0, 1.0, 2);
        top.add_track((2, 2), (0, 1), 4, 100.0);
        let mut bottom = SyntheticExposure::new(20, 10, 5.0, 1.0, 3);
        bottom.add_track((5, 5), (1, 0), 3, 100.0);

        let stacked = Exposure::stack(vec![top.exposure(40.0), bottom.exposure(40.0)]).unwrap();
        let stats = run(&stacked, &LabelConfig::default(), &NullDiagnostics).unwrap();

        assert_eq!(stats.events().len(), 2);
        // Second chip rows are offset by the first chip's height
        assert_eq!(stats.events()[1].pixel_coordinates[0], (15, 5));
        assert!((stats.incident_rate() - 0.05).abs() < 1e-12);
    }
}

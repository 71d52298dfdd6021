use crate::error::{ensure_len, LabelError, Result};

/// One detector exposure as handed over by ingestion: gain-corrected
/// intensities, the DQ bitmask and the total integration time in seconds.
///
/// Arrays are row-major, `width` columns by `height` rows.
#[derive(Debug, Clone)]
pub struct Exposure {
    width: usize,
    height: usize,
    sci: Vec<f64>,
    dq: Vec<u32>,
    integration_time: f64,
}

impl Exposure {
    pub fn new(
        width: usize,
        height: usize,
        sci: Vec<f64>,
        dq: Vec<u32>,
        integration_time: f64,
    ) -> Result<Self> {
        ensure_len("sci", width * height, sci.len())?;
        ensure_len("dq", width * height, dq.len())?;
        if !integration_time.is_finite() || integration_time < 0.0 {
            return Err(LabelError::InvalidInput(format!(
                "integration time must be finite and non-negative, got {integration_time}"
            )));
        }
        Ok(Self {
            width,
            height,
            sci,
            dq,
            integration_time,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sci(&self) -> &[f64] {
        &self.sci
    }

    pub fn dq(&self) -> &[u32] {
        &self.dq
    }

    pub fn integration_time(&self) -> f64 {
        self.integration_time
    }

    /// Stack exposures top to bottom, as multi-chip detectors are read out.
    /// All chips must share the same width; the first chip's integration time
    /// is kept.
    pub fn stack(chips: Vec<Exposure>) -> Result<Self> {
        let mut chips = chips.into_iter();
        let Some(mut stacked) = chips.next() else {
            return Err(LabelError::InvalidInput(
                "cannot stack an empty list of chips".to_string(),
            ));
        };
        for chip in chips {
            ensure_len("chip width", stacked.width, chip.width)?;
            stacked.height += chip.height;
            stacked.sci.extend(chip.sci);
            stacked.dq.extend(chip.dq);
        }
        Ok(stacked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_rejected() {
        let result = Exposure::new(2, 2, vec![0.0; 4], vec![0; 3], 1.0);
        assert_eq!(
            result.unwrap_err(),
            LabelError::ShapeMismatch {
                what: "dq",
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_negative_integration_time_rejected() {
        let result = Exposure::new(1, 1, vec![0.0], vec![0], -1.0);
        assert!(matches!(result, Err(LabelError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_integration_time_allowed() {
        assert!(Exposure::new(1, 1, vec![0.0], vec![0], 0.0).is_ok());
    }

    #[test]
    fn test_stack_chips() {
        let top = Exposure::new(2, 1, vec![1.0, 2.0], vec![0, 1], 10.0).unwrap();
        let bottom = Exposure::new(2, 2, vec![3.0, 4.0, 5.0, 6.0], vec![2, 3, 4, 5], 10.0).unwrap();
        let stacked = Exposure::stack(vec![top, bottom]).unwrap();

        assert_eq!(stacked.width(), 2);
        assert_eq!(stacked.height(), 3);
        assert_eq!(stacked.sci(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(stacked.dq(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_stack_width_mismatch() {
        let a = Exposure::new(2, 1, vec![0.0; 2], vec![0; 2], 1.0).unwrap();
        let b = Exposure::new(3, 1, vec![0.0; 3], vec![0; 3], 1.0).unwrap();
        assert!(Exposure::stack(vec![a, b]).is_err());
    }
}

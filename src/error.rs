use crate::config::DetectorFamily;

/// Errors surfaced by the labeling and statistics engine.
///
/// Degenerate statistics (zero energy, single-pixel objects, zero
/// integration time) are not errors; they are reported through
/// [`crate::diagnostics::Diagnostics`] and leave the affected value undefined.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LabelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("shape mismatch for {what}: expected {expected} values, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("labeling is not implemented for {0:?} detectors")]
    UnsupportedDetector(DetectorFamily),
}

pub type Result<T> = std::result::Result<T, LabelError>;

/// Fail with [`LabelError::ShapeMismatch`] unless `found == expected`.
pub(crate) fn ensure_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(LabelError::ShapeMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

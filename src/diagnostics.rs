//! Scoped reporting of non-fatal conditions found while labeling.
//!
//! Every stage takes a `&dyn Diagnostics` instead of logging through global
//! state, so callers decide whether conditions go to `tracing`, get collected
//! for inspection, or are dropped.

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Sigma-clipped statistics collapsed to zero spread.
    ZeroVariance { median: f64 },
    /// The mask held no foreground pixels.
    EmptyImage,
    /// The largest pre-filter component was dropped as background.
    DominantComponentDiscarded { id: u32, pixels: usize },
    /// Deblending was requested but no deblender exists.
    DeblendUnavailable,
    LabelingSummary { initial: usize, kept: usize },
    /// Object energy summed to zero, centroid and moments are undefined.
    ZeroEnergy { id: u32 },
    /// Second moments vanish (single pixel), shape is undefined.
    UndefinedShape { id: u32 },
    /// Incident rate set to NaN.
    ZeroIntegrationTime,
    StatisticsComputed { events: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::ZeroVariance { .. }
            | Diagnostic::ZeroEnergy { .. }
            | Diagnostic::ZeroIntegrationTime
            | Diagnostic::DeblendUnavailable
            | Diagnostic::DominantComponentDiscarded { .. } => Severity::Warn,
            Diagnostic::EmptyImage
            | Diagnostic::LabelingSummary { .. }
            | Diagnostic::UndefinedShape { .. }
            | Diagnostic::StatisticsComputed { .. } => Severity::Info,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ZeroVariance { median } => write!(
                f,
                "sigma-clipped standard deviation is zero (median {median}); threshold equals |median|"
            ),
            Diagnostic::EmptyImage => write!(f, "mask contains no foreground pixels"),
            Diagnostic::DominantComponentDiscarded { id, pixels } => write!(
                f,
                "largest component {id} ({pixels} pixels) treated as background"
            ),
            Diagnostic::DeblendUnavailable => {
                write!(f, "deblending requested but not available; labels left as-is")
            }
            Diagnostic::LabelingSummary { initial, kept } => {
                write!(f, "labeled {initial} components, kept {kept} after size filter")
            }
            Diagnostic::ZeroEnergy { id } => write!(
                f,
                "object {id} has zero deposited energy; centroid and moments undefined"
            ),
            Diagnostic::UndefinedShape { id } => {
                write!(f, "object {id} has vanishing second moments; shape undefined")
            }
            Diagnostic::ZeroIntegrationTime => write!(
                f,
                "integration time is zero; setting cosmic ray rate to NaN"
            ),
            Diagnostic::StatisticsComputed { events } => {
                write!(f, "computed statistics for {events} cosmic rays")
            }
        }
    }
}

pub trait Diagnostics: Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Info => tracing::debug!("{}", diagnostic),
            Severity::Warn => tracing::warn!("{}", diagnostic),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics in arrival order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.records().iter().any(predicate)
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut records) = self.records.lock() {
            records.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_keeps_order() {
        let diagnostics = RecordingDiagnostics::new();
        diagnostics.report(Diagnostic::EmptyImage);
        diagnostics.report(Diagnostic::ZeroIntegrationTime);

        assert_eq!(
            diagnostics.records(),
            vec![Diagnostic::EmptyImage, Diagnostic::ZeroIntegrationTime]
        );
        assert!(diagnostics.contains(|d| matches!(d, Diagnostic::ZeroIntegrationTime)));
    }

    #[test]
    fn test_severity() {
        assert_eq!(Diagnostic::ZeroEnergy { id: 3 }.severity(), Severity::Warn);
        assert_eq!(Diagnostic::UndefinedShape { id: 3 }.severity(), Severity::Info);
    }

    #[test]
    fn test_display_mentions_id() {
        let text = Diagnostic::ZeroEnergy { id: 42 }.to_string();
        assert!(text.contains("42"));
    }
}

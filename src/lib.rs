pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exposure;
pub mod fits;
pub mod labeling;
pub mod mask;
pub mod moments;
pub mod pipeline;
pub mod statistics;
pub mod structure;

#[cfg(test)]
mod test_pipeline;

// Re-export commonly used items
pub use config::LabelConfig;
pub use error::LabelError;
pub use exposure::Exposure;
pub use labeling::LabelMap;
pub use pipeline::run;
pub use statistics::{CosmicRayEvent, CosmicRayStatistics};

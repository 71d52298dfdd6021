pub mod analyze;
pub mod label_objects;
pub mod show_config;

pub use analyze::analyze_exposures;
pub use label_objects::label_exposure;
pub use show_config::show_config;

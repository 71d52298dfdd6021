use clap::{Parser, Subcommand};
use cr_label::config::{DetectorFamily, LabelConfig};
use cr_label::fits::IngestOptions;
use cr_label::structure::Structure;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cr-label")]
#[command(about = "Label cosmic ray strikes in detector exposures and measure them", long_about = None)]
pub struct Cli {
    /// JSON file with labeling options; flags below override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label each exposure and report per-exposure cosmic ray statistics
    Analyze {
        /// FITS files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// List every event instead of one summary row per exposure
        #[arg(long)]
        events: bool,

        #[command(flatten)]
        ingest: IngestArgs,

        #[command(flatten)]
        label_options: LabelOptions,
    },

    /// Print the labeled components of one exposure
    Label {
        /// FITS file to label
        file: PathBuf,

        #[command(flatten)]
        ingest: IngestArgs,

        #[command(flatten)]
        label_options: LabelOptions,
    },

    /// Print the effective labeling configuration as JSON
    ShowConfig {
        #[command(flatten)]
        label_options: LabelOptions,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    /// EXTVER values of the SCI/DQ chips to stack
    #[arg(long, value_delimiter = ',', default_value = "1")]
    pub extensions: Vec<i32>,

    /// Detector readout time added to EXPTIME + FLASHDUR, seconds
    #[arg(long, default_value = "0.0")]
    pub readout_time: f64,

    /// Gain applied to SCI values (electrons per count)
    #[arg(long, default_value = "1.0")]
    pub gain: f64,
}

impl IngestArgs {
    pub fn to_ingest_options(&self) -> IngestOptions {
        IngestOptions {
            extension_versions: self.extensions.clone(),
            readout_time: self.readout_time,
            gain: self.gain,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
pub struct LabelOptions {
    /// Threshold the SCI array instead of using DQ flags
    #[arg(long)]
    pub use_sci: bool,

    /// DQ bit marking cosmic ray hits
    #[arg(long)]
    pub dq_flag: Option<u32>,

    /// DQ bit marking bad pixels to exclude
    #[arg(long)]
    pub bad_pixel_flag: Option<u32>,

    /// Keep flagged pixels even when they are also marked bad
    #[arg(long)]
    pub no_bitwise_comp: bool,

    /// Objects must be larger than this many pixels
    #[arg(long, allow_negative_numbers = true)]
    pub threshold_l: Option<i64>,

    /// Objects must be smaller than this many pixels
    #[arg(long, allow_negative_numbers = true)]
    pub threshold_u: Option<i64>,

    /// Pixel connectivity (four or eight)
    #[arg(long)]
    pub connectivity: Option<String>,

    /// Request deblending of overlapping strikes
    #[arg(long)]
    pub deblend: bool,

    /// Detector family (ccd or ir)
    #[arg(long, value_parser = parse_detector)]
    pub detector: Option<DetectorFamily>,

    /// Clipping level for SCI thresholding, in standard deviations
    #[arg(long)]
    pub clip_sigma: Option<f64>,
}

impl LabelOptions {
    /// Apply the flags given on the command line on top of `base`.
    pub fn apply(&self, mut base: LabelConfig) -> anyhow::Result<LabelConfig> {
        if self.use_sci {
            base.use_dq = false;
        }
        if let Some(flag) = self.dq_flag {
            base.dq_flag = flag;
        }
        if let Some(flag) = self.bad_pixel_flag {
            base.bad_pixel_flag = flag;
        }
        if self.no_bitwise_comp {
            base.do_bitwise_comp = false;
        }
        if let Some(threshold) = self.threshold_l {
            base.threshold_l = threshold;
        }
        if let Some(threshold) = self.threshold_u {
            base.threshold_u = threshold;
        }
        if let Some(connectivity) = &self.connectivity {
            base.structure = Structure::from_connectivity(connectivity)?;
        }
        if self.deblend {
            base.deblend = true;
        }
        if let Some(detector) = self.detector {
            base.detector = detector;
        }
        if let Some(sigma) = self.clip_sigma {
            base.clip_sigma = sigma;
        }
        base.validate()?;
        Ok(base)
    }
}

fn parse_detector(value: &str) -> Result<DetectorFamily, String> {
    match value.to_lowercase().as_str() {
        "ccd" => Ok(DetectorFamily::Ccd),
        "ir" => Ok(DetectorFamily::Ir),
        other => Err(format!("unknown detector '{}', use ccd or ir", other)),
    }
}

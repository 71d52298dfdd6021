mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use cr_label::config::LabelConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base = match &cli.config {
        Some(path) => LabelConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => LabelConfig::default(),
    };

    match cli.command {
        Commands::Analyze {
            files,
            format,
            events,
            ingest,
            label_options,
        } => {
            let config = label_options.apply(base)?;
            commands::analyze_exposures(
                &files,
                &config,
                &ingest.to_ingest_options(),
                &format,
                events,
            )?;
        }
        Commands::Label {
            file,
            ingest,
            label_options,
        } => {
            let config = label_options.apply(base)?;
            commands::label_exposure(&file, &config, &ingest.to_ingest_options())?;
        }
        Commands::ShowConfig { label_options } => {
            let config = label_options.apply(base)?;
            commands::show_config(&config)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use anyhow::Result;
use cr_label::config::LabelConfig;
use cr_label::diagnostics::TracingDiagnostics;
use cr_label::fits::{read_exposure, IngestOptions};
use cr_label::pipeline::run;
use cr_label::statistics::{CosmicRayEvent, CosmicRayStatistics};
use std::path::{Path, PathBuf};

struct ExposureResult {
    file: String,
    stats: CosmicRayStatistics,
}

pub fn analyze_exposures(
    files: &[PathBuf],
    config: &LabelConfig,
    ingest: &IngestOptions,
    format: &str,
    list_events: bool,
) -> Result<()> {
    let mut results = Vec::with_capacity(files.len());
    let mut failures = 0usize;

    for path in files {
        match analyze_single(path, config, ingest) {
            Ok(stats) => results.push(ExposureResult {
                file: file_name(path),
                stats,
            }),
            Err(e) => {
                // One unreadable exposure should not stop the batch
                tracing::error!("Failed to analyze {}: {:#}", path.display(), e);
                failures += 1;
            }
        }
    }

    match (format, list_events) {
        ("json", false) => output_summary_json(&results)?,
        ("json", true) => output_events_json(&results)?,
        ("csv", false) => output_summary_csv(&results),
        ("csv", true) => output_events_csv(&results),
        (_, false) => output_summary_table(&results),
        (_, true) => output_events_table(&results),
    }

    if failures > 0 && results.is_empty() {
        return Err(anyhow::anyhow!("No exposures could be analyzed"));
    }
    Ok(())
}

fn analyze_single(path: &Path, config: &LabelConfig, ingest: &IngestOptions) -> Result<CosmicRayStatistics> {
    let exposure = read_exposure(path, ingest)?;
    let stats = run(&exposure, config, &TracingDiagnostics)?;
    tracing::info!(
        "{}: {} cosmic rays, rate {:.4}/s",
        path.display(),
        stats.events().len(),
        stats.incident_rate()
    );
    Ok(stats)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn fmt_option(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "NaN".to_string())
}

fn output_summary_table(results: &[ExposureResult]) {
    println!(
        "{:<30} {:>8} {:>12} {:>14} {:>10} {:>10} {:>8}",
        "File", "Events", "Rate [1/s]", "Energy [e]", "Size [px]", "Size [σ]", "Shape"
    );
    println!("{:-<98}", "");

    for result in results {
        let summary = result.stats.summary();
        println!(
            "{:<30} {:>8} {:>12.4} {:>14.1} {:>10.2} {:>10.3} {:>8.3}",
            truncate_string(&result.file, 30),
            summary.event_count,
            summary.incident_rate,
            summary.mean_energy_deposited,
            summary.mean_size_in_pixels,
            summary.mean_size_in_sigma,
            summary.mean_shape
        );
    }

    println!("\nTotal: {} exposures", results.len());
}

fn output_summary_csv(results: &[ExposureResult]) {
    println!("file,event_count,incident_rate,mean_energy_deposited,mean_size_in_pixels,mean_size_in_sigma,mean_shape");
    for result in results {
        let summary = result.stats.summary();
        println!(
            "{},{},{},{},{},{},{}",
            result.file,
            summary.event_count,
            summary.incident_rate,
            summary.mean_energy_deposited,
            summary.mean_size_in_pixels,
            summary.mean_size_in_sigma,
            summary.mean_shape
        );
    }
}

fn output_summary_json(results: &[ExposureResult]) -> Result<()> {
    let json_results: Vec<serde_json::Value> = results
        .iter()
        .map(|result| {
            serde_json::json!({
                "file": result.file,
                "integration_time": result.stats.integration_time(),
                "summary": result.stats.summary(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_results)?);
    Ok(())
}

fn output_events_table(results: &[ExposureResult]) {
    println!(
        "{:<30} {:>6} {:>14} {:>9} {:>9} {:>8} {:>9} {:>8}",
        "File", "Id", "Energy [e]", "Row", "Col", "Pixels", "Size [σ]", "Shape"
    );
    println!("{:-<100}", "");

    for result in results {
        for event in result.stats.events() {
            let (row, col) = centroid_strings(event);
            println!(
                "{:<30} {:>6} {:>14.1} {:>9} {:>9} {:>8} {:>9} {:>8}",
                truncate_string(&result.file, 30),
                event.id,
                event.energy_deposited,
                row,
                col,
                event.size_in_pixels,
                fmt_option(event.size_in_sigma),
                fmt_option(event.shape)
            );
        }
    }
}

fn output_events_csv(results: &[ExposureResult]) {
    println!("file,id,energy_deposited,centroid_row,centroid_col,size_in_pixels,size_in_sigma,shape");
    for result in results {
        for event in result.stats.events() {
            let (row, col) = centroid_strings(event);
            println!(
                "{},{},{},{},{},{},{},{}",
                result.file,
                event.id,
                event.energy_deposited,
                row,
                col,
                event.size_in_pixels,
                fmt_option(event.size_in_sigma),
                fmt_option(event.shape)
            );
        }
    }
}

fn output_events_json(results: &[ExposureResult]) -> Result<()> {
    let json_results: Vec<serde_json::Value> = results
        .iter()
        .map(|result| {
            serde_json::json!({
                "file": result.file,
                "incident_rate": result.stats.incident_rate(),
                "events": result.stats.events(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_results)?);
    Ok(())
}

fn centroid_strings(event: &CosmicRayEvent) -> (String, String) {
    match event.centroid {
        Some(c) => (format!("{:.2}", c.row), format!("{:.2}", c.col)),
        None => ("NaN".to_string(), "NaN".to_string()),
    }
}

/// Shorten to at most `max_len` characters, marking the cut with `...`.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

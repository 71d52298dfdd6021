use anyhow::Result;
use cr_label::config::LabelConfig;
use cr_label::diagnostics::TracingDiagnostics;
use cr_label::fits::{read_exposure, IngestOptions};
use cr_label::pipeline::run_labeling;
use std::path::Path;

/// Print id, pixel count and bounding box of every labeled component.
pub fn label_exposure(path: &Path, config: &LabelConfig, ingest: &IngestOptions) -> Result<()> {
    let exposure = read_exposure(path, ingest)?;
    let labels = run_labeling(&exposure, config, &TracingDiagnostics)?;

    let counts = labels.pixel_counts();
    let boxes = labels.bounding_boxes();

    println!("{:<8} {:>8} {:>8} {:>8} {:>8} {:>8}", "Id", "Pixels", "X", "Y", "Width", "Height");
    println!("{:-<54}", "");
    for (id, bounds) in labels.ids().zip(&boxes) {
        println!(
            "{:<8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            id, counts[id as usize], bounds.x, bounds.y, bounds.width, bounds.height
        );
    }

    println!(
        "\n{} components in {}x{} image ({} foreground pixels)",
        labels.count(),
        labels.width(),
        labels.height(),
        counts.iter().skip(1).sum::<usize>()
    );
    Ok(())
}

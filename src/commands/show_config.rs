use anyhow::Result;
use cr_label::config::LabelConfig;

pub fn show_config(config: &LabelConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

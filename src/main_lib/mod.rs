pub mod args;

use anyhow::{Context, Result};
use kbd_layout_parser::layout::Layout;
use std::path::Path;

use args::OutputFormat;

pub fn render(layout: &Layout, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Kle => Ok(layout.to_kle()),
        OutputFormat::Json => layout
            .to_json()
            .context("could not serialize the layout to JSON"),
    }
}

pub fn write_output(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, format!("{text}\n"))
        .with_context(|| format!("could not write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

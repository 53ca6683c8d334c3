//! `bunkai render`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use bunkai::analysis::SentenceAnalysis;
use bunkai::config::Config;
use bunkai::diagram::{render, LayoutConfig};
use bunkai::service::AnalysisService;
use bunkai::utils::sanitize::sanitize_analysis;

pub(crate) async fn cmd_render(
    config: Config,
    sentence: Option<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let analysis = match (sentence, input) {
        (_, Some(path)) => Arc::new(load_analysis(&path)?),
        (Some(sentence), None) => {
            let service = AnalysisService::from_config(&config)
                .with_context(|| "Failed to initialize analysis service")?;
            service
                .analyze(&sentence)
                .await
                .with_context(|| "Failed to analyze sentence")?
        }
        (None, None) => bail!("Provide a sentence or --input FILE"),
    };

    let svg = render(&analysis, &LayoutConfig::default());
    match output {
        Some(path) => std::fs::write(&path, svg)
            .with_context(|| format!("Failed to write diagram to {}", path.display()))?,
        None => print!("{svg}"),
    }
    Ok(())
}

/// Read a saved analysis, validating and sanitizing it like a live one.
fn load_analysis(path: &Path) -> Result<SentenceAnalysis> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis from {}", path.display()))?;
    let value = serde_json::from_str(&data)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let analysis = SentenceAnalysis::from_tool_input(value)
        .with_context(|| format!("{} is not a valid sentence analysis", path.display()))?;
    Ok(sanitize_analysis(analysis))
}

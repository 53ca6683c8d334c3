//! `bunkai analyze`.

use anyhow::{Context, Result};

use bunkai::config::Config;
use bunkai::service::AnalysisService;

pub(crate) async fn cmd_analyze(config: Config, sentence: &str, pretty: bool) -> Result<()> {
    let service = AnalysisService::from_config(&config)
        .with_context(|| "Failed to initialize analysis service")?;
    let analysis = service
        .analyze(sentence)
        .await
        .with_context(|| "Failed to analyze sentence")?;

    let json = if pretty {
        serde_json::to_string_pretty(analysis.as_ref())?
    } else {
        serde_json::to_string(analysis.as_ref())?
    };
    println!("{json}");
    Ok(())
}

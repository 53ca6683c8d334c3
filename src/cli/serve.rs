//! `bunkai serve`.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use bunkai::api::server::{start_server, AppState};
use bunkai::config::Config;
use bunkai::service::AnalysisService;

pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let service = AnalysisService::from_config(&config)
        .with_context(|| "Failed to initialize analysis service")?;
    let state = AppState::new(Arc::new(service));
    start_server(&config.server, state)
        .await
        .map_err(|e| anyhow!("API server error: {e}"))
}

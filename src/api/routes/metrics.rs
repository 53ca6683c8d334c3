//! Cache and upstream counters.

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::service::ServiceMetrics;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<ServiceMetrics> {
    Json(state.service.metrics())
}

//! `POST /api/diagram`: same input contract as `/api/analyze`, SVG out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::diagram::render;

use super::analyze::parse_sentence;

pub async fn diagram(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let sentence = parse_sentence(&body)?;
    let analysis = state.service.analyze(&sentence).await?;
    let svg = render(&analysis, &state.layout);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

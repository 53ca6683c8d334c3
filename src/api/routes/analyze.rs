//! `POST /api/analyze`.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::analysis::SentenceAnalysis;
use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::error::{BunkaiError, Result};

/// Pull a non-empty `sentence` string out of a raw JSON request body.
///
/// The body is parsed by hand rather than with the `Json` extractor so that
/// every malformed shape (not JSON, wrong content type, missing or
/// non-string field) gets the same 400 response.
pub fn parse_sentence(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| BunkaiError::InvalidInput(format!("body is not JSON: {}", e)))?;
    match value.get("sentence") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(BunkaiError::InvalidInput("sentence is empty".into())),
        Some(_) => Err(BunkaiError::InvalidInput("sentence is not a string".into())),
        None => Err(BunkaiError::InvalidInput("sentence is missing".into())),
    }
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<SentenceAnalysis>, ApiError> {
    let sentence = parse_sentence(&body)?;
    let analysis = state.service.analyze(&sentence).await?;
    info!(
        words = analysis.words.len(),
        fragment = analysis.is_fragment,
        "Sentence analyzed"
    );
    Ok(Json(SentenceAnalysis::clone(&analysis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sentence_ok() {
        let s = parse_sentence(r#"{"sentence":"花が咲いた。"}"#.as_bytes()).unwrap();
        assert_eq!(s, "花が咲いた。");
    }

    #[test]
    fn test_parse_sentence_rejects_bad_bodies() {
        for body in [
            "",
            "not json",
            "{}",
            r#"{"sentence":42}"#,
            r#"{"sentence":null}"#,
            r#"{"sentence":""}"#,
            r#"["sentence"]"#,
        ] {
            let err = parse_sentence(body.as_bytes()).unwrap_err();
            assert!(matches!(err, BunkaiError::InvalidInput(_)), "{body}");
        }
    }

    #[test]
    fn test_parse_sentence_keeps_whitespace() {
        // The sentence is the cache key, so it must not be normalized.
        let s = parse_sentence(r#"{"sentence":" 花 "}"#.as_bytes()).unwrap();
        assert_eq!(s, " 花 ");
    }
}

//! Mapping from pipeline errors to HTTP responses.
//!
//! Clients only ever see one of three fixed messages; the underlying error
//! is logged and dropped.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::error::BunkaiError;

pub const INVALID_SENTENCE: &str = "Invalid sentence provided";
pub const MISSING_API_KEY: &str = "ANTHROPIC_API_KEY not configured";
pub const ANALYSIS_FAILED: &str = "Failed to analyze sentence";

/// Error returned by API handlers.
#[derive(Debug)]
pub struct ApiError(pub BunkaiError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            BunkaiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never includes error detail.
    pub fn message(&self) -> &'static str {
        match self.0 {
            BunkaiError::InvalidInput(_) => INVALID_SENTENCE,
            BunkaiError::ConfigurationMissing(_) => MISSING_API_KEY,
            _ => ANALYSIS_FAILED,
        }
    }
}

impl From<BunkaiError> for ApiError {
    fn from(err: BunkaiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(kind = self.0.kind(), error = %self.0, "Rejected analysis request");
        } else {
            error!(kind = self.0.kind(), error = %self.0, "Analysis request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_message_mapping() {
        let cases = [
            (BunkaiError::InvalidInput("x".into()), 400, INVALID_SENTENCE),
            (BunkaiError::ConfigurationMissing("x".into()), 500, MISSING_API_KEY),
            (BunkaiError::Upstream("x".into()), 500, ANALYSIS_FAILED),
            (BunkaiError::Config("x".into()), 500, ANALYSIS_FAILED),
        ];
        for (err, status, message) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.message(), message);
        }
    }

    #[test]
    fn test_detail_not_leaked() {
        let api = ApiError(BunkaiError::Upstream("secret upstream detail".into()));
        assert!(!api.message().contains("secret"));
        assert_eq!(
            api.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

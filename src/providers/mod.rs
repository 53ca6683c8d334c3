//! External sentence analyzers.
//!
//! The analysis itself is delegated to a hosted model; this module only
//! defines the seam ([`Analyzer`]) and the Anthropic implementation.

pub mod anthropic;

use async_trait::async_trait;
use serde_json::Value;

use crate::analysis::SentenceAnalysis;
use crate::error::{BunkaiError, Result};

pub use anthropic::AnthropicProvider;

/// Something that turns a sentence into a validated (not yet sanitized)
/// [`SentenceAnalysis`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, sentence: &str) -> Result<SentenceAnalysis>;
}

/// Turn a non-2xx provider response into an upstream error.
///
/// Pulls `error.message` out of a JSON error body when there is one; falls
/// back to the raw text otherwise.
pub fn parse_provider_error(provider: &str, status: u16, body: &str) -> BunkaiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());
    let class = match status {
        401 | 403 => "authentication failed",
        429 => "rate limited",
        529 => "overloaded",
        500..=599 => "server error",
        _ => "request rejected",
    };
    BunkaiError::Upstream(format!("{provider} {class} ({status}): {detail}"))
}

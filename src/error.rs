//! Error types for Bunkai.
//!
//! Every fallible library call returns [`Result`]. The HTTP layer collapses
//! these into a small set of fixed client-facing messages (see
//! `api::error`), so variant payloads are for logs only.

use thiserror::Error;

/// Unified error type for the analysis pipeline.
#[derive(Debug, Error)]
pub enum BunkaiError {
    /// The caller sent something that is not an analyzable sentence.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No credential for the external analyzer.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The external analyzer failed, or returned a payload we cannot trust.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Config file or environment override could not be applied.
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BunkaiError {
    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::Upstream(_) => "upstream_failure",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BunkaiError>;

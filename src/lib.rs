//! Bunkai: Japanese sentence structure analysis.
//!
//! A sentence goes to a hosted model that returns a structured breakdown
//! (words, readings, parts of speech, modification edges, topic marking).
//! The result is sanitized, cached, and served as JSON or rendered as an
//! SVG diagram with arcs from each modifier to what it modifies.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod diagram;
pub mod error;
pub mod providers;
pub mod service;
pub mod utils;

pub use analysis::{AttachedParticle, SentenceAnalysis, WordNode};
pub use config::Config;
pub use error::{BunkaiError, Result};
pub use service::AnalysisService;

//! Route handlers for the analysis API.

pub mod analyze;
pub mod diagram;
pub mod health;
pub mod metrics;

// HTTP surface: axum router, handlers and error mapping.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

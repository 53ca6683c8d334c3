//! Analysis response caching: TTL cache plus single-flight key locks.

pub mod response_cache;
pub mod single_flight;

pub use response_cache::{CacheEntry, CacheStats, ResponseCache};
pub use single_flight::{FlightGuard, SingleFlight};

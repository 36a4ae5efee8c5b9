//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the AccountServiceClient port
//! - In-memory account service for offline use and tests
//! - JSON file and in-memory stores for the KeyValueStore port

pub mod http;
pub mod mock;
pub mod store;

#[cfg(test)]
pub mod http_mock;

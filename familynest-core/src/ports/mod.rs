//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The session
//! manager depends only on these traits, not on concrete implementations.

mod account_service;
mod store;

pub use account_service::{
    AccountServiceClient, LoginRequest, LoginResponse, RegisterRequest, RemoteUser,
};
pub use store::{keys, KeyValueStore};

//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Bad credentials, or the service could not authenticate the user
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server-side validation failure or conflict on register
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Account fetch failed: {0}")]
    AccountFetchFailed(String),

    #[error("Transaction fetch failed: {0}")]
    TransactionFetchFailed(String),

    /// The local store holds a session that cannot be read back
    #[error("Malformed persisted session: {0}")]
    MalformedPersistedSession(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a registration error
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::RegistrationFailed(msg.into())
    }

    /// Create an account fetch error
    pub fn account_fetch(msg: impl Into<String>) -> Self {
        Self::AccountFetchFailed(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error is meant to be shown to the user.
    ///
    /// Everything else is logged and absorbed by the session manager.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::RegistrationFailed(_) | Self::TransactionFetchFailed(_)
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

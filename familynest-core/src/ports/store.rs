//! Local persistent store port
//!
//! A small synchronous string key-value store, the equivalent of browser
//! local storage. The session manager keeps its token and user record here.

use crate::domain::result::Result;

/// Keys used by the session manager
pub mod keys {
    /// Bearer token issued at login
    pub const TOKEN: &str = "token";
    /// Serialized user record
    pub const USER: &str = "user";
    /// Id of the last selected account
    pub const SELECTED_ACCOUNT: &str = "selectedAccount";

    /// Every key owned by a session, cleared together on logout
    pub const SESSION_KEYS: [&str; 3] = [TOKEN, USER, SELECTED_ACCOUNT];
}

/// Synchronous key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

//! FamilyNest Core - session and account state for family finance
//!
//! This crate implements the client-side session logic following hexagonal
//! architecture:
//!
//! - **domain**: Core entities (User, Account, Transaction, Session)
//! - **ports**: Trait definitions for external dependencies (AccountServiceClient, KeyValueStore)
//! - **services**: Business logic orchestration (SessionManager, event log)
//! - **adapters**: Concrete implementations (HTTP, in-memory mock, file store)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

pub(crate) mod log_migrations;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adapters::http::HttpAccountService;
use adapters::mock::MockAccountService;
use adapters::store::FileStore;
use config::Config;
use ports::{AccountServiceClient, KeyValueStore};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{Account, Role, Session, SessionPhase, Transaction, User};
pub use services::{
    EntryPoint, EventCount, EventFilter, EventLog, LogEvent, RecordedEvent, SessionEvent, SessionManager,
};

/// Main context for FamilyNest operations
///
/// Holds the configuration, the persistent store and the session manager
/// wired to the configured backend. Call `session.restore()` before use.
pub struct FamilyNestContext {
    pub config: Config,
    pub store: Arc<FileStore>,
    pub session: SessionManager,
}

impl FamilyNestContext {
    /// Create a context rooted at the FamilyNest directory
    pub fn new(app_dir: &Path) -> Result<Self> {
        let config = Config::load(app_dir).map_err(|e| Error::Config(e.to_string()))?;
        let store = Arc::new(FileStore::open(app_dir)?);
        let kv: Arc<dyn KeyValueStore> = store.clone();

        let client: Arc<dyn AccountServiceClient> = if config.mock_mode {
            Arc::new(MockAccountService::with_demo_family()?)
        } else {
            Arc::new(HttpAccountService::with_timeout(
                &config.api_base_url,
                Arc::clone(&kv),
                Duration::from_secs(config.request_timeout_secs),
            )?)
        };
        tracing::debug!(backend = client.name(), "Initialized account service");

        let session = SessionManager::new(client, kv);

        Ok(Self {
            config,
            store,
            session,
        })
    }

    /// Record session events in an event log
    pub fn with_event_log(self, event_log: Arc<EventLog>) -> Self {
        Self {
            session: self.session.with_event_log(event_log),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_context_in_mock_mode() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.enable_mock_mode();
        config.save(dir.path()).unwrap();

        let mut ctx = FamilyNestContext::new(dir.path()).unwrap();
        assert_eq!(ctx.session.backend_name(), "mock");

        ctx.session.login("parent", adapters::mock::DEMO_PASSWORD).await.unwrap();
        assert!(ctx.store.get(ports::keys::TOKEN).unwrap().is_some());
    }

    #[test]
    fn test_context_rejects_invalid_api_url() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            mock_mode: false,
            api_base_url: "not a url".to_string(),
            request_timeout_secs: 30,
        };
        config.save(dir.path()).unwrap();

        assert!(matches!(FamilyNestContext::new(dir.path()), Err(Error::Config(_))));
    }
}

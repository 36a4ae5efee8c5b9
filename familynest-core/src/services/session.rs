//! Session service - login, registration, logout and account selection
//!
//! `SessionManager` owns the one `Session` of the process. It is built with
//! an account service client and a key-value store, and publishes a fresh
//! snapshot on a watch channel whenever the session changes.
//!
//! Only authentication and registration failures reach the caller. Failed
//! account fetches and unreadable persisted sessions are logged and
//! absorbed: the user stays signed in with zero accounts, or starts over
//! signed out.

use std::sync::Arc;

use tokio::sync::watch;

use super::event_log::{EventLog, LogEvent, SessionEvent};
use crate::domain::result::{Error, Result};
use crate::domain::{Role, Session, SessionPhase, Transaction, User};
use crate::ports::{keys, AccountServiceClient, KeyValueStore, LoginRequest, RegisterRequest};

/// Owner of the session state
pub struct SessionManager {
    client: Arc<dyn AccountServiceClient>,
    store: Arc<dyn KeyValueStore>,
    event_log: Option<Arc<EventLog>>,
    state: Session,
    updates: watch::Sender<Session>,
}

impl SessionManager {
    /// Create a manager with an empty, unauthenticated session.
    ///
    /// Call [`SessionManager::restore`] once at start-up to pick up a
    /// persisted session.
    pub fn new(client: Arc<dyn AccountServiceClient>, store: Arc<dyn KeyValueStore>) -> Self {
        let (updates, _) = watch::channel(Session::empty());
        Self {
            client,
            store,
            event_log: None,
            state: Session::empty(),
            updates,
        }
    }

    /// Record session events in an event log
    pub fn with_event_log(mut self, event_log: Arc<EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    /// Current session snapshot
    pub fn session(&self) -> &Session {
        &self.state
    }

    /// Receive a snapshot every time the session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.updates.subscribe()
    }

    /// Name of the account service backend in use
    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Restore a persisted session, if any. Never fails.
    pub async fn restore(&mut self) {
        let user = match self.read_persisted_user() {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.state.clear();
                self.publish();
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Discarding persisted session");
                self.record(LogEvent::new(SessionEvent::SessionRestoreDiscarded).with_error(e.to_string()));
                self.clear_persisted();
                self.state.clear();
                self.publish();
                return;
            }
        };

        self.state.establish(user);
        self.state.begin(SessionPhase::Restoring);
        self.publish();

        self.fetch_accounts_for_current_user().await;

        let remembered = self.store.get(keys::SELECTED_ACCOUNT).ok().flatten();
        if let Some(account_id) = remembered {
            self.state.select(&account_id);
        }
        self.state.select_first_if_unselected();
        self.persist_selection();

        self.state.finish_authenticated();
        self.publish();
        self.record(LogEvent::new(SessionEvent::SessionRestored));
    }

    /// Authenticate and load the user's accounts.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let previous = self.state.clone();
        self.state.begin(SessionPhase::Authenticating);
        self.publish();

        self.complete_login(username, password, previous).await
    }

    /// Register a new user, then log in with the same credentials.
    ///
    /// `parent_id` is forwarded for children and dropped for parents.
    /// Checking that a child actually has one is up to the caller.
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
        parent_id: Option<&str>,
    ) -> Result<()> {
        let request = RegisterRequest::new(username, email, password, role, parent_id)?;

        let previous = self.state.clone();
        self.state.begin(SessionPhase::Authenticating);
        self.publish();

        if let Err(e) = self.client.register(&request).await {
            tracing::info!(error = %e, "Registration rejected");
            self.record(LogEvent::new(SessionEvent::RegistrationFailed).with_error(e.to_string()));
            self.state = previous;
            self.publish();
            return Err(e);
        }

        tracing::info!(role = %role, "Registered new user");
        self.complete_login(username, password, previous).await
    }

    /// Forget the session locally. No network call.
    pub fn logout(&mut self) {
        self.clear_persisted();
        self.state.clear();
        self.publish();
        self.record(LogEvent::new(SessionEvent::LoggedOut));
    }

    /// Select an account by id.
    ///
    /// Unknown ids are ignored and return `false`; a caller may be racing
    /// an account-list refresh.
    pub fn select_account(&mut self, account_id: &str) -> bool {
        if !self.state.select(account_id) {
            tracing::debug!(account_id, "Ignoring selection of unknown account");
            return false;
        }
        self.persist_selection();
        self.publish();
        true
    }

    /// Reload the account list for the signed-in user
    pub async fn refresh_accounts(&mut self) {
        if self.state.user().is_none() {
            return;
        }
        self.state.set_loading(true);
        self.publish();

        self.fetch_accounts_for_current_user().await;
        self.persist_selection();

        self.state.set_loading(false);
        self.publish();
    }

    /// Transactions on the selected account, newest first.
    ///
    /// Returns an empty list when nothing is selected.
    pub async fn fetch_selected_transactions(&self) -> Result<Vec<Transaction>> {
        let Some(account) = self.state.selected_account() else {
            return Ok(Vec::new());
        };
        self.client
            .get_transactions(&account.id)
            .await
            .map_err(|e| match e {
                Error::TransactionFetchFailed(_) => e,
                other => Error::TransactionFetchFailed(other.to_string()),
            })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Second half of login, shared with registration.
    ///
    /// `previous` is the state to fall back to on failure.
    async fn complete_login(&mut self, username: &str, password: &str, previous: Session) -> Result<()> {
        let outcome = self
            .client
            .login(&LoginRequest::new(username, password))
            .await
            .and_then(|response| Ok((response.token, response.user.into_user()?)));

        let (token, user) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let e = match e {
                    Error::AuthenticationFailed(_) => e,
                    other => Error::authentication(other.to_string()),
                };
                tracing::info!(error = %e, "Login rejected");
                self.record(LogEvent::new(SessionEvent::LoginFailed).with_error(e.to_string()));
                self.state = previous;
                self.publish();
                return Err(e);
            }
        };

        // Persist first so the account fetch carries the new token
        self.persist_credentials(&token, &user);
        self.state.establish(user);
        self.fetch_accounts_for_current_user().await;
        self.state.select_first_if_unselected();
        self.persist_selection();

        self.state.finish_authenticated();
        self.publish();
        self.record(LogEvent::new(SessionEvent::LoginSucceeded));
        Ok(())
    }

    /// Replace the account list from the service; degrade to an empty list
    /// on failure.
    async fn fetch_accounts_for_current_user(&mut self) {
        let Some(user_id) = self.state.user().map(|u| u.id.clone()) else {
            return;
        };

        match self.client.get_accounts(&user_id).await {
            Ok(accounts) => {
                tracing::debug!(count = accounts.len(), "Fetched accounts");
                self.state.replace_accounts(accounts);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.client.name(),
                    "Account fetch failed; continuing with no accounts"
                );
                self.record(LogEvent::new(SessionEvent::AccountFetchFailed).with_error(e.to_string()));
                self.state.replace_accounts(Vec::new());
            }
        }
    }

    /// Read the persisted user. Token and user record must be stored together.
    fn read_persisted_user(&self) -> Result<Option<User>> {
        let malformed = |e: Error| Error::MalformedPersistedSession(e.to_string());
        let token = self.store.get(keys::TOKEN).map_err(malformed)?;
        let record = self.store.get(keys::USER).map_err(malformed)?;

        match (token, record) {
            (None, None) => Ok(None),
            (Some(_), Some(record)) => serde_json::from_str::<User>(&record)
                .map(Some)
                .map_err(|e| Error::MalformedPersistedSession(format!("invalid user record: {}", e))),
            _ => Err(Error::MalformedPersistedSession(
                "token and user record must be stored together".to_string(),
            )),
        }
    }

    /// Store token and user record as a pair. If either write fails, both
    /// are removed so a restart never pairs one user with another's token.
    fn persist_credentials(&self, token: &str, user: &User) {
        let written = serde_json::to_string(user)
            .map_err(Error::from)
            .and_then(|record| {
                self.store.set(keys::TOKEN, token)?;
                self.store.set(keys::USER, &record)
            });

        if let Err(e) = written {
            tracing::warn!(error = %e, "Could not persist session; it will not survive restart");
            for key in [keys::TOKEN, keys::USER] {
                if let Err(e) = self.store.remove(key) {
                    tracing::warn!(key, error = %e, "Could not clear partial session");
                }
            }
        }
    }

    fn persist_selection(&self) {
        let result = match self.state.selected_account_id() {
            Some(id) => self.store.set(keys::SELECTED_ACCOUNT, id),
            None => self.store.remove(keys::SELECTED_ACCOUNT),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not persist account selection");
        }
    }

    fn clear_persisted(&self) {
        for key in keys::SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Could not clear persisted session");
            }
        }
    }

    /// Push the current state to subscribers if it changed
    fn publish(&self) {
        let snapshot = self.state.clone();
        self.updates.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Record an event. Event log failures never affect the session.
    fn record(&self, event: LogEvent) {
        if let Some(log) = &self.event_log {
            if let Err(e) = log.record(event.with_backend(self.client.name())) {
                tracing::debug!(error = %e, "Could not write session event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockAccountService, DEMO_PASSWORD};
    use crate::adapters::store::MemoryStore;
    use crate::services::{EntryPoint, EventFilter};

    fn manager() -> (SessionManager, Arc<MockAccountService>, Arc<MemoryStore>) {
        let service = Arc::new(MockAccountService::with_demo_family().unwrap());
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(service.clone(), store.clone());
        (manager, service, store)
    }

    #[tokio::test]
    async fn test_new_manager_is_unauthenticated() {
        let (manager, _, _) = manager();
        assert_eq!(manager.session(), &Session::empty());
        assert_eq!(manager.backend_name(), "mock");
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let (mut manager, service, store) = manager();
        manager.login("child", DEMO_PASSWORD).await.unwrap();

        let token = store.get(keys::TOKEN).unwrap().unwrap();
        assert_eq!(service.token_owner(&token), Some("2".to_string()));

        let record: User = serde_json::from_str(&store.get(keys::USER).unwrap().unwrap()).unwrap();
        assert_eq!(record.role, Role::Child);
        assert_eq!(store.get(keys::SELECTED_ACCOUNT).unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_subscribers_see_final_state() {
        let (mut manager, _, _) = manager();
        let mut rx = manager.subscribe();

        manager.login("parent", DEMO_PASSWORD).await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.is_authenticated());
        assert!(!snapshot.is_loading());

        // Re-selecting the current account publishes nothing new
        manager.select_account("1");
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_parent_id_before_network() {
        let (mut manager, service, _) = manager();
        let err = manager
            .register("kid", "kid@example.com", "pw", Role::Child, Some("one"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RegistrationFailed(_)));
        assert!(service
            .authenticate(&LoginRequest::new("kid", "pw"))
            .is_err());
        assert_eq!(manager.session(), &Session::empty());
    }

    #[tokio::test]
    async fn test_events_recorded_without_user_data() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(EventLog::open(dir.path(), EntryPoint::Embedded, "test").unwrap());
        let (manager, _, _) = manager();
        let mut manager = manager.with_event_log(log.clone());

        assert!(manager.login("parent", "wrong").await.is_err());
        manager.login("parent", DEMO_PASSWORD).await.unwrap();
        manager.logout();

        let events: Vec<String> = log.recent(&EventFilter::latest(10)).unwrap().into_iter().rev().map(|e| e.event).collect();
        assert_eq!(events, vec!["login_failed", "login_succeeded", "logged_out"]);

        let failure = &log.recent(&EventFilter::latest(1).failures()).unwrap()[0];
        assert_eq!(failure.backend.as_deref(), Some("mock"));
        assert!(!failure.error_message.as_deref().unwrap_or("").contains("parent"));
    }

    #[tokio::test]
    async fn test_transactions_without_selection_are_empty() {
        let (manager, _, _) = manager();
        assert!(manager.fetch_selected_transactions().await.unwrap().is_empty());
    }
}

//! Session aggregate
//!
//! A session is the client-side view of who is signed in, which accounts
//! they can see and which one is selected. Fields are private so the
//! invariants below hold for every snapshot handed out:
//!
//! - no user means no accounts and no selection
//! - a selection always names an account in the current list

use serde::Serialize;

use super::{Account, User};

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    /// Persisted credentials found, accounts being fetched
    Restoring,
    /// Login or registration in flight
    Authenticating,
    Authenticated,
}

/// Snapshot of the session state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    phase: SessionPhase,
    user: Option<User>,
    accounts: Vec<Account>,
    selected_account_id: Option<String>,
    is_loading: bool,
}

impl Session {
    /// The empty, unauthenticated session
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// The selected account, resolved against the current list
    pub fn selected_account(&self) -> Option<&Account> {
        let id = self.selected_account_id.as_deref()?;
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn selected_account_id(&self) -> Option<&str> {
        self.selected_account_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated && self.user.is_some()
    }

    /// Enter an in-flight phase
    pub(crate) fn begin(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.is_loading = true;
    }

    /// Toggle the loading flag without changing phase (account refresh)
    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Install a new user, dropping whatever accounts the previous one had
    pub(crate) fn establish(&mut self, user: User) {
        self.user = Some(user);
        self.accounts.clear();
        self.selected_account_id = None;
    }

    /// Replace the account list wholesale.
    ///
    /// The selection survives only if its id is still present.
    pub(crate) fn replace_accounts(&mut self, accounts: Vec<Account>) {
        if self.user.is_none() {
            return;
        }
        self.accounts = accounts;
        if let Some(id) = self.selected_account_id.as_deref() {
            if !self.accounts.iter().any(|a| a.id == id) {
                self.selected_account_id = None;
            }
        }
    }

    /// Select an account by id. Unknown ids leave the selection alone.
    pub(crate) fn select(&mut self, account_id: &str) -> bool {
        if self.accounts.iter().any(|a| a.id == account_id) {
            self.selected_account_id = Some(account_id.to_string());
            true
        } else {
            false
        }
    }

    /// Select the first account in service order, if nothing is selected
    pub(crate) fn select_first_if_unselected(&mut self) {
        if self.selected_account_id.is_none() {
            self.selected_account_id = self.accounts.first().map(|a| a.id.clone());
        }
    }

    /// Settle into the authenticated phase
    pub(crate) fn finish_authenticated(&mut self) {
        self.phase = SessionPhase::Authenticated;
        self.is_loading = false;
    }

    /// Reset to the empty, unauthenticated session
    pub(crate) fn clear(&mut self) {
        *self = Self::empty();
    }
}

//! In-memory account service
//!
//! Stands in for the remote account service when running offline or in
//! tests. It follows the service's rules: registration creates a default
//! account, parents see their children's accounts, children only their own.
//!
//! Passwords are stored as Argon2id hashes and tokens are random, so the
//! mock never keeps plaintext credentials around.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use rand::Rng;
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Role, Transaction, User};
use crate::ports::{AccountServiceClient, LoginRequest, LoginResponse, RegisterRequest, RemoteUser};

/// Password of the seeded demo users
pub const DEMO_PASSWORD: &str = "password";

/// Argon2 cost for mock credentials
const MOCK_ARGON2_MEMORY_KIB: u32 = 8 * 1024;
const MOCK_ARGON2_ITERATIONS: u32 = 1;

struct StoredPassword {
    salt: [u8; 16],
    key: [u8; 32],
}

impl StoredPassword {
    fn new(password: &str) -> Result<Self> {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let key = derive_key(password, &salt)?;
        Ok(Self { salt, key })
    }

    fn verify(&self, password: &str) -> bool {
        derive_key(password, &self.salt)
            .map(|key| key == self.key)
            .unwrap_or(false)
    }
}

/// Derive a password key using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let params = argon2::Params::new(MOCK_ARGON2_MEMORY_KIB, MOCK_ARGON2_ITERATIONS, 1, Some(32))
        .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;
    Ok(key)
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

struct MockUser {
    user: User,
    parent_id: Option<String>,
    password: StoredPassword,
}

#[derive(Default)]
struct MockState {
    users: Vec<MockUser>,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    /// token -> user id
    tokens: HashMap<String, String>,
    next_user_id: i64,
    next_account_id: i64,
    next_transaction_id: i64,
}

impl MockState {
    fn user(&self, id: &str) -> Option<&MockUser> {
        self.users.iter().find(|u| u.user.id == id)
    }

    fn allocate_user_id(&mut self) -> String {
        self.next_user_id += 1;
        self.next_user_id.to_string()
    }

    fn allocate_account_id(&mut self) -> String {
        self.next_account_id += 1;
        self.next_account_id.to_string()
    }

    fn allocate_transaction_id(&mut self) -> String {
        self.next_transaction_id += 1;
        self.next_transaction_id.to_string()
    }

    fn insert_user(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
        parent_id: Option<String>,
    ) -> Result<User> {
        let id = self.allocate_user_id();
        let user = User::new(id, username, email, role);
        self.users.push(MockUser {
            user: user.clone(),
            parent_id,
            password: StoredPassword::new(password)?,
        });
        Ok(user)
    }

    /// Create an account, linking child accounts to the parent's first account
    fn insert_account(&mut self, user_id: &str, name: &str, is_parent_account: bool) -> Account {
        let parent_account_id = if is_parent_account {
            None
        } else {
            self.user(user_id)
                .and_then(|u| u.parent_id.clone())
                .and_then(|parent| {
                    self.accounts
                        .iter()
                        .find(|a| a.user_id == parent)
                        .map(|a| a.id.clone())
                })
        };

        let id = self.allocate_account_id();
        let mut account = Account::new(id, name, user_id);
        account.is_parent_account = is_parent_account;
        account.parent_id = parent_account_id;
        self.accounts.push(account.clone());
        account
    }

    fn insert_transaction(
        &mut self,
        account_id: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| Error::Other("Account not found".to_string()))?;
        account.balance += amount;

        let id = self.allocate_transaction_id();
        let tx = Transaction::new(id, account_id, amount, description);
        self.transactions.push(tx.clone());
        Ok(tx)
    }
}

/// In-memory implementation of the account service
pub struct MockAccountService {
    state: Mutex<MockState>,
    latency: Option<Duration>,
    fail_account_fetch: AtomicBool,
}

impl MockAccountService {
    /// An empty service with no users
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            latency: None,
            fail_account_fetch: AtomicBool::new(false),
        }
    }

    /// A service seeded with a parent and a child.
    ///
    /// Both demo users log in with [`DEMO_PASSWORD`]:
    /// - `parent` (id 1) owns "Parent Savings" (5000.00)
    /// - `child` (id 2) owns "Child Allowance" (100.00), linked to account 1
    pub fn with_demo_family() -> Result<Self> {
        let service = Self::new();
        {
            let mut state = service.lock()?;
            let parent =
                state.insert_user("parent", "parent@example.com", DEMO_PASSWORD, Role::Parent, None)?;
            let child = state.insert_user(
                "child",
                "child@example.com",
                DEMO_PASSWORD,
                Role::Child,
                Some(parent.id.clone()),
            )?;

            let savings = state.insert_account(&parent.id, "Parent Savings", true);
            state.insert_transaction(&savings.id, Decimal::new(500000, 2), "Opening deposit")?;

            let allowance = state.insert_account(&child.id, "Child Allowance", false);
            state.insert_transaction(&allowance.id, Decimal::new(12000, 2), "Weekly allowance")?;
            state.insert_transaction(&allowance.id, Decimal::new(-2000, 2), "Ice cream")?;
        }
        Ok(service)
    }

    /// Delay every async call, to simulate a slow network
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make account fetches fail until switched off again
    pub fn set_fail_account_fetch(&self, fail: bool) {
        self.fail_account_fetch.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Check credentials and issue a fresh token
    pub fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let mut state = self.lock()?;
        let user = state
            .users
            .iter()
            .find(|u| u.user.username == request.username)
            .filter(|u| u.password.verify(&request.password))
            .map(|u| u.user.clone())
            .ok_or_else(|| Error::authentication("Invalid credentials"))?;

        let token = generate_token();
        state.tokens.insert(token.clone(), user.id.clone());

        Ok(LoginResponse {
            token,
            user: RemoteUser::from(&user),
        })
    }

    /// Create a user together with their default account
    pub fn create_user(&self, request: &RegisterRequest) -> Result<RemoteUser> {
        let role = request.role.parse::<Role>().map_err(Error::registration)?;
        let mut state = self.lock()?;

        if state.users.iter().any(|u| u.user.username == request.username) {
            return Err(Error::registration("Username is already taken"));
        }
        if state.users.iter().any(|u| u.user.email == request.email) {
            return Err(Error::registration("Email is already in use"));
        }

        let parent_id = match (role, request.parent_id) {
            (Role::Child, Some(parent_id)) => {
                let parent_id = parent_id.to_string();
                let parent = state
                    .user(&parent_id)
                    .ok_or_else(|| Error::registration("Parent user not found"))?;
                if parent.user.role != Role::Parent {
                    return Err(Error::registration(
                        "The specified parent is not a parent account",
                    ));
                }
                Some(parent_id)
            }
            _ => None,
        };

        let user = state.insert_user(
            &request.username,
            &request.email,
            &request.password,
            role,
            parent_id,
        )?;

        let (name, is_parent_account) = match role {
            Role::Parent => ("Main Account", true),
            Role::Child => ("Allowance Account", false),
        };
        state.insert_account(&user.id, name, is_parent_account);

        Ok(RemoteUser::from(&user))
    }

    /// Accounts visible to a user: their own, plus their children's for parents
    pub fn accounts_for(&self, user_id: &str) -> Result<Vec<Account>> {
        if self.fail_account_fetch.load(Ordering::SeqCst) {
            return Err(Error::account_fetch("Account service unavailable"));
        }

        let state = self.lock()?;
        let user = state
            .user(user_id)
            .ok_or_else(|| Error::account_fetch("User not found"))?;

        let children: Vec<&str> = if user.user.is_parent() {
            state
                .users
                .iter()
                .filter(|u| u.parent_id.as_deref() == Some(user_id))
                .map(|u| u.user.id.as_str())
                .collect()
        } else {
            Vec::new()
        };

        Ok(state
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id || children.contains(&a.user_id.as_str()))
            .cloned()
            .collect())
    }

    /// Transactions on an account, newest first
    pub fn transactions_for(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let state = self.lock()?;
        if !state.accounts.iter().any(|a| a.id == account_id) {
            return Err(Error::TransactionFetchFailed("Account not found".to_string()));
        }
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }

    /// User id a token was issued to
    pub fn token_owner(&self, token: &str) -> Option<String> {
        self.lock().ok()?.tokens.get(token).cloned()
    }

    /// Open an extra account for an existing user
    pub fn create_account(&self, user_id: &str, name: &str, is_parent_account: bool) -> Result<Account> {
        let mut state = self.lock()?;
        let user = state
            .user(user_id)
            .ok_or_else(|| Error::Other("User not found".to_string()))?;
        if is_parent_account && user.user.role != Role::Parent {
            return Err(Error::Other(
                "Only parent users can create parent accounts".to_string(),
            ));
        }
        Ok(state.insert_account(user_id, name, is_parent_account))
    }

    /// Close an account and drop its transactions
    pub fn remove_account(&self, account_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.accounts.retain(|a| a.id != account_id);
        state.transactions.retain(|t| t.account_id != account_id);
        Ok(())
    }

    /// Post a transaction and apply it to the account balance
    pub fn record_transaction(
        &self,
        account_id: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction> {
        self.lock()?.insert_transaction(account_id, amount, description)
    }
}

impl Default for MockAccountService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountServiceClient for MockAccountService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.simulate_latency().await;
        self.authenticate(request)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RemoteUser> {
        self.simulate_latency().await;
        self.create_user(request)
    }

    async fn get_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        self.simulate_latency().await;
        self.accounts_for(user_id)
    }

    async fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        self.simulate_latency().await;
        self.transactions_for(account_id)
    }
}

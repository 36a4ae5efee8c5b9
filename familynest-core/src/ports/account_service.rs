//! Remote account service port
//!
//! Defines the interface the session manager uses to authenticate users and
//! load their accounts. Two backends implement it: an in-memory mock and an
//! HTTP client for the real service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ids::deserialize_id;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Role, Transaction, User};

/// Credentials sent to `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// User as represented by the service. Roles are upper-case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl RemoteUser {
    /// Map into the local user shape, normalizing the role to lower case
    pub fn into_user(self) -> Result<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| Error::authentication(format!("service returned {}", e)))?;
        Ok(User::new(self.id, self.username, self.email, role))
    }
}

impl From<&User> for RemoteUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.as_wire().to_string(),
        }
    }
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: RemoteUser,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Upper-case role name
    pub role: String,
    /// Always serialized; `null` for parents
    pub parent_id: Option<i64>,
}

impl RegisterRequest {
    /// Build a registration request.
    ///
    /// The parent id is dropped for parents and must be numeric for children.
    /// Whether a child actually has a parent id is left to the caller.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: Role,
        parent_id: Option<&str>,
    ) -> Result<Self> {
        let parent_id = match (role, parent_id.map(str::trim)) {
            (Role::Parent, _) | (Role::Child, None) => None,
            (Role::Child, Some("")) => None,
            (Role::Child, Some(raw)) => Some(raw.parse::<i64>().map_err(|_| {
                Error::registration(format!("parent id '{}' is not a valid identifier", raw))
            })?),
        };

        Ok(Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: role.as_wire().to_string(),
            parent_id,
        })
    }
}

/// Remote account service client.
///
/// Implementations map their failures onto the domain error kinds:
/// `AuthenticationFailed` for login, `RegistrationFailed` for register,
/// `AccountFetchFailed` and `TransactionFetchFailed` for reads.
#[async_trait]
pub trait AccountServiceClient: Send + Sync {
    /// Backend name (e.g., "mock", "http")
    fn name(&self) -> &str;

    /// Authenticate and obtain a bearer token
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    /// Create a new user. The returned representation is informational.
    async fn register(&self, request: &RegisterRequest) -> Result<RemoteUser>;

    /// Accounts visible to a user, in service order
    async fn get_accounts(&self, user_id: &str) -> Result<Vec<Account>>;

    /// Transactions on an account, newest first
    async fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>>;
}

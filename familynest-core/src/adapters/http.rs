//! HTTP account service client
//!
//! Talks to the FamilyNest REST API:
//! - POST /auth/login
//! - POST /auth/register
//! - GET  /accounts/user/{userId}
//! - GET  /transactions/account/{accountId}
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! present in the local store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction};
use crate::ports::{
    keys, AccountServiceClient, KeyValueStore, LoginRequest, LoginResponse, RegisterRequest,
    RemoteUser,
};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error body returned by the service on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of the account service
pub struct HttpAccountService {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<dyn KeyValueStore>,
}

impl HttpAccountService {
    /// Create a client with the default timeout
    pub fn new(base_url: &str, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_timeout(base_url, store, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(
        base_url: &str,
        store: Arc<dyn KeyValueStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid account service URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(
                "Account service URL must use http or https".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("familynest/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the stored bearer token, if any
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.get(keys::TOKEN) {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read token from store; sending request unauthenticated");
                request
            }
        }
    }

    /// Map request errors to user-friendly messages
    fn describe_request_error(&self, error: reqwest::Error) -> String {
        if error.is_timeout() {
            format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            )
        } else if error.is_connect() {
            "Unable to connect to the account service".to_string()
        } else {
            // Strip the URL: it carries user and account ids
            format!("Account service request failed: {}", error.without_url())
        }
    }

    /// Best-effort description of a failed response
    async fn describe_failure(response: Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(ErrorBody {
                message: Some(message),
                ..
            })
            | Ok(ErrorBody {
                error: Some(message),
                ..
            }) => message,
            _ => format!("Account service error: HTTP {}", status.as_u16()),
        }
    }
}

#[async_trait]
impl AccountServiceClient for HttpAccountService {
    fn name(&self) -> &str {
        "http"
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let response = self
            .authorize(self.client.post(self.url("/auth/login")))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::authentication(self.describe_request_error(e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<LoginResponse>()
                .await
                .map_err(|e| Error::authentication(format!("Failed to parse login response: {}", e.without_url()))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::authentication("Invalid credentials"))
            }
            _ => Err(Error::authentication(Self::describe_failure(response).await)),
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RemoteUser> {
        let response = self
            .authorize(self.client.post(self.url("/auth/register")))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::registration(self.describe_request_error(e)))?;

        if !response.status().is_success() {
            return Err(Error::registration(Self::describe_failure(response).await));
        }

        response
            .json::<RemoteUser>()
            .await
            .map_err(|e| Error::registration(format!("Failed to parse registration response: {}", e.without_url())))
    }

    async fn get_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let response = self
            .authorize(self.client.get(self.url(&format!("/accounts/user/{}", user_id))))
            .send()
            .await
            .map_err(|e| Error::account_fetch(self.describe_request_error(e)))?;

        if !response.status().is_success() {
            return Err(Error::account_fetch(Self::describe_failure(response).await));
        }

        response
            .json::<Vec<Account>>()
            .await
            .map_err(|e| Error::account_fetch(format!("Failed to parse accounts response: {}", e.without_url())))
    }

    async fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let response = self
            .authorize(
                self.client
                    .get(self.url(&format!("/transactions/account/{}", account_id))),
            )
            .send()
            .await
            .map_err(|e| Error::TransactionFetchFailed(self.describe_request_error(e)))?;

        if !response.status().is_success() {
            return Err(Error::TransactionFetchFailed(
                Self::describe_failure(response).await,
            ));
        }

        response.json::<Vec<Transaction>>().await.map_err(|e| {
            Error::TransactionFetchFailed(format!("Failed to parse transactions response: {}", e.without_url()))
        })
    }
}

//! Mock account service HTTP server for testing
//!
//! Serves the FamilyNest REST API on a random local port, backed by a
//! [`MockAccountService`]. This lets the HTTP client be exercised end to end
//! without a running backend.
//!
//! Routes:
//! - POST /auth/login
//! - POST /auth/register
//! - GET /accounts/user/{id} (bearer token required)
//! - GET /transactions/account/{id} (bearer token required)

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;

use super::mock::MockAccountService;
use crate::domain::result::Error;
use crate::ports::{LoginRequest, RegisterRequest};

/// Mock server for testing
pub struct MockAccountServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Failure injection for the mock server
#[derive(Debug, Clone, Default)]
pub struct MockServerConfig {
    /// Answer account listings with HTTP 500
    pub fail_accounts: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
    /// Answer successful logins and account listings with a body that is not JSON
    pub malformed_bodies: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

struct Request {
    method: String,
    path: String,
    bearer: Option<String>,
    body: Vec<u8>,
}

impl MockAccountServer {
    /// Start a new mock server on a random available port
    pub fn start(service: Arc<MockAccountService>, config: MockServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let service = Arc::clone(&service);
                        let config = config.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &service, &config);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockAccountServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP/1.1 request, honoring Content-Length
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;

    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut bearer = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_lowercase().as_str() {
            "content-length" => content_length = value.parse().unwrap_or(0),
            "authorization" => {
                bearer = value.strip_prefix("Bearer ").map(str::to_string);
            }
            _ => {}
        }
    }

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Some(Request {
        method,
        path,
        bearer,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, service: &MockAccountService, config: &MockServerConfig) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let path = request.path.split('?').next().unwrap_or("").to_string();
    let authorized = request
        .bearer
        .as_deref()
        .and_then(|token| service.token_owner(token))
        .is_some();

    match (request.method.as_str(), path.as_str()) {
        ("POST", "/auth/login") => {
            let Ok(login) = serde_json::from_slice::<LoginRequest>(&request.body) else {
                return send_error(&mut stream, 400, "Bad Request", "Invalid request body");
            };
            match service.authenticate(&login) {
                Ok(_) if config.malformed_bodies => send_response(&mut stream, 200, "OK", "{\"token\":"),
                Ok(response) => send_json(&mut stream, 200, "OK", &response),
                Err(_) => send_error(&mut stream, 401, "Unauthorized", "Invalid credentials"),
            }
        }
        ("POST", "/auth/register") => {
            let Ok(register) = serde_json::from_slice::<RegisterRequest>(&request.body) else {
                return send_error(&mut stream, 400, "Bad Request", "Invalid request body");
            };
            match service.create_user(&register) {
                Ok(user) => send_json(&mut stream, 200, "OK", &user),
                Err(Error::RegistrationFailed(message)) => {
                    send_error(&mut stream, 400, "Bad Request", &message)
                }
                Err(e) => send_error(&mut stream, 500, "Internal Server Error", &e.to_string()),
            }
        }
        ("GET", p) if p.starts_with("/accounts/user/") => {
            if !authorized {
                return send_error(&mut stream, 401, "Unauthorized", "Missing or invalid token");
            }
            if config.fail_accounts {
                return send_error(&mut stream, 500, "Internal Server Error", "Database unavailable");
            }
            let user_id = p.trim_start_matches("/accounts/user/");
            match service.accounts_for(user_id) {
                Ok(_) if config.malformed_bodies => send_response(&mut stream, 200, "OK", "<html>"),
                Ok(accounts) => send_json(&mut stream, 200, "OK", &accounts),
                Err(_) => send_error(&mut stream, 404, "Not Found", "User not found"),
            }
        }
        ("GET", p) if p.starts_with("/transactions/account/") => {
            if !authorized {
                return send_error(&mut stream, 401, "Unauthorized", "Missing or invalid token");
            }
            let account_id = p.trim_start_matches("/transactions/account/");
            match service.transactions_for(account_id) {
                Ok(txs) => send_json(&mut stream, 200, "OK", &txs),
                Err(_) => send_error(&mut stream, 404, "Not Found", "Account not found"),
            }
        }
        _ => send_error(&mut stream, 404, "Not Found", "Endpoint not found"),
    }
}

fn send_json<T: Serialize>(stream: &mut TcpStream, status: u16, status_text: &str, body: &T) {
    match serde_json::to_string(body) {
        Ok(json) => send_response(stream, status, status_text, &json),
        Err(e) => send_error(stream, 500, "Internal Server Error", &e.to_string()),
    }
}

fn send_error(stream: &mut TcpStream, status: u16, status_text: &str, message: &str) {
    let body = serde_json::to_string(&ErrorBody { message }).unwrap_or_default();
    send_response(stream, status, status_text, &body);
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::http::HttpAccountService;
    use crate::adapters::mock::DEMO_PASSWORD;
    use crate::adapters::store::MemoryStore;
    use crate::domain::Role;
    use crate::ports::{keys, AccountServiceClient, KeyValueStore};
    use crate::services::SessionManager;

    struct Fixture {
        service: Arc<MockAccountService>,
        server: MockAccountServer,
        store: Arc<MemoryStore>,
        client: HttpAccountService,
    }

    fn fixture(config: MockServerConfig) -> Fixture {
        let service = Arc::new(MockAccountService::with_demo_family().unwrap());
        let server = MockAccountServer::start(Arc::clone(&service), config).unwrap();
        let store = Arc::new(MemoryStore::new());
        let client = HttpAccountService::new(&server.base_url(), store.clone()).unwrap();
        Fixture {
            service,
            server,
            store,
            client,
        }
    }

    #[test]
    fn test_mock_server_starts() {
        let f = fixture(MockServerConfig::default());
        assert!(f.server.port() > 0);
    }

    #[tokio::test]
    async fn test_login_over_http() {
        let f = fixture(MockServerConfig::default());
        let response = f
            .client
            .login(&LoginRequest::new("parent", DEMO_PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.user.role, "PARENT");
        assert_eq!(f.service.token_owner(&response.token), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let f = fixture(MockServerConfig::default());
        let err = f
            .client
            .login(&LoginRequest::new("parent", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_register_conflict_surfaces_server_message() {
        let f = fixture(MockServerConfig::default());
        let request =
            RegisterRequest::new("parent", "other@example.com", "pw", Role::Parent, None).unwrap();
        let err = f.client.register(&request).await.unwrap_err();
        assert!(matches!(err, Error::RegistrationFailed(_)));
        assert!(err.to_string().contains("Username is already taken"));
    }

    #[tokio::test]
    async fn test_accounts_require_stored_token() {
        let f = fixture(MockServerConfig::default());

        let err = f.client.get_accounts("1").await.unwrap_err();
        assert!(matches!(err, Error::AccountFetchFailed(_)));

        let login = f
            .client
            .login(&LoginRequest::new("parent", DEMO_PASSWORD))
            .await
            .unwrap();
        f.store.set(keys::TOKEN, &login.token).unwrap();

        let accounts = f.client.get_accounts("1").await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Parent Savings");
        assert_eq!(accounts[0].balance, Decimal::new(500000, 2));
        assert_eq!(accounts[1].parent_id, Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_transactions_over_http() {
        let f = fixture(MockServerConfig::default());
        let login = f
            .client
            .login(&LoginRequest::new("child", DEMO_PASSWORD))
            .await
            .unwrap();
        f.store.set(keys::TOKEN, &login.token).unwrap();

        let txs = f.client.get_transactions("2").await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "Ice cream");

        let err = f.client.get_transactions("99").await.unwrap_err();
        assert!(matches!(err, Error::TransactionFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_account_fetch_failed() {
        let f = fixture(MockServerConfig {
            fail_accounts: true,
            ..Default::default()
        });
        let login = f
            .client
            .login(&LoginRequest::new("parent", DEMO_PASSWORD))
            .await
            .unwrap();
        f.store.set(keys::TOKEN, &login.token).unwrap();

        let err = f.client.get_accounts("1").await.unwrap_err();
        assert!(matches!(err, Error::AccountFetchFailed(_)));
        assert!(err.to_string().contains("Database unavailable"));
    }

    #[tokio::test]
    async fn test_unparseable_bodies_do_not_echo_request_url() {
        let f = fixture(MockServerConfig {
            malformed_bodies: true,
            ..Default::default()
        });

        let err = f
            .client
            .login(&LoginRequest::new("parent", DEMO_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        assert!(err.to_string().contains("Failed to parse login response"));
        assert!(!err.to_string().contains("/auth/login"));

        let login = f
            .service
            .authenticate(&LoginRequest::new("parent", DEMO_PASSWORD))
            .unwrap();
        f.store.set(keys::TOKEN, &login.token).unwrap();
        let err = f.client.get_accounts("1").await.unwrap_err();
        assert!(matches!(err, Error::AccountFetchFailed(_)));
        assert!(err.to_string().contains("Failed to parse accounts response"));
        assert!(!err.to_string().contains("/accounts/user/1"));
        assert!(!err.to_string().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_timeout_fails_login() {
        let f = fixture(MockServerConfig {
            delay_ms: 1500,
            ..Default::default()
        });
        let client = HttpAccountService::with_timeout(
            &f.server.base_url(),
            f.store.clone(),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = client
            .login(&LoginRequest::new("parent", DEMO_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_session_manager_over_http() {
        let f = fixture(MockServerConfig::default());
        let store: Arc<dyn KeyValueStore> = f.store.clone();
        let client: Arc<dyn AccountServiceClient> = Arc::new(
            HttpAccountService::new(&f.server.base_url(), Arc::clone(&store)).unwrap(),
        );

        let mut manager = SessionManager::new(client, Arc::clone(&store));
        manager.login("parent", DEMO_PASSWORD).await.unwrap();

        let session = manager.session();
        assert_eq!(session.user().map(|u| u.role), Some(Role::Parent));
        assert_eq!(session.accounts().len(), 2);
        assert_eq!(
            session.selected_account().map(|a| a.name.as_str()),
            Some("Parent Savings")
        );
        assert!(f.store.get(keys::TOKEN).unwrap().is_some());

        manager.logout();
        assert!(f.store.is_empty());
    }
}

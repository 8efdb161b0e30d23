//! # Fishbowl REST Client
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/login                     JSON credentials ──► {token}      │
//! │  GET  /api/data-query                text/plain SQL   ──► [rows]       │
//! │  POST /api/import/Cycle-Count-Data   JSON matrix      ──► 200          │
//! │  POST /api/logout                                                       │
//! │                                                                         │
//! │  Every call after login carries `Authorization: Bearer <token>`.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Login Retry
//! ```text
//! Attempt 1 ── fail ── wait login_wait ── Attempt 2 ── fail ── wait 2x ── ...
//! gives up after login_attempts with SyncError::AuthFailed
//! ```

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use retail_core::ImportBatch;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ErpConnector, ErpSession, QueryResponse, Row, REASON_OK};
use crate::config::ErpSettings;
use crate::error::{SyncError, SyncResult};

const LOGIN_PATH: &str = "/api/login";
const LOGOUT_PATH: &str = "/api/logout";
const DATA_QUERY_PATH: &str = "/api/data-query";
const CYCLE_IMPORT_PATH: &str = "/api/import/Cycle-Count-Data";

/// Upper bound for a single wait between login attempts.
const MAX_LOGIN_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    app_name: String,
    app_description: String,
    app_id: u64,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// Connector
// =============================================================================

/// Opens Fishbowl sessions over HTTP.
#[derive(Clone)]
pub struct FishbowlConnector {
    client: Client,
    base_url: Url,
    credentials: LoginRequest,
    bearer_token: Option<String>,
    login_attempts: u32,
    login_wait: Duration,
}

impl std::fmt::Debug for FishbowlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FishbowlConnector")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.credentials.username)
            .field("login_attempts", &self.login_attempts)
            .finish()
    }
}

impl FishbowlConnector {
    pub fn new(settings: &ErpSettings) -> SyncResult<Self> {
        let base_url = Url::parse(&settings.base_url())?;
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(FishbowlConnector {
            client,
            base_url,
            credentials: LoginRequest {
                app_name: settings.app_name.clone(),
                app_description: settings.app_description.clone(),
                app_id: settings.app_id,
                username: settings.username.clone(),
                password: settings.password.clone(),
            },
            bearer_token: settings.bearer_token.clone(),
            login_attempts: settings.login_attempts.max(1),
            login_wait: settings.login_wait(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.login_wait,
            max_interval: MAX_LOGIN_WAIT,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    async fn login_once(&self) -> SyncResult<String> {
        let url = self.base_url.join(LOGIN_PATH)?;
        let mut request = self.client.post(url).json(&self.credentials);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::CallFailure {
                operation: "login".into(),
                status: status.as_u16(),
                reason: failure_reason(status, &body),
            });
        }

        let login: LoginResponse = response.json().await?;
        Ok(login.token)
    }
}

#[async_trait]
impl ErpConnector for FishbowlConnector {
    async fn connect(&self) -> SyncResult<Box<dyn ErpSession>> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.login_once().await {
                Ok(token) => {
                    info!(
                        base_url = %self.base_url,
                        username = %self.credentials.username,
                        attempt,
                        "Logged in to Fishbowl"
                    );
                    return Ok(Box::new(FishbowlSession {
                        client: self.client.clone(),
                        base_url: self.base_url.clone(),
                        token: Some(token),
                    }));
                }
                Err(e) if attempt >= self.login_attempts => {
                    error!(attempts = attempt, error = %e, "Fishbowl login failed");
                    return Err(SyncError::AuthFailed {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    let wait = backoff.next_backoff().unwrap_or(self.login_wait);
                    warn!(attempt, ?wait, error = %e, "Fishbowl login failed, retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A logged-in Fishbowl session.
pub struct FishbowlSession {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl FishbowlSession {
    fn token(&self) -> SyncResult<String> {
        self.token.clone().ok_or(SyncError::NotLoggedIn)
    }

    /// Logs out after a failed call and builds the failure.
    async fn fail(&mut self, operation: &str, status: StatusCode, body: &str) -> SyncError {
        let reason = failure_reason(status, body);
        warn!(operation, status = status.as_u16(), reason = %reason, "Fishbowl call failed, logging out");
        if let Err(e) = self.logout().await {
            warn!(error = %e, "Logout after failed call also failed");
        }
        SyncError::CallFailure {
            operation: operation.to_string(),
            status: status.as_u16(),
            reason,
        }
    }
}

#[async_trait]
impl ErpSession for FishbowlSession {
    fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    async fn logout(&mut self) -> SyncResult<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        let url = self.base_url.join(LOGOUT_PATH)?;
        let response = self.client.post(url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::CallFailure {
                operation: "logout".into(),
                status: status.as_u16(),
                reason: failure_reason(status, &body),
            });
        }

        debug!("Logged out of Fishbowl");
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> SyncResult<QueryResponse> {
        let token = self.token()?;
        let url = self.base_url.join(DATA_QUERY_PATH)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "text/plain")
            .body(sql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fail("data-query", status, &body).await);
        }

        let data: Option<Vec<Row>> = response.json().await?;
        debug!(rows = data.as_ref().map_or(0, Vec::len), "Data query answered");

        Ok(QueryResponse {
            data,
            status: status.as_u16(),
            reason: REASON_OK.to_string(),
        })
    }

    async fn cycle_inventory(&mut self, batch: &ImportBatch) -> SyncResult<()> {
        let token = self.token()?;
        let url = self.base_url.join(CYCLE_IMPORT_PATH)?;
        let matrix = batch.to_matrix();

        info!(
            rows = matrix.len(),
            records = batch.record_count(),
            serials = batch.serial_count(),
            "Importing cycle count"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&matrix)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fail("Cycle-Count-Data import", status, &body).await);
        }
        Ok(())
    }
}

/// Reason text for a failed call: Fishbowl's `message`, the raw body, or the
/// status phrase, whichever is available first.
fn failure_reason(status: StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorBody>(body) {
        return error.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ErpSettings {
        ErpSettings {
            server_address: "127.0.0.1".into(),
            prod_port: 1,
            username: "svc".into(),
            password: "secret".into(),
            login_wait_secs: 0,
            request_timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_failure_reason_prefers_fishbowl_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            failure_reason(status, r#"{"message":"Invalid SQL"}"#),
            "Invalid SQL"
        );
        assert_eq!(failure_reason(status, "  plain text  "), "plain text");
        assert_eq!(failure_reason(status, ""), "Bad Request");
    }

    #[test]
    fn test_login_request_uses_camel_case() {
        let connector = FishbowlConnector::new(&settings()).unwrap();
        let body = serde_json::to_value(&connector.credentials).unwrap();
        assert_eq!(body["appName"], "Retail Inventory Manager");
        assert_eq!(body["appId"], 4620);
        assert_eq!(body["username"], "svc");
    }

    #[test]
    fn test_endpoints_join_base_url() {
        let connector = FishbowlConnector::new(&settings()).unwrap();
        assert_eq!(connector.base_url().as_str(), "http://127.0.0.1:1/");
        assert_eq!(
            connector.base_url().join(CYCLE_IMPORT_PATH).unwrap().as_str(),
            "http://127.0.0.1:1/api/import/Cycle-Count-Data"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let connector = FishbowlConnector::new(&settings()).unwrap();
        assert!(!format!("{:?}", connector).contains("secret"));
    }

    #[tokio::test]
    async fn test_unreachable_server_exhausts_login_attempts() {
        let connector = FishbowlConnector::new(&settings()).unwrap();
        match connector.connect().await {
            Err(SyncError::AuthFailed { attempts, .. }) => assert_eq!(attempts, 2),
            Err(other) => panic!("expected AuthFailed, got {}", other),
            Ok(_) => panic!("login against a closed port succeeded"),
        }
    }

    #[tokio::test]
    async fn test_logged_out_session_rejects_calls() {
        let mut session = FishbowlSession {
            client: Client::new(),
            base_url: Url::parse("http://127.0.0.1:1").unwrap(),
            token: None,
        };
        assert!(!session.is_logged_in());
        assert!(session.logout().await.is_ok());
        assert!(matches!(
            session.query("SELECT 1").await,
            Err(SyncError::NotLoggedIn)
        ));
    }
}

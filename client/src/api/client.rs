use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use mcdash_protocol::rest::{ApiAck, RefreshResponse};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::storage::SessionStore;

/// Failure taxonomy of the REST surface.
///
/// None of these are fatal to the process: callers degrade to an
/// empty/default view state plus a user-visible notification.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network-level failure, no usable response. Reported to the user as a
    /// generic connection error.
    #[error("connection error: {0}")]
    Transport(String),
    /// Authentication could not be recovered; the session has been cleared
    /// and the caller should route to login.
    #[error("session expired")]
    SessionExpired,
    /// The backend answered `{success: false, message}`; the message is
    /// surfaced verbatim and the call is not retried.
    #[error("{message}")]
    Domain { message: String },
    /// Non-success HTTP status without a structured body.
    #[error("request failed with status {status}")]
    Http { status: u16 },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// HTTP client for the backend: fixed request timeout, bearer token from
/// the injected session store, one transparent refresh-and-retry on 401.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    /// Single-flight guard for token refresh: one outstanding refresh call;
    /// concurrent 401 handlers queue here and reuse its result instead of
    /// racing to invalidate each other's new token.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None, None).await
    }

    pub async fn get_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        self.request::<T, Q>(Method::GET, path, Some(query), None)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.request::<T, B>(Method::POST, path, None, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request::<T, B>(Method::PUT, path, None, Some(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, path, None, None).await
    }

    async fn request<T, P>(
        &self,
        method: Method,
        path: &str,
        query: Option<&P>,
        body: Option<&P>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let resp = self.dispatch(&method, path, query, body).await?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            // Exactly one refresh attempt per originating request.
            self.refresh_once().await?;
            let retry = self.dispatch(&method, path, query, body).await?;
            if retry.status() == StatusCode::UNAUTHORIZED {
                self.session.clear();
                return Err(ApiError::SessionExpired);
            }
            retry
        } else {
            resp
        };

        Self::decode(resp).await
    }

    async fn dispatch<P: Serialize>(
        &self,
        method: &Method,
        path: &str,
        query: Option<&P>,
        body: Option<&P>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut req = self.http.request(method.clone(), self.url(path));
        if let Some(query) = query {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(token) = self.session.access_token() {
            req = req.bearer_auth(token);
        }
        debug!("{} {}", method, path);
        Ok(req.send().await?)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(Self::failure(status, &text))
    }

    /// Maps a non-success response onto the error taxonomy: structured
    /// `{success: false, message}` bodies become domain errors carrying the
    /// backend's message verbatim, anything else is a bare HTTP failure.
    fn failure(status: StatusCode, body: &str) -> ApiError {
        if let Ok(ack) = serde_json::from_str::<ApiAck>(body) {
            if let Some(message) = ack.message.or(ack.error) {
                return ApiError::Domain { message };
            }
        }
        ApiError::Http {
            status: status.as_u16(),
        }
    }

    /// Refreshes the access token, coalescing concurrent callers.
    ///
    /// The caller that wins the lock performs the HTTP call; everyone who
    /// queued behind it observes the token change and returns without a
    /// second refresh. Refresh failure clears the session: the stored
    /// refresh token is spent or rejected and retrying cannot help.
    async fn refresh_once(&self) -> Result<(), ApiError> {
        let stale = self.session.access_token();
        let _guard = self.refresh_lock.lock().await;
        if self.session.access_token() != stale {
            return Ok(());
        }

        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(ApiError::SessionExpired)?;

        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| {
                warn!("token refresh transport failure: {}", e);
                ApiError::Transport(e.to_string())
            })?;

        if !resp.status().is_success() {
            self.session.clear();
            return Err(ApiError::SessionExpired);
        }

        let rotated: RefreshResponse = resp.json().await.map_err(ApiError::from)?;
        if !rotated.success {
            self.session.clear();
            return Err(ApiError::SessionExpired);
        }

        self.session
            .set_tokens(rotated.access_token, rotated.refresh_token);
        debug!("access token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::AppConfig;
    use crate::storage::SessionStore;

    /// Minimal fixture backend: `/ping` wants the rotated token, 401
    /// otherwise; `/auth/refresh` rotates and counts how often it was hit.
    async fn spawn_backend(refreshes: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let refreshes = refreshes.clone();
                tokio::spawn(async move {
                    let mut raw = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => raw.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&raw).to_string();

                    let (status, body) = if request.starts_with("POST /auth/refresh") {
                        refreshes.fetch_add(1, Ordering::SeqCst);
                        (
                            "200 OK",
                            r#"{"success":true,"accessToken":"rotated","refreshToken":"r2"}"#,
                        )
                    } else if request.contains("authorization: Bearer rotated")
                        || request.contains("Authorization: Bearer rotated")
                    {
                        ("200 OK", r#"{"ok":true}"#)
                    } else {
                        ("401 Unauthorized", r#"{"success":false}"#)
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_backend(refreshes.clone()).await;

        let session = Arc::new(SessionStore::in_memory());
        session.set_tokens("stale".into(), "r1".into());
        let config = AppConfig {
            base_url,
            ..AppConfig::default()
        };
        let client = Arc::new(ApiClient::new(&config, session).unwrap());

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.get::<serde_json::Value>("/ping").await })
            })
            .collect();
        for call in calls {
            let value = call.await.unwrap().unwrap();
            assert_eq!(value["ok"], true);
        }

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn structured_failures_become_domain_errors() {
        let err = ApiClient::failure(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"minigame key already exists"}"#,
        );
        match err {
            ApiError::Domain { message } => assert_eq!(message, "minigame key already exists"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn error_field_is_accepted_as_the_message() {
        let err = ApiClient::failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":false,"error":"rcon unreachable"}"#,
        );
        match err {
            ApiError::Domain { message } => assert_eq!(message, "rcon unreachable"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unstructured_failures_keep_the_status() {
        let err = ApiClient::failure(StatusCode::BAD_GATEWAY, "<html>gateway</html>");
        match err {
            ApiError::Http { status } => assert_eq!(status, 502),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

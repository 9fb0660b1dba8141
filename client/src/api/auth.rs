use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use mcdash_protocol::records::User;
use mcdash_protocol::rest::{ApiAck, AuthResponse, UserEnvelope};
use serde_json::json;

use super::client::{ApiClient, ApiError};
use crate::storage::SessionStore;

/// Authentication operations: login, logout, and self-service account
/// changes. Successful calls keep the session store in sync, so the rest of
/// the client only ever reads tokens from there.
pub struct AuthApi {
    client: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { client, session }
    }

    /// Logs in and stores the token pair and user. `remember` controls
    /// whether the session survives a restart.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<User, ApiError> {
        let resp: AuthResponse = self
            .client
            .post(
                "/auth/login",
                Some(&json!({ "username": username, "password": password })),
            )
            .await?;

        if !resp.success {
            return Err(ApiError::Domain {
                message: resp
                    .message
                    .unwrap_or_else(|| "invalid credentials".to_string()),
            });
        }

        self.session.set_remember(remember);
        self.session
            .set_tokens(resp.access_token, resp.refresh_token);
        self.session.set_user(resp.user.clone());
        info!("logged in as {}", resp.user.username);
        Ok(resp.user)
    }

    /// Invalidates the refresh token server-side, then drops the local
    /// session. The local drop happens even when the backend call fails;
    /// staying logged in on a dead session helps nobody.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session.refresh_token() {
            let result: Result<ApiAck, _> = self
                .client
                .post("/auth/logout", Some(&json!({ "refreshToken": refresh_token })))
                .await;
            if let Err(e) = result {
                debug!("logout call failed, clearing session anyway: {}", e);
            }
        }
        self.session.clear();
        info!("logged out");
    }

    /// Re-fetches the authenticated user, refreshing the cached copy.
    pub async fn me(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.get("/auth/me").await?;
        self.session.set_user(envelope.user.clone());
        Ok(envelope.user)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<ApiAck, ApiError> {
        self.client
            .put(
                "/auth/password",
                &json!({
                    "currentPassword": current_password,
                    "newPassword": new_password,
                }),
            )
            .await
    }

    /// Changes the username. On success the cached user is renamed in place;
    /// the backend keeps the token pair valid.
    pub async fn change_username(&self, new_username: &str) -> Result<ApiAck, ApiError> {
        let ack: ApiAck = self
            .client
            .put("/auth/username", &json!({ "newUsername": new_username }))
            .await?;

        if ack.success {
            if let Some(mut user) = self.session.user() {
                user.username = new_username.to_string();
                self.session.set_user(user);
            }
        }
        Ok(ack)
    }

    /// Permission check against the cached user. Nobody logged in means no
    /// permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.session
            .user()
            .is_some_and(|user| user.has_permission(permission))
    }

    /// True when the stored access token is absent or already past its
    /// `exp` claim. Undecodable tokens count as expired.
    pub fn access_token_expired(&self) -> bool {
        match self.session.access_token() {
            Some(token) => match token_expiry(&token) {
                Some(exp) => exp <= Utc::now(),
                None => true,
            },
            None => true,
        }
    }
}

/// Extracts the `exp` claim from a JWT without verifying the signature.
/// The client only needs the timestamp to decide whether a proactive
/// refresh is worthwhile; the backend does the real validation.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

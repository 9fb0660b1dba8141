use std::sync::Arc;

use mcdash_protocol::records::User;
use mcdash_protocol::rest::{ApiAck, UserEnvelope, UsersEnvelope};
use serde::Serialize;
use serde_json::json;

use super::client::{ApiClient, ApiError};

/// Partial update of a user account; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Account administration. Every call requires the admin permission
/// backend-side; the client surfaces the rejection as a domain error.
pub struct UserAdminApi {
    client: Arc<ApiClient>,
}

impl UserAdminApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let envelope: UsersEnvelope = self.client.get("/auth/users").await?;
        Ok(envelope.users)
    }

    pub async fn create(
        &self,
        username: &str,
        password: &str,
        permissions: &[String],
    ) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .client
            .post(
                "/auth/users",
                Some(&json!({
                    "username": username,
                    "password": password,
                    "permissions": permissions,
                })),
            )
            .await?;
        Ok(envelope.user)
    }

    pub async fn update(&self, user_id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .client
            .put(&format!("/auth/users/{}", user_id), update)
            .await?;
        Ok(envelope.user)
    }

    /// Replaces the permission list wholesale.
    pub async fn update_permissions(
        &self,
        user_id: &str,
        permissions: &[String],
    ) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self
            .client
            .put(
                &format!("/auth/users/{}/permissions", user_id),
                &json!({ "permissions": permissions }),
            )
            .await?;
        Ok(envelope.user)
    }

    pub async fn reset_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<ApiAck, ApiError> {
        self.client
            .put(
                &format!("/auth/users/{}/password", user_id),
                &json!({ "newPassword": new_password }),
            )
            .await
    }

    pub async fn delete(&self, user_id: &str) -> Result<ApiAck, ApiError> {
        self.client.delete(&format!("/auth/users/{}", user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_updates_only_carry_set_fields() {
        let update = UserUpdate {
            permissions: Some(vec!["view_servers".into()]),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({ "permissions": ["view_servers"] }));
    }
}

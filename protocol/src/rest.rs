//! REST response envelopes, spelled exactly as the backend emits them.

use serde::{Deserialize, Serialize};

use crate::records::User;

/// Paginated collection envelope used by the instance and service listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> PaginatedResponse<T> {
    /// Empty page, used when a fetch fails and the view degrades to an
    /// empty state instead of crashing.
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            current_page: page,
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

/// Token rotation answer; unlike login the user is not re-sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
}

/// The common `{success, message}` acknowledgement most mutating endpoints
/// answer with. `success: false` carries a user-facing message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RconResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstanceResponse {
    pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(default)]
    pub stopped_containers: Option<u32>,
    #[serde(default)]
    pub removed_images: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub success: bool,
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawInstance;
    use pretty_assertions::assert_eq;

    #[test]
    fn paginated_instances_decode() {
        let json = r#"{
            "content": [{"name": "bedwars-01", "gameType": "bedwars", "state": "WAITING"}],
            "totalPages": 3,
            "totalElements": 25,
            "currentPage": 1,
            "size": 10
        }"#;
        let page: PaginatedResponse<RawInstance> = serde_json::from_str(json).unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.total_elements, 25);
        assert_eq!(page.content[0].identity(), Some("bedwars-01"));
    }

    #[test]
    fn rcon_response_tolerates_missing_fields() {
        let ok: RconResponse = serde_json::from_str(r#"{"success":true,"result":"done"}"#).unwrap();
        assert_eq!(ok.result.as_deref(), Some("done"));
        assert!(ok.error.is_none());

        let err: RconResponse =
            serde_json::from_str(r#"{"success":false,"error":"unknown command"}"#).unwrap();
        assert!(!err.success);
    }
}

use std::sync::Arc;

use mcdash_protocol::records::ServiceRecord;
use mcdash_protocol::rest::{ApiAck, PaginatedResponse};
use serde::Serialize;
use serde_json::json;

use super::client::{ApiClient, ApiError};

/// Query parameters of the service listing. `kind` narrows to a service
/// type (proxy, database, ...).
#[derive(Debug, Clone, Serialize)]
pub struct ServicePaginationParams {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ServicePaginationParams {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            search: None,
            kind: None,
        }
    }
}

/// Lifecycle and console operations for non-game backend services.
pub struct ServiceApi {
    client: Arc<ApiClient>,
}

impl ServiceApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        params: &ServicePaginationParams,
    ) -> Result<PaginatedResponse<ServiceRecord>, ApiError> {
        self.client.get_query("/services", params).await
    }

    pub async fn detail(&self, id: &str) -> Result<ServiceRecord, ApiError> {
        self.client.get(&format!("/services/{}", id)).await
    }

    pub async fn start(&self, id: &str) -> Result<ApiAck, ApiError> {
        self.client
            .post::<ApiAck, ()>(&format!("/services/{}/start", id), None)
            .await
    }

    pub async fn stop(&self, id: &str) -> Result<ApiAck, ApiError> {
        self.client
            .post::<ApiAck, ()>(&format!("/services/{}/stop", id), None)
            .await
    }

    pub async fn restart(&self, id: &str) -> Result<ApiAck, ApiError> {
        self.client
            .post::<ApiAck, ()>(&format!("/services/{}/restart", id), None)
            .await
    }

    pub async fn exec(&self, id: &str, command: &str) -> Result<ApiAck, ApiError> {
        self.client
            .post(
                &format!("/services/{}/exec", id),
                Some(&json!({ "command": command })),
            )
            .await
    }

    pub fn logs_url(&self, id: &str, lines: u32) -> String {
        format!("{}/services/{}/logs?lines={}", self.client.base_url(), id, lines)
    }
}

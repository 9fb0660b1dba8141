use std::sync::Arc;

use mcdash_protocol::records::Minigame;
use mcdash_protocol::raw::{RawInstance, RawInstanceDetail};
use mcdash_protocol::rest::{
    ApiAck, CleanupResponse, HealthResponse, PaginatedResponse, StartInstanceResponse,
};
use serde::Serialize;

use super::client::{ApiClient, ApiError};

/// Query parameters of the paginated instance listing. `minigame_filter`
/// narrows to one game type, `search` is a free-text match done server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minigame_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PaginationParams {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            minigame_filter: None,
            search: None,
        }
    }
}

/// Minigame catalog and instance operations.
pub struct MinigameApi {
    client: Arc<ApiClient>,
}

impl MinigameApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Minigame>, ApiError> {
        self.client.get("/minigames").await
    }

    pub async fn get(&self, key: &str) -> Result<Minigame, ApiError> {
        self.client.get(&format!("/minigames/{}", key)).await
    }

    pub async fn create(&self, minigame: &Minigame) -> Result<ApiAck, ApiError> {
        self.client.post("/minigames", Some(minigame)).await
    }

    pub async fn update(&self, key: &str, minigame: &Minigame) -> Result<ApiAck, ApiError> {
        self.client
            .put(&format!("/minigames/{}", key), minigame)
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<ApiAck, ApiError> {
        self.client.delete(&format!("/minigames/{}", key)).await
    }

    /// Prunes stopped containers and dangling images backend-side.
    pub async fn cleanup(&self) -> Result<CleanupResponse, ApiError> {
        self.client
            .post::<CleanupResponse, ()>("/minigames/cleanup", None)
            .await
    }

    /// Paginated listing across all minigames.
    pub async fn instances(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse<RawInstance>, ApiError> {
        self.client.get_query("/minigames/instances", params).await
    }

    pub async fn instances_of(&self, key: &str) -> Result<Vec<RawInstance>, ApiError> {
        self.client
            .get(&format!("/minigames/{}/instances", key))
            .await
    }

    pub async fn instance_detail(&self, server_id: &str) -> Result<RawInstanceDetail, ApiError> {
        self.client.get(&format!("/servers/{}", server_id)).await
    }

    pub async fn start_instance(&self, key: &str) -> Result<StartInstanceResponse, ApiError> {
        self.client
            .post::<StartInstanceResponse, ()>(&format!("/minigames/{}/start", key), None)
            .await
    }

    pub async fn stop_instance(&self, key: &str, container_id: &str) -> Result<ApiAck, ApiError> {
        self.client
            .post::<ApiAck, ()>(&format!("/minigames/{}/stop/{}", key, container_id), None)
            .await
    }

    pub async fn instance_health(
        &self,
        key: &str,
        container_id: &str,
    ) -> Result<HealthResponse, ApiError> {
        self.client
            .get(&format!("/minigames/{}/instances/{}/health", key, container_id))
            .await
    }

    /// Absolute URL of an instance's log-tail stream. `length` is the number
    /// of history lines replayed on connect, `html` selects pre-rendered
    /// markup instead of raw lines.
    pub fn logs_url(&self, container_id: &str, length: u32, html: bool) -> String {
        format!(
            "{}/minigames/instances/{}/logs?length={}&html={}",
            self.client.base_url(),
            container_id,
            length,
            html
        )
    }
}

use std::sync::Arc;

use mcdash_protocol::rest::RconResponse;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::client::{ApiClient, ApiError};

#[derive(Debug, Clone, Deserialize)]
pub struct RconPlayer {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RconPlayersResponse {
    pub success: bool,
    #[serde(default)]
    pub players: Vec<RconPlayer>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RconHealthResponse {
    pub success: bool,
    #[serde(default)]
    pub responsive: bool,
    #[serde(default)]
    pub latency: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Remote console access to a running instance. The moderation helpers are
/// thin wrappers that spell the vanilla command for the caller.
pub struct RconApi {
    client: Arc<ApiClient>,
}

impl RconApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        game_type: &str,
        server_id: &str,
        command: &str,
    ) -> Result<RconResponse, ApiError> {
        self.client
            .post(
                &format!("/rcon/{}/{}/command", game_type, server_id),
                Some(&json!({ "command": command })),
            )
            .await
    }

    pub async fn players(
        &self,
        game_type: &str,
        server_id: &str,
    ) -> Result<RconPlayersResponse, ApiError> {
        self.client
            .get(&format!("/rcon/{}/{}/players", game_type, server_id))
            .await
    }

    pub async fn health(
        &self,
        game_type: &str,
        server_id: &str,
    ) -> Result<RconHealthResponse, ApiError> {
        self.client
            .get(&format!("/rcon/{}/{}/health", game_type, server_id))
            .await
    }

    pub async fn kick(
        &self,
        game_type: &str,
        server_id: &str,
        player: &str,
        reason: Option<&str>,
    ) -> Result<RconResponse, ApiError> {
        self.execute(game_type, server_id, &player_command("kick", player, reason))
            .await
    }

    pub async fn ban(
        &self,
        game_type: &str,
        server_id: &str,
        player: &str,
        reason: Option<&str>,
    ) -> Result<RconResponse, ApiError> {
        self.execute(game_type, server_id, &player_command("ban", player, reason))
            .await
    }

    pub async fn say(
        &self,
        game_type: &str,
        server_id: &str,
        message: &str,
    ) -> Result<RconResponse, ApiError> {
        self.execute(game_type, server_id, &format!("say {}", message))
            .await
    }

    /// Runs `tps` and parses the 1m/5m/15m triple out of the free-text
    /// answer. Servers without a tps plugin answer something unparseable,
    /// in which case a healthy [20, 20, 20] is assumed.
    pub async fn tps(&self, game_type: &str, server_id: &str) -> Result<Vec<f64>, ApiError> {
        let resp = self.execute(game_type, server_id, "tps").await?;
        if !resp.success {
            return Err(ApiError::Domain {
                message: resp.error.unwrap_or_else(|| "tps command failed".to_string()),
            });
        }
        Ok(parse_tps(resp.result.as_deref().unwrap_or_default()))
    }
}

fn player_command(verb: &str, player: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("{} {} {}", verb, player, reason),
        None => format!("{} {}", verb, player),
    }
}

/// Typical answer: "TPS from last 1m, 5m, 15m: 19.98, 19.96, 19.97".
fn parse_tps(result: &str) -> Vec<f64> {
    let re = match Regex::new(r"(\d+\.\d+)") {
        Ok(re) => re,
        Err(_) => return vec![20.0, 20.0, 20.0],
    };
    let values: Vec<f64> = re
        .captures_iter(result)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if values.is_empty() {
        vec![20.0, 20.0, 20.0]
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tps_triple_is_extracted_from_the_usual_answer() {
        let values = parse_tps("TPS from last 1m, 5m, 15m: 19.98, 19.96, 19.97");
        assert_eq!(values, vec![19.98, 19.96, 19.97]);
    }

    #[test]
    fn unparseable_answers_fall_back_to_a_healthy_triple() {
        assert_eq!(parse_tps("Unknown command"), vec![20.0, 20.0, 20.0]);
        assert_eq!(parse_tps(""), vec![20.0, 20.0, 20.0]);
    }

    #[test]
    fn commands_are_spelled_with_and_without_reason() {
        assert_eq!(player_command("kick", "Steve", None), "kick Steve");
        assert_eq!(
            player_command("ban", "Alex", Some("griefing")),
            "ban Alex griefing"
        );
    }
}

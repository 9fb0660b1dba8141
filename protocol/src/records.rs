use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback palette for instances whose owning minigame has no configured
/// color. Matches the tag colors the dashboard theme ships with.
pub const COLOR_PALETTE: &[&str] = &[
    "blue", "lime", "orange", "purple", "red", "teal", "cyan", "pink",
];

/// Default cosmetic color when nothing better is known.
pub const DEFAULT_COLOR: &str = "blue";

/// Coarse lifecycle of one game-server process as the dashboard shows it.
///
/// The backend speaks a richer vocabulary (`PREPARING`, `WAITING`,
/// `IN_GAME`, ...); the projection down to three states is one-way and
/// lossy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Starting,
    Running,
    Stopped,
}

impl LifecycleState {
    /// Maps a raw upstream state string onto the dashboard's three states.
    ///
    /// Pure function of the input string: feeding it the same raw value
    /// twice yields the same state, and it never consults prior output.
    /// Unknown strings become `Stopped`; they are logged so new backend
    /// states at least show up in debug output instead of silently looking
    /// like crashes.
    pub fn from_upstream(state: &str) -> Self {
        match state {
            "PREPARING" | "STARTING" => LifecycleState::Starting,
            "WAITING" | "IN_GAME" => LifecycleState::Running,
            "FINISHED" => LifecycleState::Stopped,
            other => {
                log::debug!("unrecognized upstream state {:?}, treating as stopped", other);
                LifecycleState::Stopped
            }
        }
    }
}

/// Player occupancy of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Players {
    pub current: u32,
    pub max: u32,
    /// Player identifiers in the order the backend reports them. These may
    /// be bare usernames without UUIDs.
    pub roster: Vec<String>,
}

impl Default for Players {
    fn default() -> Self {
        Self {
            current: 0,
            max: 16,
            roster: Vec::new(),
        }
    }
}

/// Resource telemetry of one instance.
///
/// Most fetch paths fill these with static placeholders because the backend
/// does not yet expose per-instance figures there; only the push-telemetry
/// path carries live values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// RAM usage as a fraction in [0, 1].
    pub ram_usage_fraction: f64,
    /// Total RAM in GB.
    pub ram_total_gb: f64,
    /// CPU usage in percent.
    pub cpu_usage_percent: f64,
}

impl Resources {
    /// Placeholder figures used by fetch paths without live telemetry.
    pub fn placeholder() -> Self {
        Self {
            ram_usage_fraction: 0.6,
            ram_total_gb: 2.0,
            cpu_usage_percent: 25.0,
        }
    }
}

/// Placeholder TPS reported until live telemetry arrives.
pub const PLACEHOLDER_TPS: f64 = 19.8;

/// One running game-server process as tracked by the dashboard.
///
/// `id` is the sole de-duplication key across the roster; it equals the
/// backend's container name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub minigame_type: String,
    pub map: String,
    pub lifecycle_state: LifecycleState,
    /// Backend "last update" time; an approximation of process start, not
    /// the true start time.
    pub started_at: DateTime<Utc>,
    pub players: Players,
    pub resources: Resources,
    /// Ticks per second; 20 is a healthy game loop.
    pub tps: f64,
    pub display_color: String,
    pub version: Option<String>,
    pub java_version: Option<String>,
}

impl InstanceRecord {
    pub fn is_running(&self) -> bool {
        self.lifecycle_state == LifecycleState::Running
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub min_players: u32,
    pub max_players: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// Memory budget as the backend spells it, e.g. "2G" or "512M".
    pub memory: String,
    pub cpu: String,
    pub java_version: String,
    pub server_version: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinigameStats {
    pub avg_tps: f64,
    pub avg_memory_usage: f64,
    pub avg_cpu_usage: f64,
    pub avg_startup_time: f64,
    pub success_rate: f64,
    pub active_servers: u32,
    pub peak_player_count: u32,
    pub current_player_count: u32,
}

/// Static configuration of one minigame: created and edited through the
/// admin CRUD forms, read-mostly everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minigame {
    pub id: String,
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub description: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub developer_names: Vec<String>,
    pub enabled: bool,
    pub game_settings: GameSettings,
    pub server_settings: ServerSettings,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stats: MinigameStats,
}

/// A non-game backend service (proxy, database, ...) managed through the
/// parallel `/services` surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub container_id: String,
    pub image: String,
    pub state: String,
    pub status: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub description: Option<String>,
    pub created_at: String,
    pub started_at: String,
    pub memory_usage: f64,
    pub memory_limit: String,
    pub cpu_usage: f64,
}

/// A dashboard user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub permissions: Vec<String>,
}

impl User {
    /// "admin" is a super-permission: holding it grants every other one by
    /// plain membership test, there is no hierarchy traversal.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == "admin")
            || self.permissions.iter().any(|p| p == permission)
    }

    pub fn has_permissions(&self, permissions: &[&str]) -> bool {
        if permissions.is_empty() {
            return true;
        }
        if self.permissions.iter().any(|p| p == "admin") {
            return true;
        }
        permissions.iter().all(|needed| self.permissions.iter().any(|p| p == needed))
    }
}

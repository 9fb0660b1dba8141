//! Frames spoken over the push channel.
//!
//! The wire format is one JSON object per websocket text message, tagged by
//! `event` with the payload under `data`. The backend keeps no subscription
//! state across connections, so every client frame here may need to be
//! replayed after a reconnect.

use serde::{Deserialize, Serialize};

use crate::raw::RawInstance;
use crate::records::Resources;

/// Client → server subscription control frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    /// Start watching one instance's live telemetry. One watch at a time.
    #[serde(rename = "join:server")]
    JoinServer(String),
    /// Stop watching an instance. Must precede the next join when switching.
    #[serde(rename = "leave:server")]
    LeaveServer(String),
    /// Arm roster-wide created/updated/deleted notifications.
    #[serde(rename = "subscribe:servers")]
    SubscribeServers,
    #[serde(rename = "unsubscribe:servers")]
    UnsubscribeServers,
}

/// Live telemetry for the watched instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub server_id: String,
    pub timestamp: i64,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Percent.
    pub usage: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// MB in use.
    pub usage: f64,
    /// MB limit.
    pub limit: f64,
    /// Percent of the limit.
    pub percent: f64,
}

impl ServerStats {
    /// Live resource figures in the canonical record's units: fraction for
    /// RAM usage, GB for the total.
    pub fn resources(&self) -> Resources {
        Resources {
            ram_usage_fraction: self.memory.percent / 100.0,
            ram_total_gb: self.memory.limit / 1024.0,
            cpu_usage_percent: self.cpu.usage,
        }
    }
}

/// Roster change notification. `server_data` is optional: the backend omits
/// it on some paths, in which case the client falls back to a full resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerNotification {
    pub game_type: String,
    pub server_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_data: Option<RawInstance>,
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    #[serde(rename = "server:stats")]
    Stats(ServerStats),
    #[serde(rename = "server:created")]
    Created(ServerNotification),
    #[serde(rename = "server:updated")]
    Updated(ServerNotification),
    #[serde(rename = "server:deleted")]
    Deleted(ServerNotification),
}

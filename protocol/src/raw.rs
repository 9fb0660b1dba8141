//! Raw backend payload shapes and their normalization into canonical
//! records.
//!
//! The backend grew across versions and its endpoints disagree on field
//! names (`name` vs `containerId`, `state` vs `status`) and on types
//! (memory as a bare number or a `"2G"`-style string). Everything entering
//! the roster goes through [`RawInstance::normalize`] so that none of these
//! shapes leak past this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{
    InstanceRecord, LifecycleState, Players, Resources, COLOR_PALETTE, DEFAULT_COLOR,
    PLACEHOLDER_TPS,
};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// None of the identity fields (id, containerId, name) held a non-empty
    /// value. Such a record cannot be keyed into the roster and is rejected
    /// to the caller rather than swallowed.
    #[error("malformed instance record: id, containerId and name are all absent or empty")]
    MalformedRecord,
}

/// Memory totals arrive either as a bare number or as a string with a
/// `G`/`M` suffix, depending on backend version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMemory {
    Number(f64),
    Text(String),
}

/// Timestamps arrive as epoch milliseconds from the list endpoints and as
/// RFC 3339 strings from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            RawTimestamp::Text(s) => s.parse::<DateTime<Utc>>().ok(),
        }
    }
}

/// Instance payload as the pagination endpoint and the push channel's
/// `serverData` field deliver it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstance {
    pub id: Option<String>,
    pub container_id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "minigame")]
    pub game_type: Option<String>,
    #[serde(alias = "map")]
    pub map_name: Option<String>,
    #[serde(alias = "status")]
    pub state: Option<String>,
    pub last_update: Option<RawTimestamp>,
    pub connected_players: Option<u32>,
    pub max_players: Option<u32>,
    pub players: Option<Vec<String>>,
    pub memory: Option<RawMemory>,
}

/// Instance payload from the single-instance detail endpoint; same base
/// shape plus version attribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstanceDetail {
    #[serde(flatten)]
    pub base: RawInstance,
    pub version: Option<String>,
    pub java_version: Option<String>,
}

/// Per-call knobs for normalization that differ between endpoint shapes.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Map name used when the payload carries none: the list shape says
    /// "default", the detail shape says "world".
    pub map_fallback: &'static str,
    /// Display color from the owning minigame's configuration, if known.
    pub color: Option<String>,
}

impl NormalizeOptions {
    pub fn listed() -> Self {
        Self {
            map_fallback: "default",
            color: None,
        }
    }

    pub fn detail() -> Self {
        Self {
            map_fallback: "world",
            color: None,
        }
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }
}

impl RawInstance {
    /// Resolves the record identity: explicit id first, then container id,
    /// then name; first non-empty wins.
    pub fn identity(&self) -> Option<&str> {
        [&self.id, &self.container_id, &self.name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }

    /// Produces one canonical [`InstanceRecord`] from this payload.
    ///
    /// Never fails on missing optional fields, every one has a default.
    /// An unresolvable identity is a [`NormalizeError::MalformedRecord`]
    /// surfaced to the caller.
    pub fn normalize(&self, opts: &NormalizeOptions) -> Result<InstanceRecord, NormalizeError> {
        let id = self
            .identity()
            .ok_or(NormalizeError::MalformedRecord)?
            .to_string();

        let resources = match &self.memory {
            Some(memory) => Resources {
                ram_total_gb: memory_gb(memory),
                ..Resources::placeholder()
            },
            None => Resources::placeholder(),
        };

        let display_color = opts
            .color
            .clone()
            .unwrap_or_else(|| fallback_color(&id).to_string());

        Ok(InstanceRecord {
            minigame_type: self.game_type.clone().unwrap_or_default(),
            map: self
                .map_name
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| opts.map_fallback.to_string()),
            lifecycle_state: LifecycleState::from_upstream(self.state.as_deref().unwrap_or("")),
            started_at: self
                .last_update
                .as_ref()
                .and_then(RawTimestamp::to_utc)
                .unwrap_or_else(Utc::now),
            players: Players {
                current: self.connected_players.unwrap_or(0),
                max: self.max_players.filter(|m| *m > 0).unwrap_or(16),
                roster: self.players.clone().unwrap_or_default(),
            },
            resources,
            tps: PLACEHOLDER_TPS,
            display_color,
            version: None,
            java_version: None,
            id,
        })
    }
}

impl RawInstanceDetail {
    pub fn normalize(&self, opts: &NormalizeOptions) -> Result<InstanceRecord, NormalizeError> {
        let mut record = self.base.normalize(opts)?;
        record.version = self.version.clone();
        record.java_version = self.java_version.clone();
        Ok(record)
    }
}

/// Stable palette pick for instances without a configured color. Hash of
/// the identity rather than a true random draw, so the same instance keeps
/// its color across refetches.
fn fallback_color(id: &str) -> &'static str {
    let hash = id.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    COLOR_PALETTE
        .get(hash % COLOR_PALETTE.len())
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}

/// Normalizes a raw memory total to GB.
///
/// Bare numbers above 1000 are taken as MB; at or below 1000 they are taken
/// as already GB-equivalent. The 100–1000 band is genuinely ambiguous
/// upstream (a 512 could plausibly mean MB) and is passed through as GB
/// rather than silently "fixed".
pub fn memory_gb(raw: &RawMemory) -> f64 {
    match raw {
        RawMemory::Number(n) if *n > 1000.0 => n / 1024.0,
        RawMemory::Number(n) => *n,
        RawMemory::Text(s) => {
            let trimmed = s.trim();
            if let Some(v) = trimmed.strip_suffix(['G', 'g']) {
                v.parse::<f64>().unwrap_or(2.0)
            } else if let Some(v) = trimmed.strip_suffix(['M', 'm']) {
                v.parse::<f64>().map(|mb| mb / 1024.0).unwrap_or(2.0)
            } else {
                log::debug!("unparseable memory value {:?}, assuming 2G", s);
                2.0
            }
        }
    }
}

/// Formats a raw memory total for display as decimal GB.
///
/// Suffixed strings and MB-range numbers get one fractional digit
/// (`"2G"` → `"2.0"`, `2048` → `"2.0"`); bare GB-range numbers are shown as
/// given (`1` → `"1"`).
pub fn memory_display(raw: &RawMemory) -> String {
    match raw {
        RawMemory::Number(n) if *n <= 1000.0 => {
            if n.fract() == 0.0 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        _ => format!("{:.1}", memory_gb(raw)),
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::file::{Config, FileIoWithBackup};

/// UI layout preferences, persisted as one JSON blob under its own file,
/// separate from the session entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub preset: String,
    pub primary: String,
    pub surface: Option<String>,
    pub dark_theme: bool,
    pub menu_mode: String,
    pub menu_theme: String,
    pub card_style: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            preset: "Aura".into(),
            primary: "blue".into(),
            surface: None,
            dark_theme: true,
            menu_mode: "static".into(),
            menu_theme: "dark".into(),
            card_style: "transparent".into(),
        }
    }
}

pub struct LayoutStore {
    path: PathBuf,
}

impl FileIoWithBackup for LayoutStore {}
impl Config for LayoutStore {
    type ConfigType = LayoutConfig;
}

impl LayoutStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("layout.json"),
        }
    }

    pub fn load(&self) -> LayoutConfig {
        Self::load_config(&self.path).unwrap_or_default()
    }

    pub fn save(&self, config: &LayoutConfig) {
        if let Err(e) = Self::save_config(&self.path, config) {
            log::warn!("could not persist layout preferences: {}", e);
        }
    }
}

use std::path::PathBuf;
use std::sync::Mutex;

use mcdash_protocol::records::User;
use serde::{Deserialize, Serialize};

use super::file::{Config, FileIoWithBackup};

/// The persisted session entries: access token, refresh token, the
/// serialized user, plus the "remember me" preference kept alongside them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    #[serde(default)]
    pub remember: bool,
}

/// Owner of the persisted authentication state.
///
/// Built once at startup and injected by `Arc` into the HTTP client and the
/// auth surface; there is deliberately no global token holder.
pub struct SessionStore {
    path: PathBuf,
    state: Mutex<SessionState>,
}

impl FileIoWithBackup for SessionStore {}
impl Config for SessionStore {
    type ConfigType = SessionState;
}

impl SessionStore {
    /// Loads the session from `dir/session.json`, starting empty when the
    /// file is absent or unreadable.
    pub fn load(dir: &std::path::Path) -> Self {
        let path = dir.join("session.json");
        let state = Self::load_config(&path).unwrap_or_default();
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from("session.json"),
            state: Mutex::new(SessionState::default()),
        }
    }

    fn persist(&self, state: &SessionState) {
        // Sessions of users who declined "remember me" stay memory-only.
        if !state.remember {
            return;
        }
        if let Err(e) = Self::save_config(&self.path, state) {
            log::warn!("could not persist session: {}", e);
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().unwrap().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().unwrap().refresh_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.lock().unwrap().user.clone()
    }

    pub fn remember(&self) -> bool {
        self.state.lock().unwrap().remember
    }

    pub fn set_remember(&self, remember: bool) {
        let mut state = self.state.lock().unwrap();
        state.remember = remember;
        self.persist(&state);
    }

    pub fn set_tokens(&self, access: String, refresh: String) {
        let mut state = self.state.lock().unwrap();
        state.access_token = Some(access);
        state.refresh_token = Some(refresh);
        self.persist(&state);
    }

    pub fn set_user(&self, user: User) {
        let mut state = self.state.lock().unwrap();
        state.user = Some(user);
        self.persist(&state);
    }

    /// Wipes tokens and user, on disk too. The remember preference itself
    /// survives, it is a UI setting, not a credential.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.access_token = None;
        state.refresh_token = None;
        state.user = None;
        if state.remember {
            if let Err(e) = Self::save_config(&self.path, &state) {
                log::warn!("could not clear persisted session: {}", e);
            }
        }
    }
}

use std::sync::Arc;

use log::{debug, info, warn};
use mcdash_protocol::raw::NormalizeOptions;
use mcdash_protocol::records::InstanceRecord;
use tokio::sync::Notify;

use crate::api::{
    ApiClient, ApiError, AuthApi, MinigameApi, PaginationParams, RconApi, ServiceApi, UserAdminApi,
};
use crate::config::AppConfig;
use crate::push::{PushStatus, PushSubscriber, RosterPush};
use crate::roster::{RosterNotice, RosterStore};
use crate::storage::{LayoutStore, SessionStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const ROSTER_PAGE_SIZE: u32 = 50;

/// Everything the client holds at runtime, built once at startup and
/// `Arc`-shared. Components receive what they need from here; there are no
/// global singletons behind the accessors.
pub struct AppContext {
    pub config: AppConfig,
    pub session: Arc<SessionStore>,
    pub layout: LayoutStore,
    pub auth: AuthApi,
    pub minigames: MinigameApi,
    pub rcon: RconApi,
    pub services: ServiceApi,
    pub users: UserAdminApi,
    pub roster: RosterStore,
    pub push: Arc<PushSubscriber>,
    pub stop_notify: Arc<Notify>,
}

pub type AppState = Arc<AppContext>;

pub fn init_context() -> anyhow::Result<AppState> {
    let config = AppConfig::load()?;
    debug!(
        "config loaded: {}",
        serde_json::to_string_pretty(&config)?
    );

    let session = Arc::new(SessionStore::load(&config.storage_dir));
    let layout = LayoutStore::new(&config.storage_dir);

    let client = Arc::new(ApiClient::new(&config, session.clone())?);
    let push = Arc::new(PushSubscriber::new(
        config.push_url.clone(),
        config.reconnect.clone(),
    ));

    Ok(Arc::new(AppContext {
        auth: AuthApi::new(client.clone(), session.clone()),
        minigames: MinigameApi::new(client.clone()),
        rcon: RconApi::new(client.clone()),
        services: ServiceApi::new(client.clone()),
        users: UserAdminApi::new(client),
        roster: RosterStore::new(),
        push,
        session,
        layout,
        config,
        stop_notify: Arc::new(Notify::new()),
    }))
}

/// Authoritative roster resync: walks every page and installs the combined
/// snapshot. Records that fail to normalize are skipped, one bad entry must
/// not blank the whole roster. A failed page fetch aborts the whole resync
/// and leaves the store at its last known good state.
pub async fn refresh_roster(minigames: &MinigameApi, roster: &RosterStore) -> Result<(), ApiError> {
    let opts = NormalizeOptions::listed();
    let mut records: Vec<InstanceRecord> = Vec::new();
    let mut page = 0;
    let total;
    loop {
        let fetched = minigames
            .instances(&PaginationParams::page(page, ROSTER_PAGE_SIZE))
            .await?;
        for raw in &fetched.content {
            match raw.normalize(&opts) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping malformed instance record: {}", e),
            }
        }
        page += 1;
        if page >= fetched.total_pages {
            total = fetched.total_elements;
            break;
        }
    }
    info!("roster refreshed: {} instances", records.len());
    roster.replace_all(records, total);
    Ok(())
}

/// Folds one push frame into the roster store, falling back to a full
/// refetch when the store asks for it.
pub async fn apply_roster_push(minigames: &MinigameApi, roster: &RosterStore, event: RosterPush) {
    use crate::roster::RosterOutcome::*;

    let opts = NormalizeOptions::listed();
    let outcome = match &event {
        RosterPush::Created(n) => match &n.server_data {
            Some(raw) => match raw.normalize(&opts) {
                Ok(record) => roster.apply_create(record),
                Err(e) => {
                    warn!("created event with malformed record: {}", e);
                    ResyncNeeded
                }
            },
            None => ResyncNeeded,
        },
        RosterPush::Updated(n) => {
            let record = match &n.server_data {
                Some(raw) => match raw.normalize(&opts) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("updated event with malformed record: {}", e);
                        None
                    }
                },
                None => None,
            };
            roster.apply_update(&n.server_id, record)
        }
        RosterPush::Deleted(n) => roster.apply_delete(&n.server_id),
    };

    if outcome == ResyncNeeded {
        debug!("push state diverged from the roster, refetching");
        if let Err(e) = refresh_roster(minigames, roster).await {
            warn!("roster refetch failed, keeping last known state: {}", e);
        }
    }
}

/// Wires push frames and store notices, then blocks until ctrl-c.
pub async fn run_app() -> anyhow::Result<()> {
    let state = init_context()?;
    info!("mcdash client v{}", VERSION);

    let username = std::env::var("MCDASH_USERNAME")?;
    let password = std::env::var("MCDASH_PASSWORD")?;
    let user = state
        .auth
        .login(&username, &password, state.session.remember())
        .await?;
    info!(
        "authenticated as {} ({} permissions)",
        user.username,
        user.permissions.len()
    );

    if let Err(e) = refresh_roster(&state.minigames, &state.roster).await {
        warn!("initial roster fetch failed: {}", e);
    }

    state.roster.notices.subscribe(|notice: RosterNotice| match notice {
        RosterNotice::Created { id } => info!("instance started: {}", id),
        RosterNotice::Deleted { id } => info!("instance stopped: {}", id),
    });
    state.push.status.subscribe(|status: PushStatus| match status {
        PushStatus::Connected => info!("push channel up"),
        PushStatus::Disconnected => warn!("push channel down, reconnecting"),
        PushStatus::GaveUp => warn!("push channel gave up, live updates stopped"),
    });

    let ctx = state.clone();
    state.push.roster.subscribe_async(move |event| {
        let ctx = ctx.clone();
        async move { apply_roster_push(&ctx.minigames, &ctx.roster, event).await }
    });

    state.push.subscribe_servers();
    let push = state.push.clone();
    let push_task = tokio::spawn(async move { push.run().await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("ctrl-c received, shutting down"),
        _ = state.stop_notify.notified() => info!("stop requested, shutting down"),
    }

    state.push.shutdown();
    let _ = push_task.await;
    state.auth.logout().await;
    info!("Bye.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use mcdash_protocol::raw::RawInstance;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Fixture backend for the instances endpoint: page 0 answers one record
    /// out of two pages, page 1 blows up with a 500.
    async fn spawn_flaky_pager() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut raw = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => raw.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&raw).to_string();

                    let (status, body) = if request.contains("page=0") {
                        (
                            "200 OK",
                            r#"{"content":[{"name":"bw-2","minigame":"bedwars","state":"WAITING"}],"totalPages":2,"totalElements":2,"currentPage":0,"size":50}"#,
                        )
                    } else {
                        ("500 Internal Server Error", r#"{"success":false}"#)
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn minigames_against(base_url: String) -> MinigameApi {
        let session = Arc::new(SessionStore::in_memory());
        session.set_tokens("t".into(), "r".into());
        let config = AppConfig {
            base_url,
            ..AppConfig::default()
        };
        MinigameApi::new(Arc::new(ApiClient::new(&config, session).unwrap()))
    }

    fn seeded_store() -> RosterStore {
        let roster = RosterStore::new();
        let record = RawInstance {
            name: Some("bw-1".into()),
            game_type: Some("bedwars".into()),
            state: Some("IN_GAME".into()),
            ..RawInstance::default()
        }
        .normalize(&NormalizeOptions::listed())
        .unwrap();
        roster.replace_all(vec![record], 1);
        roster
    }

    #[tokio::test]
    async fn failed_page_fetch_keeps_the_previous_roster() {
        let base_url = spawn_flaky_pager().await;
        let minigames = minigames_against(base_url);
        let roster = seeded_store();

        let result = refresh_roster(&minigames, &roster).await;

        assert!(result.is_err());
        let records = roster.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "bw-1");
        assert_eq!(roster.total(), 1);
    }

    #[tokio::test]
    async fn single_page_fetch_replaces_the_roster() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut raw = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => raw.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let body = r#"{"content":[{"name":"sw-1","minigame":"skywars","state":"PREPARING"}],"totalPages":1,"totalElements":1,"currentPage":0,"size":50}"#;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        let minigames = minigames_against(format!("http://{}", addr));
        let roster = seeded_store();

        refresh_roster(&minigames, &roster).await.unwrap();

        let records = roster.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "sw-1");
        assert_eq!(roster.total(), 1);
    }
}

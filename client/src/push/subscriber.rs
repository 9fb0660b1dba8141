use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use mcdash_protocol::push::{ClientFrame, ServerFrame, ServerNotification, ServerStats};
use tokio::select;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Notify;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::utils::backoff::{Backoff, ReconnectPolicy};
use crate::utils::Event;

/// Connection state surfaced to observers. `GaveUp` is terminal: the
/// attempt budget ran out and no further reconnects are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Connected,
    Disconnected,
    GaveUp,
}

/// Roster change frames fanned out to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterPush {
    Created(ServerNotification),
    Updated(ServerNotification),
    Deleted(ServerNotification),
}

/// Desired subscriptions, independent of any live connection.
///
/// The backend forgets subscriptions when the socket drops, so the registry
/// records what the client wants and `replay_frames` re-states it on every
/// (re)connect, each subscription at most once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    watched: Option<String>,
    roster_subscribed: bool,
}

impl SubscriptionState {
    /// Switches the watched instance. Leaves the old watch before joining
    /// the new one; watching the already-watched id sends nothing.
    pub fn watch(&mut self, id: &str) -> Vec<ClientFrame> {
        if self.watched.as_deref() == Some(id) {
            return Vec::new();
        }
        let mut frames = Vec::new();
        if let Some(old) = self.watched.take() {
            frames.push(ClientFrame::LeaveServer(old));
        }
        self.watched = Some(id.to_string());
        frames.push(ClientFrame::JoinServer(id.to_string()));
        frames
    }

    pub fn unwatch(&mut self) -> Vec<ClientFrame> {
        match self.watched.take() {
            Some(old) => vec![ClientFrame::LeaveServer(old)],
            None => Vec::new(),
        }
    }

    pub fn subscribe_roster(&mut self) -> Vec<ClientFrame> {
        if self.roster_subscribed {
            return Vec::new();
        }
        self.roster_subscribed = true;
        vec![ClientFrame::SubscribeServers]
    }

    pub fn unsubscribe_roster(&mut self) -> Vec<ClientFrame> {
        if !self.roster_subscribed {
            return Vec::new();
        }
        self.roster_subscribed = false;
        vec![ClientFrame::UnsubscribeServers]
    }

    pub fn watched(&self) -> Option<&str> {
        self.watched.as_deref()
    }

    /// The frames that restore this registry on a fresh connection.
    pub fn replay_frames(&self) -> Vec<ClientFrame> {
        let mut frames = Vec::new();
        if let Some(id) = &self.watched {
            frames.push(ClientFrame::JoinServer(id.clone()));
        }
        if self.roster_subscribed {
            frames.push(ClientFrame::SubscribeServers);
        }
        frames
    }
}

/// Owner of the websocket lifecycle.
///
/// Built once, `Arc`-shared; `run` drives connect, dispatch and reconnect
/// until shutdown or until the backoff budget is spent. Subscription calls
/// are valid in any state, they update the registry and reach the wire
/// immediately when connected or at the next replay otherwise.
pub struct PushSubscriber {
    url: String,
    policy: ReconnectPolicy,
    state: Mutex<SubscriptionState>,
    outbound: Mutex<Option<UnboundedSender<ClientFrame>>>,
    shutdown: Notify,
    stopping: AtomicBool,
    pub stats: Event<ServerStats>,
    pub roster: Event<RosterPush>,
    pub status: Event<PushStatus>,
}

impl PushSubscriber {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            state: Mutex::new(SubscriptionState::default()),
            outbound: Mutex::new(None),
            shutdown: Notify::new(),
            stopping: AtomicBool::new(false),
            stats: Event::new(),
            roster: Event::new(),
            status: Event::new(),
        }
    }

    pub fn watch_server(&self, id: &str) {
        let frames = self.state.lock().unwrap().watch(id);
        self.send_frames(frames);
    }

    pub fn unwatch_server(&self) {
        let frames = self.state.lock().unwrap().unwatch();
        self.send_frames(frames);
    }

    pub fn subscribe_servers(&self) {
        let frames = self.state.lock().unwrap().subscribe_roster();
        self.send_frames(frames);
    }

    pub fn unsubscribe_servers(&self) {
        let frames = self.state.lock().unwrap().unsubscribe_roster();
        self.send_frames(frames);
    }

    pub fn watched_server(&self) -> Option<String> {
        self.state.lock().unwrap().watched().map(str::to_string)
    }

    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    fn send_frames(&self, frames: Vec<ClientFrame>) {
        // Disconnected is fine, the registry replays on the next connect.
        let outbound = self.outbound.lock().unwrap();
        if let Some(sender) = outbound.as_ref() {
            for frame in frames {
                if sender.send(frame).is_err() {
                    debug!("push sender gone, frame deferred to replay");
                    break;
                }
            }
        }
    }

    /// Connect/dispatch/reconnect loop. Returns on shutdown or after the
    /// reconnect budget is exhausted.
    pub async fn run(&self) {
        let mut backoff = Backoff::new(self.policy.clone());
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                return;
            }
            match self.run_connection(&mut backoff).await {
                Ok(()) => return,
                Err(e) => warn!("push connection lost: {}", e),
            }
            self.status.emit(PushStatus::Disconnected);

            let delay = match backoff.next_delay() {
                Some(delay) => delay,
                None => {
                    warn!(
                        "push channel gave up after {} attempts",
                        backoff.attempt()
                    );
                    self.status.emit(PushStatus::GaveUp);
                    return;
                }
            };
            debug!("push reconnect in {:?}", delay);
            select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// One websocket session. `Ok(())` means an orderly shutdown was
    /// requested; any error means the session died and the caller decides
    /// about a reconnect. An established connection resets the reconnect
    /// budget, only consecutive failures count against it.
    async fn run_connection(&self, backoff: &mut Backoff) -> anyhow::Result<()> {
        let (socket, _) = connect_async(&self.url).await?;
        info!("push channel connected to {}", self.url);
        backoff.reset();
        self.status.emit(PushStatus::Connected);

        let (sink, stream) = socket.split();
        let (tx, rx) = unbounded_channel::<ClientFrame>();
        *self.outbound.lock().unwrap() = Some(tx);

        let result = self.session(sink, stream, rx).await;
        *self.outbound.lock().unwrap() = None;
        result
    }

    async fn session<S, R>(
        &self,
        mut sink: S,
        mut stream: R,
        mut rx: tokio::sync::mpsc::UnboundedReceiver<ClientFrame>,
    ) -> anyhow::Result<()>
    where
        S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
        R: futures::Stream<
                Item = Result<Message, tokio_tungstenite::tungstenite::Error>,
            > + Unpin,
    {
        let replay = self.state.lock().unwrap().replay_frames();
        for frame in replay {
            sink.send(Message::Text(serde_json::to_string(&frame)?))
                .await?;
        }

        loop {
            select! {
                outgoing = rx.recv() => {
                    // Sender lives in self.outbound, recv cannot fail here.
                    if let Some(frame) = outgoing {
                        let text = serde_json::to_string(&frame)?;
                        sink.send(Message::Text(text)).await?;
                    }
                }
                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => self.dispatch(&text),
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            anyhow::bail!("push channel closed by peer");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
                _ = self.shutdown.notified() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let frame: ServerFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("unrecognized push frame: {}", e);
                return;
            }
        };
        match frame {
            ServerFrame::Stats(stats) => {
                // Telemetry only counts for the instance being watched;
                // late frames from a previous watch are dropped.
                let watched = self.state.lock().unwrap().watched().map(str::to_string);
                if watched.as_deref() == Some(stats.server_id.as_str()) {
                    self.stats.emit(stats);
                }
            }
            ServerFrame::Created(n) => self.roster.emit(RosterPush::Created(n)),
            ServerFrame::Updated(n) => self.roster.emit(RosterPush::Updated(n)),
            ServerFrame::Deleted(n) => self.roster.emit(RosterPush::Deleted(n)),
        }
    }
}

//! Realtime map channel
//!
//! A single driver task owns the channel state, the point set, the live
//! connection and the reconnect timer. Everything that can change them
//! (caller commands, socket events, credential changes, the timer firing,
//! shutdown) arrives through one `select!` loop, so handling is strictly
//! ordered and nothing races on the point set.
//!
//! Socket tasks only produce [`SocketEvent`]s over a bounded queue. Each
//! connection has an id; events from a superseded connection are dropped.

use super::endpoint;
use super::points::{MergeOutcome, PointSet, PointSnapshot};
use super::reconnect::ReconnectSlot;
use crate::api::MapApi;
use crate::credential::CredentialStore;
use crate::http::SessionPipeline;
use crate::{ClientConfig, ClientError};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared::models::{GeoPoint, MapBounds, StreamMessage};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Time a closing socket gets to send its close frame
const CLOSE_GRACE: Duration = Duration::from_secs(2);
/// Caller command queue depth
const COMMAND_BUFFER: usize = 16;
/// Transition broadcast capacity
const TRANSITION_BUFFER: usize = 64;

/// Connection state of the live stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Closed,
    Connecting,
    Open,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Closed => "CLOSED",
            ChannelState::Connecting => "CONNECTING",
            ChannelState::Open => "OPEN",
        };
        f.write_str(s)
    }
}

enum Command {
    Connect { done: oneshot::Sender<()> },
    Replace {
        points: Vec<GeoPoint>,
        done: oneshot::Sender<()>,
    },
}

/// Produced by socket tasks, consumed by the driver
#[derive(Debug)]
enum SocketEvent {
    Opened { conn: u64 },
    Message { conn: u64, text: String },
    Closed {
        conn: u64,
        normal: bool,
        reason: String,
    },
}

struct Connection {
    id: u64,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

// ============================================================================
// Handle
// ============================================================================

/// Handle to a running realtime channel
///
/// Dropping the handle stops the driver; [`RealtimeChannel::shutdown`]
/// additionally waits until the socket is closed.
pub struct RealtimeChannel {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ChannelState>,
    points_rx: watch::Receiver<PointSnapshot>,
    transitions: broadcast::Sender<ChannelState>,
    pipeline: SessionPipeline,
    shutdown: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("state", &*self.state_rx.borrow())
            .field("points", &self.points_rx.borrow().len())
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl RealtimeChannel {
    /// Start the driver task; the channel starts `Closed` with no points
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn(config: ClientConfig, pipeline: SessionPipeline) -> Self {
        let (channel, driver) = Self::parts(config, pipeline);
        let handle = tokio::spawn(driver.run());
        *channel.driver.lock() = Some(handle);
        channel
    }

    fn parts(config: ClientConfig, pipeline: SessionPipeline) -> (Self, Driver) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::channel(config.stream_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(ChannelState::Closed);
        let (points_tx, points_rx) = watch::channel(PointSnapshot::default());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        let shutdown = CancellationToken::new();

        let store = pipeline.session().store().clone();
        let credentials = store.subscribe();

        let driver = Driver {
            config,
            store,
            credentials,
            commands: commands_rx,
            events_tx,
            events_rx,
            state_tx,
            points_tx,
            transitions: transitions.clone(),
            points: PointSet::new(),
            connection: None,
            next_conn: 0,
            reconnect: ReconnectSlot::new(),
            attempts: 0,
            shutdown: shutdown.clone(),
        };

        let channel = Self {
            commands: commands_tx,
            state_rx,
            points_rx,
            transitions,
            pipeline,
            shutdown,
            driver: Mutex::new(None),
        };
        (channel, driver)
    }

    /// Fetch the bounded point set and replace the held set with it
    ///
    /// Defaults cover the whole operating region when `bounds` is `None`.
    /// Fetch errors are logged and swallowed; the previous view stays.
    /// Connection state is not touched.
    pub async fn seed(&self, bounds: Option<MapBounds>) {
        let bounds = bounds.unwrap_or_default();
        let points = match MapApi::new(self.pipeline.clone()).points(&bounds).await {
            Ok(points) => points,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "Map seed fetch failed: {}", e);
                return;
            }
        };

        let (done, ack) = oneshot::channel();
        if self.commands.send(Command::Replace { points, done }).await.is_err() {
            tracing::debug!("Realtime channel stopped, seed dropped");
            return;
        }
        let _ = ack.await;
    }

    /// Open the live stream
    ///
    /// No-op while connecting or open, and when no access token is held.
    pub async fn connect(&self) {
        let (done, ack) = oneshot::channel();
        if self.commands.send(Command::Connect { done }).await.is_err() {
            tracing::debug!("Realtime channel stopped, connect ignored");
            return;
        }
        let _ = ack.await;
    }

    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Latest state, coalescing intermediate transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Every state transition, in order
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<ChannelState> {
        self.transitions.subscribe()
    }

    /// Current point snapshot
    pub fn points(&self) -> PointSnapshot {
        self.points_rx.borrow().clone()
    }

    pub fn subscribe_points(&self) -> watch::Receiver<PointSnapshot> {
        self.points_rx.clone()
    }

    /// Cancel the reconnect timer, close the socket with a normal close
    /// and stop the driver. Safe to call repeatedly and in any state.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.driver.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!("Realtime driver terminated abnormally: {}", e);
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============================================================================
// Driver
// ============================================================================

struct Driver {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    credentials: watch::Receiver<Option<String>>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<SocketEvent>,
    events_rx: mpsc::Receiver<SocketEvent>,
    state_tx: watch::Sender<ChannelState>,
    points_tx: watch::Sender<PointSnapshot>,
    transitions: broadcast::Sender<ChannelState>,
    points: PointSet,
    connection: Option<Connection>,
    next_conn: u64,
    reconnect: ReconnectSlot,
    /// Consecutive abnormal closes, reset on open
    attempts: u32,
    shutdown: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        tracing::debug!("Realtime driver started");
        let mut credentials_live = true;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                Some(event) = self.events_rx.recv() => self.handle_event(event),

                changed = self.credentials.changed(), if credentials_live => match changed {
                    Ok(()) => {
                        let token = self.credentials.borrow_and_update().clone();
                        self.handle_credential_change(token).await;
                    }
                    Err(_) => credentials_live = false,
                },

                _ = self.reconnect.fired(), if self.reconnect.is_pending() => {
                    tracing::info!(attempt = self.attempts, "Reconnecting live map stream");
                    self.open_connection();
                }
            }
        }

        self.teardown().await;
        tracing::debug!("Realtime driver stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { done } => {
                self.open_connection();
                let _ = done.send(());
            }
            Command::Replace { points, done } => {
                let outcome = self.points.replace(points);
                tracing::debug!(?outcome, "Point set seeded");
                self.publish_points();
                let _ = done.send(());
            }
        }
    }

    fn handle_event(&mut self, event: SocketEvent) {
        let current = self.connection.as_ref().map(|c| c.id);
        match event {
            SocketEvent::Opened { conn } if current == Some(conn) => {
                self.attempts = 0;
                self.reconnect.cancel();
                self.set_state(ChannelState::Open);
                tracing::info!(conn, "Live map stream open");
            }
            SocketEvent::Message { conn, text } if current == Some(conn) => {
                self.handle_message(&text);
            }
            SocketEvent::Closed {
                conn,
                normal,
                reason,
            } if current == Some(conn) => {
                // Socket task is finishing on its own
                self.connection = None;
                self.set_state(ChannelState::Closed);

                if normal {
                    tracing::info!(conn, %reason, "Live map stream closed normally");
                } else if !self.store.is_authenticated() {
                    tracing::warn!(conn, %reason, "Live map stream closed, no credential to reconnect with");
                } else {
                    let delay = self.config.reconnect.delay_for(self.attempts);
                    if self.reconnect.schedule(delay) {
                        self.attempts = self.attempts.saturating_add(1);
                        tracing::warn!(conn, %reason, delay_ms = delay.as_millis() as u64, "Live map stream lost, reconnect scheduled");
                    }
                }
            }
            stale => tracing::trace!(?stale, "Ignoring event from superseded connection"),
        }
    }

    fn handle_message(&mut self, text: &str) {
        let message = match StreamMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(len = text.len(), "Discarding malformed stream payload: {}", e);
                return;
            }
        };

        match self.points.apply(message) {
            MergeOutcome::Rejected => {
                tracing::warn!("Discarding single cluster point: nothing to merge by");
            }
            outcome => {
                tracing::debug!(?outcome, "Point set updated");
                self.publish_points();
            }
        }
    }

    async fn handle_credential_change(&mut self, token: Option<String>) {
        match token {
            Some(_) if self.connection.is_some() => {
                // The handshake embeds the token; it cannot be swapped in place
                tracing::info!("Access token changed, re-establishing live map stream");
                self.close_connection().await;
                self.open_connection();
            }
            Some(_) if self.reconnect.is_pending() => {
                self.open_connection();
            }
            Some(_) => {}
            None => {
                self.reconnect.cancel();
                if self.connection.is_some() {
                    tracing::info!("Access token cleared, closing live map stream");
                    self.close_connection().await;
                }
            }
        }
    }

    fn open_connection(&mut self) {
        if self.connection.is_some() {
            return;
        }
        let Some(token) = self.store.access_token() else {
            tracing::warn!("No access token held, live map stream not started");
            return;
        };
        let url = match endpoint::stream_url(&self.config, &token) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot resolve live map endpoint: {}", e);
                return;
            }
        };

        self.reconnect.cancel();
        self.next_conn += 1;
        let id = self.next_conn;
        let stop = self.shutdown.child_token();
        tracing::info!(
            conn = id,
            host = url.host_str().unwrap_or_default(),
            "Connecting live map stream"
        );

        let task = tokio::spawn(run_socket(id, url, self.events_tx.clone(), stop.clone()));
        self.connection = Some(Connection { id, stop, task });
        self.set_state(ChannelState::Connecting);
    }

    /// Close the current socket with a normal close and wait for it
    async fn close_connection(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.stop.cancel();
            if tokio::time::timeout(CLOSE_GRACE, &mut conn.task).await.is_err() {
                tracing::warn!(conn = conn.id, "Socket did not close in time, aborting");
                conn.task.abort();
            }
        }
        self.set_state(ChannelState::Closed);
    }

    async fn teardown(&mut self) {
        self.reconnect.cancel();
        self.close_connection().await;
        tracing::info!("Realtime channel shut down");
    }

    fn publish_points(&self) {
        self.points_tx.send_replace(self.points.snapshot());
    }

    fn set_state(&self, next: ChannelState) {
        if *self.state_tx.borrow() == next {
            return;
        }
        self.state_tx.send_replace(next);
        tracing::debug!(state = %next, "Channel state");
        let _ = self.transitions.send(next);
    }
}

// ============================================================================
// Socket task
// ============================================================================

/// One stream connection: handshake, read loop, close
///
/// Reports through `events` only; on `stop` it sends a normal close frame
/// and returns without reporting.
async fn run_socket(
    conn: u64,
    url: Url,
    events: mpsc::Sender<SocketEvent>,
    stop: CancellationToken,
) {
    let ws = tokio::select! {
        _ = stop.cancelled() => return,
        result = tokio_tungstenite::connect_async(url.as_str()) => match result {
            Ok((ws, _response)) => ws,
            Err(e) => {
                let err = ClientError::from(e);
                tracing::warn!(conn, "Live map handshake failed: {}", err);
                emit(&events, &stop, SocketEvent::Closed {
                    conn,
                    normal: false,
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        },
    };

    let (mut sink, mut stream) = ws.split();
    emit(&events, &stop, SocketEvent::Opened { conn }).await;

    let (normal, reason) = loop {
        tokio::select! {
            _ = stop.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: Utf8Bytes::from_static("client shutdown"),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(conn, "Close frame not sent: {}", e);
                }
                return;
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, &stop, SocketEvent::Message { conn, text: text.as_str().to_owned() }).await;
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => emit(&events, &stop, SocketEvent::Message { conn, text }).await,
                    Err(_) => tracing::warn!(conn, len = data.len(), "Discarding non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let normal = frame.as_ref().is_some_and(|f| f.code == CloseCode::Normal);
                    let reason = match frame {
                        Some(f) => format!("{} {}", u16::from(f.code), f.reason.as_str()),
                        None => "closed without status".to_string(),
                    };
                    break (normal, reason);
                }
                Some(Err(e)) => break (false, ClientError::from(e).to_string()),
                None => break (false, "stream ended".to_string()),
                _ => {} // Pong, raw frames
            },
        }
    };

    emit(&events, &stop, SocketEvent::Closed { conn, normal, reason }).await;
}

/// Queue an event for the driver unless the connection is being stopped
async fn emit(events: &mpsc::Sender<SocketEvent>, stop: &CancellationToken, event: SocketEvent) {
    tokio::select! {
        _ = stop.cancelled() => {}
        result = events.send(event) => {
            if result.is_err() {
                tracing::trace!("Realtime driver gone, event dropped");
            }
        }
    }
}

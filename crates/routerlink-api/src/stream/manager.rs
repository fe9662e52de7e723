// Single-socket subscription manager with a fixed-interval reconnect loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use super::envelope::SubscriptionEnvelope;
use super::state::{ConnectionPhase, ConnectionState, StreamError};
use super::{StreamConfig, StreamEvent};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const CLIENT_CLOSE_REASON: &str = "client disconnect";

// ── SubscriptionManager ──────────────────────────────────────────────

/// Owns one telemetry socket and multiplexes device subscriptions over it.
///
/// Cheap to clone; every clone drives the same socket. The background task
/// is cancelled by [`disconnect`](Self::disconnect) or when the last clone
/// is dropped.
///
/// Subscriptions are **not** replayed after a reconnect. Consumers watch
/// [`StreamEvent::Connected`] (or the state channel) and re-issue them.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
    _lifetime: Arc<DropGuard>,
}

struct Inner {
    config: StreamConfig,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<StreamEvent>,
    /// Present only while a socket is open.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    worker: Mutex<Option<Worker>>,
    /// Bumped by every `connect()`/`disconnect()`. A task only publishes
    /// while its own generation is current.
    generation: AtomicU64,
    root: CancellationToken,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// How a connected socket ended.
enum Closed {
    Requested,
    Lost { code: Option<u16>, reason: String },
    Failed(StreamError),
}

impl SubscriptionManager {
    pub fn new(config: StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let root = CancellationToken::new();
        let lifetime = Arc::new(root.clone().drop_guard());

        Self {
            inner: Arc::new(Inner {
                config,
                state,
                events,
                outbound: Mutex::new(None),
                worker: Mutex::new(None),
                generation: AtomicU64::new(0),
                root,
            }),
            _lifetime: lifetime,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the connection task. Must be called within a Tokio runtime.
    ///
    /// A no-op while a task is already connecting, connected or waiting to
    /// reconnect. After the reconnect limit was hit this starts over with
    /// the attempt counter at zero.
    pub fn connect(&self) {
        let mut worker = self.inner.worker.lock().expect("worker lock poisoned");

        let running = worker.as_ref().is_some_and(|w| !w.handle.is_finished());
        if running && self.inner.state.borrow().phase != ConnectionPhase::Disconnected {
            debug!("connect ignored, telemetry stream already active");
            return;
        }
        if let Some(stale) = worker.take() {
            stale.cancel.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| {
            s.set_phase(ConnectionPhase::Connecting);
            s.reconnect_attempts = 0;
        });

        let cancel = self.inner.root.child_token();
        let handle = tokio::spawn(Arc::clone(&self.inner).run(generation, cancel.clone()));
        *worker = Some(Worker { cancel, handle });
    }

    /// Close the socket with a normal (1000) close frame and stop
    /// reconnecting. Cancels a pending reconnect wait. Idempotent.
    ///
    /// Envelopes already accepted by [`send`](Self::send) are written
    /// before the close frame.
    pub fn disconnect(&self) {
        let worker = self.inner.worker.lock().expect("worker lock poisoned").take();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let had_socket = self
            .inner
            .outbound
            .lock()
            .expect("outbound lock poisoned")
            .take()
            .is_some();

        let Some(worker) = worker else {
            return;
        };
        let was_active = !worker.handle.is_finished();
        worker.cancel.cancel();

        self.inner.state.send_if_modified(|s| {
            if s.phase == ConnectionPhase::Disconnected {
                return false;
            }
            s.set_phase(ConnectionPhase::Disconnected);
            s.reconnect_attempts = 0;
            true
        });

        if was_active {
            info!("telemetry stream disconnected by client");
            // A close code only when a socket was open to carry the frame.
            let _ = self.inner.events.send(StreamEvent::Disconnected {
                code: had_socket.then(|| u16::from(CloseCode::Normal)),
                reason: CLIENT_CLOSE_REASON.into(),
                requested: true,
            });
        }
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Queue an envelope on the open socket. Returns `false` when no socket
    /// is open; the caller re-issues after the next `Connected`.
    pub fn send(&self, envelope: &SubscriptionEnvelope) -> bool {
        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, kind = %envelope.kind, "failed to encode envelope");
                return false;
            }
        };

        let outbound = self.inner.outbound.lock().expect("outbound lock poisoned");
        let Some(tx) = outbound.as_ref() else {
            debug!(kind = %envelope.kind, "telemetry stream not open, envelope dropped");
            return false;
        };
        tx.send(Message::text(json)).is_ok()
    }

    pub fn subscribe(&self, device_id: &str) -> bool {
        self.send(&SubscriptionEnvelope::subscribe(device_id))
    }

    pub fn unsubscribe(&self, device_id: &str) -> bool {
        self.send(&SubscriptionEnvelope::unsubscribe(device_id))
    }

    pub fn ping(&self) -> bool {
        self.send(&SubscriptionEnvelope::ping())
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Snapshot of the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// A new listener. Events sent before this call are not replayed.
    pub fn events(&self) -> broadcast::Receiver<StreamEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("url", &self.inner.config.url.as_str())
            .field("phase", &self.inner.state.borrow().phase)
            .finish_non_exhaustive()
    }
}

// ── Background task ──────────────────────────────────────────────────

impl Inner {
    /// connect → pump → on unexpected close, wait a fixed interval → connect.
    async fn run(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        let mut attempts: u32 = 0;

        loop {
            info!(url = %self.config.url, attempt = attempts, "connecting to telemetry stream");

            let connected = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = tokio_tungstenite::connect_async(self.config.url.as_str()) => result,
            };

            let failure = match connected {
                Ok((ws, _response)) => {
                    attempts = 0;
                    match self.pump(ws, generation, &cancel).await {
                        Closed::Requested => break,
                        Closed::Lost { code, reason } => {
                            warn!(?code, %reason, "telemetry stream closed unexpectedly");
                            self.emit(
                                generation,
                                StreamEvent::Disconnected {
                                    code,
                                    reason: reason.clone(),
                                    requested: false,
                                },
                            );
                            StreamError::ConnectionLost { code, reason }
                        }
                        Closed::Failed(err) => {
                            warn!(error = %err, "telemetry stream failed");
                            self.emit(generation, StreamEvent::Error(err.clone()));
                            self.emit(
                                generation,
                                StreamEvent::Disconnected {
                                    code: None,
                                    reason: err.to_string(),
                                    requested: false,
                                },
                            );
                            err
                        }
                    }
                }
                Err(e) => {
                    let err = StreamError::from_ws(&e);
                    warn!(error = %err, attempt = attempts, "telemetry stream connection failed");
                    self.emit(generation, StreamEvent::Error(err.clone()));
                    err
                }
            };
            self.clear_outbound(generation);

            if matches!(failure, StreamError::InvalidUrl(_)) {
                self.publish(generation, |s| {
                    s.set_phase(ConnectionPhase::Disconnected);
                    s.last_error = Some(failure);
                });
                break;
            }

            if attempts >= self.config.max_reconnect_attempts {
                error!(
                    max_attempts = self.config.max_reconnect_attempts,
                    "telemetry stream reconnection limit reached, giving up"
                );
                let limit = StreamError::ReconnectLimitReached { attempts };
                self.publish(generation, |s| {
                    s.set_phase(ConnectionPhase::Disconnected);
                    s.last_error = Some(limit.clone());
                });
                self.emit(generation, StreamEvent::Error(limit));
                break;
            }

            attempts += 1;
            self.publish(generation, |s| {
                s.set_phase(ConnectionPhase::Reconnecting);
                s.reconnect_attempts = attempts;
                s.last_error = Some(failure);
            });

            let delay = self.config.reconnect_interval;
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = attempts,
                "waiting before reconnect"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            self.publish(generation, |s| s.set_phase(ConnectionPhase::Connecting));
        }

        debug!(generation, "telemetry stream task exiting");
    }

    /// Drive one open socket until it closes.
    async fn pump(&self, ws: WsStream, generation: u64, cancel: &CancellationToken) -> Closed {
        let (mut write, mut read) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel();

        if !self.install_outbound(generation, tx) {
            return Closed::Requested;
        }
        self.publish(generation, |s| {
            s.set_phase(ConnectionPhase::Connected);
            s.reconnect_attempts = 0;
            s.last_error = None;
            s.connections += 1;
        });
        self.emit(generation, StreamEvent::Connected);
        info!(url = %self.config.url, "telemetry stream connected");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    while let Ok(message) = rx.try_recv() {
                        if let Err(e) = write.send(message).await {
                            debug!(error = %e, "queued envelope not delivered");
                            return Closed::Requested;
                        }
                    }
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: CLIENT_CLOSE_REASON.into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    return Closed::Requested;
                }
                Some(message) = rx.recv() => {
                    if let Err(e) = write.send(message).await {
                        return Closed::Failed(StreamError::from_ws(&e));
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(generation, text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |cf| {
                            (Some(u16::from(cf.code)), cf.reason.to_string())
                        });
                        return Closed::Lost { code, reason };
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary: tungstenite answers pings itself.
                    }
                    Some(Err(e)) => return Closed::Failed(StreamError::from_ws(&e)),
                    None => {
                        return Closed::Lost {
                            code: None,
                            reason: "stream ended".into(),
                        };
                    }
                },
            }
        }
    }

    /// Inbound frames are handled one at a time, in arrival order.
    fn dispatch(&self, generation: u64, text: &str) {
        trace!(len = text.len(), "telemetry frame");

        let envelope = match SubscriptionEnvelope::from_json(text) {
            Ok(envelope) => Arc::new(envelope),
            Err(e) => {
                warn!(error = %e, "discarding malformed telemetry frame");
                return;
            }
        };

        self.publish(generation, |s| s.last_message = Some(Arc::clone(&envelope)));
        self.emit(generation, StreamEvent::Message(envelope));
    }

    // ── Generation-gated publishing ──────────────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, generation: u64, update: impl FnOnce(&mut ConnectionState)) {
        // Checked under the watch lock so a concurrent disconnect() wins.
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            update(state);
            true
        });
    }

    fn emit(&self, generation: u64, event: StreamEvent) {
        if self.is_current(generation) {
            // No listeners is fine.
            let _ = self.events.send(event);
        }
    }

    fn install_outbound(&self, generation: u64, tx: mpsc::UnboundedSender<Message>) -> bool {
        let mut outbound = self.outbound.lock().expect("outbound lock poisoned");
        if !self.is_current(generation) {
            return false;
        }
        *outbound = Some(tx);
        true
    }

    fn clear_outbound(&self, generation: u64) {
        let mut outbound = self.outbound.lock().expect("outbound lock poisoned");
        if self.is_current(generation) {
            *outbound = None;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

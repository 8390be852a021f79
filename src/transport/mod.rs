//! The single shared duplex channel that carries every session's traffic.
//!
//! [`Transport`] is a cheap-to-clone handle. One handshake establishes a
//! connection generation; subscriptions belong to the generation they were
//! made in and are invalidated when it ends. Nothing is re-subscribed
//! automatically after a reconnect.

mod link;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use termweave_config::Config;
use termweave_protocol::{Frame, destinations};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::TransportError;
use link::Link;

/// Receives channel failures: handshake errors, server ERROR frames, and
/// unexpected closes.
pub type ErrorCallback = Arc<dyn Fn(TransportError) + Send + Sync>;

/// Receives the body of every MESSAGE addressed to a subscription.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Where and how to open the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub server_addr: String,
    pub base_path: String,
    pub handshake_timeout: Duration,
}

impl From<&Config> for TransportSettings {
    fn from(config: &Config) -> Self {
        Self {
            server_addr: config.server_addr.clone(),
            base_path: config.base_path.clone(),
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

/// Token returned by [`Transport::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
    generation: u64,
    destination: String,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

struct SubscriptionEntry {
    destination: String,
    generation: u64,
    handler: MessageHandler,
}

struct Inner {
    settings: TransportSettings,
    connected: AtomicBool,
    /// Incremented on every successful handshake and on close.
    generation: AtomicU64,
    next_subscription_id: AtomicU64,
    subscriptions: Mutex<HashMap<u64, SubscriptionEntry>>,
    link: Mutex<Option<Link>>,
}

impl Inner {
    fn send(&self, frame: Frame) -> bool {
        let link = self.link.lock();
        match link.as_ref() {
            Some(link) => link.outbound.send(frame).is_ok(),
            None => false,
        }
    }

    /// Deliver an inbound frame from connection `generation`.
    fn route(&self, frame: Frame, generation: u64, on_error: &ErrorCallback) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        match frame {
            Frame::Message {
                destination,
                subscription,
                body,
            } => {
                // Handlers run outside the lock so they may subscribe or publish.
                let handlers: Vec<MessageHandler> = {
                    let subs = self.subscriptions.lock();
                    match subscription {
                        Some(id) => subs
                            .get(&id)
                            .filter(|entry| entry.generation == generation)
                            .map(|entry| Arc::clone(&entry.handler))
                            .into_iter()
                            .collect(),
                        None => subs
                            .values()
                            .filter(|entry| {
                                entry.generation == generation && entry.destination == destination
                            })
                            .map(|entry| Arc::clone(&entry.handler))
                            .collect(),
                    }
                };
                if handlers.is_empty() {
                    log::debug!("No subscriber for message on {destination}");
                }
                for handler in handlers {
                    handler(&body);
                }
            }
            Frame::Error { message } => {
                log::error!("Channel error from server: {message}");
                on_error(TransportError::Remote(message));
            }
            other => {
                log::debug!("Ignoring unexpected frame from server: {other:?}");
            }
        }
    }

    /// The reader for `generation` hit EOF or an I/O error.
    fn lost(&self, generation: u64, on_error: &ErrorCallback) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.subscriptions.lock().clear();
        // Dropping the link detaches the reader (this task) and stops the writer.
        self.link.lock().take();
        log::warn!("Channel connection lost");
        on_error(TransportError::ConnectionLost);
    }
}

/// Read frames until the server accepts or rejects the handshake.
async fn await_connected<R>(lines: &mut Lines<BufReader<R>>) -> Result<String, TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(line) = lines.next_line().await? else {
            return Err(TransportError::ConnectionLost);
        };
        if line.trim().is_empty() {
            continue;
        }
        match Frame::from_line(&line) {
            Ok(Frame::Connected { version }) => return Ok(version),
            Ok(Frame::Error { message }) => return Err(TransportError::Rejected(message)),
            Ok(other) => return Err(TransportError::UnexpectedFrame(format!("{other:?}"))),
            Err(e) => log::warn!("Discarding malformed handshake frame: {e}"),
        }
    }
}

/// Handle to the shared channel.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("server_addr", &self.inner.settings.server_addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Transport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                next_subscription_id: AtomicU64::new(1),
                subscriptions: Mutex::new(HashMap::new()),
                link: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.inner.settings
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Dial the configured endpoint and perform the handshake.
    ///
    /// A failure is reported once through `on_error` and also returned.
    /// Calling this while already connected is a no-op.
    pub async fn connect<F>(&self, on_error: F) -> Result<(), TransportError>
    where
        F: Fn(TransportError) + Send + Sync + 'static,
    {
        if self.is_connected() {
            return Ok(());
        }
        let on_error: ErrorCallback = Arc::new(on_error);
        let addr = self.inner.settings.server_addr.clone();
        let timeout = self.inner.settings.handshake_timeout;

        log::info!("Connecting to terminal channel at {addr}");
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let err = TransportError::Unreachable {
                    addr,
                    reason: e.to_string(),
                };
                log::error!("{err}");
                on_error(err.clone());
                return Err(err);
            }
            Err(_) => {
                let err = TransportError::HandshakeTimeout(timeout.as_secs());
                log::error!("{err}");
                on_error(err.clone());
                return Err(err);
            }
        };
        let _ = stream.set_nodelay(true);
        self.establish(stream, on_error).await
    }

    /// Perform the handshake over an already-open stream.
    pub async fn connect_stream<S, F>(&self, stream: S, on_error: F) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
        F: Fn(TransportError) + Send + Sync + 'static,
    {
        if self.is_connected() {
            return Ok(());
        }
        self.establish(stream, Arc::new(on_error)).await
    }

    async fn establish<S>(&self, stream: S, on_error: ErrorCallback) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        match self.handshake(stream, Arc::clone(&on_error)).await {
            Ok(version) => {
                log::info!("Terminal channel connected (protocol {version})");
                Ok(())
            }
            Err(err) => {
                log::error!("Terminal channel handshake failed: {err}");
                on_error(err.clone());
                Err(err)
            }
        }
    }

    async fn handshake<S>(&self, stream: S, on_error: ErrorCallback) -> Result<String, TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let settings = &self.inner.settings;
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut lines = BufReader::new(read_half).lines();

        let hello = Frame::connect(settings.base_path.as_str())
            .to_line()
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        write_half.write_all(hello.as_bytes()).await?;
        write_half.flush().await?;

        let version = tokio::time::timeout(settings.handshake_timeout, await_connected(&mut lines))
            .await
            .map_err(|_| TransportError::HandshakeTimeout(settings.handshake_timeout.as_secs()))??;

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        link::spawn_writer(write_half, outbound_rx);

        // Hold the slot so a reader that fails immediately observes the stored link.
        let mut slot = self.inner.link.lock();
        self.inner.connected.store(true, Ordering::SeqCst);
        let reader = link::spawn_reader(lines, Arc::downgrade(&self.inner), generation, on_error);
        *slot = Some(Link { outbound, reader });
        Ok(version)
    }

    /// Register `handler` for messages on `destination`.
    ///
    /// Returns `None` without side effects when the channel is not connected.
    pub fn subscribe<F>(&self, destination: impl Into<String>, handler: F) -> Option<Subscription>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let destination = destination.into();
        if !self.is_connected() {
            log::debug!("Not connected; subscription to {destination} skipped");
            return None;
        }

        let id = self
            .inner
            .next_subscription_id
            .fetch_add(1, Ordering::SeqCst);
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.subscriptions.lock().insert(
            id,
            SubscriptionEntry {
                destination: destination.clone(),
                generation,
                handler: Arc::new(handler),
            },
        );
        self.inner.send(Frame::Subscribe {
            id,
            destination: destination.clone(),
        });
        crate::debug_log!("TRANSPORT", "subscribed #{} to {}", id, destination);

        Some(Subscription {
            id,
            generation,
            destination,
        })
    }

    /// Drop a subscription. Tokens from an earlier generation are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        let removed = {
            let mut subs = self.inner.subscriptions.lock();
            match subs.get(&subscription.id) {
                Some(entry) if entry.generation == subscription.generation => {
                    subs.remove(&subscription.id);
                    true
                }
                _ => false,
            }
        };
        if removed && self.is_connected() {
            self.inner.send(Frame::Unsubscribe {
                id: subscription.id,
            });
            crate::debug_log!(
                "TRANSPORT",
                "unsubscribed #{} from {}",
                subscription.id,
                subscription.destination
            );
        }
    }

    /// Fire-and-forget publish; silently dropped when not connected.
    pub fn publish(&self, destination: &str, body: impl Into<String>) {
        if !self.is_connected() {
            log::debug!("Not connected; dropping publish to {destination}");
            return;
        }
        if !self.inner.send(Frame::send(destination, body)) {
            log::debug!("Channel writer gone; dropping publish to {destination}");
        }
    }

    /// Publish `payload` encoded as JSON.
    pub fn publish_json<T: Serialize>(
        &self,
        destination: &str,
        payload: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_string(payload)?;
        self.publish(destination, body);
        Ok(())
    }

    /// Tear the channel down and invalidate every subscription.
    pub fn close(&self) {
        let was_connected = self.inner.connected.swap(false, Ordering::SeqCst);
        if let Some(link) = self.inner.link.lock().take() {
            if was_connected {
                let _ = link.outbound.send(Frame::Disconnect);
            }
            // The writer drains the queue, including DISCONNECT, then shuts down.
            drop(link.outbound);
            link.reader.abort();
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.subscriptions.lock().clear();
        if was_connected {
            log::info!("Terminal channel closed");
        }
    }

    /// Number of live subscriptions in the current generation.
    pub fn subscription_count(&self) -> usize {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner
            .subscriptions
            .lock()
            .values()
            .filter(|entry| entry.generation == generation)
            .count()
    }
}

/// Outbound side of the heartbeat: something that can deliver a ping.
pub trait PingSink: Send + Sync + 'static {
    fn send_ping(&self, remote_session_id: &str);
}

impl PingSink for Transport {
    fn send_ping(&self, remote_session_id: &str) {
        self.publish(destinations::PING, remote_session_id);
    }
}

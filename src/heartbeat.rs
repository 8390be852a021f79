//! Per-session ping/pong liveness monitoring.
//!
//! Each monitored session runs a small state machine in its own task:
//! every `interval` it sends a ping and arms a single-shot deadline
//! `timeout` later. A pong clears the deadline; an expired deadline fires the
//! timeout callback once and disarms. The repeating cycle keeps running until
//! the session is stopped. Starting a session that is already monitored
//! cancels the previous cycle first.
//!
//! Every `start` gets a new generation number, which is handed to the timeout
//! callback. A timeout delivered after its cycle was stopped or restarted can
//! be recognized with [`HeartbeatMonitor::is_current`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use termweave_config::Config;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::session::SessionId;
use crate::transport::PingSink;

/// Liveness-lost signal for one session, carrying the cycle's generation.
pub type TimeoutCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Monitoring state for one session. Exists only between `start` and `stop`.
struct PingState {
    task: JoinHandle<()>,
    pong_tx: mpsc::UnboundedSender<()>,
    last_pong: Option<Instant>,
    generation: u64,
}

pub struct HeartbeatMonitor {
    sink: Arc<dyn PingSink>,
    interval: Duration,
    timeout: Duration,
    states: HashMap<SessionId, PingState>,
    next_generation: u64,
}

impl HeartbeatMonitor {
    pub fn new(sink: Arc<dyn PingSink>, interval: Duration, timeout: Duration) -> Self {
        Self {
            sink,
            interval,
            timeout,
            states: HashMap::new(),
            next_generation: 1,
        }
    }

    pub fn from_config(sink: Arc<dyn PingSink>, config: &Config) -> Self {
        Self::new(sink, config.heartbeat_interval(), config.heartbeat_timeout())
    }

    /// Begin monitoring `id`, pinging on behalf of `remote_session_id`.
    ///
    /// Any existing cycle for `id` is cancelled first. Returns the new
    /// cycle's generation, which `on_timeout` also receives.
    pub fn start<F>(
        &mut self,
        id: SessionId,
        remote_session_id: impl Into<String>,
        on_timeout: F,
    ) -> u64
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.stop(&id);
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let (pong_tx, pong_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_cycle(
            Arc::clone(&self.sink),
            remote_session_id.into(),
            self.interval,
            self.timeout,
            pong_rx,
            generation,
            Arc::new(on_timeout),
        ));
        self.states.insert(
            id,
            PingState {
                task,
                pong_tx,
                last_pong: None,
                generation,
            },
        );
        crate::debug_info!(
            "HEARTBEAT",
            "monitoring session {} (generation {})",
            id,
            generation
        );
        generation
    }

    /// Record a pong for `id` and cancel whatever deadline is pending.
    ///
    /// Late or duplicate pongs are accepted and still refresh the timestamp.
    pub fn handle_pong(&mut self, id: &SessionId) {
        let Some(state) = self.states.get_mut(id) else {
            log::debug!("Pong for unmonitored session {id} ignored");
            return;
        };
        state.last_pong = Some(Instant::now());
        let _ = state.pong_tx.send(());
    }

    /// Cancel the cycle for `id`; safe when not monitored.
    pub fn stop(&mut self, id: &SessionId) {
        if let Some(state) = self.states.remove(id) {
            state.task.abort();
            crate::debug_info!("HEARTBEAT", "stopped monitoring session {}", id);
        }
    }

    pub fn stop_all(&mut self) {
        for (_, state) in self.states.drain() {
            state.task.abort();
        }
    }

    pub fn is_monitoring(&self, id: &SessionId) -> bool {
        self.states.contains_key(id)
    }

    /// Generation of the running cycle for `id`.
    pub fn generation(&self, id: &SessionId) -> Option<u64> {
        self.states.get(id).map(|state| state.generation)
    }

    /// Whether `generation` is the cycle currently monitoring `id`.
    pub fn is_current(&self, id: &SessionId, generation: u64) -> bool {
        self.generation(id) == Some(generation)
    }

    pub fn last_pong(&self, id: &SessionId) -> Option<Instant> {
        self.states.get(id).and_then(|state| state.last_pong)
    }

    pub fn monitored_count(&self) -> usize {
        self.states.len()
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_cycle(
    sink: Arc<dyn PingSink>,
    remote_session_id: String,
    interval: Duration,
    timeout: Duration,
    mut pongs: mpsc::UnboundedReceiver<()>,
    generation: u64,
    on_timeout: TimeoutCallback,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sink.send_ping(&remote_session_id);
                deadline = Some(Instant::now() + timeout);
            }
            () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                log::warn!("Heartbeat timeout for remote session {remote_session_id}");
                on_timeout(generation);
            }
            pong = pongs.recv() => match pong {
                Some(()) => deadline = None,
                None => return,
            },
        }
    }
}

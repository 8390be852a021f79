//! Socket-side tasks of an established channel.
//!
//! The writer drains an unbounded queue of frames so publishers never await;
//! the reader parses newline-delimited frames and hands them to the transport
//! for routing.

use std::sync::Weak;

use termweave_protocol::Frame;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ErrorCallback, Inner};

/// Handles to the running tasks of one connection generation.
pub(super) struct Link {
    /// Outbound queue; dropping it lets the writer flush and shut the socket down.
    pub outbound: mpsc::UnboundedSender<Frame>,
    pub reader: JoinHandle<()>,
}

/// Spawn the writer task.
///
/// Exits when every sender is dropped or a write fails.
pub(super) fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
) -> JoinHandle<()>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let line = match frame.to_line() {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Failed to encode outbound frame: {e}");
                    continue;
                }
            };
            crate::debug_trace!("TRANSPORT", "-> {}", line.trim_end());
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                log::error!("Channel write failed: {e}");
                return;
            }
            if let Err(e) = writer.flush().await {
                log::error!("Channel flush failed: {e}");
                return;
            }
        }
        let _ = writer.shutdown().await;
        log::debug!("Channel writer stopped");
    })
}

/// Spawn the reader task for connection `generation`.
///
/// Holds only a weak reference so a dropped transport ends the task.
pub(super) fn spawn_reader<R>(
    mut lines: Lines<BufReader<R>>,
    inner: Weak<Inner>,
    generation: u64,
    on_error: ErrorCallback,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::info!("Channel closed by server");
                    break;
                }
                Err(e) => {
                    log::error!("Channel read failed: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let frame = match Frame::from_line(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Discarding malformed frame: {e}");
                    continue;
                }
            };
            crate::debug_trace!("TRANSPORT", "<- {}", line.trim_end());

            let Some(inner) = inner.upgrade() else {
                return;
            };
            inner.route(frame, generation, &on_error);
        }

        if let Some(inner) = inner.upgrade() {
            inner.lost(generation, &on_error);
        }
    })
}

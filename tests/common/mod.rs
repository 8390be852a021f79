//! Shared integration test helpers for termweave.
//!
//! The centrepiece is [`FakeServer`], an in-process peer that speaks the
//! newline-delimited frame protocol over a `tokio::io::duplex` pipe, so the
//! real transport can be exercised without sockets.
//!
//! Note: Rust integration tests use `mod common;` (not `use`) to bring in
//! helpers from `tests/common/mod.rs`. The `#![allow(dead_code)]` attribute
//! suppresses warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use std::time::Duration;

use tempfile::TempDir;
use termweave::persistence::PersistenceGateway;
use termweave::transport::TransportSettings;
use termweave::workspace::{Workspace, WorkspaceEvent};
use termweave_config::{AuthType, Config, ProfileForm, ProfileId, ProfileStore};
use termweave_protocol::Frame;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::sync::mpsc;

/// How long a test waits for something that should happen promptly.
pub const WAIT: Duration = Duration::from_secs(5);

/// Server end of an in-memory channel.
pub struct FakeServer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

/// A connected (client stream, server) pair.
pub fn duplex_pair() -> (DuplexStream, FakeServer) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (read_half, writer) = tokio::io::split(server);
    (
        client,
        FakeServer {
            lines: BufReader::new(read_half).lines(),
            writer,
        },
    )
}

impl FakeServer {
    /// Next frame from the client; panics on EOF or after [`WAIT`].
    pub async fn recv(&mut self) -> Frame {
        let line = tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a client frame")
            .expect("read failed")
            .expect("client closed the channel");
        Frame::from_line(&line).expect("client sent a malformed frame")
    }

    /// Next frame from the client, or `None` on EOF.
    pub async fn try_recv(&mut self) -> Option<Frame> {
        let line = tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a client frame")
            .ok()??;
        Frame::from_line(&line).ok()
    }

    /// Skip frames until one matches `pred`.
    pub async fn recv_matching(&mut self, pred: impl Fn(&Frame) -> bool) -> Frame {
        loop {
            let frame = self.recv().await;
            if pred(&frame) {
                return frame;
            }
        }
    }

    pub async fn send(&mut self, frame: &Frame) {
        let line = frame.to_line().expect("encode frame");
        self.send_raw(&line).await;
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write to client");
        self.writer.flush().await.expect("flush to client");
    }

    /// Complete the handshake; returns the path the client asked for.
    pub async fn accept(&mut self) -> String {
        match self.recv().await {
            Frame::Connect { path, .. } => {
                self.send(&Frame::Connected {
                    version: termweave_protocol::PROTOCOL_VERSION.to_string(),
                })
                .await;
                path
            }
            other => panic!("expected CONNECT, got {other:?}"),
        }
    }

    /// Answer the handshake with an ERROR frame.
    pub async fn reject(&mut self, message: &str) {
        match self.recv().await {
            Frame::Connect { .. } => {
                self.send(&Frame::Error {
                    message: message.to_string(),
                })
                .await
            }
            other => panic!("expected CONNECT, got {other:?}"),
        }
    }

    /// Next SUBSCRIBE frame, as (id, destination).
    pub async fn expect_subscribe(&mut self) -> (u64, String) {
        match self.recv().await {
            Frame::Subscribe { id, destination } => (id, destination),
            other => panic!("expected SUBSCRIBE, got {other:?}"),
        }
    }

    /// Next SEND frame, as (destination, body).
    pub async fn expect_send(&mut self) -> (String, String) {
        match self.recv().await {
            Frame::Send { destination, body } => (destination, body),
            other => panic!("expected SEND, got {other:?}"),
        }
    }

    /// Next SEND frame to `destination`, skipping anything else.
    pub async fn expect_send_to(&mut self, destination: &str) -> String {
        match self
            .recv_matching(|f| matches!(f, Frame::Send { destination: d, .. } if d == destination))
            .await
        {
            Frame::Send { body, .. } => body,
            _ => unreachable!(),
        }
    }

    /// Deliver a MESSAGE on `destination`.
    pub async fn deliver(&mut self, destination: &str, subscription: Option<u64>, body: &str) {
        self.send(&Frame::Message {
            destination: destination.to_string(),
            subscription,
            body: body.to_string(),
        })
        .await;
    }
}

/// Transport settings that never dial anything real.
pub fn test_settings() -> TransportSettings {
    TransportSettings {
        server_addr: "127.0.0.1:9".to_string(),
        base_path: "/ws/terminal".to_string(),
        handshake_timeout: Duration::from_secs(1),
    }
}

/// An error callback that forwards into a channel.
pub fn error_channel<T: Send + 'static>() -> (
    impl Fn(T) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<T>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |value| {
            let _ = tx.send(value);
        },
        rx,
    )
}

/// Await the next value on `rx` or panic after [`WAIT`].
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting on channel")
        .expect("channel closed")
}

/// A profile form with password credentials.
pub fn password_form(name: &str) -> ProfileForm {
    ProfileForm {
        name: name.to_string(),
        host: format!("{name}.internal"),
        port: 22,
        username: "deploy".to_string(),
        auth_type: AuthType::Password,
        password: "hunter2".to_string(),
        private_key: String::new(),
    }
}

/// Config whose state and profile files live inside `dir`.
pub fn config_in(dir: &TempDir) -> Config {
    Config {
        state_file: Some(dir.path().join("state.json")),
        profiles_file: Some(dir.path().join("connections.yaml")),
        ..Config::default()
    }
}

/// A workspace with one password profile, backed by a temp dir.
///
/// The `TempDir` must be kept alive for the duration of the test.
pub fn workspace_fixture() -> (Workspace, ProfileId, TempDir) {
    workspace_fixture_with(|_| {})
}

/// [`workspace_fixture`] with a config tweak applied first.
pub fn workspace_fixture_with(edit: impl FnOnce(&mut Config)) -> (Workspace, ProfileId, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = config_in(&dir);
    edit(&mut config);
    let mut profiles = ProfileStore::new();
    let profile = profiles.add(password_form("web")).id;
    profiles
        .save_to(&config.profiles_file_path())
        .expect("save profiles");
    let gateway = PersistenceGateway::from_config(&config);
    (Workspace::new(config, profiles, gateway), profile, dir)
}

/// Reopen a workspace over the same temp dir, loading profiles from disk.
pub fn reopen_workspace(dir: &TempDir) -> Workspace {
    let config = config_in(dir);
    let profiles = ProfileStore::load_from(&config.profiles_file_path()).expect("load profiles");
    let gateway = PersistenceGateway::from_config(&config);
    Workspace::new(config, profiles, gateway)
}

/// Next workspace event, or panic after [`WAIT`].
pub async fn next_event(workspace: &mut Workspace) -> WorkspaceEvent {
    tokio::time::timeout(WAIT, workspace.next_event())
        .await
        .expect("timed out waiting for a workspace event")
        .expect("event channel closed")
}

/// Connect `workspace` to a fresh fake server.
pub async fn connect_workspace(workspace: &mut Workspace) -> FakeServer {
    let (client, mut server) = duplex_pair();
    let (result, _) = tokio::join!(workspace.connect_transport_over(client), server.accept());
    result.expect("workspace handshake");
    server
}

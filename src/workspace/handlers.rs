//! Reactions to asynchronous events.
//!
//! Events addressed to a session that has already been removed are dropped:
//! unsubscription and in-flight delivery are not atomic.

use termweave_protocol::{DirectoryListResponse, Envelope};

use super::{Notice, Workspace, WorkspaceEvent};
use crate::error::TransportError;
use crate::session::{ConnectionStatus, SessionId};

impl Workspace {
    /// Apply one event to the workspace state.
    pub fn handle_event(&mut self, event: WorkspaceEvent) {
        if let Some(id) = event.session_id()
            && !self.registry.contains(&id)
        {
            log::debug!("Dropping event for removed session {id}");
            return;
        }

        match event {
            WorkspaceEvent::Envelope {
                session_id,
                envelope,
            } => self.on_envelope(session_id, envelope),
            WorkspaceEvent::Directory {
                session_id,
                response,
            } => self.on_directory(session_id, response),
            WorkspaceEvent::WorkingDirectory { session_id, path } => {
                let path = path.trim();
                if !path.is_empty() && self.registry.set_current_path(&session_id, path) {
                    self.persist();
                }
            }
            WorkspaceEvent::HeartbeatTimeout {
                session_id,
                generation,
            } => {
                // Queued before the cycle was stopped or restarted.
                if !self.heartbeat.is_current(&session_id, generation) {
                    log::debug!(
                        "Dropping stale heartbeat timeout for {session_id} (generation {generation})"
                    );
                    return;
                }
                log::warn!("Session {session_id} missed its heartbeat");
                self.set_status(&session_id, ConnectionStatus::Error);
                self.notify(Notice::LivenessLost { session_id });
                self.persist();
            }
            WorkspaceEvent::TransportFault(err) => self.on_transport_fault(err),
        }
    }

    fn on_envelope(&mut self, id: SessionId, envelope: Envelope) {
        crate::debug_trace!("WORKSPACE", "{} envelope for {}", envelope.kind(), id);
        let code = envelope.error_code();
        let unhealthy = envelope.reports_unhealthy();

        match envelope {
            Envelope::Connected { message, .. } => {
                self.set_status(&id, ConnectionStatus::Connected);
                if let Some(session) = self.registry.get(&id) {
                    let remote = session.remote_session_id.clone();
                    let profile = session.connection_id;
                    let tx = self.event_tx.clone();
                    self.heartbeat.start(id, remote, move |generation| {
                        let _ = tx.send(WorkspaceEvent::HeartbeatTimeout {
                            session_id: id,
                            generation,
                        });
                    });
                    if self.profiles.touch_last_connected(&profile) {
                        self.save_profiles();
                    }
                }
                if let Some(text) = message {
                    self.notify(Notice::Message {
                        session_id: id,
                        text,
                    });
                }
                self.request_working_directory(&id);
                self.persist();
            }
            Envelope::Output { data, .. } => {
                if let Some(data) = data {
                    self.notify(Notice::Output {
                        session_id: id,
                        data,
                    });
                }
            }
            Envelope::Status {
                status, message, ..
            } => {
                log::info!(
                    "Session {id} status: {}",
                    status.as_deref().unwrap_or("unknown")
                );
                if let Some(text) = message {
                    self.notify(Notice::Message {
                        session_id: id,
                        text,
                    });
                }
            }
            Envelope::Error { message, .. } => {
                let message = message
                    .or_else(|| code.as_ref().map(|c| c.description().to_string()))
                    .unwrap_or_else(|| "Unknown error".to_string());
                log::error!("Session {id} failed: {message}");
                self.heartbeat.stop(&id);
                self.set_status(&id, ConnectionStatus::Error);
                self.notify(Notice::SessionError {
                    session_id: id,
                    code,
                    message,
                });
                self.persist();
            }
            Envelope::Disconnected { message, .. } => {
                self.heartbeat.stop(&id);
                self.set_status(&id, ConnectionStatus::Disconnected);
                if let Some(text) = message {
                    self.notify(Notice::Message {
                        session_id: id,
                        text,
                    });
                }
                self.persist();
            }
            Envelope::Resized { cols, rows, .. } => {
                if let (Some(cols), Some(rows)) = (cols, rows) {
                    self.notify(Notice::Resized {
                        session_id: id,
                        cols,
                        rows,
                    });
                }
            }
            Envelope::Ping { .. } => {
                crate::debug_log!("WORKSPACE", "server ping for {}", id);
            }
            Envelope::Pong { .. } => {
                self.heartbeat.handle_pong(&id);
                if unhealthy {
                    self.mark_unhealthy(id);
                }
            }
            Envelope::HealthCheck { message, .. } => {
                if unhealthy {
                    if let Some(text) = message {
                        log::warn!("Session {id} health check: {text}");
                    }
                    self.mark_unhealthy(id);
                }
            }
        }
    }

    fn mark_unhealthy(&mut self, id: SessionId) {
        log::warn!("Session {id} reported unhealthy");
        self.set_status(&id, ConnectionStatus::Error);
        self.persist();
    }

    fn on_directory(&mut self, id: SessionId, response: DirectoryListResponse) {
        self.registry.set_loading_directory(&id, false);
        if response.success {
            let path = response.current_path.unwrap_or_else(|| {
                self.registry
                    .get(&id)
                    .map(|session| session.current_path.clone())
                    .unwrap_or_default()
            });
            self.registry
                .set_directory_data(&id, path.clone(), response.entries);
            self.notify(Notice::DirectoryListed {
                session_id: id,
                path,
            });
        } else {
            let message = response
                .error_message
                .unwrap_or_else(|| "Directory listing failed".to_string());
            log::warn!("Directory listing for {id} failed: {message}");
            self.notify(Notice::SessionError {
                session_id: id,
                code: None,
                message,
            });
        }
        self.persist();
    }

    fn on_transport_fault(&mut self, err: TransportError) {
        self.notify(Notice::Transport(err.clone()));
        if self.transport.is_connected() {
            // A server ERROR frame on a channel that is still open.
            log::warn!("Channel reported an error: {err}");
            return;
        }

        log::warn!("Channel down ({err}); marking live sessions disconnected");
        self.heartbeat.stop_all();
        self.registry.forget_all_subscriptions();
        let live: Vec<SessionId> = self
            .registry
            .iter()
            .filter(|session| session.status.is_live())
            .map(|session| session.id)
            .collect();
        for id in &live {
            self.set_status(id, ConnectionStatus::Disconnected);
        }
        if !live.is_empty() {
            self.persist();
        }
    }
}

//! Subcommand implementations.
//!
//! Each command returns the process exit code; `Err` is reserved for
//! failures the user cannot fix from the command line (unreadable files).

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use termweave_config::{AuthType, Config, ProfileForm, ProfileStore};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Commands;
use crate::pane::{LayoutNode, PaneId, PaneType};
use crate::persistence::PersistenceGateway;
use crate::session::{ConnectionStatus, SessionId, SessionRegistry};
use crate::workspace::{Notice, Workspace};

/// Run `command` (default `status`) against `config`.
pub async fn run(command: Option<Commands>, config: Config) -> Result<i32> {
    match command.unwrap_or(Commands::Status) {
        Commands::Status => status(config),
        Commands::Profiles => list_profiles(&config),
        Commands::AddProfile {
            name,
            host,
            port,
            username,
            password,
            key_file,
        } => {
            let (auth_type, private_key) = match key_file {
                Some(path) => (
                    AuthType::PrivateKey,
                    std::fs::read_to_string(&path).with_context(|| {
                        format!("Failed to read private key {}", path.display())
                    })?,
                ),
                None => (AuthType::Password, String::new()),
            };
            add_profile(
                &config,
                ProfileForm {
                    name,
                    host,
                    port,
                    username,
                    auth_type,
                    password: password.unwrap_or_default(),
                    private_key,
                },
            )
        }
        Commands::RemoveProfile { profile } => remove_profile(&config, &profile),
        Commands::Open {
            profile,
            cols,
            rows,
        } => open(config, &profile, cols, rows).await,
        Commands::Reset => {
            let gateway = PersistenceGateway::from_config(&config);
            gateway.clear();
            println!("Cleared workspace state at {}", gateway.path().display());
            Ok(0)
        }
    }
}

fn load_profiles(config: &Config) -> Result<ProfileStore> {
    let path = config.profiles_file_path();
    ProfileStore::load_from(&path)
        .with_context(|| format!("Failed to load connection profiles from {}", path.display()))
}

fn save_profiles(profiles: &ProfileStore, path: &Path) -> Result<()> {
    profiles
        .save_to(path)
        .with_context(|| format!("Failed to save connection profiles to {}", path.display()))
}

fn status(config: Config) -> Result<i32> {
    let profiles = load_profiles(&config)?;
    let gateway = PersistenceGateway::from_config(&config);
    let endpoint = format!("{}{}", config.server_addr, config.base_path);
    let mut workspace = Workspace::new(config, profiles, gateway);
    let report = workspace.restore();

    let (cols, rows) = workspace.layout().grid();
    println!("Channel: {endpoint}");
    println!("Grid:    {cols}x{rows}");
    if report.dropped_sessions > 0 {
        println!(
            "Dropped: {} session(s) whose profile no longer exists",
            report.dropped_sessions
        );
    }
    if report.layout_reset {
        println!("Layout:  persisted layout was invalid and has been reset");
    }

    let registry = workspace.registry();
    println!();
    println!("Sessions ({}):", registry.len());
    for session in registry.iter() {
        let marker = if registry.active_id() == Some(session.id) {
            '*'
        } else {
            ' '
        };
        let label = workspace
            .profiles()
            .get(&session.connection_id)
            .map(|p| format!("{} ({})", p.name, p.display_label()))
            .unwrap_or_else(|| session.connection_id.to_string());
        println!(
            " {marker} {}  {label}  [{}]  {}",
            session.id, session.status, session.current_path
        );
    }

    println!();
    println!("Layout:");
    print!(
        "{}",
        render_layout(
            &workspace.layout().to_snapshot(),
            workspace.layout().focused(),
            registry
        )
    );
    Ok(0)
}

/// Indented outline of a layout; `>` marks the focused pane.
pub fn render_layout(
    root: &LayoutNode,
    focused: Option<PaneId>,
    registry: &SessionRegistry,
) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let marker = if focused == Some(node.id) { '>' } else { ' ' };
        let indent = "  ".repeat(depth);
        let size = node
            .size
            .map(|s| format!(" {s:.0}%"))
            .unwrap_or_default();
        let _ = match node.pane_type {
            PaneType::Split => writeln!(
                out,
                "{marker} {indent}pane {} split {}{size}",
                node.id,
                node.direction
                    .map(|d| format!("{d:?}").to_lowercase())
                    .unwrap_or_default()
            ),
            PaneType::Terminal => {
                let session = match node.session_id {
                    Some(id) if registry.contains(&id) => id.to_string(),
                    Some(_) => "(closed)".to_string(),
                    None => "(empty)".to_string(),
                };
                writeln!(out, "{marker} {indent}pane {} {session}{size}", node.id)
            }
        };
        if let Some(children) = &node.children {
            for child in children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }
    out
}

fn list_profiles(config: &Config) -> Result<i32> {
    let profiles = load_profiles(config)?;
    if profiles.is_empty() {
        println!("No connection profiles. Add one with `termweave add-profile`.");
        return Ok(0);
    }
    for profile in profiles.iter() {
        let last = profile
            .last_connected_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}  {:<16} {:<32} last connected: {last}",
            profile.id,
            profile.name,
            profile.display_label()
        );
    }
    Ok(0)
}

fn add_profile(config: &Config, form: ProfileForm) -> Result<i32> {
    let path = config.profiles_file_path();
    let mut profiles = load_profiles(config)?;
    let profile = profiles.add(form);
    save_profiles(&profiles, &path)?;
    println!("Added profile {} ({})", profile.name, profile.id);
    Ok(0)
}

fn remove_profile(config: &Config, target: &str) -> Result<i32> {
    let path = config.profiles_file_path();
    let mut profiles = load_profiles(config)?;
    let Some(id) = profiles.resolve(target).map(|p| p.id) else {
        eprintln!("termweave: no connection profile matches '{target}'");
        return Ok(1);
    };
    if let Some(profile) = profiles.remove(&id) {
        save_profiles(&profiles, &path)?;
        println!("Removed profile {} ({})", profile.name, profile.id);
    }
    Ok(0)
}

enum Step {
    Event(Option<crate::workspace::WorkspaceEvent>),
    Input(std::io::Result<Option<String>>),
    Quit,
}

async fn open(config: Config, target: &str, cols: Option<u16>, rows: Option<u16>) -> Result<i32> {
    let profiles = load_profiles(&config)?;
    let Some(profile_id) = profiles.resolve(target).map(|p| p.id) else {
        eprintln!("termweave: no connection profile matches '{target}'");
        return Ok(1);
    };
    let size = (
        cols.unwrap_or(config.default_cols),
        rows.unwrap_or(config.default_rows),
    );
    let gateway = PersistenceGateway::from_config(&config);

    let mut workspace = Workspace::new(config, profiles, gateway);
    workspace.restore();
    workspace.set_terminal_size(size.0, size.1);
    let Some(mut notices) = workspace.take_notices() else {
        anyhow::bail!("Workspace notices already taken");
    };

    if let Err(e) = workspace.connect_transport().await {
        eprintln!("termweave: {e}");
        return Ok(1);
    }
    let id = match workspace.open_session(profile_id, None) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("termweave: {e}");
            workspace.shutdown();
            return Ok(1);
        }
    };

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut exit_code = 0;

    loop {
        let step = tokio::select! {
            event = workspace.next_event() => Step::Event(event),
            line = stdin.next_line() => Step::Input(line),
            _ = &mut ctrl_c => Step::Quit,
        };
        match step {
            Step::Event(Some(event)) => workspace.handle_event(event),
            Step::Event(None) | Step::Quit => break,
            Step::Input(Ok(Some(line))) => {
                workspace.record_command(&id, &line);
                workspace.send_input(&id, format!("{line}\n"));
            }
            Step::Input(Ok(None)) => break,
            Step::Input(Err(e)) => {
                log::error!("Failed to read stdin: {e}");
                break;
            }
        }

        match print_notices(&mut notices, &id) {
            Some(code) => {
                exit_code = code;
                break;
            }
            None if !workspace.is_connected() => {
                exit_code = 1;
                break;
            }
            None => {}
        }
    }

    workspace.shutdown();
    print_notices(&mut notices, &id);
    Ok(exit_code)
}

/// Print pending notices for `id`; returns an exit code once the session ended.
fn print_notices(
    notices: &mut tokio::sync::mpsc::UnboundedReceiver<Notice>,
    id: &SessionId,
) -> Option<i32> {
    let mut stdout = std::io::stdout();
    let mut ended = None;
    while let Ok(notice) = notices.try_recv() {
        match notice {
            Notice::Output { session_id, data } if session_id == *id => {
                let _ = stdout.write_all(data.as_bytes());
            }
            Notice::StatusChanged { session_id, status } if session_id == *id => {
                eprintln!("[termweave] {status}");
                match status {
                    ConnectionStatus::Disconnected => ended = Some(0),
                    ConnectionStatus::Error => ended = Some(1),
                    ConnectionStatus::Connecting | ConnectionStatus::Connected => {}
                }
            }
            Notice::Message { session_id, text } if session_id == *id => {
                eprintln!("[termweave] {text}");
            }
            Notice::SessionError {
                session_id,
                code,
                message,
            } if session_id == *id => match code {
                Some(code) => eprintln!("[termweave] error {code}: {message}"),
                None => eprintln!("[termweave] error: {message}"),
            },
            Notice::LivenessLost { session_id } if session_id == *id => {
                eprintln!("[termweave] session stopped answering heartbeats");
            }
            Notice::Transport(err) => eprintln!("[termweave] {err}"),
            _ => {}
        }
    }
    let _ = stdout.flush();
    ended
}

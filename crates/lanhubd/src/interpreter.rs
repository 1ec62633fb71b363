//! Command interpreter — turns one inbound line into replies.
//!
//! Parses the line, checks the caller's role, then runs a built-in command or
//! a file store operation. Every failure becomes a plain text reply; nothing
//! here can take the connection down except `/exit` and a bad upload payload.

use std::net::SocketAddr;
use std::time::SystemTime;

use chrono::{DateTime, Local};

use lanhub_core::protocol::{self, Command};
use lanhub_services::{FileStore, Role, SessionRegistry, StoreError};

/// Who sent the line being handled.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub addr: SocketAddr,
    pub role: Role,
}

/// Lines to send back to the caller, and whether to hang up afterwards.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Response {
    pub lines: Vec<String>,
    pub disconnect: bool,
}

impl Response {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            disconnect: false,
        }
    }

    fn closing(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            disconnect: true,
        }
    }
}

pub struct Interpreter {
    registry: SessionRegistry,
    store: FileStore,
    server_name: String,
}

impl Interpreter {
    pub fn new(registry: SessionRegistry, store: FileStore, server_name: String) -> Self {
        Self {
            registry,
            store,
            server_name,
        }
    }

    pub async fn handle(&self, caller: &Caller, line: &str) -> Response {
        let command = Command::parse(line);

        if command.requires_admin() && !caller.role.is_admin() {
            tracing::debug!(peer = %caller.addr, ?command, "admin-only command refused");
            return Response::line(protocol::PERMISSION_DENIED);
        }

        match command {
            Command::Help => Response::line(protocol::HELP_TEXT),
            Command::Time => Response::line(format!(
                "Server Time: {}",
                Local::now().format("%H:%M:%S")
            )),
            Command::Date => Response::line(format!(
                "Server Date: {}",
                Local::now().format("%Y-%m-%d")
            )),
            Command::Name => Response::line(format!("Server Name: {}", self.server_name)),
            Command::ListClients => {
                let peers = self.registry.peers().await;
                let mut text = String::from("Connected clients:");
                for peer in peers {
                    text.push_str(&format!("\n- {peer}"));
                }
                Response::line(text)
            }
            Command::Broadcast(Some(message)) => {
                let line = protocol::broadcast_line(caller.addr, &message);
                let delivered = self.registry.broadcast(&caller.addr, &line).await;
                tracing::debug!(peer = %caller.addr, delivered, "broadcast sent");
                Response::line(protocol::BROADCAST_ACK)
            }
            Command::List => match self.store.list() {
                Ok(names) => Response::line(format!("Files on server: {}", join_or_none(&names))),
                Err(e) => {
                    tracing::warn!(error = %e, "listing failed");
                    Response::line(protocol::LIST_ERROR)
                }
            },
            Command::Search(Some(needle)) => match self.store.search(&needle) {
                Ok(names) => Response::line(format!(
                    "Matching files on server: {}",
                    join_or_none(&names)
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "search failed");
                    Response::line(protocol::SEARCH_ERROR)
                }
            },
            Command::Read(Some(name)) => self.with_existing(&name, |store| {
                let data = store.read(&name)?;
                Ok(Response::line(format!(
                    "--- {name} ---\n{}",
                    String::from_utf8_lossy(&data)
                )))
            }),
            Command::Delete(Some(name)) => self.with_existing(&name, |store| {
                store.delete(&name)?;
                tracing::info!(peer = %caller.addr, file = %name, "file deleted");
                Ok(Response::line(format!("File {name} deleted from server.")))
            }),
            Command::Download(Some(name)) => self.with_existing(&name, |store| {
                let data = store.read(&name)?;
                Ok(Response::line(protocol::download_line(&name, &data)))
            }),
            Command::Info(Some(name)) => self.with_existing(&name, |store| {
                let info = store.info(&name)?;
                Ok(Response::line(format!(
                    "File: {name}\nSize: {} bytes\nCreated: {}\nModified: {}",
                    info.size,
                    format_time(info.created),
                    format_time(info.modified)
                )))
            }),
            Command::Upload {
                name: Some(name),
                payload: Some(payload),
            } => self.upload(caller, &name, &payload),
            Command::Exit => Response::closing(protocol::GOODBYE),
            Command::Unknown(_) => Response::line(protocol::UNKNOWN_COMMAND),
            // Everything left is a known command missing its argument.
            other => Response::line(other.usage().unwrap_or(protocol::UNKNOWN_COMMAND)),
        }
    }

    fn upload(&self, caller: &Caller, name: &str, payload: &str) -> Response {
        let data = match protocol::decode_payload(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(peer = %caller.addr, error = %e, "malformed upload payload");
                return Response::closing(protocol::INVALID_PAYLOAD);
            }
        };
        match self.store.write(name, &data) {
            Ok(()) => {
                tracing::info!(peer = %caller.addr, file = %name, bytes = data.len(), "file uploaded");
                Response::line(format!("File uploaded to server: {name}"))
            }
            Err(e) => store_failure(e),
        }
    }

    /// Run `op` only if `name` exists, mapping store errors to replies.
    fn with_existing<F>(&self, name: &str, op: F) -> Response
    where
        F: FnOnce(&FileStore) -> Result<Response, StoreError>,
    {
        let result = match self.store.exists(name) {
            Ok(true) => op(&self.store),
            Ok(false) => Err(StoreError::NotFound(name.to_string())),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(store_failure)
    }
}

fn store_failure(e: StoreError) -> Response {
    match e {
        StoreError::NotFound(_) => Response::line(protocol::FILE_NOT_FOUND),
        StoreError::InvalidName(_) => Response::line(protocol::INVALID_FILENAME),
        StoreError::Io { .. } => {
            tracing::warn!(error = %e, "file store operation failed");
            Response::line(protocol::FILE_ERROR)
        }
    }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

fn format_time(t: Option<SystemTime>) -> String {
    match t {
        Some(t) => DateTime::<Local>::from(t)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "unknown".to_string(),
    }
}

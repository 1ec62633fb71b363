//! Line protocol — command parsing, reply texts, and inline binary transfer.
//!
//! One command per newline-terminated line. Binary payloads travel as a
//! single base64 word so a transfer line never contains an embedded newline:
//!
//!   /upload <file> <base64>          client → server
//!   /download <file>                 client → server
//!   /download <file> <base64>        server → client

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

// ── Reply texts ──────────────────────────────────────────────────────────────

pub const SERVER_FULL: &str = "Server full. Try later.";
pub const PERMISSION_DENIED: &str = "Permission denied. Admin only.";
pub const FILE_NOT_FOUND: &str = "File not found.";
pub const INVALID_FILENAME: &str = "Invalid filename.";
pub const INVALID_PAYLOAD: &str = "Invalid base64 payload.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /help";
pub const IDLE_DISCONNECT: &str = "Disconnected due to inactivity.";
pub const GOODBYE: &str = "Goodbye!";
pub const BROADCAST_ACK: &str = "Message broadcasted.";
pub const LIST_ERROR: &str = "Error reading directory.";
pub const SEARCH_ERROR: &str = "Error reading files.";
pub const FILE_ERROR: &str = "Error accessing file.";

pub const HELP_TEXT: &str = "\
Available commands:
------------------------------------------
/time             Show current server time
/date             Show current server date
/name             Show server name
/listclients      List all connected clients
/broadcast <msg>  Send a message to all clients
/list             List files on server
/read <file>      Read file content
/delete <file>    Delete a file from server (admin only)
/upload <file>    Upload a file to server (admin only)
/download <file>  Download a file from server
/search <text>    Search files on server
/info <file>      Show file info
/exit             Disconnect
/help             Show this message
------------------------------------------";

/// Greeting sent once a connection is admitted.
pub fn welcome(role: impl std::fmt::Display) -> String {
    format!("Connected. Your role: {role}")
}

pub fn broadcast_line(from: impl std::fmt::Display, message: &str) -> String {
    format!("[Broadcast from {from}]: {message}")
}

// ── Commands ─────────────────────────────────────────────────────────────────

/// A parsed inbound line.
///
/// File arguments are `Option` because a missing argument is answered with a
/// usage hint rather than rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Time,
    Date,
    Name,
    ListClients,
    Broadcast(Option<String>),
    List,
    Read(Option<String>),
    Delete(Option<String>),
    /// Binary transfer: the payload is the untouched remainder after the name.
    Upload {
        name: Option<String>,
        payload: Option<String>,
    },
    Download(Option<String>),
    Info(Option<String>),
    Search(Option<String>),
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse one line. The command token is case-insensitive.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((t, r)) => (t, r.trim_start()),
            None => (line, ""),
        };
        let token = token.to_lowercase();

        // Transfer lines are dispatched before word splitting.
        if token == "/upload" {
            let (name, payload) = split_word(rest);
            return Command::Upload {
                name,
                payload: payload.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            };
        }

        let (arg, _trailing) = split_word(rest);
        match token.as_str() {
            "/help" => Command::Help,
            "/time" => Command::Time,
            "/date" => Command::Date,
            "/name" => Command::Name,
            "/listclients" => Command::ListClients,
            "/broadcast" => Command::Broadcast(non_empty(rest)),
            "/list" => Command::List,
            "/read" => Command::Read(arg),
            "/delete" => Command::Delete(arg),
            "/download" => Command::Download(arg),
            "/info" => Command::Info(arg),
            "/search" => Command::Search(arg),
            "/exit" => Command::Exit,
            _ => Command::Unknown(token),
        }
    }

    /// Commands restricted to the admin role.
    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::Delete(_) | Command::Upload { .. })
    }

    /// Usage hint returned when a required argument is missing.
    pub fn usage(&self) -> Option<&'static str> {
        Some(match self {
            Command::Broadcast(_) => "Usage: /broadcast <message>",
            Command::Read(_) => "Usage: /read <filename>",
            Command::Delete(_) => "Usage: /delete <filename>",
            Command::Upload { .. } => "Usage: /upload <filename> <base64-data>",
            Command::Download(_) => "Usage: /download <filename>",
            Command::Info(_) => "Usage: /info <filename>",
            Command::Search(_) => "Usage: /search <keyword>",
            _ => return None,
        })
    }
}

/// Split off the first whitespace-delimited word, returning it and the rest.
fn split_word(s: &str) -> (Option<String>, Option<String>) {
    let s = s.trim_start();
    if s.is_empty() {
        return (None, None);
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (Some(word.to_string()), non_empty(rest.trim_start())),
        None => (Some(s.to_string()), None),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

// ── Binary transfer ──────────────────────────────────────────────────────────

pub fn encode_payload(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(payload.trim())
}

/// `/upload <name> <base64>` as sent by a client.
pub fn upload_line(name: &str, data: &[u8]) -> String {
    format!("/upload {name} {}", encode_payload(data))
}

/// `/download <name> <base64>` as sent by the server.
pub fn download_line(name: &str, data: &[u8]) -> String {
    format!("/download {name} {}", encode_payload(data))
}

/// Recognise a server download response and decode its payload.
///
/// An empty file is sent as `/download <name> ` with nothing after the space.
pub fn parse_download_line(line: &str) -> Option<(String, Vec<u8>)> {
    let rest = line.strip_prefix("/download ")?;
    let (name, payload) = match rest.split_once(' ') {
        Some((n, p)) => (n, p),
        None => (rest.trim_end(), ""),
    };
    if name.is_empty() {
        return None;
    }
    let data = decode_payload(payload).ok()?;
    Some((name.to_string(), data))
}

//! Interactive session against a lanhubd server.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, Lines};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use lanhub_core::protocol;

/// Local directories used for transfers.
#[derive(Debug, Clone)]
pub struct Dirs {
    pub upload: PathBuf,
    pub download: PathBuf,
}

impl Dirs {
    pub fn create(&self) -> Result<()> {
        for dir in [&self.upload, &self.download] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// What the user typed, after local interpretation.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Send `/exit` and stop.
    Quit,
    /// Send the file from the upload directory.
    Upload(String),
    /// Send the line verbatim.
    Raw(String),
    Empty,
}

impl Input {
    pub fn classify(line: &str) -> Self {
        let clean = line.trim();
        if clean.is_empty() {
            return Input::Empty;
        }
        if clean.eq_ignore_ascii_case("exit") {
            return Input::Quit;
        }
        if let Some(rest) = clean.strip_prefix("/upload ") {
            if let Some(name) = rest.split_whitespace().next() {
                return Input::Upload(name.to_string());
            }
        }
        Input::Raw(clean.to_string())
    }
}

/// How a session ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Ended {
    /// The user quit, or stdin closed.
    User,
    /// The server closed the connection.
    Server,
}

/// Only the final path component of a name chosen by someone else.
fn local_name(name: &str) -> Option<&str> {
    Path::new(name).file_name().and_then(|n| n.to_str())
}

fn prompt() {
    print!("Enter command (or message): ");
    let _ = std::io::stdout().flush();
}

/// Run one connection until the user quits or the server hangs up.
pub async fn run_session<R>(
    stream: TcpStream,
    dirs: &Dirs,
    input: &mut Lines<R>,
) -> Result<Ended>
where
    R: AsyncBufRead + Unpin,
{
    let mut server = Framed::new(stream, LinesCodec::new());
    prompt();

    loop {
        tokio::select! {
            line = server.next() => {
                let Some(line) = line else {
                    return Ok(Ended::Server);
                };
                let line = line.context("failed to read from server")?;
                handle_server_line(&line, dirs);
                prompt();
            }

            typed = input.next_line() => {
                let Some(typed) = typed.context("failed to read stdin")? else {
                    server.send("/exit").await?;
                    return Ok(Ended::User);
                };
                match Input::classify(&typed) {
                    Input::Empty => prompt(),
                    Input::Quit => {
                        server.send("/exit").await?;
                        return Ok(Ended::User);
                    }
                    Input::Upload(name) => match read_upload(dirs, &name) {
                        Some(data) => {
                            server.send(protocol::upload_line(&name, &data)).await?;
                            println!("Uploading {name} from {}...", dirs.upload.display());
                        }
                        None => {
                            println!("File not found in {}.", dirs.upload.display());
                            prompt();
                        }
                    },
                    Input::Raw(text) => server.send(text).await?,
                }
            }
        }
    }
}

fn read_upload(dirs: &Dirs, name: &str) -> Option<Vec<u8>> {
    let name = local_name(name)?;
    std::fs::read(dirs.upload.join(name)).ok()
}

/// Print a server line, or save it if it is a download response.
fn handle_server_line(line: &str, dirs: &Dirs) {
    if let Some((name, data)) = protocol::parse_download_line(line) {
        let Some(name) = local_name(&name) else {
            println!("\nIgnoring download with unusable name: {name}");
            return;
        };
        let path = dirs.download.join(name);
        match std::fs::write(&path, &data) {
            Ok(()) => println!("\nFile downloaded: {name} -> saved in {}", dirs.download.display()),
            Err(e) => println!("\nFailed to save {}: {e}", path.display()),
        }
    } else {
        println!("\n{line}");
    }
}

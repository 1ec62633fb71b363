//! lanhub-ctl — interactive client for the LanHub daemon.

mod repl;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use repl::{Dirs, Ended};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

fn print_usage() {
    println!("Usage: lanhub-ctl [options]");
    println!();
    println!("Options:");
    println!("  --host <host>          Server host (default: {})", DEFAULT_HOST);
    println!("  --port <port>          Server port (default: {})", DEFAULT_PORT);
    println!("  --upload-dir <dir>     Files sent by /upload (default: ./upload)");
    println!("  --download-dir <dir>   Where /download saves (default: ./download)");
    println!();
    println!("Type /help once connected for the server's commands, or exit to quit.");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut host = DEFAULT_HOST.to_string();
    let mut port = DEFAULT_PORT;
    let mut dirs = Dirs {
        upload: PathBuf::from("upload"),
        download: PathBuf::from("download"),
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "help" | "--help" | "-h") {
            print_usage();
            return Ok(());
        }
        i += 1;
        let value = args
            .get(i)
            .with_context(|| format!("{flag} requires a value"))?;
        match flag {
            "--host" => host = value.clone(),
            "--port" => port = value.parse().context("--port must be a number")?,
            "--upload-dir" => dirs.upload = PathBuf::from(value),
            "--download-dir" => dirs.download = PathBuf::from(value),
            other => {
                eprintln!("Unknown option: {}", other);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    dirs.create()?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .with_context(|| format!("failed to connect to {host}:{port}"))?;
        println!("Connected to server at {host}:{port}");

        match repl::run_session(stream, &dirs, &mut input).await? {
            Ended::User => return Ok(()),
            Ended::Server => {
                println!("\nConnection closed by server. Attempting to reconnect...");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

//! kvlog CLI Client
//!
//! Command-line interface for interacting with a kvlog server.

use clap::{Parser, Subcommand};
use reqwest::StatusCode;

/// kvlog CLI
#[derive(Parser, Debug)]
#[command(name = "kvlog-cli")]
#[command(about = "CLI for the kvlog key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();
    let base = format!("http://{}", args.server);

    let response = match &args.command {
        Commands::Get { key } => client.get(key_url(&base, key)).send().await?,
        Commands::Set { key, value } => {
            client
                .put(key_url(&base, key))
                .body(value.clone())
                .send()
                .await?
        }
        Commands::Del { key } => client.delete(key_url(&base, key)).send().await?,
        Commands::Ping => client.get(format!("{}/health", base)).send().await?,
    };

    let status = response.status();
    let body = response.text().await?;

    match (&args.command, status) {
        (Commands::Get { .. }, StatusCode::OK) => println!("{}", body),
        (Commands::Get { .. }, StatusCode::NOT_FOUND) => println!("(nil)"),
        (Commands::Ping, StatusCode::OK) => println!("PONG"),
        (_, s) if s.is_success() => println!("OK"),
        (_, s) => anyhow::bail!("server returned {}: {}", s, body),
    }

    Ok(())
}

fn key_url(base: &str, key: &str) -> String {
    format!("{}/v1/key/{}", base, encode_path_segment(key))
}

/// Percent-encode everything outside the unreserved set
fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

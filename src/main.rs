//! Multi-client TCP Chat Server - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections
//! until the operator shuts the server down.

use std::env;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_server_tcp::{is_exit_line, serve_until, ChatServer};

/// Default server address
const DEFAULT_ADDR: &str = "0.0.0.0:42424";

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_server_tcp=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_server_tcp=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    // Start TCP listener
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat server listening on {}", addr);
    info!("Type 'exit' (or press Ctrl-C) to stop the server");

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let server = ChatServer::new(cmd_rx);
    tokio::spawn(server.run());

    info!("ChatServer actor started");

    // Accept connections until the operator asks us to stop
    serve_until(listener, cmd_tx, shutdown_signal()).await;

    info!("Server stopped");

    Ok(())
}

/// Resolve when the operator wants the server down
///
/// Either Ctrl-C or an `exit` line on standard input. When stdin is not
/// available (e.g. running detached) only the signal applies.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let exit_line = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if is_exit_line(&line) => break,
                Ok(Some(_)) => continue,
                // Closed stdin never resolves this arm; Ctrl-C still works.
                Ok(None) | Err(_) => std::future::pending::<()>().await,
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = exit_line => {}
    }
}

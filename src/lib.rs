//! Multi-client TCP Chat Server Library
//!
//! A chat server speaking a small length-prefixed binary protocol over
//! raw TCP, built with tokio using the Actor pattern for state management.
//!
//! # Features
//! - Username registration (first text frame from each connection)
//! - Broadcast chat to every registered user
//! - Private messages addressed by username
//! - Roster relays so clients can keep a live user list
//! - Disconnection announcements
//!
//! # Wire format
//! Every frame is a 1-byte tag, a 4-byte little-endian payload length,
//! and the payload. Private messages append a second length-prefixed
//! string naming the target. See [`message`] for the tag meanings.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor managing all state
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_server_tcp::{serve, ChatServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("0.0.0.0:42424").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(cmd_rx).run());
//!     serve(listener, cmd_tx).await;
//! }
//! ```

pub mod client;
pub mod error;
pub mod frame;
pub mod handler;
pub mod listener;
pub mod message;
pub mod roster;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use error::{AppError, FrameError, SendError};
pub use handler::handle_connection;
pub use listener::{is_exit_line, serve, serve_until};
pub use message::{ClientFrame, ServerMessage};
pub use roster::{Roster, RosterEntry};
pub use server::{ChatServer, ServerCommand};
pub use types::ClientId;

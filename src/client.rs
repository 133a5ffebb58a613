//! Client struct definition
//!
//! Represents a connected client with their state and communication channel.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client information
///
/// Holds all state related to a connected client including their
/// unique ID, username and message sender channel.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Username (None before registration)
    pub username: Option<String>,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            username: None,
            sender,
        }
    }

    /// Send a message to this client without waiting
    ///
    /// The channel is bounded, so the caller never parks behind a peer
    /// that has stopped reading. `ChannelFull` means the client's outbound
    /// buffer is saturated; `ChannelClosed` means the client is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|err| match err {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Get the display name for this client
    ///
    /// Returns the username if set, otherwise "Unknown".
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("Unknown")
    }

    /// Check if this client has registered a username
    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }

    /// Set the client's username
    ///
    /// The first write wins; returns false (leaving the name unchanged)
    /// if one was already set.
    pub fn set_username(&mut self, username: String) -> bool {
        if self.username.is_some() {
            return false;
        }
        self.username = Some(username);
        true
    }
}

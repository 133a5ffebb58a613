//! ChatServer Actor implementation
//!
//! The central actor that owns all shared state: the client map and the
//! username roster. Uses the Actor pattern with mpsc channels for message
//! passing, so handlers never touch state directly and no locks are needed.
//! Outbound pushes never wait: the actor's only suspension point is the
//! command receive, so one stalled client cannot hold back anyone else.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{AppError, SendError};
use crate::message::{timestamp, ServerMessage};
use crate::roster::Roster;
use crate::types::ClientId;

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect {
        client_id: ClientId,
    },
    /// Inbound text frame: a username on first contact, chat afterwards
    Text {
        client_id: ClientId,
        content: String,
    },
    /// Private message for a single named user
    Private {
        client_id: ClientId,
        content: String,
        to: String,
    },
}

/// The main ChatServer actor
///
/// Manages all state and processes commands from connection handlers, one
/// at a time, in arrival order. The client map holds every open connection;
/// the roster lists only the ones that have registered a username.
pub struct ChatServer {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Registered usernames in join order
    roster: Roster,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            roster: Roster::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Text { client_id, content } => {
                self.handle_text(client_id, content);
            }
            ServerCommand::Private {
                client_id,
                content,
                to,
            } => {
                self.handle_private(client_id, content, to);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        let client = Client::new(client_id, sender);
        self.clients.insert(client_id, client);
        debug!(
            "Total clients: {}, registered: {}",
            self.clients.len(),
            self.roster.len()
        );
    }

    /// Handle an inbound text frame
    ///
    /// The first text frame from a connection is its username; every later
    /// one is broadcast chat.
    fn handle_text(&mut self, client_id: ClientId, content: String) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        if client.has_username() {
            self.handle_broadcast(client_id, content);
        } else {
            self.handle_register(client_id, content);
        }
    }

    /// Handle username registration
    fn handle_register(&mut self, client_id: ClientId, name: String) {
        // The name must be free; a rejected client stays unregistered and
        // its next text frame is another attempt.
        if self.roster.contains_name(&name) {
            info!("Client {} requested taken username '{}'", client_id, name);
            if let Some(client) = self.clients.get(&client_id) {
                self.send_or_drop(client, AppError::NameTaken(name).into());
            }
            return;
        }

        let Some(client) = self.clients.get_mut(&client_id) else {
            return;
        };
        if !client.set_username(name.clone()) {
            return;
        }
        info!("Client {} registered as '{}'", client_id, name);

        // Everyone already registered learns the new name first.
        self.send_to_registered(ServerMessage::RosterAdd(name.clone()));

        // The joiner catches up on the roster; their own name arrives last.
        if let Some(client) = self.clients.get(&client_id) {
            for entry in self.roster.iter() {
                self.send_or_drop(client, ServerMessage::RosterAdd(entry.name.clone()));
            }
            self.send_or_drop(client, ServerMessage::RosterAdd(name.clone()));
        }

        self.roster.add(client_id, name.clone());

        // Announce the join to everyone, the joiner included.
        let line = format!("{}: User {} connected!", timestamp(), name);
        self.send_to_registered(ServerMessage::Line(line));

        debug!(
            "Total clients: {}, registered: {}",
            self.clients.len(),
            self.roster.len()
        );
    }

    /// Handle a broadcast chat message
    fn handle_broadcast(&mut self, client_id: ClientId, content: String) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        let sender_name = client.display_name().to_string();

        debug!("Client {} broadcast {} bytes", client_id, content.len());

        let line = format!("{} {}: {}", timestamp(), sender_name, content);
        self.send_to_registered(ServerMessage::Line(line));
    }

    /// Handle a private message
    fn handle_private(&mut self, client_id: ClientId, content: String, to: String) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };

        // Only registered users may whisper; drop the frame otherwise.
        if !client.has_username() {
            warn!("Client {} sent a private message before registering", client_id);
            return;
        }
        let sender_name = client.display_name().to_string();

        let Some(target_id) = self.roster.find_by_name(&to) else {
            info!("Client {} messaged unknown user '{}'", client_id, to);
            self.send_or_drop(client, AppError::UnknownTarget(to).into());
            return;
        };

        debug!("Client {} -> '{}' private, {} bytes", client_id, to, content.len());

        // Both copies carry the same clock reading.
        let time = timestamp();

        if let Some(target) = self.clients.get(&target_id) {
            self.send_or_drop(
                target,
                ServerMessage::Line(format!(
                    "{}: Private Message From {}: {}",
                    time, sender_name, content
                )),
            );
        }
        self.send_or_drop(
            client,
            ServerMessage::Line(format!(
                "{}: Private Message To {}: {}",
                time, to, content
            )),
        );
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        if self.clients.remove(&client_id).is_none() {
            return;
        }
        info!("Client {} disconnected", client_id);

        // A connection that never registered leaves without an announcement.
        if let Some(name) = self.roster.remove(client_id) {
            let line = format!("{}: {} disconnected from the network", timestamp(), name);
            self.send_to_registered(ServerMessage::Line(line));
            self.send_to_registered(ServerMessage::RosterRemove(name));
        }

        debug!(
            "Total clients: {}, registered: {}",
            self.clients.len(),
            self.roster.len()
        );
    }

    /// Helper: Send a copy of `msg` to every registered client
    fn send_to_registered(&self, msg: ServerMessage) {
        for entry in self.roster.iter() {
            if let Some(client) = self.clients.get(&entry.id) {
                self.send_or_drop(client, msg.clone());
            }
        }
    }

    /// Helper: push one message to one client without waiting
    ///
    /// A full outbound buffer means the client has stopped draining its
    /// socket; that client's copy is dropped so the rest keep receiving.
    /// A closed channel belongs to a client mid-disconnect and is ignored.
    fn send_or_drop(&self, client: &Client, msg: ServerMessage) {
        match client.send(msg) {
            Ok(()) => {}
            Err(SendError::ChannelFull) => {
                warn!("Client {} outbound buffer full, message dropped", client.id);
            }
            Err(SendError::ChannelClosed) => {}
        }
    }
}

//! TCP connection handler
//!
//! Handles individual client connections: socket splitting, frame
//! decoding, and bidirectional communication with the ChatServer.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, FrameError};
use crate::message::{ClientFrame, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Handle a new TCP connection
///
/// Splits the socket into read and write halves, wires the read half to
/// the ChatServer command channel and the write half to this client's
/// message channel, and manages the connection lifecycle.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let (read_half, mut write_half) = stream.into_split();

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages. The actor pushes into
    // it without waiting, so this buffer is all the slack a slow reader
    // gets before its copies start being dropped.
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(32);

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (frames -> ServerCommand)
    let read_task = tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        loop {
            match ClientFrame::read(&mut reader).await {
                Ok(ClientFrame::Text(content)) => {
                    if cmd_tx_read
                        .send(ServerCommand::Text { client_id, content })
                        .await
                        .is_err()
                    {
                        debug!("Server closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Ok(ClientFrame::Private { content, to }) => {
                    if cmd_tx_read
                        .send(ServerCommand::Private {
                            client_id,
                            content,
                            to,
                        })
                        .await
                        .is_err()
                    {
                        debug!("Server closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Ok(ClientFrame::Invalid(tag)) => {
                    // One unknown byte was consumed; the stream stays usable.
                    warn!("Unknown tag {} from {}, skipping", tag, client_id);
                }
                Err(FrameError::PayloadTooLarge { size, max }) => {
                    warn!(
                        "Client {} declared a {} byte payload (max {}), discarded",
                        client_id, size, max
                    );
                }
                Err(FrameError::ConnectionClosed) => {
                    debug!("Client {} closed the connection", client_id);
                    break;
                }
                Err(e) => {
                    error!("Read error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> frames)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = msg.write(&mut write_half).await {
                debug!("Socket write failed, ending write task: {}", e);
                break;
            }
        }
        debug!("Write task ended for client");

        // Close our half of the connection when done
        let _ = write_half.shutdown().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", client_id);
        }
    }

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

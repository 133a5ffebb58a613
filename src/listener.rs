//! TCP accept loop
//!
//! Accepts connections and spawns a handler task per client. Lives apart
//! from main so the same loop can run under tests and behind a shutdown
//! signal.

use std::future::Future;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::handler::handle_connection;
use crate::server::ServerCommand;

/// Accept connections forever
///
/// Each accepted socket gets its own handler task. Accept errors are
/// logged and the loop keeps going.
pub async fn serve(listener: TcpListener, cmd_tx: mpsc::Sender<ServerCommand>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Accept connections until `shutdown` completes
///
/// Dropping out of this function closes the listener; connections already
/// handed to their tasks keep running.
pub async fn serve_until<F>(listener: TcpListener, cmd_tx: mpsc::Sender<ServerCommand>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown => {
            info!("Shutdown signal received");
        }
        _ = serve(listener, cmd_tx) => {}
    }
}

/// Check whether an operator console line asks for shutdown
///
/// Matching is case-insensitive and ignores surrounding whitespace, so
/// `exit`, `EXIT`, and a line with a trailing `\r` all stop the server.
pub fn is_exit_line(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::frame::{encode_chunk, encode_frame, MAX_PAYLOAD};
    use crate::message::ServerMessage;
    use crate::server::ChatServer;

    /// Bind an ephemeral port and start the actor plus accept loop.
    async fn start_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::new(cmd_rx).run());
        tokio::spawn(serve(listener, cmd_tx));

        addr
    }

    /// Minimal wire-level chat client.
    struct TestClient {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (read_half, writer) = stream.into_split();
            Self {
                reader: BufReader::new(read_half),
                writer,
            }
        }

        /// Register with tag 1, the way the legacy desktop client does.
        async fn register(&mut self, name: &str) {
            self.writer
                .write_all(&encode_frame(1, name.as_bytes()))
                .await
                .unwrap();
        }

        async fn chat(&mut self, text: &str) {
            self.writer
                .write_all(&encode_frame(2, text.as_bytes()))
                .await
                .unwrap();
        }

        async fn private(&mut self, text: &str, to: &str) {
            let mut buf = encode_frame(3, text.as_bytes());
            encode_chunk(to.as_bytes(), &mut buf);
            self.writer.write_all(&buf).await.unwrap();
        }

        async fn recv(&mut self) -> ServerMessage {
            timeout(Duration::from_secs(2), ServerMessage::read(&mut self.reader))
                .await
                .expect("timed out waiting for a message")
                .unwrap()
        }

        async fn recv_line(&mut self) -> String {
            match self.recv().await {
                ServerMessage::Line(line) => line,
                other => panic!("expected line, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_full_chat_session() {
        let addr = start_server().await;

        let mut alice = TestClient::connect(addr).await;
        alice.register("alice").await;
        assert_eq!(
            alice.recv().await,
            ServerMessage::RosterAdd("alice".to_string())
        );
        assert!(alice.recv_line().await.ends_with("User alice connected!"));

        let mut bob = TestClient::connect(addr).await;
        bob.register("bob").await;
        assert_eq!(
            bob.recv().await,
            ServerMessage::RosterAdd("alice".to_string())
        );
        assert_eq!(bob.recv().await, ServerMessage::RosterAdd("bob".to_string()));
        assert!(bob.recv_line().await.ends_with("User bob connected!"));

        assert_eq!(
            alice.recv().await,
            ServerMessage::RosterAdd("bob".to_string())
        );
        assert!(alice.recv_line().await.ends_with("User bob connected!"));

        // Broadcast reaches both ends with identical text.
        bob.chat("hi").await;
        let alice_line = alice.recv_line().await;
        let bob_line = bob.recv_line().await;
        assert_eq!(alice_line, bob_line);
        assert!(alice_line.ends_with("bob: hi"));

        // Private message and its echo.
        alice.private("you there?", "bob").await;
        assert!(bob
            .recv_line()
            .await
            .ends_with("Private Message From alice: you there?"));
        assert!(alice
            .recv_line()
            .await
            .ends_with("Private Message To bob: you there?"));

        // Bob leaves; alice hears the line first, then the roster relay.
        drop(bob);
        assert!(alice
            .recv_line()
            .await
            .ends_with("bob disconnected from the network"));
        assert_eq!(
            alice.recv().await,
            ServerMessage::RosterRemove("bob".to_string())
        );
    }

    #[tokio::test]
    async fn test_frames_survive_chunked_delivery() {
        let addr = start_server().await;

        let mut alice = TestClient::connect(addr).await;

        // Dribble the registration frame out a few bytes at a time.
        let frame = encode_frame(1, b"alice");
        for piece in frame.chunks(2) {
            alice.writer.write_all(piece).await.unwrap();
            alice.writer.flush().await.unwrap();
            sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            alice.recv().await,
            ServerMessage::RosterAdd("alice".to_string())
        );
        assert!(alice.recv_line().await.ends_with("User alice connected!"));
    }

    #[tokio::test]
    async fn test_unknown_tag_does_not_kill_the_connection() {
        let addr = start_server().await;

        let mut alice = TestClient::connect(addr).await;
        alice.writer.write_all(&[9]).await.unwrap();
        alice.register("alice").await;

        assert_eq!(
            alice.recv().await,
            ServerMessage::RosterAdd("alice".to_string())
        );
        assert!(alice.recv_line().await.ends_with("User alice connected!"));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_survivable() {
        let addr = start_server().await;

        let mut alice = TestClient::connect(addr).await;
        alice.register("alice").await;
        alice.recv().await;
        alice.recv_line().await;

        // Declare more than the cap; the server discards and keeps reading.
        let huge = vec![0u8; MAX_PAYLOAD + 1];
        alice
            .writer
            .write_all(&encode_frame(2, &huge))
            .await
            .unwrap();

        alice.chat("still alive").await;
        assert!(alice.recv_line().await.ends_with("alice: still alive"));
    }

    #[tokio::test]
    async fn test_taken_username_over_tcp() {
        let addr = start_server().await;

        let mut alice = TestClient::connect(addr).await;
        alice.register("alice").await;
        alice.recv().await;
        alice.recv_line().await;

        let mut imposter = TestClient::connect(addr).await;
        imposter.register("alice").await;
        assert!(imposter
            .recv_line()
            .await
            .ends_with("Username alice is already taken"));

        // The connection is still usable for another attempt.
        imposter.register("bob").await;
        assert_eq!(
            imposter.recv().await,
            ServerMessage::RosterAdd("alice".to_string())
        );
        assert_eq!(
            imposter.recv().await,
            ServerMessage::RosterAdd("bob".to_string())
        );
        assert!(imposter.recv_line().await.ends_with("User bob connected!"));
    }

    #[tokio::test]
    async fn test_serve_until_stops_accepting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::new(cmd_rx).run());

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, cmd_tx, async {
            let _ = stop_rx.await;
        }));

        // The loop is alive until the signal fires.
        let conn = TcpStream::connect(addr).await;
        assert!(conn.is_ok());

        stop_tx.send(()).unwrap();
        timeout(Duration::from_secs(2), server)
            .await
            .expect("accept loop did not stop")
            .unwrap();
    }

    #[test]
    fn test_exit_line_matching() {
        assert!(is_exit_line("exit"));
        assert!(is_exit_line("EXIT"));
        assert!(is_exit_line("  Exit  "));
        assert!(is_exit_line("exit\r"));

        assert!(!is_exit_line("exits"));
        assert!(!is_exit_line("quit"));
        assert!(!is_exit_line(""));
    }
}

//! Message protocol definitions
//!
//! Typed views of the binary wire protocol, built on the raw framing in
//! [`frame`](crate::frame). The tag byte is overloaded by direction:
//!
//! | Tag | Client to server | Server to client |
//! |-----|------------------|------------------|
//! | 1 | username (first frame) or chat text | human-readable chat line |
//! | 2 | username (first frame) or chat text | roster relay: name added |
//! | 3 | private message: body string, then target-name string | roster relay: name removed |
//!
//! A connection's first text frame is its registration; every later text
//! frame is broadcast chat. The legacy client registers with tag 1 and
//! chats with tag 2, so both tags are accepted for both purposes.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{AppError, FrameError};
use crate::frame::{encode_frame, read_chunk, read_tag, write_frame, MAX_PAYLOAD};

/// Client → server message
///
/// One decoded inbound frame. `Text` covers both registration and broadcast
/// chat; which one applies depends on whether the connection has already
/// registered, and only the server actor knows that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Tag 1 or 2: a username (first frame) or chat text (afterwards)
    Text(String),
    /// Tag 3: private message body and target username
    Private { content: String, to: String },
    /// Any other tag; exactly the tag byte was consumed
    Invalid(u8),
}

impl ClientFrame {
    /// Read and decode the next client frame from `reader`.
    ///
    /// Protocol faults come back as `Invalid` or `PayloadTooLarge` and leave
    /// the stream framed, so the caller can keep reading. `ConnectionClosed`
    /// and `Io` are fatal.
    pub async fn read<R>(reader: &mut R) -> Result<Self, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        match read_tag(reader).await? {
            1 | 2 => {
                let content = read_chunk(reader, MAX_PAYLOAD).await?;
                Ok(ClientFrame::Text(text(content)))
            }
            3 => match read_chunk(reader, MAX_PAYLOAD).await {
                Ok(content) => {
                    let to = read_chunk(reader, MAX_PAYLOAD).await?;
                    Ok(ClientFrame::Private {
                        content: text(content),
                        to: text(to),
                    })
                }
                Err(err @ FrameError::PayloadTooLarge { .. }) => {
                    // The target string still follows on the wire; consume
                    // it so the stream stays framed before reporting.
                    discard_chunk(reader).await?;
                    Err(err)
                }
                Err(err) => Err(err),
            },
            tag => Ok(ClientFrame::Invalid(tag)),
        }
    }
}

/// Server → client message
///
/// All messages from server to client. Each variant maps to one wire tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Tag 1: human-readable chat line
    Line(String),
    /// Tag 2: roster relay, a username joined
    RosterAdd(String),
    /// Tag 3: roster relay, a username left
    RosterRemove(String),
}

impl ServerMessage {
    /// The wire tag for this message kind.
    pub fn tag(&self) -> u8 {
        match self {
            ServerMessage::Line(_) => 1,
            ServerMessage::RosterAdd(_) => 2,
            ServerMessage::RosterRemove(_) => 3,
        }
    }

    /// The payload text carried by this message.
    pub fn payload(&self) -> &str {
        match self {
            ServerMessage::Line(text)
            | ServerMessage::RosterAdd(text)
            | ServerMessage::RosterRemove(text) => text,
        }
    }

    /// Encode into a ready-to-send byte buffer.
    pub fn encode(&self) -> BytesMut {
        encode_frame(self.tag(), self.payload().as_bytes())
    }

    /// Write this message to `writer` as one frame.
    pub async fn write<W>(&self, writer: &mut W) -> Result<(), FrameError>
    where
        W: AsyncWrite + Unpin,
    {
        write_frame(writer, self.tag(), self.payload().as_bytes()).await
    }

    /// Read and decode the next server frame from `reader`.
    ///
    /// This is the client-side view of the stream; the server never calls
    /// it, but clients and tests do.
    pub async fn read<R>(reader: &mut R) -> Result<Self, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let tag = read_tag(reader).await?;
        if !(1..=3).contains(&tag) {
            return Err(FrameError::InvalidTag(tag));
        }
        let payload = text(read_chunk(reader, MAX_PAYLOAD).await?);
        Ok(match tag {
            1 => ServerMessage::Line(payload),
            2 => ServerMessage::RosterAdd(payload),
            _ => ServerMessage::RosterRemove(payload),
        })
    }
}

/// Convert a reportable AppError into the chat line sent to the client
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let text = match &err {
            AppError::NameTaken(name) => format!("Username {} is already taken", name),
            AppError::UnknownTarget(name) => format!("User {} is not connected", name),
            // Fatal errors are not typically converted (the connection closes)
            AppError::ChannelSend => "Internal error".to_string(),
        };
        ServerMessage::Line(format!("{}: {}", timestamp(), text))
    }
}

/// Wall-clock prefix used by the human-readable lines: 12-hour `H:MM AM/PM`.
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%-I:%M %p").to_string()
}

/// Decode payload bytes as text, substituting anything undecodable rather
/// than faulting the connection.
fn text(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read and throw away one chunk, tolerating oversize; only transport
/// faults propagate.
async fn discard_chunk<R>(reader: &mut R) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    match read_chunk(reader, MAX_PAYLOAD).await {
        Ok(_) | Err(FrameError::PayloadTooLarge { .. }) => Ok(()),
        Err(err) => Err(err),
    }
}

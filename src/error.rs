//! Error types for the chat server
//!
//! Defines frame codec errors, application-level errors, and message send
//! errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Frame codec errors
///
/// Raised while reading or writing length-prefixed frames. `Io` and
/// `ConnectionClosed` are transport faults that end the session;
/// `PayloadTooLarge` is a protocol fault the session survives, because the
/// offending payload is drained off the wire before it is reported.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Declared payload length exceeds the codec maximum
    #[error("declared payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    /// Unrecognized tag while decoding a server frame
    #[error("invalid frame tag {0}")]
    InvalidTag(u8),

    /// I/O failure while reading or writing a frame (fatal)
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream, possibly mid-frame (fatal)
    #[error("connection closed")]
    ConnectionClosed,
}

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and business errors,
/// which are reported back to the offending client as a chat line via
/// `From<AppError> for ServerMessage`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Channel send error (fatal - internal channel broken)
    #[error("channel send error")]
    ChannelSend,

    /// Registration asked for a name that is already registered
    #[error("username '{0}' is already taken")]
    NameTaken(String),

    /// Private message addressed to a name that is not registered
    #[error("user '{0}' is not connected")]
    UnknownTarget(String),
}

/// Message send errors
///
/// Occurs when pushing a message into a client's bounded outbound channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The channel buffer is full (the client is not draining its socket)
    #[error("Channel full")]
    ChannelFull,
}

//! Basic type definitions for the chat server
//!
//! Provides a newtype wrapper for type safety:
//! - `ClientId`: UUID-based unique connection identifier

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe identification of one accepted connection.
/// Implements Hash and Eq for use as HashMap keys. Clients are addressed on
/// the wire by username, never by this id; the id only ties a session task
/// to its server-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Roster struct definition
//!
//! The list of registered usernames, kept in the order clients joined.

use crate::types::ClientId;

/// One registered username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// The connection that owns this name
    pub id: ClientId,
    /// The registered username
    pub name: String,
}

/// Registered-username roster
///
/// Holds every username currently registered, in join order. Only named
/// connections appear here; a connection that has not yet sent its first
/// text frame is invisible to the roster. Lookups are linear scans, which
/// is fine at chat-room scale.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a username for the given connection
    ///
    /// Returns false (leaving the roster unchanged) if the connection is
    /// already listed. Name uniqueness is the caller's concern; see
    /// [`contains_name`](Self::contains_name).
    pub fn add(&mut self, id: ClientId, name: String) -> bool {
        if self.entries.iter().any(|entry| entry.id == id) {
            return false;
        }
        self.entries.push(RosterEntry { id, name });
        true
    }

    /// Remove the entry for the given connection
    ///
    /// Returns the username that was registered, or None if the connection
    /// was not listed.
    pub fn remove(&mut self, id: ClientId) -> Option<String> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index).name)
    }

    /// Look up the connection that registered `name` (exact match)
    pub fn find_by_name(&self, name: &str) -> Option<ClientId> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id)
    }

    /// Check whether `name` is already registered (exact match)
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Iterate the entries in join order
    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    /// Number of registered usernames
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no usernames are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_starts_empty() {
        let roster = Roster::new();

        assert!(roster.is_empty());
        assert_eq!(roster.len(), 0);
        assert!(roster.find_by_name("alice").is_none());
    }

    #[test]
    fn test_roster_add_and_find() {
        let alice_id = ClientId::new();
        let mut roster = Roster::new();

        assert!(roster.add(alice_id, "alice".to_string()));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.find_by_name("alice"), Some(alice_id));
        assert!(roster.contains_name("alice"));
    }

    #[test]
    fn test_roster_rejects_duplicate_connection() {
        let alice_id = ClientId::new();
        let mut roster = Roster::new();

        assert!(roster.add(alice_id, "alice".to_string()));
        assert!(!roster.add(alice_id, "alice2".to_string()));

        assert_eq!(roster.len(), 1);
        assert!(!roster.contains_name("alice2"));
    }

    #[test]
    fn test_roster_preserves_join_order() {
        let mut roster = Roster::new();
        roster.add(ClientId::new(), "alice".to_string());
        roster.add(ClientId::new(), "bob".to_string());
        roster.add(ClientId::new(), "carol".to_string());

        let names: Vec<&str> = roster.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_roster_lookup_is_case_sensitive() {
        let mut roster = Roster::new();
        roster.add(ClientId::new(), "Alice".to_string());

        assert!(roster.contains_name("Alice"));
        assert!(!roster.contains_name("alice"));
        assert!(roster.find_by_name("alice").is_none());
    }

    #[test]
    fn test_roster_remove() {
        let alice_id = ClientId::new();
        let bob_id = ClientId::new();
        let mut roster = Roster::new();
        roster.add(alice_id, "alice".to_string());
        roster.add(bob_id, "bob".to_string());

        assert_eq!(roster.remove(alice_id), Some("alice".to_string()));
        assert_eq!(roster.len(), 1);
        assert!(!roster.contains_name("alice"));
        assert!(roster.contains_name("bob"));

        // Removing again is a no-op
        assert_eq!(roster.remove(alice_id), None);
        assert_eq!(roster.len(), 1);
    }
}

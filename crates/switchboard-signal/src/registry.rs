//! Session registry for the signal server

use std::collections::{HashMap, HashSet};

use switchboard_core::{ConnectionId, SessionId};

/// Live sessions and the connection ids each one has joined
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, HashSet<ConnectionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session with no connections
    pub fn create(&mut self) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id.clone(), HashSet::new());
        id
    }

    /// Remove a session, returning the connections it had joined.
    /// Unknown sessions yield `None`.
    pub fn delete(&mut self, id: &SessionId) -> Option<HashSet<ConnectionId>> {
        self.sessions.remove(id)
    }

    pub fn exists(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Add a connection to the session's set (idempotent)
    pub fn join(&mut self, id: &SessionId, connection_id: &ConnectionId) {
        if let Some(connections) = self.sessions.get_mut(id) {
            connections.insert(connection_id.clone());
        }
    }

    /// Remove a connection from the session's set
    pub fn leave(&mut self, id: &SessionId, connection_id: &ConnectionId) -> bool {
        self.sessions
            .get_mut(id)
            .map(|connections| connections.remove(connection_id))
            .unwrap_or(false)
    }

    /// Connections joined by a session, sorted for stable output
    pub fn connections(&self, id: &SessionId) -> Vec<ConnectionId> {
        let mut connections: Vec<ConnectionId> = self
            .sessions
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        connections.sort();
        connections
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_delete() {
        let mut registry = SessionRegistry::new();
        let id = registry.create();
        assert!(registry.exists(&id));
        assert_eq!(registry.len(), 1);

        registry.join(&id, &"c1".into());
        let joined = registry.delete(&id).unwrap();
        assert!(joined.contains(&ConnectionId::from("c1")));
        assert!(!registry.exists(&id));
        assert!(registry.is_empty());

        // Deleting again is a silent no-op
        assert!(registry.delete(&id).is_none());
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let id = registry.create();

        registry.join(&id, &"c1".into());
        registry.join(&id, &"c1".into());
        registry.join(&id, &"c0".into());
        assert_eq!(
            registry.connections(&id),
            vec![ConnectionId::from("c0"), ConnectionId::from("c1")]
        );

        assert!(registry.leave(&id, &"c1".into()));
        assert!(!registry.leave(&id, &"c1".into()));
        assert_eq!(registry.connections(&id), vec![ConnectionId::from("c0")]);
    }

    #[test]
    fn test_join_unknown_session() {
        let mut registry = SessionRegistry::new();
        let ghost = SessionId::from("ghost");
        registry.join(&ghost, &"c1".into());
        assert!(!registry.exists(&ghost));
        assert!(registry.connections(&ghost).is_empty());
    }
}

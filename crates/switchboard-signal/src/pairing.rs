//! Connection pairing for the signal server
//!
//! Each connection id is claimed by at most two sessions: the initiator
//! (first to register) and the responder (second). In private mode the
//! relay routes joins through [`PairingTable::claim`], which enforces that
//! limit; in public mode offers and answers write pairings directly.

use std::collections::HashMap;

use switchboard_core::{ConnectionId, SessionId, SignalError};

/// Claim record for one connection id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pairing {
    /// First session to register
    pub initiator: SessionId,
    /// Second session, once one has joined
    pub responder: Option<SessionId>,
}

impl Pairing {
    fn half(initiator: SessionId) -> Self {
        Self {
            initiator,
            responder: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.responder.is_some()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        &self.initiator == session_id || self.responder.as_ref() == Some(session_id)
    }

    /// The other member of a full pairing
    pub fn peer_of(&self, session_id: &SessionId) -> Option<&SessionId> {
        let responder = self.responder.as_ref()?;
        if &self.initiator == session_id {
            Some(responder)
        } else if responder == session_id {
            Some(&self.initiator)
        } else {
            None
        }
    }
}

/// Outcome of [`PairingTable::release`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// The session held no slot on the connection
    NotMember,
    /// The session left; its peer still holds the connection
    Left,
    /// The session was the last member and the entry is gone
    Emptied,
}

/// Connection id to pairing map
#[derive(Default)]
pub struct PairingTable {
    pairings: HashMap<ConnectionId, Pairing>,
}

impl PairingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slot on a connection.
    ///
    /// Returns whether a peer was already waiting. A third distinct session
    /// is rejected with [`SignalError::ConnectionAlreadyPaired`].
    pub fn claim(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<bool, SignalError> {
        let Some(pairing) = self.pairings.get_mut(connection_id) else {
            self.pairings
                .insert(connection_id.clone(), Pairing::half(session_id.clone()));
            return Ok(false);
        };

        if pairing.is_full() {
            // Re-claim by a member changes nothing
            return if pairing.contains(session_id) {
                Ok(true)
            } else {
                Err(SignalError::ConnectionAlreadyPaired(connection_id.clone()))
            };
        }
        if &pairing.initiator == session_id {
            return Ok(false);
        }

        pairing.responder = Some(session_id.clone());
        Ok(true)
    }

    /// The other party of a fully paired connection
    pub fn resolve_peer(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<SessionId> {
        self.pairings
            .get(connection_id)
            .and_then(|p| p.peer_of(session_id))
            .cloned()
    }

    /// Overwrite the pairing with a one-sided `(session_id, none)` entry.
    /// Any earlier pairing on the same id is discarded.
    pub fn reset_initiator(&mut self, connection_id: &ConnectionId, session_id: &SessionId) {
        self.pairings
            .insert(connection_id.clone(), Pairing::half(session_id.clone()));
    }

    /// Record `responder` as the second member of an existing pairing.
    /// Returns the initiator it was paired with.
    pub fn complete(
        &mut self,
        connection_id: &ConnectionId,
        responder: &SessionId,
    ) -> Option<SessionId> {
        let pairing = self.pairings.get_mut(connection_id)?;
        if &pairing.initiator == responder {
            return None;
        }
        pairing.responder = Some(responder.clone());
        Some(pairing.initiator.clone())
    }

    /// Remove a session from a connection's pairing.
    ///
    /// A surviving responder is promoted to initiator; an emptied entry is
    /// deleted.
    pub fn release(&mut self, connection_id: &ConnectionId, session_id: &SessionId) -> Release {
        let Some(pairing) = self.pairings.get_mut(connection_id) else {
            return Release::NotMember;
        };

        if pairing.responder.as_ref() == Some(session_id) {
            pairing.responder = None;
            return Release::Left;
        }
        if &pairing.initiator != session_id {
            return Release::NotMember;
        }
        match pairing.responder.take() {
            Some(responder) => {
                pairing.initiator = responder;
                Release::Left
            }
            None => {
                self.pairings.remove(connection_id);
                Release::Emptied
            }
        }
    }

    /// Release a session from every pairing it appears in
    pub fn release_all(&mut self, session_id: &SessionId) -> Vec<ConnectionId> {
        let touched: Vec<ConnectionId> = self
            .pairings
            .iter()
            .filter(|(_, p)| p.contains(session_id))
            .map(|(id, _)| id.clone())
            .collect();

        touched
            .into_iter()
            .filter(|id| self.release(id, session_id) == Release::Emptied)
            .collect()
    }

    /// Number of connection ids with a pairing entry
    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SessionId, SessionId, SessionId, ConnectionId) {
        ("a".into(), "b".into(), "c".into(), "c1".into())
    }

    #[test]
    fn test_claim_state_machine() {
        let (a, b, c, conn) = ids();
        let mut table = PairingTable::new();

        assert!(!table.claim(&a, &conn).unwrap());
        assert_eq!(table.resolve_peer(&a, &conn), None);

        // Initiator re-claiming is a no-op
        assert!(!table.claim(&a, &conn).unwrap());

        assert!(table.claim(&b, &conn).unwrap());
        assert_eq!(table.resolve_peer(&a, &conn), Some(b.clone()));
        assert_eq!(table.resolve_peer(&b, &conn), Some(a.clone()));
        assert_eq!(table.resolve_peer(&c, &conn), None);

        assert_eq!(
            table.claim(&c, &conn),
            Err(SignalError::ConnectionAlreadyPaired(conn.clone()))
        );

        // Members may re-claim a full pairing
        assert!(table.claim(&b, &conn).unwrap());
        assert!(table.claim(&a, &conn).unwrap());
        assert_eq!(table.pairings[&conn].initiator, a);
    }

    #[test]
    fn test_release_promotes_responder() {
        let (a, b, c, conn) = ids();
        let mut table = PairingTable::new();
        table.claim(&a, &conn).unwrap();
        table.claim(&b, &conn).unwrap();

        assert_eq!(table.release(&conn, &a), Release::Left);
        let pairing = &table.pairings[&conn];
        assert_eq!(pairing.initiator, b);
        assert!(!pairing.is_full());
        assert_eq!(table.resolve_peer(&b, &conn), None);

        // The freed slot can be claimed again
        assert!(table.claim(&c, &conn).unwrap());
        assert_eq!(table.resolve_peer(&c, &conn), Some(b.clone()));

        assert_eq!(table.release(&conn, &c), Release::Left);
        assert_eq!(table.release(&conn, &b), Release::Emptied);
        assert!(table.is_empty());
    }

    #[test]
    fn test_release_unrelated_session() {
        let (a, _, c, conn) = ids();
        let mut table = PairingTable::new();
        table.claim(&a, &conn).unwrap();

        assert_eq!(table.release(&conn, &c), Release::NotMember);
        assert_eq!(table.pairings.get(&conn).map(|p| &p.initiator), Some(&a));

        // No entry at all: nothing was released
        assert_eq!(table.release(&"other".into(), &a), Release::NotMember);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reset_and_complete() {
        let (a, b, c, conn) = ids();
        let mut table = PairingTable::new();

        table.reset_initiator(&conn, &a);
        assert_eq!(table.complete(&conn, &b), Some(a.clone()));
        assert_eq!(table.resolve_peer(&b, &conn), Some(a.clone()));

        // A new offer wipes the earlier pairing
        table.reset_initiator(&conn, &c);
        assert_eq!(table.resolve_peer(&b, &conn), None);
        assert_eq!(table.pairings.get(&conn).map(|p| &p.initiator), Some(&c));

        // Answering your own offer never pairs a session with itself
        assert_eq!(table.complete(&conn, &c), None);
        assert!(!table.pairings[&conn].is_full());
        assert_eq!(table.complete(&"missing".into(), &a), None);
    }

    #[test]
    fn test_release_all() {
        let (a, b, _, conn) = ids();
        let other: ConnectionId = "c2".into();
        let mut table = PairingTable::new();
        table.claim(&a, &conn).unwrap();
        table.claim(&b, &conn).unwrap();
        table.claim(&a, &other).unwrap();

        let emptied = table.release_all(&a);
        assert_eq!(emptied, vec![other.clone()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.pairings.get(&conn).map(|p| &p.initiator), Some(&b));
    }
}

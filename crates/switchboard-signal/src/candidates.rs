//! ICE candidate storage
//!
//! Candidates are bucketed by the session that sent them and then by
//! connection id. Readers always pull from the peer's bucket, never their
//! own.

use std::collections::HashMap;

use switchboard_core::{ConnectionId, IceCandidate, SessionId, Stamped, Timestamp};

type Bucket = HashMap<ConnectionId, Vec<Stamped<IceCandidate>>>;

/// Append-only candidate lists per (sender, connection)
#[derive(Default)]
pub struct CandidateStore {
    buckets: HashMap<SessionId, Bucket>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate sent by `session_id` on `connection_id`
    pub fn add(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        candidate: IceCandidate,
        now: Timestamp,
    ) {
        self.buckets
            .entry(session_id.clone())
            .or_default()
            .entry(connection_id.clone())
            .or_default()
            .push(Stamped::new(candidate, now));
    }

    /// Candidates sent by `sender` on `connection_id` newer than `from_time`
    pub fn since(
        &self,
        sender: &SessionId,
        connection_id: &ConnectionId,
        from_time: Timestamp,
    ) -> Vec<IceCandidate> {
        self.list(sender, connection_id)
            .map(|list| {
                list.iter()
                    .filter(|c| c.is_newer_than(from_time))
                    .map(|c| c.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-stamp every candidate under (sender, connection) with `now`.
    /// Returns how many were touched.
    pub fn refresh(
        &mut self,
        sender: &SessionId,
        connection_id: &ConnectionId,
        now: Timestamp,
    ) -> usize {
        let Some(list) = self
            .buckets
            .get_mut(sender)
            .and_then(|bucket| bucket.get_mut(connection_id))
        else {
            return 0;
        };

        for candidate in list.iter_mut() {
            candidate.timestamp = now;
        }
        list.len()
    }

    /// Drop the whole bucket of a session
    pub fn remove_session(&mut self, session_id: &SessionId) {
        self.buckets.remove(session_id);
    }

    /// Drop one session's candidates for one connection
    pub fn remove_connection(&mut self, session_id: &SessionId, connection_id: &ConnectionId) {
        if let Some(bucket) = self.buckets.get_mut(session_id) {
            bucket.remove(connection_id);
            if bucket.is_empty() {
                self.buckets.remove(session_id);
            }
        }
    }

    fn list(
        &self,
        sender: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<&Vec<Stamped<IceCandidate>>> {
        self.buckets.get(sender)?.get(connection_id)
    }

    /// Total number of stored candidates
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

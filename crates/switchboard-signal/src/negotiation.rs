//! Offer/answer storage
//!
//! One offer and one answer per connection id, last write wins. Reads are
//! filtered by a strict "newer than" watermark and come back in write order.

use std::collections::HashMap;

use switchboard_core::{ConnectionId, SessionDescription, Stamped, Timestamp};

/// Latest session description per connection
#[derive(Default)]
pub struct DescriptionSlot {
    entries: HashMap<ConnectionId, Stamped<SessionDescription>>,
}

impl DescriptionSlot {
    fn put(
        &mut self,
        connection_id: &ConnectionId,
        description: SessionDescription,
        now: Timestamp,
    ) {
        self.entries
            .insert(connection_id.clone(), Stamped::new(description, now));
    }

    fn remove(&mut self, connection_id: &ConnectionId) -> bool {
        self.entries.remove(connection_id).is_some()
    }

    /// Entries newer than `from_time` whose connection passes `filter`
    fn since<F>(&self, from_time: Timestamp, filter: F) -> Vec<(ConnectionId, SessionDescription)>
    where
        F: Fn(&ConnectionId) -> bool,
    {
        let mut found: Vec<(&ConnectionId, &Stamped<SessionDescription>)> = self
            .entries
            .iter()
            .filter(|(id, entry)| entry.is_newer_than(from_time) && filter(*id))
            .collect();
        found.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp).then_with(|| a.0.cmp(b.0)));

        found
            .into_iter()
            .map(|(id, entry)| (id.clone(), entry.value.clone()))
            .collect()
    }
}

/// Offers and answers, keyed by connection id
#[derive(Default)]
pub struct NegotiationStore {
    offers: DescriptionSlot,
    answers: DescriptionSlot,
}

impl NegotiationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_offer(
        &mut self,
        connection_id: &ConnectionId,
        offer: SessionDescription,
        now: Timestamp,
    ) {
        self.offers.put(connection_id, offer, now);
    }

    pub fn put_answer(
        &mut self,
        connection_id: &ConnectionId,
        answer: SessionDescription,
        now: Timestamp,
    ) {
        self.answers.put(connection_id, answer, now);
    }

    /// Every offer newer than `from_time`
    pub fn all_offers_since(
        &self,
        from_time: Timestamp,
    ) -> Vec<(ConnectionId, SessionDescription)> {
        self.offers.since(from_time, |_| true)
    }

    /// Offers newer than `from_time` restricted to `connections`
    pub fn offers_since(
        &self,
        connections: &[ConnectionId],
        from_time: Timestamp,
    ) -> Vec<(ConnectionId, SessionDescription)> {
        self.offers.since(from_time, |id| connections.contains(id))
    }

    /// Answers newer than `from_time` restricted to `connections`
    pub fn answers_since(
        &self,
        connections: &[ConnectionId],
        from_time: Timestamp,
    ) -> Vec<(ConnectionId, SessionDescription)> {
        self.answers.since(from_time, |id| connections.contains(id))
    }

    /// Drop both the offer and the answer of a connection
    pub fn remove(&mut self, connection_id: &ConnectionId) {
        self.offers.remove(connection_id);
        self.answers.remove(connection_id);
    }
}

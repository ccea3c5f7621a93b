//! Relay state machine
//!
//! [`SignalingState`] owns the four stores (sessions, pairings, offers and
//! answers, candidates) and implements every relay operation against an
//! explicit `now`. [`Relay`] puts that state behind a single lock together
//! with a clock, so the session check and the mutation it gates always run
//! as one step.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use switchboard_core::{
    ConnectionId, IceCandidate, SessionDescription, SessionId, SignalError, SignalingMode,
    Timestamp,
};

use crate::candidates::CandidateStore;
use crate::clock::{Clock, SystemClock};
use crate::negotiation::NegotiationStore;
use crate::pairing::{PairingTable, Release};
use crate::registry::SessionRegistry;

/// Offers or answers returned by a poll
pub type Descriptions = Vec<(ConnectionId, SessionDescription)>;

/// Candidates returned by a poll, grouped by connection
pub type CandidateBatches = Vec<(ConnectionId, Vec<IceCandidate>)>;

/// Result of a poll plus the relay time it was taken at.
/// `datetime` is a safe watermark for the next poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polled<T> {
    pub items: T,
    pub datetime: Timestamp,
}

/// Counters for health reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayStats {
    pub mode: SignalingMode,
    pub sessions: usize,
    pub connections: usize,
}

/// All signaling bookkeeping for one process
pub struct SignalingState {
    mode: SignalingMode,
    registry: SessionRegistry,
    pairing: PairingTable,
    negotiation: NegotiationStore,
    candidates: CandidateStore,
    last_issued: Timestamp,
}

impl SignalingState {
    pub fn new(mode: SignalingMode) -> Self {
        Self {
            mode,
            registry: SessionRegistry::new(),
            pairing: PairingTable::new(),
            negotiation: NegotiationStore::new(),
            candidates: CandidateStore::new(),
            last_issued: 0,
        }
    }

    pub fn mode(&self) -> SignalingMode {
        self.mode
    }

    /// Hand out a timestamp strictly greater than every earlier one
    pub fn issue_timestamp(&mut self, wall_clock: Timestamp) -> Timestamp {
        let issued = wall_clock.max(self.last_issued + 1);
        self.last_issued = issued;
        issued
    }

    fn ensure_session(&self, session_id: &SessionId) -> Result<(), SignalError> {
        if self.registry.exists(session_id) {
            Ok(())
        } else {
            Err(SignalError::UnknownSession(session_id.clone()))
        }
    }

    fn ensure_connection_id(connection_id: &ConnectionId) -> Result<(), SignalError> {
        if connection_id.is_empty() {
            return Err(SignalError::malformed("connectionId is required"));
        }
        Ok(())
    }

    pub fn create_session(&mut self) -> SessionId {
        let id = self.registry.create();
        info!("Session created: {}", id);
        id
    }

    /// Remove a session and everything it owns.
    ///
    /// The peer's candidates stay in place until the peer releases the
    /// connection or is deleted itself.
    pub fn delete_session(&mut self, session_id: &SessionId) -> Result<(), SignalError> {
        let joined = self
            .registry
            .delete(session_id)
            .ok_or_else(|| SignalError::UnknownSession(session_id.clone()))?;

        for connection_id in &joined {
            self.negotiation.remove(connection_id);
        }
        for connection_id in self.pairing.release_all(session_id) {
            self.negotiation.remove(&connection_id);
        }
        self.candidates.remove_session(session_id);

        info!("Session deleted: {} ({} connections)", session_id, joined.len());
        Ok(())
    }

    pub fn session_exists(&self, session_id: &SessionId) -> bool {
        self.registry.exists(session_id)
    }

    /// Join a connection, returning whether a peer was already waiting.
    /// Pairing exclusivity only applies in private mode.
    pub fn join_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<bool, SignalError> {
        self.ensure_session(session_id)?;
        Self::ensure_connection_id(connection_id)?;

        let peer_exists = if self.mode.is_private() {
            self.pairing.claim(session_id, connection_id).map_err(|e| {
                warn!("Session {} rejected on {}: {}", session_id, connection_id, e);
                e
            })?
        } else {
            false
        };

        self.registry.join(session_id, connection_id);
        info!(
            "Session {} joined {} (peer exists: {})",
            session_id, connection_id, peer_exists
        );
        Ok(peer_exists)
    }

    /// Leave a connection and release this session's claim on it
    pub fn leave_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<(), SignalError> {
        self.ensure_session(session_id)?;
        Self::ensure_connection_id(connection_id)?;

        self.registry.leave(session_id, connection_id);
        if self.pairing.release(connection_id, session_id) == Release::Emptied {
            self.negotiation.remove(connection_id);
            debug!("Connection {} released entirely", connection_id);
        }
        self.candidates.remove_connection(session_id, connection_id);

        info!("Session {} left {}", session_id, connection_id);
        Ok(())
    }

    /// Store an offer.
    ///
    /// Private mode requires a resolvable peer and stores nothing otherwise.
    /// Public mode resets the pairing to `(session_id, none)` so the next
    /// answer knows whom to pair with.
    pub fn put_offer(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        offer: SessionDescription,
        now: Timestamp,
    ) -> Result<(), SignalError> {
        self.ensure_session(session_id)?;
        Self::ensure_connection_id(connection_id)?;

        if self.mode.is_private() {
            if self.pairing.resolve_peer(session_id, connection_id).is_none() {
                warn!("Offer on {} from {} before peer joined", connection_id, session_id);
                return Err(SignalError::PeerNotReady(connection_id.clone()));
            }
        } else {
            self.pairing.reset_initiator(connection_id, session_id);
        }

        self.negotiation.put_offer(connection_id, offer, now);
        debug!("Offer stored on {} by {} at {}", connection_id, session_id, now);
        Ok(())
    }

    /// Store an answer and re-expose the peer's candidates.
    ///
    /// Every candidate the peer already sent on this connection is
    /// re-stamped with `now`, so an answerer polling from just before its
    /// own answer still receives candidates sent long before it was ready.
    pub fn put_answer(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        answer: SessionDescription,
        now: Timestamp,
    ) -> Result<(), SignalError> {
        self.ensure_session(session_id)?;
        Self::ensure_connection_id(connection_id)?;

        self.registry.join(session_id, connection_id);
        self.negotiation.put_answer(connection_id, answer, now);

        let peer = if self.mode.is_private() {
            self.pairing.resolve_peer(session_id, connection_id)
        } else {
            self.pairing.complete(connection_id, session_id)
        };

        if let Some(peer) = peer {
            let refreshed = self.candidates.refresh(&peer, connection_id, now);
            debug!(
                "Answer stored on {} by {}, refreshed {} candidates from {}",
                connection_id, session_id, refreshed, peer
            );
        } else {
            debug!("Answer stored on {} by {} with no peer", connection_id, session_id);
        }
        Ok(())
    }

    pub fn add_candidate(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        candidate: IceCandidate,
        now: Timestamp,
    ) -> Result<(), SignalError> {
        self.ensure_session(session_id)?;
        Self::ensure_connection_id(connection_id)?;

        self.candidates.add(session_id, connection_id, candidate, now);
        debug!("Candidate stored on {} by {}", connection_id, session_id);
        Ok(())
    }

    /// Offers newer than `from_time`: all of them in public mode, only the
    /// session's own connections in private mode
    pub fn get_offers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<Descriptions, SignalError> {
        self.ensure_session(session_id)?;

        let offers = if self.mode.is_private() {
            let joined = self.registry.connections(session_id);
            self.negotiation.offers_since(&joined, from_time)
        } else {
            self.negotiation.all_offers_since(from_time)
        };
        Ok(offers)
    }

    /// Answers newer than `from_time` on the session's connections
    pub fn get_answers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<Descriptions, SignalError> {
        self.ensure_session(session_id)?;

        let joined = self.registry.connections(session_id);
        Ok(self.negotiation.answers_since(&joined, from_time))
    }

    /// The paired peer's candidates newer than `from_time`, per connection
    pub fn get_candidates(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<CandidateBatches, SignalError> {
        self.ensure_session(session_id)?;

        let batches = self
            .registry
            .connections(session_id)
            .into_iter()
            .filter_map(|connection_id| {
                let peer = self.pairing.resolve_peer(session_id, &connection_id)?;
                let candidates = self.candidates.since(&peer, &connection_id, from_time);
                if candidates.is_empty() {
                    None
                } else {
                    Some((connection_id, candidates))
                }
            })
            .collect();
        Ok(batches)
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            mode: self.mode,
            sessions: self.registry.len(),
            connections: self.pairing.len(),
        }
    }
}

/// Thread-safe relay: one lock around [`SignalingState`] plus a clock
pub struct Relay<C = SystemClock> {
    state: Mutex<SignalingState>,
    clock: C,
}

impl Relay<SystemClock> {
    pub fn new(mode: SignalingMode) -> Self {
        Self::with_clock(mode, SystemClock)
    }
}

impl<C: Clock> Relay<C> {
    pub fn with_clock(mode: SignalingMode, clock: C) -> Self {
        Self {
            state: Mutex::new(SignalingState::new(mode)),
            clock,
        }
    }

    pub fn mode(&self) -> SignalingMode {
        self.state.lock().mode()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn create_session(&self) -> SessionId {
        self.state.lock().create_session()
    }

    pub fn delete_session(&self, session_id: &SessionId) -> Result<(), SignalError> {
        self.state.lock().delete_session(session_id)
    }

    pub fn session_exists(&self, session_id: &SessionId) -> bool {
        self.state.lock().session_exists(session_id)
    }

    pub fn join_connection(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<bool, SignalError> {
        self.state.lock().join_connection(session_id, connection_id)
    }

    pub fn leave_connection(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<(), SignalError> {
        self.state.lock().leave_connection(session_id, connection_id)
    }

    pub fn put_offer(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        offer: SessionDescription,
    ) -> Result<(), SignalError> {
        let mut state = self.state.lock();
        let now = state.issue_timestamp(self.clock.now_millis());
        state.put_offer(session_id, connection_id, offer, now)
    }

    pub fn put_answer(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        answer: SessionDescription,
    ) -> Result<(), SignalError> {
        let mut state = self.state.lock();
        let now = state.issue_timestamp(self.clock.now_millis());
        state.put_answer(session_id, connection_id, answer, now)
    }

    pub fn add_candidate(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        candidate: IceCandidate,
    ) -> Result<(), SignalError> {
        let mut state = self.state.lock();
        let now = state.issue_timestamp(self.clock.now_millis());
        state.add_candidate(session_id, connection_id, candidate, now)
    }

    pub fn get_offers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<Polled<Descriptions>, SignalError> {
        self.poll(|state| state.get_offers(session_id, from_time))
    }

    pub fn get_answers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<Polled<Descriptions>, SignalError> {
        self.poll(|state| state.get_answers(session_id, from_time))
    }

    pub fn get_candidates(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> Result<Polled<CandidateBatches>, SignalError> {
        self.poll(|state| state.get_candidates(session_id, from_time))
    }

    pub fn stats(&self) -> RelayStats {
        self.state.lock().stats()
    }

    /// Run a read and stamp it. The stamp consumes a tick so every later
    /// write lands strictly after it.
    fn poll<T, F>(&self, read: F) -> Result<Polled<T>, SignalError>
    where
        F: FnOnce(&SignalingState) -> Result<T, SignalError>,
    {
        let mut state = self.state.lock();
        let items = read(&state)?;
        let datetime = state.issue_timestamp(self.clock.now_millis());
        Ok(Polled { items, datetime })
    }
}

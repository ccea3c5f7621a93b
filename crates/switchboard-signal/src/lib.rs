//! Switchboard Signal Server
//!
//! Signaling relay for WebRTC session negotiation over plain HTTP polling.
//! Peers never hold a socket open; they post what they produce and poll for
//! what is new since their last watermark.
//!
//! # Protocol
//!
//! 1. Each peer creates a session and receives an opaque session id
//! 2. Both peers join the same client-chosen connection id
//! 3. The initiator posts an offer, the responder polls for it and posts an answer
//! 4. Both sides trickle ICE candidates and poll for the other side's
//! 5. Peers delete their sessions once the direct connection is up
//!
//! In private mode a connection id holds exactly two sessions and offers
//! wait until both have joined. In public mode any session may address any
//! connection id.

pub mod candidates;
pub mod clock;
pub mod messages;
pub mod negotiation;
pub mod pairing;
pub mod registry;
pub mod relay;
pub mod server;

pub use clock::{Clock, ManualClock, SystemClock};
pub use messages::{CandidateEntry, DescriptionEntry};
pub use pairing::{Pairing, PairingTable, Release};
pub use relay::{Polled, Relay, RelayStats, SignalingState};
pub use server::{router, SignalServer};

//! Core type definitions for Switchboard
//!
//! Identifiers, negotiation payloads, and the timestamp type shared by
//! every store in the relay.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds
pub fn unix_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// A stored record together with the time it was written (or refreshed)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamped<T> {
    pub value: T,
    pub timestamp: Timestamp,
}

impl<T> Stamped<T> {
    pub fn new(value: T, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    /// Strictly newer than the watermark
    pub fn is_newer_than(&self, from_time: Timestamp) -> bool {
        self.timestamp > from_time
    }
}

/// Opaque session token handed out by the relay
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh, globally unique session id (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-supplied identifier of one negotiation attempt
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide pairing policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalingMode {
    /// No pairing exclusivity; any session may address any connection id
    #[default]
    Public,
    /// At most two sessions per connection id, offers need a paired peer
    Private,
}

impl SignalingMode {
    pub fn is_private(self) -> bool {
        self == SignalingMode::Private
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalingMode::Public => "public",
            SignalingMode::Private => "private",
        }
    }
}

impl fmt::Display for SignalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An SDP offer or answer body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self { sdp: sdp.into() }
    }
}

/// A single ICE candidate as produced by `RTCPeerConnection.onicecandidate`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u32>,
    #[serde(default)]
    pub sdp_mid: Option<String>,
}

impl IceCandidate {
    pub fn new(
        candidate: impl Into<String>,
        sdp_mline_index: u32,
        sdp_mid: impl Into<String>,
    ) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mline_index: Some(sdp_mline_index),
            sdp_mid: Some(sdp_mid.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_generation() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36); // UUID v4 format
    }

    #[test]
    fn test_candidate_wire_names() {
        let candidate =
            IceCandidate::new("candidate:1 1 udp 2122260223 10.0.0.1 50000 typ host", 0, "0");
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(json.contains("\"sdpMLineIndex\":0"));
        assert!(json.contains("\"sdpMid\":\"0\""));

        let parsed: IceCandidate = serde_json::from_str(r#"{"candidate":"c"}"#).unwrap();
        assert_eq!(parsed.sdp_mline_index, None);
        assert_eq!(parsed.sdp_mid, None);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&SignalingMode::Private).unwrap(), "\"private\"");
        assert_eq!(SignalingMode::default(), SignalingMode::Public);
        assert!(SignalingMode::Private.is_private());
    }
}

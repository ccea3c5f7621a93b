//! Signal protocol messages
//!
//! JSON bodies exchanged over HTTP. Field names are camelCase to stay
//! compatible with existing HTTP signaling clients.

use serde::{Deserialize, Serialize};

use switchboard_core::{
    ConnectionId, ErrorCode, IceCandidate, SessionDescription, SessionId, Timestamp,
};

use crate::relay::{CandidateBatches, Descriptions, Polled};

/// `PUT /signaling` response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: SessionId,
}

/// Body of `PUT`/`DELETE /signaling/connection`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub connection_id: ConnectionId,
}

/// `PUT /signaling/connection` response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionJoined {
    pub connection_id: ConnectionId,
    pub peer_exists: bool,
}

/// Body of `POST /signaling/offer` and `POST /signaling/answer`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionMessage {
    pub connection_id: ConnectionId,
    pub sdp: String,
}

impl DescriptionMessage {
    pub fn into_parts(self) -> (ConnectionId, SessionDescription) {
        (self.connection_id, SessionDescription::new(self.sdp))
    }
}

/// Body of `POST /signaling/candidate`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMessage {
    pub connection_id: ConnectionId,
    #[serde(flatten)]
    pub candidate: IceCandidate,
}

/// One offer or answer in a poll response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionEntry {
    pub connection_id: ConnectionId,
    pub sdp: String,
}

/// One connection's candidates in a poll response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub connection_id: ConnectionId,
    pub candidates: Vec<IceCandidate>,
}

/// `GET /signaling/offer` response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OffersResponse {
    pub offers: Vec<DescriptionEntry>,
    pub datetime: Timestamp,
}

/// `GET /signaling/answer` response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswersResponse {
    pub answers: Vec<DescriptionEntry>,
    pub datetime: Timestamp,
}

/// `GET /signaling/candidate` response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidatesResponse {
    pub candidates: Vec<CandidateEntry>,
    pub datetime: Timestamp,
}

fn description_entries(items: Descriptions) -> Vec<DescriptionEntry> {
    items
        .into_iter()
        .map(|(connection_id, description)| DescriptionEntry {
            connection_id,
            sdp: description.sdp,
        })
        .collect()
}

impl OffersResponse {
    pub fn from_polled(polled: Polled<Descriptions>) -> Self {
        Self {
            offers: description_entries(polled.items),
            datetime: polled.datetime,
        }
    }
}

impl AnswersResponse {
    pub fn from_polled(polled: Polled<Descriptions>) -> Self {
        Self {
            answers: description_entries(polled.items),
            datetime: polled.datetime,
        }
    }
}

impl CandidatesResponse {
    pub fn from_polled(polled: Polled<CandidateBatches>) -> Self {
        Self {
            candidates: polled
                .items
                .into_iter()
                .map(|(connection_id, candidates)| CandidateEntry {
                    connection_id,
                    candidates,
                })
                .collect(),
            datetime: polled.datetime,
        }
    }
}

/// Error body
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
}

/// `GET /health` response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub mode: String,
    pub sessions: usize,
    pub connections: usize,
}

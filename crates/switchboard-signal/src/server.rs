//! HTTP signal server implementation
//!
//! Binds the relay operations onto short-lived HTTP requests. Every route
//! except session creation and `/health` needs the `session-id` header.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use switchboard_core::{SessionId, SignalError, SignalingMode, Timestamp, SESSION_ID_HEADER};

use crate::clock::{Clock, SystemClock};
use crate::messages::{
    AnswersResponse, CandidateMessage, CandidatesResponse, ConnectionJoined, ConnectionRequest,
    DescriptionMessage, ErrorBody, HealthStatus, OffersResponse, SessionCreated,
};
use crate::relay::Relay;

type SharedRelay<C> = Arc<Relay<C>>;

/// Signal server state
pub struct SignalServer<C: Clock = SystemClock> {
    relay: SharedRelay<C>,
}

impl SignalServer<SystemClock> {
    pub fn new(mode: SignalingMode) -> Self {
        Self::from_relay(Arc::new(Relay::new(mode)))
    }
}

impl<C: Clock> SignalServer<C> {
    pub fn from_relay(relay: SharedRelay<C>) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> &SharedRelay<C> {
        &self.relay
    }

    /// The full HTTP application
    pub fn router(&self) -> Router {
        router(self.relay.clone())
    }

    /// Start the signal server; returns once ctrl-c is received
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Signal server listening on {} ({} mode)",
            listener.local_addr()?,
            self.relay.mode()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    /// Get session count (for monitoring)
    pub fn session_count(&self) -> usize {
        self.relay.stats().sessions
    }
}

impl Default for SignalServer<SystemClock> {
    fn default() -> Self {
        Self::new(SignalingMode::default())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Build the router for a relay
pub fn router<C: Clock>(relay: SharedRelay<C>) -> Router {
    Router::new()
        .route("/health", get(health::<C>))
        .route(
            "/signaling",
            put(create_session::<C>).delete(delete_session::<C>),
        )
        .route(
            "/signaling/connection",
            put(join_connection::<C>).delete(leave_connection::<C>),
        )
        .route("/signaling/offer", get(get_offers::<C>).post(post_offer::<C>))
        .route("/signaling/answer", get(get_answers::<C>).post(post_answer::<C>))
        .route(
            "/signaling/candidate",
            get(get_candidates::<C>).post(post_candidate::<C>),
        )
        .with_state(relay)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// HTTP face of a [`SignalError`]
#[derive(Debug)]
pub struct ApiError(pub SignalError);

impl From<SignalError> for ApiError {
    fn from(e: SignalError) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError(SignalError::malformed(e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError(SignalError::malformed(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        debug!(code = code.as_str(), "Request rejected: {}", self.0);
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Unknown sessions are rejected before the body or query is inspected
fn require_session<C: Clock>(relay: &Relay<C>, session_id: &SessionId) -> ApiResult<()> {
    if relay.session_exists(session_id) {
        Ok(())
    } else {
        Err(SignalError::UnknownSession(session_id.clone()).into())
    }
}

/// The `session-id` request header
pub struct SessionHeader(pub SessionId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionHeader {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| SessionHeader(SessionId::from(value)))
            .ok_or_else(|| ApiError(SignalError::malformed("session-id header is required")))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PollParams {
    /// Watermark; absent means "everything"
    pub fromtime: Option<Timestamp>,
}

fn watermark(params: Result<Query<PollParams>, QueryRejection>) -> ApiResult<Timestamp> {
    let Query(params) = params?;
    Ok(params.fromtime.unwrap_or(0))
}

async fn health<C: Clock>(State(relay): State<SharedRelay<C>>) -> Json<HealthStatus> {
    let stats = relay.stats();
    Json(HealthStatus {
        status: "healthy".into(),
        mode: stats.mode.to_string(),
        sessions: stats.sessions,
        connections: stats.connections,
    })
}

async fn create_session<C: Clock>(State(relay): State<SharedRelay<C>>) -> Json<SessionCreated> {
    Json(SessionCreated {
        session_id: relay.create_session(),
    })
}

async fn delete_session<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
) -> ApiResult<StatusCode> {
    relay.delete_session(&session_id)?;
    Ok(StatusCode::OK)
}

async fn join_connection<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    body: Result<Json<ConnectionRequest>, JsonRejection>,
) -> ApiResult<Json<ConnectionJoined>> {
    require_session(&relay, &session_id)?;
    let Json(request) = body?;
    let peer_exists = relay.join_connection(&session_id, &request.connection_id)?;
    Ok(Json(ConnectionJoined {
        connection_id: request.connection_id,
        peer_exists,
    }))
}

async fn leave_connection<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    body: Result<Json<ConnectionRequest>, JsonRejection>,
) -> ApiResult<Json<ConnectionRequest>> {
    require_session(&relay, &session_id)?;
    let Json(request) = body?;
    relay.leave_connection(&session_id, &request.connection_id)?;
    Ok(Json(request))
}

async fn post_offer<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    body: Result<Json<DescriptionMessage>, JsonRejection>,
) -> ApiResult<StatusCode> {
    require_session(&relay, &session_id)?;
    let Json(message) = body?;
    let (connection_id, offer) = message.into_parts();
    relay.put_offer(&session_id, &connection_id, offer)?;
    Ok(StatusCode::OK)
}

async fn post_answer<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    body: Result<Json<DescriptionMessage>, JsonRejection>,
) -> ApiResult<StatusCode> {
    require_session(&relay, &session_id)?;
    let Json(message) = body?;
    let (connection_id, answer) = message.into_parts();
    relay.put_answer(&session_id, &connection_id, answer)?;
    Ok(StatusCode::OK)
}

async fn post_candidate<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    body: Result<Json<CandidateMessage>, JsonRejection>,
) -> ApiResult<StatusCode> {
    require_session(&relay, &session_id)?;
    let Json(message) = body?;
    relay.add_candidate(&session_id, &message.connection_id, message.candidate)?;
    Ok(StatusCode::OK)
}

async fn get_offers<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    params: Result<Query<PollParams>, QueryRejection>,
) -> ApiResult<Json<OffersResponse>> {
    require_session(&relay, &session_id)?;
    let from_time = watermark(params)?;
    let polled = relay.get_offers(&session_id, from_time)?;
    debug!("{} offers for {} since {}", polled.items.len(), session_id, from_time);
    Ok(Json(OffersResponse::from_polled(polled)))
}

async fn get_answers<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    params: Result<Query<PollParams>, QueryRejection>,
) -> ApiResult<Json<AnswersResponse>> {
    require_session(&relay, &session_id)?;
    let from_time = watermark(params)?;
    let polled = relay.get_answers(&session_id, from_time)?;
    debug!("{} answers for {} since {}", polled.items.len(), session_id, from_time);
    Ok(Json(AnswersResponse::from_polled(polled)))
}

async fn get_candidates<C: Clock>(
    State(relay): State<SharedRelay<C>>,
    SessionHeader(session_id): SessionHeader,
    params: Result<Query<PollParams>, QueryRejection>,
) -> ApiResult<Json<CandidatesResponse>> {
    require_session(&relay, &session_id)?;
    let from_time = watermark(params)?;
    let polled = relay.get_candidates(&session_id, from_time)?;
    debug!(
        "Candidates on {} connections for {} since {}",
        polled.items.len(),
        session_id,
        from_time
    );
    Ok(Json(CandidatesResponse::from_polled(polled)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let server = SignalServer::new(SignalingMode::Private);
        assert_eq!(server.session_count(), 0);
        assert_eq!(server.relay().mode(), SignalingMode::Private);
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError(SignalError::UnknownSession("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(SignalError::PeerNotReady("c1".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_require_session() {
        let relay = Relay::new(SignalingMode::Public);
        let ghost = SessionId::from("ghost");
        let err = require_session(&relay, &ghost).unwrap_err();
        assert_eq!(err.0, SignalError::UnknownSession(ghost));

        let id = relay.create_session();
        assert!(require_session(&relay, &id).is_ok());
    }

    #[test]
    fn test_watermark_defaults_to_zero() {
        assert_eq!(watermark(Ok(Query(PollParams::default()))).unwrap(), 0);
        let params = PollParams { fromtime: Some(17) };
        assert_eq!(watermark(Ok(Query(params))).unwrap(), 17);
    }
}

//! HTTP + WebSocket API for the matchmaking engine
//!
//! Endpoints:
//! - GET  /health                  - Health check
//! - POST /queue/join              - Join (or rejoin) the queue
//! - POST /queue/:entryId/heartbeat - Liveness signal
//! - POST /queue/:entryId/leave    - Leave the queue
//! - POST /press/start             - Start holding on the focus target
//! - POST /press/commit            - Hold reached the threshold
//! - POST /press/cancel            - Released before commit
//! - POST /match/:matchId/ack      - Acknowledge the intro
//! - POST /match/:matchId/close    - End the match
//! - GET  /state/:entryId          - Client state projection
//! - WS   /ws/:entryId             - Pushed client state

use axum::{
    async_trait,
    extract::{
        ws::{Message, WebSocket},
        FromRequest, FromRequestParts, Path, Request, State, WebSocketUpgrade,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::core::Engine;
use crate::types::{
    AckResult, ClientState, EngineConfig, EngineError, EngineResult, EntryId, FocusWindowId,
    JoinResult, MatchActionResult, MatchId, PressCancelResult, PressCommitResult,
    PressEventId, PressStartResult, ReasonCode, RejectionBody,
};

/// App state
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Join request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub identity: String,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressStartRequest {
    pub entry_id: EntryId,
    pub target_entry_id: EntryId,
    pub focus_window_id: FocusWindowId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressCommitRequest {
    pub entry_id: EntryId,
    pub press_event_id: PressEventId,
    pub target_entry_id: EntryId,
    pub focus_window_id: FocusWindowId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressCancelRequest {
    pub entry_id: EntryId,
    pub press_event_id: PressEventId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchActionRequest {
    pub entry_id: EntryId,
}

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub queue_count: usize,
}

/// Engine rejection rendered as `{ ok: false, reason, fatal, serverNow }`
#[derive(Debug)]
pub struct ApiError {
    error: EngineError,
    server_now: u64,
}

impl ApiError {
    fn malformed(detail: String, state: &AppState) -> Self {
        tracing::debug!(%detail, "Malformed request");
        Self {
            error: EngineError::MalformedRequest(detail),
            server_now: state.engine.now(),
        }
    }

    fn status(&self) -> StatusCode {
        match self.error.reason() {
            ReasonCode::NotFound
            | ReasonCode::PressNotFound
            | ReasonCode::MatchNotFound
            | ReasonCode::NotParticipant => StatusCode::NOT_FOUND,
            ReasonCode::InvalidIdentity | ReasonCode::MalformedRequest => StatusCode::BAD_REQUEST,
            _ => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = RejectionBody {
            ok: false,
            reason: self.error.reason(),
            fatal: self.error.is_fatal(),
            server_now: self.server_now,
        };
        (self.status(), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `Path` whose rejection renders as a `malformed_request` body
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T> FromRequestParts<Arc<AppState>> for ApiPath<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::malformed(rejection.body_text(), state)),
        }
    }
}

/// `Json` whose rejection renders as a `malformed_request` body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T> FromRequest<Arc<AppState>> for ApiJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::malformed(rejection.body_text(), state)),
        }
    }
}

fn respond<T>(engine: &Engine, result: EngineResult<T>) -> ApiResult<T> {
    result.map(Json).map_err(|error| {
        tracing::debug!(%error, "Command rejected");
        ApiError { error, server_now: engine.now() }
    })
}

/// Create the API router
pub fn create_router(engine: Arc<Engine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/health", get(health))
        .route("/queue/join", post(join_queue))
        .route("/queue/:entry_id/heartbeat", post(heartbeat))
        .route("/queue/:entry_id/leave", post(leave_queue))
        .route("/press/start", post(press_start))
        .route("/press/commit", post(press_commit))
        .route("/press/cancel", post(press_cancel))
        .route("/match/:match_id/ack", post(acknowledge_match))
        .route("/match/:match_id/close", post(close_match))
        .route("/state/:entry_id", get(client_state))
        .route("/ws/:entry_id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        queue_count: state.engine.queue_count(),
    })
}

async fn join_queue(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<JoinRequest>,
) -> ApiResult<JoinResult> {
    let result = state.engine.join_queue(
        &req.identity,
        req.display_name.as_deref(),
        req.avatar_ref.as_deref(),
    );
    respond(&state.engine, result)
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    ApiPath(entry_id): ApiPath<EntryId>,
) -> ApiResult<AckResult> {
    respond(&state.engine, state.engine.heartbeat(entry_id))
}

async fn leave_queue(
    State(state): State<Arc<AppState>>,
    ApiPath(entry_id): ApiPath<EntryId>,
) -> Json<AckResult> {
    Json(state.engine.leave_queue(entry_id))
}

async fn press_start(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PressStartRequest>,
) -> ApiResult<PressStartResult> {
    let result = state.engine.press_start(req.entry_id, req.target_entry_id, req.focus_window_id);
    respond(&state.engine, result)
}

async fn press_commit(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PressCommitRequest>,
) -> ApiResult<PressCommitResult> {
    let result = state.engine.press_commit(
        req.entry_id,
        req.press_event_id,
        req.target_entry_id,
        req.focus_window_id,
    );
    respond(&state.engine, result)
}

async fn press_cancel(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PressCancelRequest>,
) -> ApiResult<PressCancelResult> {
    respond(&state.engine, state.engine.press_cancel(req.entry_id, req.press_event_id))
}

async fn acknowledge_match(
    State(state): State<Arc<AppState>>,
    ApiPath(match_id): ApiPath<MatchId>,
    ApiJson(req): ApiJson<MatchActionRequest>,
) -> ApiResult<MatchActionResult> {
    respond(&state.engine, state.engine.acknowledge_match(req.entry_id, match_id))
}

async fn close_match(
    State(state): State<Arc<AppState>>,
    ApiPath(match_id): ApiPath<MatchId>,
    ApiJson(req): ApiJson<MatchActionRequest>,
) -> ApiResult<MatchActionResult> {
    respond(&state.engine, state.engine.close_match(req.entry_id, match_id))
}

/// Unknown entries get the inactive projection, not a 404
async fn client_state(
    State(state): State<Arc<AppState>>,
    ApiPath(entry_id): ApiPath<EntryId>,
) -> Json<ClientState> {
    Json(state.engine.client_state(entry_id))
}

/// WebSocket handler for live client state
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(entry_id): ApiPath<EntryId>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let engine = state.engine.clone();
    let rx = engine.subscribe();
    ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, engine, entry_id, rx).await;
    })
}

/// Push the projection on relevant events and whenever it changes between ticks
async fn handle_websocket(
    socket: WebSocket,
    engine: Arc<Engine>,
    entry_id: EntryId,
    mut rx: broadcast::Receiver<crate::types::EngineEvent>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut ticker = tokio::time::interval(Duration::from_millis(engine.config().tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_sent: Option<String> = None;

    loop {
        let push = tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => event.involves(entry_id),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(entry = %entry_id, skipped, "WebSocket subscriber lagged");
                    true
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ticker.tick() => true,
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => false,
            },
        };
        if !push {
            continue;
        }

        let json = match serde_json::to_string(&engine.client_state(entry_id)) {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(%error, "Failed to encode client state");
                break;
            }
        };
        // serverNow changes every pass; compare without it
        let fingerprint = strip_server_now(&json);
        if last_sent.as_deref() == Some(fingerprint.as_str()) {
            continue;
        }
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
        last_sent = Some(fingerprint);
    }
    tracing::debug!(entry = %entry_id, "WebSocket closed");
}

fn strip_server_now(json: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.remove("serverNow");
            serde_json::Value::Object(map).to_string()
        }
        _ => json.to_string(),
    }
}

/// Spawn the background maintenance ticker
pub fn spawn_ticker(engine: Arc<Engine>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_millis(engine.config().tick_interval_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            engine.tick();
        }
    })
}

/// Run the API server
pub async fn run_server(addr: &str, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(Engine::new(config));
    let ticker = spawn_ticker(engine.clone());
    let router = create_router(engine);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Matchmaking API listening");
    let served = axum::serve(listener, router).await;
    ticker.abort();
    served?;
    Ok(())
}

//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`: one turn; JSON, or SSE when `stream` is set
//! - `POST /v1/chat/stream`: one turn as an SSE stream
//! - `GET /v1/modes/{mode}/suggestions`: quick replies for a mode

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::request::{RequestError, normalize};
use selah_core::SuggestedAction;
use selah_engine::{ChatEngine, ChatReply, ChatRequest, EngineError, suggested_actions_for};

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/modes/{mode}/suggestions", get(suggestions_handler))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Parse and normalize the body, or produce the rejection response.
fn parse(
    state: &SharedState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ChatRequest, Response> {
    let Json(body) = body.map_err(|e| {
        warn!(error = %e, "Rejected malformed chat body");
        error_response(e.status(), e.body_text())
    })?;
    normalize(&body, state.history_limit).map_err(|e: RequestError| {
        warn!(error = %e, "Rejected chat request");
        error_response(StatusCode::BAD_REQUEST, e.to_string())
    })
}

/// `POST /v1/chat`
async fn chat_handler(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match parse(&state, body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    info!(
        stream = request.stream,
        mode = %request.mode,
        message_len = request.message.len(),
        "v1/chat request"
    );

    if request.stream {
        return sse_response(&state.engine, request).into_response();
    }

    let thread_id = ChatEngine::thread_id_for(&request);
    let wit_level = request.wit_level;
    let request = ChatRequest {
        thread_id: Some(thread_id.clone()),
        ..request
    };

    // Dropping this handler future (client gone) cancels the turn.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.engine.respond(request, cancel).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "Chat turn failed");
            apology(thread_id, wit_level, &e)
        }
    }
}

fn apology(thread_id: String, wit_level: selah_core::WitLevel, e: &EngineError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ChatReply::apology(thread_id, wit_level, e)),
    )
        .into_response()
}

/// `POST /v1/chat/stream`
async fn chat_stream_handler(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match parse(&state, body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    info!(
        mode = %request.mode,
        message_len = request.message.len(),
        "v1/chat/stream SSE request"
    );
    sse_response(&state.engine, request).into_response()
}

/// Run the turn and frame each event as one `data:` line.
fn sse_response(
    engine: &ChatEngine,
    request: ChatRequest,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>> + use<>> {
    let cancel = CancellationToken::new();
    let rx = engine.respond_stream(request, cancel.clone());
    let guard = cancel.drop_guard();

    let stream = ReceiverStream::new(rx).map(move |event| {
        // The guard lives as long as the response body.
        let _keep = &guard;
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().data(data))
    });

    Sse::new(stream)
}

/// `GET /v1/modes/{mode}/suggestions`
async fn suggestions_handler(Path(mode): Path<String>) -> Json<Vec<SuggestedAction>> {
    Json(suggested_actions_for(&mode))
}

//! Relay endpoints used by the project-management front end.
//!
//! - `POST /sync`          - Replace the cached readables and actions
//! - `GET  /state`         - The snapshot currently cached
//! - `POST /chat`          - `{message}` → `{text}` or `{toolCalls: [...]}`
//! - `POST /chat-stream`   - `{message}` → SSE stream of relay events
//! - `POST /action-result` - Echo an action's outcome back as an acknowledgement

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use pmrelay_assistant::{Completion, FunctionCall};
use pmrelay_core::state::Snapshot;

use crate::SharedState;

/// Error label reported for every failed non-streaming chat.
pub const CHAT_ERROR_LABEL: &str = "OpenAI API error";

pub fn relay_router() -> Router<SharedState> {
    Router::new()
        .route("/sync", post(sync_handler))
        .route("/state", get(state_handler))
        .route("/chat", post(chat_handler))
        .route("/chat-stream", post(chat_stream_handler))
        .route("/action-result", post(action_result_handler))
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body of a successful `/chat`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Text {
        text: String,
    },
    ToolCalls {
        #[serde(rename = "toolCalls")]
        tool_calls: Vec<ToolCallEnvelope>,
    },
}

#[derive(Debug, Serialize)]
pub struct ToolCallEnvelope {
    #[serde(rename = "functionCall")]
    pub function_call: FunctionCall,
}

impl From<Completion> for ChatReply {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Text(text) => ChatReply::Text { text },
            Completion::FunctionCall(function_call) => ChatReply::ToolCalls {
                tool_calls: vec![ToolCallEnvelope { function_call }],
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatErrorResponse {
    pub error: String,
    pub details: Value,
}

#[derive(Debug, Serialize)]
pub struct ActionResultResponse {
    pub status: String,
    pub result: Value,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn sync_handler(
    State(state): State<SharedState>,
    Json(snapshot): Json<Snapshot>,
) -> Json<StatusResponse> {
    let snapshot = state.cache.replace(snapshot);
    info!(
        readables = snapshot.readables.len(),
        actions = snapshot.actions.len(),
        "State synced"
    );
    Json(StatusResponse {
        status: "ok".into(),
    })
}

async fn state_handler(State(state): State<SharedState>) -> Json<Snapshot> {
    Json(state.cache.snapshot().as_ref().clone())
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<ChatErrorResponse>)> {
    let request_id = uuid::Uuid::new_v4();
    let snapshot = state.cache.snapshot();
    info!(%request_id, actions = snapshot.actions.len(), "chat request");

    match state.assistant.chat(&snapshot, &payload.message).await {
        Ok(completion) => {
            let reply = ChatReply::from(completion);
            debug!(%request_id, tool_call = matches!(reply, ChatReply::ToolCalls { .. }), "chat answered");
            Ok(Json(reply))
        }
        Err(e) => {
            error!(%request_id, error = %e, "chat failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatErrorResponse {
                    error: CHAT_ERROR_LABEL.into(),
                    details: e.details(),
                }),
            ))
        }
    }
}

/// `POST /chat-stream` - each relay event is sent as one `data:` frame.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> impl IntoResponse {
    let request_id = uuid::Uuid::new_v4();
    let snapshot = state.cache.snapshot();
    info!(%request_id, actions = snapshot.actions.len(), "chat-stream request");

    let rx = state.assistant.chat_stream(&snapshot, &payload.message);

    let stream = ReceiverStream::new(rx).map(move |event| {
        debug!(%request_id, event = event.event_type(), "stream event");
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(SseEvent::default().data(data))
    });

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream),
    )
}

/// `POST /action-result` - acknowledge without processing.
///
/// An empty body is echoed as `{}`.
async fn action_result_handler(
    body: Bytes,
) -> Result<Json<ActionResultResponse>, (StatusCode, Json<ErrorResponse>)> {
    let result = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid JSON body: {e}"),
                }),
            )
        })?
    };

    info!("action result received");
    Ok(Json(ActionResultResponse {
        status: "received".into(),
        result,
    }))
}

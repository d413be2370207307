//! Streaming events relayed to the caller.
//!
//! `StreamEvent` is the normalized unit the gateway forwards over SSE, one
//! `data: <json>` line per event. A well-formed stream is:
//!
//! - zero or one `thinking`
//! - zero or more `content` (each carrying only its delta)
//! - exactly one of `function_call`, `complete` or `error`, after which the
//!   stream closes
//!
//! `function_call.arguments` stays the raw accumulated string here, whereas
//! the non-streaming reply parses it into an object. Consumers of both paths
//! have to handle that difference.

use serde::{Deserialize, Serialize};

/// Events emitted while relaying a streamed completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The request was accepted; sent before the provider answers.
    Thinking,

    /// Incremental text delta.
    Content { content: String },

    /// The model requested an action. Terminal.
    FunctionCall { function_call: StreamedFunctionCall },

    /// The full accumulated text. Terminal.
    Complete { content: String },

    /// Transport or provider failure. Terminal.
    Error { error: String },
}

/// A function call as accumulated from stream fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamedFunctionCall {
    pub name: String,
    pub arguments: String,
}

impl StreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking => "thinking",
            Self::Content { .. } => "content",
            Self::FunctionCall { .. } => "function_call",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FunctionCall { .. } | Self::Complete { .. } | Self::Error { .. }
        )
    }
}

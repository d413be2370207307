//! Provider trait - the abstraction over the LLM completion service.
//!
//! A Provider knows how to send a system prompt, a user message and a set of
//! callable functions to an LLM, and get back either a complete reply or a
//! channel of incremental stream frames.
//!
//! Implementations: the OpenAI-compatible HTTP provider, plus scripted stubs
//! in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-3.5-turbo-1106")
    pub model: String,

    /// The messages, system prompt first
    pub messages: Vec<Message>,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Functions the model may call (automatic selection)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<ToolDefinition>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// A callable function exposed to the LLM, derived 1:1 from an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the parameters, unvalidated
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

/// A function call requested by the model, `arguments` still a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallPayload {
    pub name: String,
    pub arguments: String,
}

/// The first choice of a completion, as the provider reported it.
///
/// Classification into "text" vs "function call" is the dispatcher's job;
/// this type only carries the raw signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallPayload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ProviderReply {
    /// A plain text reply that finished normally.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_call: None,
            finish_reason: Some("stop".into()),
        }
    }

    /// A function-call reply that finished with `finish_reason = "function_call"`.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCallPayload {
                name: name.into(),
                arguments: arguments.into(),
            }),
            finish_reason: Some("function_call".into()),
        }
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub reply: ProviderReply,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One decoded frame of a provider stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// An incremental delta.
    Delta(StreamDelta),
    /// The terminator sentinel (`[DONE]`).
    Done,
}

/// The incremental payload of one stream frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub function_call: Option<FunctionCallDelta>,
}

impl StreamDelta {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            function_call: None,
        }
    }

    pub fn function_call(name: Option<&str>, arguments: Option<&str>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCallDelta {
                name: name.map(String::from),
                arguments: arguments.map(String::from),
            }),
        }
    }
}

/// A fragment of a function call; both fields append to what came before.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub arguments: Option<String>,
}

/// Receiving half of a provider stream.
pub type FrameReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamFrame, ProviderError>>;

/// The core Provider trait.
///
/// The assistant calls `complete()` or `stream()` without knowing which
/// backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a channel of stream frames.
    ///
    /// Default implementation calls `complete()` and replays the reply as a
    /// single delta followed by the terminator.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<FrameReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let delta = StreamDelta {
            content: response.reply.content,
            function_call: response.reply.function_call.map(|fc| FunctionCallDelta {
                name: Some(fc.name),
                arguments: Some(fc.arguments),
            }),
        };
        let _ = tx.send(Ok(StreamFrame::Delta(delta))).await;
        let _ = tx.send(Ok(StreamFrame::Done)).await;
        Ok(rx)
    }

    /// Health check - can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

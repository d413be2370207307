//! Prompt construction and response dispatch - the core of pmrelay.
//!
//! For every chat message the [`Assistant`]:
//!
//! 1. **Builds** a system prompt from the fixed rules plus the current readables
//! 2. **Exposes** the current actions as callable functions
//! 3. **Sends** system prompt + user message to the provider
//! 4. **Classifies** the reply as text or a function call ([`dispatch`]), or,
//!    when streaming, **reassembles** deltas into relay events ([`reassembler`])
//!
//! The assistant never executes actions itself; a function call is handed
//! back to the caller, which runs it on the front end.

pub mod dispatch;
pub mod prompt;
pub mod reassembler;
pub mod tools;

pub use dispatch::{Completion, FunctionCall, classify};
pub use prompt::{REFUSAL, build_system_prompt};
pub use reassembler::StreamReassembler;
pub use tools::tool_definitions;

use std::sync::Arc;

use pmrelay_core::error::ProviderError;
use pmrelay_core::message::Message;
use pmrelay_core::provider::{Provider, ProviderRequest};
use pmrelay_core::state::Snapshot;
use pmrelay_core::stream_event::StreamEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of the per-request event channel.
const EVENT_BUFFER: usize = 64;

/// Relays chat messages to the provider with the current snapshot as context.
#[derive(Clone)]
pub struct Assistant {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Assistant {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build an assistant with the model settings from configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &pmrelay_config::ProviderConfig) -> Self {
        Self::new(provider, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Assemble the provider request for one message against one snapshot.
    pub fn build_request(&self, snapshot: &Snapshot, message: &str, stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(build_system_prompt(&snapshot.readables)),
                Message::user(message.trim()),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            functions: tool_definitions(&snapshot.actions),
            stream,
        }
    }

    /// One-shot completion, classified into text or a function call.
    pub async fn chat(&self, snapshot: &Snapshot, message: &str) -> Result<Completion, ProviderError> {
        let request = self.build_request(snapshot, message, false);
        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        classify(response.reply)
    }

    /// Streamed completion.
    ///
    /// The returned channel yields `thinking` right away, then content deltas,
    /// then exactly one terminal event, and is closed afterwards. The request
    /// is built from `snapshot` before this returns.
    pub fn chat_stream(&self, snapshot: &Snapshot, message: &str) -> mpsc::Receiver<StreamEvent> {
        let request = self.build_request(snapshot, message, true);
        let provider = self.provider.clone();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            if tx.send(StreamEvent::Thinking).await.is_err() {
                return;
            }

            match provider.stream(request).await {
                Ok(frames) => reassembler::relay(frames, &tx).await,
                Err(e) => {
                    let _ = tx
                        .send(StreamEvent::Error {
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        });

        rx
    }
}

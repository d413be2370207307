//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any proxy that exposes the same
//! `/v1/chat/completions` endpoint.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Legacy function calling (`functions` + `function_call: "auto"`)
//! - Health checks against the sibling `/models` endpoint

use async_trait::async_trait;
use futures::StreamExt;
use pmrelay_core::error::ProviderError;
use pmrelay_core::provider::*;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::sse::{LineBuffer, ParsedLine, parse_line};

/// An OpenAI-compatible LLM provider.
///
/// The configured timeout bounds connecting and every read. A non-streaming
/// request is also bounded as a whole; a streamed body is not, so a long
/// generation survives as long as chunks keep arriving.
pub struct OpenAiCompatProvider {
    name: String,
    api_url: String,
    api_key: String,
    timeout: std::time::Duration,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider for the given chat-completions URL.
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client,
        })
    }

    /// The chat-completions URL requests are sent to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// The `/models` endpoint next to the configured chat-completions URL.
    fn models_url(&self) -> String {
        match self.api_url.strip_suffix("/chat/completions") {
            Some(base) => format!("{base}/models"),
            None => format!("{}/models", self.api_url),
        }
    }

    /// Build the chat-completions request body.
    ///
    /// `functions` and `function_call` are omitted when there is nothing to
    /// call, since the API rejects an empty function list.
    fn build_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.functions.is_empty() {
            body["functions"] = serde_json::json!(request.functions);
            body["function_call"] = serde_json::json!("auto");
        }

        body
    }

    /// POST the body and turn transport failures and non-2xx statuses into errors.
    async fn send(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        } else {
            builder = builder.timeout(self.timeout);
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string(), e.is_timeout()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                body: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = Self::build_body(&request, false);

        debug!(
            provider = %self.name,
            model = %request.model,
            functions = request.functions.len(),
            "Sending completion request"
        );

        let response = self.send(&body, false).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(e.to_string(), e.is_timeout()))?;

        parse_completion(status, &text, &request.model)
    }

    async fn stream(&self, request: ProviderRequest) -> Result<FrameReceiver, ProviderError> {
        let body = Self::build_body(&request, true);

        debug!(
            provider = %self.name,
            model = %request.model,
            functions = request.functions.len(),
            "Sending streaming request"
        );

        let response = self.send(&body, true).await?;

        let (tx, rx) = mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and forward frames in arrival order
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                lines.push(&bytes);
                while let Some(line) = lines.next_line() {
                    if forward_line(&provider_name, &line, &tx).await == Flow::Stop {
                        return;
                    }
                }
            }

            if let Some(line) = lines.finish() {
                if forward_line(&provider_name, &line, &tx).await == Flow::Stop {
                    return;
                }
            }

            // Body ended without the sentinel: finalize with what arrived.
            debug!(provider = %provider_name, "Stream ended without [DONE]");
            let _ = tx.send(Ok(StreamFrame::Done)).await;
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(self.models_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string(), e.is_timeout()))?;

        Ok(response.status().is_success())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Classify one line and forward it. Stops after the terminator, after an
/// in-band provider error, or once the receiver has gone away.
async fn forward_line(
    provider_name: &str,
    line: &str,
    tx: &mpsc::Sender<Result<StreamFrame, ProviderError>>,
) -> Flow {
    match parse_line(line) {
        ParsedLine::Frame(frame) => {
            let done = frame == StreamFrame::Done;
            if tx.send(Ok(frame)).await.is_err() || done {
                return Flow::Stop;
            }
        }
        ParsedLine::Skip => {}
        ParsedLine::Malformed { data, reason } => {
            trace!(
                provider = %provider_name,
                data = %data,
                error = %reason,
                "Ignoring unparseable SSE chunk"
            );
        }
        ParsedLine::Failed { message } => {
            warn!(provider = %provider_name, error = %message, "Provider failed mid-stream");
            let _ = tx.send(Err(ProviderError::StreamInterrupted(message))).await;
            return Flow::Stop;
        }
    }
    Flow::Continue
}

/// Interpret a 2xx completion body.
///
/// Some proxies answer a failed request with a 2xx status and an
/// `{"error": {...}}` body; that is reported as an API error carrying the
/// body, like a non-2xx status would be.
fn parse_completion(
    status_code: u16,
    body: &str,
    requested_model: &str,
) -> Result<ProviderResponse, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    if api_response.choices.is_empty() && api_response.error.is_some() {
        warn!(status = status_code, body = %body, "Provider returned an error body");
        return Err(ProviderError::ApiError {
            status_code,
            body: body.to_string(),
        });
    }

    api_response.into_provider_response(requested_model)
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<ApiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl ApiResponse {
    fn into_provider_response(self, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let reply = ProviderReply {
            content: choice.message.content,
            function_call: choice.message.function_call.map(|fc| FunctionCallPayload {
                name: fc.name,
                arguments: fc.arguments,
            }),
            finish_reason: choice.finish_reason,
        };

        let usage = self.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            reply,
            usage,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmrelay_core::message::Message;

    fn request(functions: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-3.5-turbo-1106".into(),
            messages: vec![Message::system("rules"), Message::user("hi")],
            temperature: None,
            max_tokens: None,
            functions,
            stream: false,
        }
    }

    #[test]
    fn models_url_is_sibling_of_chat_completions() {
        let provider = OpenAiCompatProvider::new(
            "openai",
            "https://api.openai.com/v1/chat/completions",
            "sk-test",
            std::time::Duration::from_secs(120),
        )
        .unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.models_url(), "https://api.openai.com/v1/models");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new(
            "proxy",
            "http://localhost:8000/v1/chat/completions/",
            "",
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.api_url(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(provider.models_url(), "http://localhost:8000/v1/models");
    }

    #[test]
    fn body_with_functions_enables_auto_calling() {
        let body = OpenAiCompatProvider::build_body(
            &request(vec![ToolDefinition {
                name: "getEmployeeById".into(),
                description: "Fetch an employee".into(),
                parameters: serde_json::json!({"type": "object"}),
            }]),
            false,
        );
        assert_eq!(body["function_call"], "auto");
        assert_eq!(body["functions"][0]["name"], "getEmployeeById");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["stream"], false);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn body_without_functions_omits_function_fields() {
        let mut req = request(vec![]);
        req.temperature = Some(0.2);
        let body = OpenAiCompatProvider::build_body(&req, true);
        assert!(body.get("functions").is_none());
        assert!(body.get("function_call").is_none());
        assert_eq!(body["stream"], true);
        assert!(body["temperature"].as_f64().is_some());
    }

    #[test]
    fn parse_text_response() {
        let data = r#"{
            "model": "gpt-3.5-turbo-1106",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parsed.into_provider_response("requested").unwrap();
        assert_eq!(response.reply, ProviderReply::text("Hi there"));
        assert_eq!(response.model, "gpt-3.5-turbo-1106");
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn parse_function_call_response() {
        let data = r#"{
            "choices": [{
                "message": {"role": "assistant", "content": null,
                            "function_call": {"name": "getEmployeeById", "arguments": "{\"id\":5}"}},
                "finish_reason": "function_call"
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parsed.into_provider_response("requested").unwrap();
        assert_eq!(
            response.reply,
            ProviderReply::function_call("getEmployeeById", "{\"id\":5}")
        );
        assert_eq!(response.model, "requested");
    }

    #[test]
    fn response_without_choices_is_malformed() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = parsed.into_provider_response("m").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn error_body_with_success_status_is_api_error() {
        let body = r#"{"error":{"message":"quota exceeded","type":"insufficient_quota"}}"#;
        let err = parse_completion(200, body, "m").unwrap_err();
        match &err {
            ProviderError::ApiError { status_code, body: kept } => {
                assert_eq!(*status_code, 200);
                assert_eq!(kept, body);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.details()["error"]["message"], "quota exceeded");
    }

    #[test]
    fn non_json_success_body_is_malformed() {
        let err = parse_completion(200, "<html>gateway</html>", "m").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn choices_win_over_null_error() {
        let body = r#"{"choices":[{"message":{"content":"Hi"},"finish_reason":"stop"}],"error":null}"#;
        let response = parse_completion(200, body, "m").unwrap();
        assert_eq!(response.reply, ProviderReply::text("Hi"));
    }

    #[tokio::test]
    async fn forward_line_turns_error_chunk_into_stream_error() {
        let (tx, mut rx) = mpsc::channel(4);
        let line = r#"data: {"error":{"message":"The server is overloaded"}}"#;
        assert_eq!(forward_line("t", line, &tx).await, Flow::Stop);
        drop(tx);

        match rx.recv().await.unwrap() {
            Err(ProviderError::StreamInterrupted(message)) => {
                assert_eq!(message, "The server is overloaded")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn forward_line_stops_after_done() {
        let (tx, mut rx) = mpsc::channel(4);
        assert_eq!(forward_line("t", ": ping", &tx).await, Flow::Continue);
        assert_eq!(forward_line("t", "data: nope", &tx).await, Flow::Continue);
        assert_eq!(forward_line("t", "data: [DONE]", &tx).await, Flow::Stop);
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().unwrap(), StreamFrame::Done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn forward_line_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let line = r#"data: {"choices":[{"delta":{"content":"x"}}]}"#;
        assert_eq!(forward_line("t", line, &tx).await, Flow::Stop);
    }
}

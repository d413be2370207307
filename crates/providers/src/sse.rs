//! Server-sent-event framing for chat-completion streams.
//!
//! The provider body arrives as arbitrary byte chunks. [`LineBuffer`] cuts it
//! into lines on byte boundaries (a multi-byte character split across two
//! chunks is decoded only once its line is complete), and [`parse_line`]
//! classifies each line.
//!
//! Only `data:` lines carry frames. Blank lines, `:` comments (keep-alives)
//! and other SSE fields are skipped, and a `data:` payload that is neither the
//! `[DONE]` sentinel nor a JSON chunk is reported as malformed so the caller
//! can drop it. Neither case is an error. A chunk carrying an `error` object
//! is the provider failing mid-stream and ends the stream.

use pmrelay_core::provider::{FunctionCallDelta, StreamDelta, StreamFrame};
use serde::Deserialize;

/// The terminator sentinel sent as the last `data:` payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates raw body bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of body bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, without its `\n` / `\r\n` ending.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Take whatever is left once the body has ended (an unterminated last line).
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&rest);
        let line = line.trim_end_matches('\r');
        (!line.is_empty()).then(|| line.to_string())
    }
}

/// How one line of the stream was classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A delta or the terminator.
    Frame(StreamFrame),
    /// Not a data line: blank separator, comment or other SSE field.
    Skip,
    /// A data line whose payload is not a JSON chunk. Dropped by the reader.
    Malformed { data: String, reason: String },
    /// An in-band `{"error": {...}}` chunk.
    Failed { message: String },
}

/// Classify one SSE line.
pub fn parse_line(line: &str) -> ParsedLine {
    let Some(data) = line.strip_prefix("data:") else {
        return ParsedLine::Skip;
    };
    let data = data.trim();

    if data == DONE_SENTINEL {
        return ParsedLine::Frame(StreamFrame::Done);
    }

    match serde_json::from_str::<ChunkResponse>(data) {
        Ok(ChunkResponse {
            error: Some(error), ..
        }) => ParsedLine::Failed {
            message: error_message(&error),
        },
        Ok(chunk) => ParsedLine::Frame(StreamFrame::Delta(chunk.into_delta())),
        Err(e) => ParsedLine::Malformed {
            data: data.to_string(),
            reason: e.to_string(),
        },
    }
}

// --- Streaming chunk wire types ---

/// A single `data: {...}` chunk of a streaming completion.
#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `error.message` when the provider sends one, else the whole error object.
fn error_message(error: &serde_json::Value) -> String {
    match error.get("message").and_then(|m| m.as_str()) {
        Some(message) => message.to_string(),
        None => error.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<ChunkFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunctionCall {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl ChunkResponse {
    /// Only the first choice is relayed; the relay never asks for `n > 1`.
    fn into_delta(self) -> StreamDelta {
        let Some(choice) = self.choices.into_iter().next() else {
            return StreamDelta::default();
        };
        StreamDelta {
            content: choice.delta.content,
            function_call: choice.delta.function_call.map(|fc| FunctionCallDelta {
                name: fc.name,
                arguments: fc.arguments,
            }),
        }
    }
}

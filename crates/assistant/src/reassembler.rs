//! Reassembly of a streamed completion into relay events.
//!
//! Text deltas are forwarded as they arrive (only the delta, never the running
//! total) and also accumulated. Function-call fragments are accumulated
//! silently: the first fragment opens the accumulator, later ones append to
//! both `name` and `arguments`. The terminator then closes the stream with a
//! single `function_call` event when an accumulator exists, or a `complete`
//! event carrying the full text otherwise. A transport error closes it with
//! an `error` event, even if content was already sent.

use pmrelay_core::provider::{FrameReceiver, StreamDelta, StreamFrame};
use pmrelay_core::stream_event::{StreamEvent, StreamedFunctionCall};
use tokio::sync::mpsc;
use tracing::debug;

/// Accumulated state of one stream.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    text: String,
    function_call: Option<StreamedFunctionCall>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one delta. Returns the `content` event to forward, if any.
    pub fn on_delta(&mut self, delta: StreamDelta) -> Option<StreamEvent> {
        if let Some(fragment) = delta.function_call {
            let acc = self.function_call.get_or_insert_with(Default::default);
            if let Some(name) = fragment.name {
                acc.name.push_str(&name);
            }
            if let Some(arguments) = fragment.arguments {
                acc.arguments.push_str(&arguments);
            }
        }

        match delta.content {
            Some(content) if !content.is_empty() => {
                self.text.push_str(&content);
                Some(StreamEvent::Content { content })
            }
            _ => None,
        }
    }

    /// The terminal event for the terminator sentinel.
    pub fn finish(self) -> StreamEvent {
        match self.function_call {
            Some(function_call) => StreamEvent::FunctionCall { function_call },
            None => StreamEvent::Complete { content: self.text },
        }
    }
}

/// Drain provider frames into relay events, in arrival order.
///
/// Sends exactly one terminal event unless the event receiver has gone away,
/// in which case it stops reading. Nothing is sent after the terminal event.
pub async fn relay(mut frames: FrameReceiver, events: &mpsc::Sender<StreamEvent>) {
    let mut reassembler = StreamReassembler::new();

    while let Some(item) = frames.recv().await {
        match item {
            Ok(StreamFrame::Delta(delta)) => {
                if let Some(event) = reassembler.on_delta(delta) {
                    if events.send(event).await.is_err() {
                        debug!("Stream consumer went away; dropping provider stream");
                        return;
                    }
                }
            }
            Ok(StreamFrame::Done) => {
                let _ = events.send(reassembler.finish()).await;
                return;
            }
            Err(e) => {
                let _ = events
                    .send(StreamEvent::Error {
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        }
    }

    // Provider channel closed without a terminator.
    let _ = events.send(reassembler.finish()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmrelay_core::error::ProviderError;

    async fn run(frames: Vec<Result<StreamFrame, ProviderError>>) -> Vec<StreamEvent> {
        let (frame_tx, frame_rx) = mpsc::channel(frames.len().max(1));
        for frame in frames {
            frame_tx.send(frame).await.unwrap();
        }
        drop(frame_tx);

        let (tx, mut rx) = mpsc::channel(32);
        relay(frame_rx, &tx).await;
        drop(tx);

        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    fn content(text: &str) -> Result<StreamFrame, ProviderError> {
        Ok(StreamFrame::Delta(StreamDelta::content(text)))
    }

    #[tokio::test]
    async fn text_deltas_then_complete() {
        let events = run(vec![content("Hel"), content("lo"), Ok(StreamFrame::Done)]).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Content {
                    content: "Hel".into()
                },
                StreamEvent::Content {
                    content: "lo".into()
                },
                StreamEvent::Complete {
                    content: "Hello".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn function_call_fragments_accumulate() {
        let events = run(vec![
            Ok(StreamFrame::Delta(StreamDelta::function_call(Some("addProduct"), None))),
            Ok(StreamFrame::Delta(StreamDelta::function_call(
                None,
                Some(r#"{"name":"#),
            ))),
            Ok(StreamFrame::Delta(StreamDelta::function_call(None, Some(r#""Pen"}"#)))),
            Ok(StreamFrame::Done),
        ])
        .await;
        assert_eq!(
            events,
            vec![StreamEvent::FunctionCall {
                function_call: StreamedFunctionCall {
                    name: "addProduct".into(),
                    arguments: r#"{"name":"Pen"}"#.into(),
                }
            }]
        );
    }

    #[tokio::test]
    async fn split_function_name_is_appended() {
        let events = run(vec![
            Ok(StreamFrame::Delta(StreamDelta::function_call(Some("add"), Some("")))),
            Ok(StreamFrame::Delta(StreamDelta::function_call(Some("Product"), Some("{}")))),
            Ok(StreamFrame::Done),
        ])
        .await;
        match &events[..] {
            [StreamEvent::FunctionCall { function_call }] => {
                assert_eq!(function_call.name, "addProduct");
                assert_eq!(function_call.arguments, "{}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn function_call_wins_over_text() {
        let events = run(vec![
            content("Sure, "),
            Ok(StreamFrame::Delta(StreamDelta::function_call(Some("addProduct"), Some("{}")))),
            Ok(StreamFrame::Done),
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Content { .. }));
        assert!(matches!(events[1], StreamEvent::FunctionCall { .. }));
    }

    #[tokio::test]
    async fn empty_deltas_emit_nothing() {
        let events = run(vec![
            Ok(StreamFrame::Delta(StreamDelta::default())),
            content(""),
            Ok(StreamFrame::Done),
        ])
        .await;
        assert_eq!(
            events,
            vec![StreamEvent::Complete {
                content: String::new()
            }]
        );
    }

    #[tokio::test]
    async fn error_after_partial_content() {
        let events = run(vec![
            content("Hel"),
            Err(ProviderError::StreamInterrupted("connection reset".into())),
            content("never sent"),
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::Content {
                content: "Hel".into()
            }
        );
        match &events[1] {
            StreamEvent::Error { error } => assert!(error.contains("connection reset")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn nothing_after_done() {
        let events = run(vec![content("a"), Ok(StreamFrame::Done), content("b")]).await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn closed_channel_finalizes() {
        let events = run(vec![content("partial")]).await;
        assert_eq!(
            events.last(),
            Some(&StreamEvent::Complete {
                content: "partial".into()
            })
        );
    }
}

//! Classification of a complete provider reply.
//!
//! A reply is a function call when the provider says so through
//! `finish_reason == "function_call"` **or** when it carries a
//! `function_call` payload. Either signal alone is enough. Everything else is
//! plain text, reported verbatim.

use pmrelay_core::error::ProviderError;
use pmrelay_core::provider::ProviderReply;
use serde::{Deserialize, Serialize};

/// The finish reason the provider uses for function calls.
pub const FUNCTION_CALL_FINISH_REASON: &str = "function_call";

/// A function call with its arguments parsed into JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: serde_json::Value,
}

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Answer with text.
    Text(String),
    /// Ask the caller to run an action.
    FunctionCall(FunctionCall),
}

/// Decide between text and function call.
///
/// Fails when the reply signals a function call without a payload, or when
/// the payload's `arguments` are not valid JSON.
pub fn classify(reply: ProviderReply) -> Result<Completion, ProviderError> {
    let signals_call = reply.finish_reason.as_deref() == Some(FUNCTION_CALL_FINISH_REASON);

    if !signals_call && reply.function_call.is_none() {
        return Ok(Completion::Text(reply.content.unwrap_or_default()));
    }

    let payload = reply.function_call.ok_or_else(|| {
        ProviderError::MalformedResponse(
            "finish_reason is function_call but the reply has no function_call".into(),
        )
    })?;

    let args = serde_json::from_str(&payload.arguments).map_err(|e| {
        ProviderError::InvalidArguments {
            name: payload.name.clone(),
            reason: e.to_string(),
        }
    })?;

    Ok(Completion::FunctionCall(FunctionCall {
        name: payload.name,
        args,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmrelay_core::provider::FunctionCallPayload;
    use serde_json::json;

    #[test]
    fn plain_text_is_reported_verbatim() {
        let completion = classify(ProviderReply::text("  two products  ")).unwrap();
        assert_eq!(completion, Completion::Text("  two products  ".into()));
    }

    #[test]
    fn null_content_becomes_empty_text() {
        let reply = ProviderReply {
            content: None,
            function_call: None,
            finish_reason: Some("length".into()),
        };
        assert_eq!(classify(reply).unwrap(), Completion::Text(String::new()));
    }

    #[test]
    fn function_call_with_finish_reason() {
        let completion =
            classify(ProviderReply::function_call("getEmployeeById", r#"{"id":5}"#)).unwrap();
        assert_eq!(
            completion,
            Completion::FunctionCall(FunctionCall {
                name: "getEmployeeById".into(),
                args: json!({"id": 5}),
            })
        );
    }

    #[test]
    fn payload_alone_is_enough() {
        let reply = ProviderReply {
            content: Some("Let me look that up".into()),
            function_call: Some(FunctionCallPayload {
                name: "getEmployeeById".into(),
                arguments: r#"{"id":5}"#.into(),
            }),
            finish_reason: Some("stop".into()),
        };
        assert!(matches!(
            classify(reply).unwrap(),
            Completion::FunctionCall(FunctionCall { ref name, .. }) if name == "getEmployeeById"
        ));
    }

    #[test]
    fn finish_reason_without_payload_is_an_error() {
        let reply = ProviderReply {
            content: None,
            function_call: None,
            finish_reason: Some("function_call".into()),
        };
        assert!(matches!(
            classify(reply).unwrap_err(),
            ProviderError::MalformedResponse(_)
        ));
    }

    #[test]
    fn malformed_arguments_are_an_error() {
        let err = classify(ProviderReply::function_call("addProduct", "{name: Pen")).unwrap_err();
        match err {
            ProviderError::InvalidArguments { name, .. } => assert_eq!(name, "addProduct"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

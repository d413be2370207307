//! Readables and actions: the two catalogs a front end syncs.
//!
//! A [`Readable`] is a described slice of application state the assistant
//! may reason over. An [`Action`] is an operation the front end knows how to
//! execute; the assistant can only *request* it.

use serde::{Deserialize, Serialize};

/// One described slice of application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readable {
    /// Human-readable label, rendered verbatim into the system prompt.
    pub description: String,

    /// Arbitrary JSON data. Missing values deserialize as `null`.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Readable {
    pub fn new(description: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            description: description.into(),
            value,
        }
    }
}

/// One callable operation exposed by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Function name the model will use to request this action.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON-Schema-like parameter description. Passed to the provider as-is,
    /// with no well-formedness checks.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

//! # pmrelay Core
//!
//! Domain types, traits, and error definitions for the pmrelay LLM relay.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that the provider, assistant and gateway crates implement against.
//!
//! ## Domain
//!
//! - A front end syncs a [`Snapshot`] of [`Readable`]s (state it exposes for
//!   read-only reasoning) and [`Action`]s (operations it can execute).
//! - A [`Provider`] turns a [`ProviderRequest`] into either a complete
//!   [`ProviderResponse`] or a channel of [`StreamFrame`]s.
//! - Streaming progress is relayed to callers as [`StreamEvent`]s.

pub mod catalog;
pub mod error;
pub mod message;
pub mod provider;
pub mod state;
pub mod stream_event;

// Re-export key types at crate root for ergonomics
pub use catalog::{Action, Readable};
pub use error::{Error, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{
    FrameReceiver, FunctionCallDelta, FunctionCallPayload, Provider, ProviderReply, ProviderRequest,
    ProviderResponse, StreamDelta, StreamFrame, ToolDefinition, Usage,
};
pub use state::{Snapshot, StateCache};
pub use stream_event::{StreamEvent, StreamedFunctionCall};

//! LLM provider implementations for pmrelay.
//!
//! All providers implement the `pmrelay_core::Provider` trait. The relay
//! talks to one OpenAI-compatible chat-completions endpoint, built from
//! configuration by [`build_from_config`].

pub mod openai_compat;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;

use pmrelay_core::error::ProviderError;

/// Build the configured provider.
pub fn build_from_config(
    config: &pmrelay_config::AppConfig,
) -> Result<OpenAiCompatProvider, ProviderError> {
    let provider = &config.provider;
    if provider.api_key.is_none() {
        tracing::warn!("No API key configured (set OPENAI_API_KEY); provider calls will be rejected");
    }
    OpenAiCompatProvider::new(
        "openai",
        &provider.api_url,
        provider.api_key.clone().unwrap_or_default(),
        std::time::Duration::from_secs(provider.timeout_secs),
    )
}

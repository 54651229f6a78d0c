//! LLM Provider implementations for autoclaw.
//!
//! All providers implement the `autoclaw_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use autoclaw_core::Provider;
use std::sync::Arc;

/// Build the shared provider from configuration.
///
/// One HTTP client pool is shared by every agent in the process.
pub fn build_from_config(config: &autoclaw_config::AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!(api_url = %config.api_url, "No API key configured");
    }
    Arc::new(OpenAiCompatProvider::new("openai", &config.api_url, api_key))
}

//! Multi-provider AI normalization layer
//!
//! Calls heterogeneous providers (chat-completions-compatible endpoints,
//! a vision variant, Google Gemini file references) with provider-specific
//! request shapes, and folds their wildly differing responses into one
//! uniform [`Outcome`]. Soft failures signaled inside HTTP 200 bodies are
//! classified and retried within a fixed ceiling.

mod chat;
mod classify;
mod error;
mod extract;
mod gemini;
mod orchestrator;
#[cfg(test)]
mod proptests;
mod types;

pub use chat::{ChatBody, HttpTransport};
pub use classify::{classify, Verdict};
pub use error::AiError;
pub use gemini::GeminiBody;
pub use orchestrator::{Orchestrator, MAX_RETRIES};
pub use types::{sniff_mime, AiRequest, ImageInput, Outcome, Payload};

use crate::config::{ProviderConfig, ProviderKind};
use async_trait::async_trait;
use serde_json::Value;

/// Wire-level request body, one variant per provider shape.
#[derive(Debug)]
pub enum ProviderBody {
    Chat(ChatBody),
    Gemini(GeminiBody),
}

/// The network seam between the orchestrator and a provider. Production
/// uses [`HttpTransport`]; tests substitute a scripted implementation so
/// the retry loop is exercised without sockets.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(&self, provider: &ProviderConfig, body: &ProviderBody)
        -> Result<Value, AiError>;
}

/// Extractor for a provider kind, chosen once at resolution time rather
/// than re-detected per response.
pub fn extractor_for(kind: ProviderKind) -> fn(&Value) -> Outcome {
    match kind {
        ProviderKind::Chat | ProviderKind::Vision => extract::extract_chat,
        ProviderKind::Gemini => extract::extract_gemini,
    }
}

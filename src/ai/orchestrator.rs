//! Request orchestration
//!
//! Drives one logical call through build → send → classify → retry-or-settle
//! as an explicit bounded loop. Settlement always yields exactly one
//! [`Outcome`]; configuration, transport, and shape errors are folded into
//! `Failure` payloads here and never propagate further. Cost tracking is the
//! caller's job — the generation id rides along on the outcome.

use super::chat::ChatBody;
use super::gemini::GeminiBody;
use super::types::{AiRequest, Outcome};
use super::{classify, extract, extractor_for, ProviderBody, ProviderTransport};
use crate::config::{ConfigStore, ProviderConfig, ProviderKind};
use std::sync::Arc;
use std::time::Duration;

/// Additional attempts after the first for the retryable soft failure.
pub const MAX_RETRIES: u32 = 2;

/// Fixed pause before re-issuing a retryable request.
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Orchestrator {
    config: Arc<ConfigStore>,
    transport: Arc<dyn ProviderTransport>,
}

impl Orchestrator {
    pub fn new(config: Arc<ConfigStore>, transport: Arc<dyn ProviderTransport>) -> Self {
        Self { config, transport }
    }

    /// Drive one logical call to settlement. Configuration is resolved
    /// fresh, so an external reload takes effect on the next call.
    pub async fn run(&self, request: &AiRequest) -> Outcome {
        let provider = match self.config.resolve(&request.capability) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::error!(capability = %request.capability, error = %e, "resolution failed");
                return Outcome::failure(e.to_string(), false);
            }
        };
        self.drive(&provider, request).await
    }

    async fn drive(&self, provider: &ProviderConfig, request: &AiRequest) -> Outcome {
        let body = match provider.kind {
            ProviderKind::Gemini => ProviderBody::Gemini(GeminiBody::build(request)),
            ProviderKind::Chat | ProviderKind::Vision => {
                ProviderBody::Chat(ChatBody::build(provider, request))
            }
        };
        let extract_outcome = extractor_for(provider.kind);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let started = std::time::Instant::now();
            let raw = match self.transport.send(provider, &body).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!(
                        capability = %request.capability,
                        model = %provider.model,
                        attempt,
                        error = %e,
                        "provider call failed"
                    );
                    return Outcome::failure(e.to_string(), false);
                }
            };
            tracing::info!(
                capability = %request.capability,
                model = %provider.model,
                attempt,
                duration_ms = started.elapsed().as_millis() as u64,
                "provider call completed"
            );

            let generation_id = extract::generation_id(&raw);
            let verdict = classify::classify(&raw);
            if verdict.has_error {
                let reason = verdict.reason.unwrap_or_default();
                if verdict.retryable && attempt <= MAX_RETRIES {
                    tracing::warn!(
                        capability = %request.capability,
                        reason = %reason,
                        attempt,
                        "soft failure, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
                let message = if verdict.retryable {
                    format!("provider produced no image after {attempt} attempts (finish reason: {reason})")
                } else {
                    format!("provider reported failure (finish reason: {reason})")
                };
                return Outcome::failure(message, false).with_generation_id(generation_id);
            }

            return extract_outcome(&raw);
        }
    }
}

//! Chat-completions wire format and the production HTTP transport

use super::types::AiRequest;
use super::{AiError, ProviderBody, ProviderTransport};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Image- and video-capable models are slow; give them minutes.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(300);

/// Request body for chat-completions-compatible endpoints.
#[derive(Debug, Serialize)]
pub struct ChatBody {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

/// Content is either a plain string or an array of typed parts.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

impl ChatBody {
    pub fn build(provider: &ProviderConfig, request: &AiRequest) -> Self {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system.clone()),
            });
        }

        let content = if request.images.is_empty() {
            MessageContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.prompt.clone(),
            }];
            parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.to_data_uri(),
                },
            }));
            MessageContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: "user",
            content,
        });

        Self {
            model: provider.model.clone(),
            messages,
            modalities: request.want_image.then(|| vec!["image"]),
        }
    }
}

/// Production transport: one reqwest client shared across calls.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(
        &self,
        provider: &ProviderConfig,
        body: &ProviderBody,
    ) -> Result<Value, AiError> {
        let request = match body {
            ProviderBody::Chat(chat) => self
                .client
                .post(&provider.url)
                .header("Authorization", format!("Bearer {}", provider.key))
                .header("Content-Type", "application/json")
                .json(chat),
            ProviderBody::Gemini(gemini) => self
                .client
                .post(super::gemini::endpoint(provider))
                .header("x-goog-api-key", provider.key.clone())
                .header("Content-Type", "application/json")
                .json(gemini),
        };

        let response = request.send().await.map_err(AiError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(AiError::from_reqwest)?;

        if !status.is_success() {
            return Err(AiError::transport(
                format!("HTTP {status}: {}", snippet(&text)),
                Some(status.as_u16()),
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| AiError::Shape(format!("{e} - body: {}", snippet(&text))))
    }
}

/// First ~300 chars of a body for error messages.
fn snippet(text: &str) -> &str {
    let mut cut = text.len().min(300);
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

//! Request and response bodies for the command surface

use crate::ledger::ChatUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DescribeRequest {
    pub chat_id: i64,
    pub user: ChatUser,
    /// Explicit image; falls back to the chat's last seen image.
    #[serde(default)]
    pub image_b64: Option<String>,
    /// Override for the default description prompt.
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub chat_id: i64,
    pub user: ChatUser,
    pub prompt: String,
    /// "imagegen" (default) or "abcgen".
    #[serde(default)]
    pub capability: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformSource {
    /// The chat's last seen image.
    #[default]
    Last,
    /// The last image the system generated for this chat.
    Generated,
}

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub chat_id: i64,
    pub user: ChatUser,
    pub prompt: String,
    #[serde(default)]
    pub source: TransformSource,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub chat_id: i64,
    pub user: ChatUser,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub user: ChatUser,
    /// Transcript text for chat-shaped providers.
    #[serde(default)]
    pub text: Option<String>,
    /// Uploaded-file reference for the Gemini shape.
    #[serde(default)]
    pub file_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushImageRequest {
    pub chat_id: i64,
    pub image_b64: String,
    /// Start a fresh album before adding this image.
    #[serde(default)]
    pub new_album: bool,
}

/// Uniform command result; mirrors the outcome variants.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResponse {
    Text {
        body: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        generation_id: Option<String>,
    },
    Image {
        image_b64: String,
        format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        generation_id: Option<String>,
    },
    ImageUrl {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        generation_id: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub users: Vec<UserStatRow>,
    pub total_spent: f64,
    pub user_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UserStatRow {
    pub rank: usize,
    pub user_id: i64,
    pub display_name: String,
    pub total_spent: f64,
    pub total_requests: i64,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub capabilities: Vec<CapabilityInfo>,
}

#[derive(Debug, Serialize)]
pub struct CapabilityInfo {
    pub capability: String,
    pub provider: String,
    pub model: String,
}

//! Google Gemini generateContent wire format
//!
//! The file-reference variant: content parts carry a `file_data` URI (for
//! already-uploaded media) followed by the prompt text. Responses come back
//! as `candidates[0].content.parts[].text` or a `promptFeedback` block
//! signal; see the extractor.

use super::types::AiRequest;
use crate::config::ProviderConfig;
use serde::Serialize;

const TEMPERATURE: f32 = 0.7;

/// `POST {endpoint}/models/{model}:generateContent`
pub fn endpoint(provider: &ProviderConfig) -> String {
    format!(
        "{}/models/{}:generateContent",
        provider.url.trim_end_matches('/'),
        provider.model
    )
}

#[derive(Debug, Serialize)]
pub struct GeminiBody {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    FileData { file_data: FileData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

impl GeminiBody {
    pub fn build(request: &AiRequest) -> Self {
        let mut parts = Vec::new();
        if let Some(uri) = &request.file_uri {
            parts.push(GeminiPart::FileData {
                file_data: FileData {
                    file_uri: uri.clone(),
                },
            });
        }
        // Gemini has no system role in this shape; fold the system text in.
        let text = match &request.system {
            Some(system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.clone(),
        };
        parts.push(GeminiPart::Text { text });

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn test_endpoint_format() {
        let provider = ProviderConfig {
            url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            key: "k".to_string(),
            model: "gemini-2.0-flash".to_string(),
            kind: ProviderKind::Gemini,
        };
        assert_eq!(
            endpoint(&provider),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_body_with_file_reference() {
        let request = AiRequest::text("summary", "summarize this video")
            .with_file_uri("https://example.com/files/abc");
        let body = serde_json::to_value(GeminiBody::build(&request)).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0]["file_data"]["file_uri"],
            "https://example.com/files/abc"
        );
        assert_eq!(parts[1]["text"], "summarize this video");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_body_without_file_reference() {
        let request = AiRequest::text("summary", "plain text").with_system("be brief");
        let body = serde_json::to_value(GeminiBody::build(&request)).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "be brief\n\nplain text");
    }
}

//! Provider response extraction
//!
//! Turns a raw provider JSON body into one uniform [`Outcome`], regardless
//! of which provider produced it. Image-capable models answer in several
//! shapes: an inline multimodal image field, a data-URI or hosted URL in the
//! text content, a URL buried inside prose, or an alternate top-level `data`
//! array. A malformed-but-parseable body never errors out of here; it
//! settles as a non-retryable failure with a diagnostic.

use super::types::{Outcome, Payload};
use base64::Engine as _;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn data_uri_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:image/(\w+);base64,(.+)$").unwrap())
}

fn embedded_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").unwrap())
}

/// Provider-assigned generation id, used later for cost lookup.
pub fn generation_id(raw: &Value) -> Option<String> {
    raw.get("id").and_then(Value::as_str).map(String::from)
}

/// `data:image/{format};base64,{payload}` → decoded bytes plus format.
fn parse_data_uri(s: &str) -> Option<(Vec<u8>, String)> {
    let captures = data_uri_re().captures(s)?;
    let format = captures.get(1)?.as_str().to_string();
    let payload = captures.get(2)?.as_str();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((bytes, format))
}

/// A URL string becomes either decoded inline bytes or a hosted reference.
fn url_outcome(url: &str) -> Payload {
    match parse_data_uri(url) {
        Some((bytes, format)) => Payload::Image { bytes, format },
        None => Payload::ImageRef {
            url: url.to_string(),
        },
    }
}

/// Extract an outcome from a chat-completions-shaped response.
pub fn extract_chat(raw: &Value) -> Outcome {
    let generation_id = generation_id(raw);

    let message = raw
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"));

    if let Some(message) = message {
        // 1. Inline multimodal image field.
        if let Some(url) = message
            .get("images")
            .and_then(|imgs| imgs.get(0))
            .and_then(|img| img.get("image_url"))
            .and_then(|iu| iu.get("url"))
            .and_then(Value::as_str)
        {
            return Outcome {
                payload: url_outcome(url),
                generation_id,
            };
        }

        // 2. Textual content: data-URI, bare URL, embedded URL, plain text.
        if let Some(content) = message.get("content").and_then(Value::as_str) {
            if !content.is_empty() {
                if let Some((bytes, format)) = parse_data_uri(content) {
                    return Outcome {
                        payload: Payload::Image { bytes, format },
                        generation_id,
                    };
                }
                if content.starts_with("http://") || content.starts_with("https://") {
                    return Outcome {
                        payload: Payload::ImageRef {
                            url: content.to_string(),
                        },
                        generation_id,
                    };
                }
                if let Some(found) = embedded_url_re().find(content) {
                    return Outcome {
                        payload: Payload::ImageRef {
                            url: found.as_str().to_string(),
                        },
                        generation_id,
                    };
                }
                return Outcome {
                    payload: Payload::Text {
                        body: content.to_string(),
                    },
                    generation_id,
                };
            }
        }
    }

    // 3. Alternate provider shape: top-level data array.
    if let Some(url) = raw
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|entry| entry.get("url"))
        .and_then(Value::as_str)
    {
        return Outcome {
            payload: url_outcome(url),
            generation_id,
        };
    }

    // 4. Unrecoverable shape mismatch.
    Outcome {
        payload: Payload::Failure {
            message: format!("unrecognized response shape: {}", summarize(raw)),
            retryable: false,
        },
        generation_id,
    }
}

/// Extract an outcome from a Gemini generateContent response: concatenate
/// all text parts of the first candidate, or surface the block reason.
pub fn extract_gemini(raw: &Value) -> Outcome {
    let generation_id = generation_id(raw);

    if let Some(parts) = raw
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
    {
        let body: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if !body.is_empty() {
            return Outcome {
                payload: Payload::Text { body },
                generation_id,
            };
        }
    }

    if let Some(reason) = raw
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Outcome {
            payload: Payload::Failure {
                message: format!("request blocked by provider: {reason}"),
                retryable: false,
            },
            generation_id,
        };
    }

    Outcome {
        payload: Payload::Failure {
            message: format!("no candidates in response: {}", summarize(raw)),
            retryable: false,
        },
        generation_id,
    }
}

/// Truncated single-line rendering of a body for diagnostics.
fn summarize(raw: &Value) -> String {
    let mut rendered = raw.to_string();
    if rendered.len() > 300 {
        let mut cut = 300;
        while !rendered.is_char_boundary(cut) {
            cut -= 1;
        }
        rendered.truncate(cut);
        rendered.push_str("...");
    }
    rendered
}

//! Finish-reason classification
//!
//! Providers signal soft failures through completion-reason fields while
//! still returning HTTP 200. The provider-native field is authoritative;
//! the generic one is a fallback. A missing reason field counts as success:
//! providers that omit the field are not penalized.

use serde_json::Value;

/// Reason codes that mean "stopped normally" in the provider-native field
/// (Gemini uses STOP, OpenAI uses completed).
const NATIVE_SUCCESS: &[&str] = &["STOP", "completed"];

/// Reason codes that mean "stopped normally" in the generic field.
const GENERIC_SUCCESS: &[&str] = &["stop", "completed"];

/// The single retryable soft failure: the model finished without emitting
/// an image.
const NO_IMAGE: &str = "NO_IMAGE";

/// Classification of one raw provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub has_error: bool,
    pub reason: Option<String>,
    pub retryable: bool,
}

impl Verdict {
    fn ok() -> Self {
        Self {
            has_error: false,
            reason: None,
            retryable: false,
        }
    }

    fn error(reason: &str, retryable: bool) -> Self {
        Self {
            has_error: true,
            reason: Some(reason.to_string()),
            retryable,
        }
    }
}

/// Inspect the finish-reason fields of a chat-shaped response.
pub fn classify(raw: &Value) -> Verdict {
    let Some(choice) = raw.get("choices").and_then(|c| c.get(0)) else {
        return Verdict::ok();
    };

    let native = choice
        .get("native_finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("");
    if !native.is_empty() {
        if native == NO_IMAGE {
            return Verdict::error(NO_IMAGE, true);
        }
        if !NATIVE_SUCCESS.contains(&native) {
            return Verdict::error(native, false);
        }
    }

    let generic = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("");
    if !generic.is_empty() && !GENERIC_SUCCESS.contains(&generic) {
        return Verdict::error(generic, false);
    }

    Verdict::ok()
}

//! Error taxonomy for provider calls
//!
//! Everything here is caught at the orchestrator boundary and converted to a
//! typed `Failure` outcome; nothing escapes to callers as a panic.
//! Configuration errors have their own type in the config module and are
//! folded into failures at resolution time.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    /// Non-2xx HTTP status, timeout, or connection failure. Terminal.
    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// Response body that could not be parsed as JSON. Terminal.
    #[error("malformed provider response: {0}")]
    Shape(String),
}

impl AiError {
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            Self::transport(format!("request timeout: {err}"), status)
        } else if err.is_connect() {
            Self::transport(format!("connection failed: {err}"), status)
        } else {
            Self::transport(format!("request failed: {err}"), status)
        }
    }
}

//! Ledger schema and row types

use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_statistics (
    user_id INTEGER PRIMARY KEY,
    username TEXT,
    first_name TEXT,
    last_name TEXT,
    total_spent REAL NOT NULL DEFAULT 0,
    total_requests INTEGER NOT NULL DEFAULT 0,
    last_request_date TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS request_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    generation_id TEXT,
    command TEXT,
    cost REAL,
    model TEXT,
    tokens_prompt INTEGER,
    tokens_completion INTEGER,
    request_date TEXT,

    FOREIGN KEY (user_id) REFERENCES user_statistics (user_id)
);

CREATE INDEX IF NOT EXISTS idx_request_history_user ON request_history(user_id);
"#;

/// Chat user a cost is attributed to. Display fields hold the last-seen
/// values and are refreshed on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl ChatUser {
    pub fn display_name(&self) -> String {
        display_name(
            self.username.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.id,
        )
    }
}

/// One settled, billed provider call; appended once per generation id.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user: ChatUser,
    pub generation_id: String,
    pub command: String,
    pub cost: f64,
    pub model: String,
    pub tokens_prompt: i64,
    pub tokens_completion: i64,
}

/// Aggregated running totals for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserTotals {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_spent: f64,
    pub total_requests: i64,
}

impl UserTotals {
    pub fn display_name(&self) -> String {
        display_name(
            self.username.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.user_id,
        )
    }
}

/// Preference order: @username, then "first last", then a numeric fallback.
fn display_name(
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    user_id: i64,
) -> String {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        return format!("@{username}");
    }
    if let Some(first) = first_name.filter(|f| !f.is_empty()) {
        return match last_name.filter(|l| !l.is_empty()) {
            Some(last) => format!("{first} {last}"),
            None => first.to_string(),
        };
    }
    format!("User {user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>, first: Option<&str>, last: Option<&str>) -> ChatUser {
        ChatUser {
            id: 42,
            username: username.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        }
    }

    #[test]
    fn test_display_name_prefers_username() {
        assert_eq!(
            user(Some("alice"), Some("Alice"), Some("Smith")).display_name(),
            "@alice"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_full_name() {
        assert_eq!(
            user(None, Some("Alice"), Some("Smith")).display_name(),
            "Alice Smith"
        );
        assert_eq!(user(None, Some("Alice"), None).display_name(), "Alice");
        assert_eq!(user(Some(""), Some("Alice"), None).display_name(), "Alice");
    }

    #[test]
    fn test_display_name_numeric_fallback() {
        assert_eq!(user(None, None, None).display_name(), "User 42");
    }
}

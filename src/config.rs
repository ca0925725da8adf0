//! Capability-to-provider configuration
//!
//! The configuration document is a JSON file mapping each capability name
//! ("describe", "imagegen", ...) to a set of named providers plus the key of
//! the currently active one:
//!
//! ```json
//! {
//!   "describe": {
//!     "provider": "openrouter",
//!     "openrouter": { "url": "...", "key": "...", "model": "..." },
//!     "grok": { "url": "...", "key": "...", "model": "...", "kind": "vision" }
//!   },
//!   "billing": { "url": "...", "credits_url": "...", "key": "..." }
//! }
//! ```
//!
//! The store can be reloaded while the process runs. Resolution always reads
//! the latest loaded snapshot; a snapshot is replaced wholesale so readers
//! never observe a partially-updated document.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error("capability '{0}' has no active provider set")]
    NoActiveProvider(String),
    #[error("capability '{capability}': active provider '{active}' is not configured (available: {available:?})")]
    UnknownProvider {
        capability: String,
        active: String,
        available: Vec<String>,
    },
}

/// Wire shape a provider speaks. Selected once at resolution time; the
/// extractor for a response is chosen by this tag, not re-detected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-style chat completions, with a generation id for billing.
    #[default]
    Chat,
    /// Chat completions without generation tracking (e.g. Grok vision).
    Vision,
    /// Google Gemini generateContent with file references.
    Gemini,
}

/// Concrete provider for one capability. Immutable once resolved for a call.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub key: String,
    pub model: String,
    #[serde(default)]
    pub kind: ProviderKind,
}

/// Billing endpoints for cost lookup and credits balance.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Generation metadata endpoint; queried as `{url}?id={generation_id}`.
    pub url: String,
    /// Credits endpoint for the balance report.
    #[serde(default)]
    pub credits_url: Option<String>,
    pub key: String,
}

/// One capability: the active provider key plus all configured providers.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityEntry {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BotConfig {
    #[serde(default)]
    pub billing: Option<BillingConfig>,
    #[serde(flatten)]
    pub capabilities: HashMap<String, CapabilityEntry>,
}

impl BotConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve a capability name to its active provider.
    pub fn resolve(&self, capability: &str) -> Result<ProviderConfig, ConfigError> {
        let entry = self
            .capabilities
            .get(capability)
            .ok_or_else(|| ConfigError::UnknownCapability(capability.to_string()))?;
        let active = entry
            .provider
            .as_deref()
            .ok_or_else(|| ConfigError::NoActiveProvider(capability.to_string()))?;
        entry.providers.get(active).cloned().ok_or_else(|| {
            let mut available: Vec<String> = entry.providers.keys().cloned().collect();
            available.sort();
            ConfigError::UnknownProvider {
                capability: capability.to_string(),
                active: active.to_string(),
                available,
            }
        })
    }
}

/// Reloadable configuration store.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<BotConfig>>,
}

impl ConfigStore {
    /// Load the config file and build a store around it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = BotConfig::from_file(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Re-parse the config file and swap the snapshot wholesale.
    /// On failure the previous snapshot stays in effect.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let fresh = Arc::new(BotConfig::from_file(&self.path)?);
        *self.current.write().unwrap() = fresh;
        tracing::info!(path = %self.path.display(), "configuration reloaded");
        Ok(())
    }

    /// Current snapshot. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<BotConfig> {
        self.current.read().unwrap().clone()
    }

    /// Resolve a capability against the latest loaded snapshot.
    pub fn resolve(&self, capability: &str) -> Result<ProviderConfig, ConfigError> {
        self.snapshot().resolve(capability)
    }

    pub fn billing(&self) -> Option<BillingConfig> {
        self.snapshot().billing.clone()
    }

    /// (capability, active provider key, model) for every capability with a
    /// resolvable active provider. Used by the reload report.
    pub fn active_providers(&self) -> Vec<(String, String, String)> {
        let snapshot = self.snapshot();
        let mut entries: Vec<(String, String, String)> = snapshot
            .capabilities
            .iter()
            .filter_map(|(name, entry)| {
                let active = entry.provider.as_deref()?;
                let provider = entry.providers.get(active)?;
                Some((name.clone(), active.to_string(), provider.model.clone()))
            })
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_from(json: &str) -> ConfigStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let store = ConfigStore::load(file.path()).unwrap();
        // Keep the file alive for the duration of the test via leak.
        std::mem::forget(file);
        store
    }

    const SAMPLE: &str = r#"{
        "describe": {
            "provider": "grok",
            "grok": {"url": "https://api.x.ai/v1/chat/completions", "key": "k1", "model": "grok-2-vision", "kind": "vision"},
            "openrouter": {"url": "https://openrouter.ai/api/v1/chat/completions", "key": "k2", "model": "qwen-vl"}
        },
        "imagegen": {
            "provider": "openrouter",
            "openrouter": {"url": "https://openrouter.ai/api/v1/chat/completions", "key": "k2", "model": "gemini-image"}
        },
        "summary": {
            "gemini": {"url": "https://generativelanguage.googleapis.com/v1beta", "key": "k3", "model": "gemini-flash", "kind": "gemini"}
        },
        "billing": {"url": "https://openrouter.ai/api/v1/generation", "credits_url": "https://openrouter.ai/api/v1/credits", "key": "k2"}
    }"#;

    #[test]
    fn test_resolve_active_provider() {
        let store = store_from(SAMPLE);
        let provider = store.resolve("describe").unwrap();
        assert_eq!(provider.model, "grok-2-vision");
        assert_eq!(provider.kind, ProviderKind::Vision);
        assert!(!provider.url.is_empty());
        assert!(!provider.key.is_empty());
    }

    #[test]
    fn test_default_kind_is_chat() {
        let store = store_from(SAMPLE);
        let provider = store.resolve("imagegen").unwrap();
        assert_eq!(provider.kind, ProviderKind::Chat);
    }

    #[test]
    fn test_unknown_capability() {
        let store = store_from(SAMPLE);
        assert!(matches!(
            store.resolve("transcribe"),
            Err(ConfigError::UnknownCapability(_))
        ));
    }

    #[test]
    fn test_missing_active_provider() {
        let store = store_from(SAMPLE);
        assert!(matches!(
            store.resolve("summary"),
            Err(ConfigError::NoActiveProvider(_))
        ));
    }

    #[test]
    fn test_active_provider_not_configured() {
        let store = store_from(
            r#"{"describe": {"provider": "missing",
                "grok": {"url": "u", "key": "k", "model": "m"}}}"#,
        );
        match store.resolve("describe") {
            Err(ConfigError::UnknownProvider {
                active, available, ..
            }) => {
                assert_eq!(active, "missing");
                assert_eq!(available, vec!["grok".to_string()]);
            }
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"ask": {"provider": "a", "a": {"url": "u", "key": "k", "model": "old"}}}"#,
        )
        .unwrap();
        file.flush().unwrap();
        let store = ConfigStore::load(file.path()).unwrap();
        assert_eq!(store.resolve("ask").unwrap().model, "old");

        std::fs::write(
            file.path(),
            br#"{"ask": {"provider": "a", "a": {"url": "u", "key": "k", "model": "new"}}}"#,
        )
        .unwrap();
        store.reload().unwrap();
        assert_eq!(store.resolve("ask").unwrap().model, "new");
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"ask": {"provider": "a", "a": {"url": "u", "key": "k", "model": "m"}}}"#,
        )
        .unwrap();
        file.flush().unwrap();
        let store = ConfigStore::load(file.path()).unwrap();

        std::fs::write(file.path(), b"{not json").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.resolve("ask").unwrap().model, "m");
    }

    #[test]
    fn test_active_providers_report() {
        let store = store_from(SAMPLE);
        let active = store.active_providers();
        assert!(active.contains(&(
            "describe".to_string(),
            "grok".to_string(),
            "grok-2-vision".to_string()
        )));
        // "summary" has no active provider and is omitted.
        assert!(!active.iter().any(|(name, _, _)| name == "summary"));
    }
}

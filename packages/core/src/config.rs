//! Runtime configuration
//!
//! Layered, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. a JSON file named by `MINDMAP_CONFIG` (optional)
//! 3. environment overrides (`MINDMAP_DEBOUNCE_MS`, `MINDMAP_LINE_WIDTH`)
//!
//! All fields use `#[serde(default)]` so partial config files deserialize
//! without error.

use crate::codec::{CodecOptions, DEFAULT_LINE_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const CONFIG_PATH_ENV: &str = "MINDMAP_CONFIG";
pub const DEBOUNCE_ENV: &str = "MINDMAP_DEBOUNCE_MS";
pub const LINE_WIDTH_ENV: &str = "MINDMAP_LINE_WIDTH";

/// Narrowest line width the authorable dialect accepts
const MIN_LINE_WIDTH: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MindmapConfig {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub codec: CodecOptions,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Sync coordinator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period after the last text edit before reconciling
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Buffered outbound events per document before slow subscribers lag
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    256
}

/// Mutation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Write `metadata.created`/`metadata.updated` on created and updated nodes
    #[serde(default = "default_true")]
    pub stamp_timestamps: bool,

    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stamp_timestamps: true,
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_search_limit() -> usize {
    20
}

fn default_max_search_limit() -> usize {
    1000
}

impl MindmapConfig {
    /// Load from the process environment
    pub async fn load() -> Result<Self, String> {
        Self::load_with(|key| std::env::var(key).ok()).await
    }

    /// Load with an injectable environment lookup
    pub async fn load_with<F>(env: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match env(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path)).await?,
            None => Self::default(),
        };

        if let Some(raw) = env(DEBOUNCE_ENV) {
            config.sync.debounce_ms = raw
                .trim()
                .parse()
                .map_err(|e| format!("Invalid {}='{}': {}", DEBOUNCE_ENV, raw, e))?;
        }
        if let Some(raw) = env(LINE_WIDTH_ENV) {
            config.codec.line_width = raw
                .trim()
                .parse()
                .map_err(|e| format!("Invalid {}='{}': {}", LINE_WIDTH_ENV, raw, e))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;

        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sync.debounce_ms == 0 {
            return Err("sync.debounce_ms must be greater than 0".to_string());
        }

        if self.sync.event_capacity == 0 {
            return Err("sync.event_capacity must be greater than 0".to_string());
        }

        if self.codec.line_width < MIN_LINE_WIDTH {
            return Err(format!(
                "codec.line_width must be at least {} (default {})",
                MIN_LINE_WIDTH, DEFAULT_LINE_WIDTH
            ));
        }

        if self.engine.default_search_limit > self.engine.max_search_limit {
            return Err(format!(
                "engine.default_search_limit ({}) cannot exceed engine.max_search_limit ({})",
                self.engine.default_search_limit, self.engine.max_search_limit
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MindmapConfig::default();
        assert_eq!(config.sync.debounce_ms, 1000);
        assert_eq!(config.sync.event_capacity, 256);
        assert_eq!(config.codec.line_width, 120);
        assert!(config.engine.stamp_timestamps);
        assert_eq!(config.engine.default_search_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MindmapConfig::default();
        config.sync.debounce_ms = 0;
        assert!(config.validate().is_err());

        let mut config = MindmapConfig::default();
        config.codec.line_width = 10;
        assert!(config.validate().is_err());

        let mut config = MindmapConfig::default();
        config.engine.default_search_limit = 5000;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mindmap.json");
        std::fs::write(&path, r#"{"sync": {"debounce_ms": 250}}"#).unwrap();

        let config = MindmapConfig::load_with(env_of(&[(
            CONFIG_PATH_ENV,
            path.to_str().unwrap(),
        )]))
        .await
        .unwrap();

        assert_eq!(config.sync.debounce_ms, 250);
        assert_eq!(config.sync.event_capacity, 256);
        assert_eq!(config.codec.line_width, 120);
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mindmap.json");
        std::fs::write(&path, r#"{"sync": {"debounce_ms": 250}}"#).unwrap();

        let config = MindmapConfig::load_with(env_of(&[
            (CONFIG_PATH_ENV, path.to_str().unwrap()),
            (DEBOUNCE_ENV, "50"),
            (LINE_WIDTH_ENV, "80"),
        ]))
        .await
        .unwrap();

        assert_eq!(config.sync.debounce_ms, 50);
        assert_eq!(config.codec.line_width, 80);
    }

    #[tokio::test]
    async fn test_bad_env_value_is_rejected() {
        let err = MindmapConfig::load_with(env_of(&[(DEBOUNCE_ENV, "soon")]))
            .await
            .unwrap_err();
        assert!(err.contains(DEBOUNCE_ENV));
    }
}

//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MMSKIT_CONFIG` (environment variable)
//! 2. `~/.config/mmskit/config.toml` (Linux/macOS)
//!    `%APPDATA%\mmskit\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mms::compose::DEFAULT_PAGE_DURATION_MS;
use crate::model::attachment::MediaInference;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// MMS composition.
    pub compose: ComposeConfig,
    /// MMS parsing.
    pub parse: ParseConfig,
    /// Local message store.
    pub store: StoreConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// MMS composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Duration of the single composed page, in milliseconds.
    pub page_duration_ms: u32,
    /// Directory for MMS text files (default: `text/` inside the store).
    pub text_dir: Option<PathBuf>,
}

/// MMS parsing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Media-kind table for top-level attachments: "literal" or "extension".
    pub media_inference: MediaInference,
}

/// Local message store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory (default: `<data_dir>/mmskit/store`).
    pub path: Option<PathBuf>,
    /// Number of decoded MMS bodies kept in memory.
    pub cache_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            page_duration_ms: DEFAULT_PAGE_DURATION_MS,
            text_dir: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            cache_size: 50,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MMSKIT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mmskit").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mmskit")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mmskit.log")
}

/// Return the message store directory.
pub fn store_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.store.path {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mmskit")
        .join("store")
}

/// Return the directory MMS text files are written to.
pub fn text_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.compose.text_dir {
        return dir.clone();
    }
    store_dir(config).join("text")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.compose.page_duration_ms, 5440);
        assert!(cfg.compose.text_dir.is_none());
        assert_eq!(cfg.parse.media_inference, MediaInference::Literal);
        assert_eq!(cfg.store.cache_size, 50);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.compose.page_duration_ms, cfg.compose.page_duration_ms);
        assert_eq!(parsed.parse.media_inference, cfg.parse.media_inference);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[compose]
page_duration_ms = 8000

[parse]
media_inference = "extension"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.compose.page_duration_ms, 8000);
        assert_eq!(cfg.parse.media_inference, MediaInference::Extension);
        // Other fields use defaults
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.store.cache_size, 50);
    }

    #[test]
    fn test_unknown_inference_is_rejected() {
        let bad = r#"
[parse]
media_inference = "guess"
"#;
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn test_store_dir_override() {
        let mut cfg = Config::default();
        cfg.store.path = Some(PathBuf::from("/var/lib/mmskit"));
        assert_eq!(store_dir(&cfg), PathBuf::from("/var/lib/mmskit"));
    }

    #[test]
    fn test_text_dir_defaults_inside_store() {
        let mut cfg = Config::default();
        cfg.store.path = Some(PathBuf::from("/var/lib/mmskit"));
        assert_eq!(text_dir(&cfg), PathBuf::from("/var/lib/mmskit/text"));

        cfg.compose.text_dir = Some(PathBuf::from("/srv/mms-text"));
        assert_eq!(text_dir(&cfg), PathBuf::from("/srv/mms-text"));
    }
}

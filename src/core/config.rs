use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yml";
pub const BASE_URL_ENV: &str = "NOVEL_STUDIO_BASE_URL";

/// Request body shape for `POST /api/optimize`.
///
/// The bundled Python server (`web/app.py`) only reads `text`, so point at it with
/// `optimize_contract: legacy`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeContract {
    /// `{original, instruction, field}`
    #[default]
    Instruction,
    /// `{text, field}`, what the bundled server expects
    Legacy,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_true")]
    pub supports_streaming: bool,

    #[serde(default)]
    pub optimize_contract: OptimizeContract,

    #[serde(default = "default_chat_history_limit")]
    pub chat_history_limit: usize,

    #[serde(default = "default_toast_ms")]
    pub toast_ms: u64,

    #[serde(default = "default_loading_dot_interval_ms")]
    pub loading_dot_interval_ms: u64,

    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_true() -> bool {
    true
}
fn default_chat_history_limit() -> usize {
    60
}
fn default_toast_ms() -> u64 {
    1800
}
fn default_loading_dot_interval_ms() -> u64 {
    350
}
fn default_frame_ms() -> u64 {
    16
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            supports_streaming: true,
            optimize_contract: OptimizeContract::default(),
            chat_history_limit: default_chat_history_limit(),
            toast_ms: default_toast_ms(),
            loading_dot_interval_ms: default_loading_dot_interval_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Config {
    /// Loads `config.yml` from the working directory; a missing file means defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_FILE))?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.apply_base_url_override(&url);
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    pub fn apply_base_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.base_url = url.to_string();
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load_from(&dir.path().join("config.yml"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.chat_history_limit, 60);
        assert_eq!(config.toast_ms, 1800);
        assert_eq!(config.loading_dot_interval_ms, 350);
        assert!(config.supports_streaming);
        Ok(())
    }

    #[test]
    fn test_partial_yaml_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "base_url: http://novels.local:9000\nsupports_streaming: false\noptimize_contract: legacy\n",
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.base_url, "http://novels.local:9000");
        assert!(!config.supports_streaming);
        assert_eq!(config.optimize_contract, OptimizeContract::Legacy);
        assert_eq!(config.frame_ms, 16);
        Ok(())
    }

    #[test]
    fn test_save_round_trips_through_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        let config = Config {
            chat_history_limit: 20,
            ..Config::default()
        };
        config.save_to(&path)?;
        assert_eq!(Config::load_from(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(Config::parse("base_url: [unclosed").is_err());
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = Config::default();
        config.apply_base_url_override("   ");
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        config.apply_base_url_override("http://example.com");
        assert_eq!(config.base_url, "http://example.com");
    }
}

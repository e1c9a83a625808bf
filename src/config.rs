//! Configuration loaded from `autohunt.toml`.
//!
//! Keys missing from the file fall back to defaults. `ANTHROPIC_API_KEY`
//! takes precedence over the `api_key` in the file.

use anyhow::{Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::CoverLetterStyle;

pub const CONFIG_FILE: &str = "autohunt.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AutohuntConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bulk threshold used when the profile does not set one.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u8,

    #[serde(default = "default_dispatch_delay_min_ms")]
    pub dispatch_delay_min_ms: u64,

    #[serde(default = "default_dispatch_delay_max_ms")]
    pub dispatch_delay_max_ms: u64,

    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,

    #[serde(default)]
    pub default_style: CoverLetterStyle,

    /// Directory holding the profile, risk state and application log.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_match_threshold() -> u8 {
    70
}

fn default_dispatch_delay_min_ms() -> u64 {
    1500
}

fn default_dispatch_delay_max_ms() -> u64 {
    4000
}

fn default_collaborator_timeout_secs() -> u64 {
    90
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".autohunt")
}

impl Default for AutohuntConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            match_threshold: default_match_threshold(),
            dispatch_delay_min_ms: default_dispatch_delay_min_ms(),
            dispatch_delay_max_ms: default_dispatch_delay_max_ms(),
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            default_style: CoverLetterStyle::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl AutohuntConfig {
    /// Loads `autohunt.toml` from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AutohuntConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.match_threshold > 100 {
            bail!("match_threshold must be within 0..=100, got {}", self.match_threshold);
        }
        if self.dispatch_delay_min_ms > self.dispatch_delay_max_ms {
            bail!(
                "dispatch_delay_min_ms ({}) exceeds dispatch_delay_max_ms ({})",
                self.dispatch_delay_min_ms,
                self.dispatch_delay_max_ms
            );
        }
        if self.collaborator_timeout_secs == 0 {
            bail!("collaborator_timeout_secs must be positive");
        }
        if self.max_tokens == 0 {
            bail!("max_tokens must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = AutohuntConfig::default();
        assert_eq!(config.match_threshold, 70);
        assert_eq!(config.dispatch_delay_min_ms, 1500);
        assert_eq!(config.dispatch_delay_max_ms, 4000);
        assert_eq!(config.collaborator_timeout_secs, 90);
        assert_eq!(config.default_style, CoverLetterStyle::Professional);
        assert_eq!(config.data_dir, PathBuf::from(".autohunt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"
            match_threshold = 80
            default_style = "technical"
        "#;
        let config: AutohuntConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.match_threshold, 80);
        assert_eq!(config.default_style, CoverLetterStyle::Technical);
        assert_eq!(config.dispatch_delay_max_ms, 4000);
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let config = AutohuntConfig {
            dispatch_delay_min_ms: 5000,
            dispatch_delay_max_ms: 1000,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dispatch_delay_min_ms"));
    }

    #[test]
    fn threshold_above_hundred_is_rejected() {
        let config = AutohuntConfig {
            match_threshold: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "model = \"claude-haiku-4-5\"\ncollaborator_timeout_secs = 30\n")
            .unwrap();
        let config = AutohuntConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.collaborator_timeout_secs, 30);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutohuntConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.match_threshold, 70);
    }

    #[test]
    fn invalid_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "dispatch_delay_min_ms = 9000\n").unwrap();
        assert!(AutohuntConfig::load_from(&path).is_err());
    }
}

//! Configuration loading for smus2mid.
//!
//! # Usage
//!
//! ```rust,no_run
//! use smusconf::SmusConfig;
//!
//! let (config, sources) = SmusConfig::load_with_sources_from(None).expect("Failed to load config");
//! println!("Loaded from: {:?}", sources.files);
//! println!("Exploded tracks: {}", config.convert.explode);
//! print!("{}", config.to_toml());
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/smus2mid/config.toml` (system)
//! 2. `~/.config/smus2mid/config.toml` (user)
//! 3. `./smus2mid.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`SMUS2MID_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [convert]
//! explode = false
//! copyright = ""
//! extension = "mid"
//! channel_per_track = false
//!
//! [logging]
//! level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ConvertConfig, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete smus2mid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SmusConfig {
    #[serde(default)]
    pub convert: ConvertConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SmusConfig {
    /// Load configuration from all sources and report where values came from.
    /// `config_path` stands in for the local `./smus2mid.toml`; system and
    /// user configs still load first.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = SmusConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::overlay_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# smus2mid configuration\n\n");

        output.push_str("[convert]\n");
        output.push_str(&format!("explode = {}\n", self.convert.explode));
        output.push_str(&format!("copyright = {:?}\n", self.convert.copyright));
        output.push_str(&format!("extension = {:?}\n", self.convert.extension));
        output.push_str(&format!(
            "channel_per_track = {}\n",
            self.convert.channel_per_track
        ));

        output.push_str("\n[logging]\n");
        output.push_str(&format!("level = {:?}\n", self.logging.level));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SmusConfig::default();
        assert!(!config.convert.explode);
        assert_eq!(config.convert.copyright(), None);
        assert_eq!(config.convert.extension, "mid");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = SmusConfig::default();
        config.convert.explode = true;
        config.convert.copyright = "(c) 1987 \"EA\"".to_string();

        let toml = config.to_toml();
        assert!(toml.contains("[convert]"));
        assert!(toml.contains("[logging]"));

        let parsed: SmusConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_config_file_is_ignored() {
        let files = discover_config_files_with_override(Some(Path::new(
            "/nonexistent/smus2mid.toml",
        )));
        assert!(!files.iter().any(|f| f.starts_with("/nonexistent")));
    }
}

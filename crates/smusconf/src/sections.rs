//! Config sections.

use serde::{Deserialize, Serialize};

/// Conversion defaults. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// One track per instrument instead of one per part.
    /// Default: false
    #[serde(default)]
    pub explode: bool,

    /// Copyright text written at the start of every track. Empty means none.
    /// Default: ""
    #[serde(default)]
    pub copyright: String,

    /// Extension given to output files.
    /// Default: mid
    #[serde(default = "ConvertConfig::default_extension")]
    pub extension: String,

    /// Put each output track on its own MIDI channel.
    /// Default: false
    #[serde(default)]
    pub channel_per_track: bool,
}

impl ConvertConfig {
    fn default_extension() -> String {
        "mid".to_string()
    }

    /// Copyright text, if any was configured
    pub fn copyright(&self) -> Option<&str> {
        Some(self.copyright.as_str()).filter(|c| !c.is_empty())
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            explode: false,
            copyright: String::new(),
            extension: Self::default_extension(),
            channel_per_track: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `smus=debug`.
    /// Default: info
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

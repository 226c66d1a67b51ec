//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SmusConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only returns
/// files that exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    // System config
    let system = PathBuf::from("/etc/smus2mid/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("smus2mid/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        let path = expand_path(&path.to_string_lossy());
        if path.exists() {
            files.push(path);
            return files;
        }
    }

    let local = PathBuf::from("smus2mid.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Apply the keys set in a TOML file on top of `config`.
pub fn overlay_file(config: &mut SmusConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    overlay_toml(config, &contents, path)
}

/// Only keys present in `contents` are touched, so a later file can change
/// one setting without resetting the others.
fn overlay_toml(config: &mut SmusConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let wrong_type = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{} must be a {}", key, expected),
    };

    if let Some(convert) = table.get("convert").and_then(|v| v.as_table()) {
        if let Some(v) = convert.get("explode") {
            config.convert.explode = v
                .as_bool()
                .ok_or_else(|| wrong_type("convert.explode", "boolean"))?;
        }
        if let Some(v) = convert.get("copyright") {
            config.convert.copyright = v
                .as_str()
                .ok_or_else(|| wrong_type("convert.copyright", "string"))?
                .to_string();
        }
        if let Some(v) = convert.get("extension") {
            config.convert.extension = v
                .as_str()
                .ok_or_else(|| wrong_type("convert.extension", "string"))?
                .to_string();
        }
        if let Some(v) = convert.get("channel_per_track") {
            config.convert.channel_per_track = v
                .as_bool()
                .ok_or_else(|| wrong_type("convert.channel_per_track", "boolean"))?;
        }
    }

    if let Some(logging) = table.get("logging").and_then(|v| v.as_table()) {
        if let Some(v) = logging.get("level") {
            config.logging.level = v
                .as_str()
                .ok_or_else(|| wrong_type("logging.level", "string"))?
                .to_string();
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SmusConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |name| env::var(name).ok());
}

fn apply_overrides_from(
    config: &mut SmusConfig,
    sources: &mut ConfigSources,
    var: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = var("SMUS2MID_EXPLODE").as_deref().and_then(parse_flag) {
        config.convert.explode = v;
        sources.env_overrides.push("SMUS2MID_EXPLODE".to_string());
    }
    if let Some(v) = var("SMUS2MID_COPYRIGHT") {
        config.convert.copyright = v;
        sources.env_overrides.push("SMUS2MID_COPYRIGHT".to_string());
    }
    if let Some(v) = var("SMUS2MID_EXTENSION") {
        config.convert.extension = v;
        sources.env_overrides.push("SMUS2MID_EXTENSION".to_string());
    }
    if let Some(v) = var("SMUS2MID_CHANNEL_PER_TRACK")
        .as_deref()
        .and_then(parse_flag)
    {
        config.convert.channel_per_track = v;
        sources
            .env_overrides
            .push("SMUS2MID_CHANNEL_PER_TRACK".to_string());
    }

    if let Some(v) = var("SMUS2MID_LOG_LEVEL") {
        config.logging.level = v;
        sources.env_overrides.push("SMUS2MID_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = var("RUST_LOG") {
        config.logging.level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        let (var_name, rest) = stripped.split_once('/').unwrap_or((stripped, ""));
        if let Ok(var_value) = env::var(var_name) {
            return PathBuf::from(var_value).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let mut config = SmusConfig::default();
        overlay_toml(&mut config, "[convert]\nexplode = true\n", Path::new("test.toml")).unwrap();
        assert!(config.convert.explode);
        // Other values should be defaults
        assert_eq!(config.convert.extension, "mid");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_later_file_only_overrides_its_keys() {
        let mut config = SmusConfig::default();
        overlay_toml(
            &mut config,
            r#"
[convert]
explode = true
copyright = "(c) 1987"

[logging]
level = "debug"
"#,
            Path::new("system.toml"),
        )
        .unwrap();
        overlay_toml(
            &mut config,
            "[convert]\nextension = \"midi\"\n",
            Path::new("user.toml"),
        )
        .unwrap();

        assert!(config.convert.explode);
        assert_eq!(config.convert.copyright(), Some("(c) 1987"));
        assert_eq!(config.convert.extension, "midi");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let mut config = SmusConfig::default();
        let err = overlay_toml(
            &mut config,
            "[convert]\nexplode = \"yes\"\n",
            Path::new("bad.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("convert.explode"));
    }

    #[test]
    fn test_invalid_toml() {
        let mut config = SmusConfig::default();
        let err = overlay_toml(&mut config, "[convert", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overlay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[convert]\nchannel_per_track = true").unwrap();

        let mut config = SmusConfig::default();
        overlay_file(&mut config, file.path()).unwrap();
        assert!(config.convert.channel_per_track);
        assert!(!config.convert.explode);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SmusConfig::default();
        let err = overlay_file(&mut config, &dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_cli_path_is_discovered() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"warn\"").unwrap();

        let files = discover_config_files_with_override(Some(file.path()));
        assert_eq!(files.last().map(PathBuf::as_path), Some(file.path()));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SmusConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(
            &mut config,
            &mut sources,
            vars(&[
                ("SMUS2MID_EXPLODE", "yes"),
                ("SMUS2MID_COPYRIGHT", "(c) 1987"),
                ("SMUS2MID_CHANNEL_PER_TRACK", "maybe"),
                ("SMUS2MID_LOG_LEVEL", "debug"),
                ("RUST_LOG", "smus=trace"),
            ]),
        );

        assert!(config.convert.explode);
        assert_eq!(config.convert.copyright, "(c) 1987");
        // Unparseable flag is ignored
        assert!(!config.convert.channel_per_track);
        assert_eq!(config.logging.level, "smus=trace");
        assert_eq!(
            sources.env_overrides,
            vec![
                "SMUS2MID_EXPLODE",
                "SMUS2MID_COPYRIGHT",
                "SMUS2MID_LOG_LEVEL",
                "RUST_LOG"
            ]
        );
    }
}

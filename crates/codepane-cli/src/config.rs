//! `Codepane.toml` discovery and parsing.
//!
//! Search order:
//! 1. Current working directory upward
//! 2. Upward from the executable's directory
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const FILE_NAME: &str = "Codepane.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub share: ShareConfig,
    pub autosave: AutosaveConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
    #[serde(skip)]
    pub source: ConfigSource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Scheme and host of the hosted playground
    pub origin: String,
    pub path: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub quiet_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { quiet_ms: 500 }
    }
}

impl AutosaveConfig {
    pub fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot directory, relative to the project directory
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".codepane"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: 9333 }
    }
}

impl RelayConfig {
    pub fn endpoint(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    #[default]
    Default,
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

fn read(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config = parse(&content).with_context(|| format!("Invalid {}", path.display()))?;
    config.source = ConfigSource::File(path.to_path_buf());
    Ok(config)
}

pub fn detect() -> Result<Config> {
    let from_cwd = std::env::current_dir().ok().and_then(|cwd| find_config(&cwd));
    let from_exe = || {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().and_then(find_config))
    };

    let config = match from_cwd.or_else(from_exe) {
        Some(path) => read(&path)?,
        None => Config::default(),
    };
    match &config.source {
        ConfigSource::File(path) => log::debug!("Using configuration from {}", path.display()),
        ConfigSource::Default => log::debug!("No {FILE_NAME} found, using defaults"),
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
            [share]
            origin = "https://play.example"

            [relay]
            port = 7000
            "#,
        )
        .unwrap();
        assert_eq!(config.share.origin, "https://play.example");
        assert_eq!(config.share.path, "/");
        assert_eq!(config.relay.endpoint(), "ws://127.0.0.1:7000");
        assert_eq!(config.autosave.quiet(), Duration::from_millis(500));
        assert_eq!(config.storage.dir, PathBuf::from(".codepane"));
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(parse("[sahre]\norigin = \"x\"").is_err());
    }

    #[test]
    fn found_in_a_parent_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(FILE_NAME), "[autosave]\nquiet_ms = 50\n").unwrap();

        let path = find_config(&nested).unwrap();
        assert_eq!(path, root.path().join(FILE_NAME));

        let config = read(&path).unwrap();
        assert_eq!(config.autosave.quiet_ms, 50);
        assert_eq!(config.source, ConfigSource::File(path));
    }
}

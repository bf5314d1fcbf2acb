//! Configuration management for Shelfscan.
//!
//! Configuration is loaded from the platform config directory (or an explicit
//! path) with sensible defaults, then a handful of environment variables are
//! layered on top so the service can be deployed with env alone.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Shelfscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Upstream model settings
    pub llm: LlmConfig,

    /// Temporary upload storage
    pub upload: UploadConfig,

    /// CSV export settings
    pub export: ExportConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.shelfscan.shelfscan/config.toml
    /// - Linux: ~/.config/shelfscan/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\shelfscan\config\config.toml
    ///
    /// Falls back to ~/.shelfscan/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "shelfscan", "shelfscan")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".shelfscan").join("config.toml")
            })
    }

    /// Apply `PORT` and `SHELFSCAN_EXPORT_CSV` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using the given lookup function.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }

        if let Some(flag) = lookup("SHELFSCAN_EXPORT_CSV") {
            self.export.enabled = matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        self.validate()
    }

    /// Get the resolved upload directory (with ~ expansion).
    pub fn upload_dir(&self) -> PathBuf {
        expand(&self.upload.dir)
    }

    /// Get the resolved export directory (with ~ expansion).
    pub fn export_dir(&self) -> PathBuf {
        expand(&self.export.dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.style, CallStyle::ChatSchema);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(!config.export.enabled);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[llm]"));
        assert!(toml.contains("[export]"));
    }

    #[test]
    fn test_load_from_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[llm]\nstyle = \"responses\"\n\n[export]\nenabled = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.llm.style, CallStyle::Responses);
        assert!(config.export.enabled);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.api_key, "${OPENAI_API_KEY}");
    }

    #[test]
    fn test_load_from_rejects_unknown_style() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\nstyle = \"telepathy\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_overrides_port_and_export() {
        let mut config = Config::default();
        config
            .apply_env_with(env(&[("PORT", "3000"), ("SHELFSCAN_EXPORT_CSV", "true")]))
            .unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.export.enabled);
    }

    #[test]
    fn test_env_without_port_keeps_default() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("PORT", "")])).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_rejects_garbage_port() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(env(&[("PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_env_rejects_zero_port() {
        let mut config = Config::default();
        let err = config.apply_env_with(env(&[("PORT", "0")])).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }
}

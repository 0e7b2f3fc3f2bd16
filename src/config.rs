//! Configuration management for thrifty
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (thrifty.toml)
//! - Environment variables (THRIFTY__*)
//!
//! ## Example config file (thrifty.toml):
//! ```toml
//! [decode]
//! protocol = "binary"
//! max_depth = 64
//! missing_fields = "omit"
//! lenient = false
//!
//! [output]
//! format = "compact"
//!
//! [schemas]
//! paths = ["idl/account.thrift"]
//! dirs = ["idl/shared"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::mapper::{MapOptions, MissingPolicy, DEFAULT_MAX_DEPTH};
use crate::transcode::{DecodeOptions, Protocol};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThriftyConfig {
    /// Decode settings
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Schema locations
    #[serde(default)]
    pub schemas: SchemasConfig,
}

/// Decode configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Wire protocol of incoming messages
    #[serde(default)]
    pub protocol: Protocol,

    /// Nesting limit for structs and containers
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Handling of absent pass-through fields
    #[serde(default)]
    pub missing_fields: MissingPolicy,

    /// Emit `{}` instead of failing when the root struct is unknown
    #[serde(default)]
    pub lenient: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pretty,
    #[default]
    Compact,
}

/// Where to find IDL documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemasConfig {
    /// Individual `.thrift` files
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Directories walked recursively for `.thrift` files
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
}

// Default value functions
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            max_depth: default_max_depth(),
            missing_fields: MissingPolicy::default(),
            lenient: false,
        }
    }
}

impl DecodeConfig {
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            max_depth: self.max_depth,
            missing: self.missing_fields,
        }
    }
}

impl ThriftyConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["thrifty.toml", ".thrifty.toml", "config/thrifty.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "thrifty", "thrifty") {
            let xdg_config = config_dir.config_dir().join("thrifty.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (THRIFTY__DECODE__MAX_DEPTH=...)
        builder = builder.add_source(
            Environment::with_prefix("THRIFTY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Options for a [`Transcoder`](crate::transcode::Transcoder)
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            protocol: self.decode.protocol,
            mapping: self.decode.map_options(),
            pretty: self.output.format == OutputFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ThriftyConfig::default();
        assert_eq!(config.decode.max_depth, 64);
        assert_eq!(config.decode.protocol, Protocol::Binary);
        assert!(!config.decode.lenient);
        assert_eq!(config.decode_options(), DecodeOptions::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = ThriftyConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[decode]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("missing_fields = \"omit\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [decode]
            protocol = "compact"
            missing_fields = "null"

            [output]
            format = "pretty"

            [schemas]
            dirs = ["idl"]
            "#,
        )
        .unwrap();

        let config = ThriftyConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.decode.protocol, Protocol::Compact);
        assert_eq!(config.decode.max_depth, 64);
        assert_eq!(config.schemas.dirs, vec![PathBuf::from("idl")]);

        let options = config.decode_options();
        assert!(options.pretty);
        assert_eq!(options.mapping.missing, MissingPolicy::Null);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ThriftyConfig::default();
        config.decode.lenient = true;
        config.schemas.paths.push(PathBuf::from("account.thrift"));

        config.save(path.to_str().unwrap()).unwrap();
        let loaded = ThriftyConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded, config);
    }
}

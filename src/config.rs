//! Configuration for the schema compiler and the `schemac` tool
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemac.toml)
//! - Environment variables (SCHEMAC__*)
//!
//! ## Example config file (schemac.toml):
//! ```toml
//! [compiler]
//! max_inline_depth = 32
//! strict_map_keys = true
//!
//! [output]
//! format = "pretty"
//! show_anonymous = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compiler::CompilerSettings;

/// Default file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "schemac.toml";

/// Prefix of environment overrides, e.g. `SCHEMAC__COMPILER__MAX_INLINE_DEPTH`
pub const ENV_PREFIX: &str = "SCHEMAC";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemacConfig {
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// Output settings for the command line tool
    #[serde(default)]
    pub output: OutputConfig,
}

/// How `schemac` prints compiled types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,

    /// Print anonymous types alongside declared ones
    #[serde(default = "default_true")]
    pub show_anonymous: bool,
}

/// Output format for printed types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full schema DSL form
    #[default]
    Pretty,
    /// One line per type
    Compact,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            show_anonymous: true,
        }
    }
}

impl SchemacConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layered(config_path, ENV_PREFIX)
    }

    fn load_layered(config_path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Working directory
        for location in ["schemac.toml", ".schemac.toml", "config/schemac.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(xdg_config) = Self::user_config_path() {
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Per-user config file in the XDG config directory
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "schemac", "schemac")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchemacConfig::default();
        assert_eq!(config.compiler.max_inline_depth, 32);
        assert!(config.compiler.strict_map_keys);
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert!(config.output.show_anonymous);
    }

    #[test]
    fn test_serialize_config() {
        let config = SchemacConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[compiler]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[compiler]\nmax_inline_depth = 4\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = SchemacConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.compiler.max_inline_depth, 4);
        assert!(config.compiler.strict_map_keys);
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = SchemacConfig::default();
        config.compiler.strict_map_keys = false;
        config.save(&path).unwrap();

        let loaded = SchemacConfig::load_from(Some(&path)).unwrap();
        assert!(!loaded.compiler.strict_map_keys);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SchemacConfig::load_from(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_environment_override() {
        // Own prefix so loads in concurrently running tests never see it
        std::env::set_var("SCHEMAC_ENV_TEST__OUTPUT__SHOW_ANONYMOUS", "false");
        std::env::set_var("SCHEMAC_ENV_TEST__COMPILER__MAX_INLINE_DEPTH", "8");
        let config = SchemacConfig::load_layered(None, "SCHEMAC_ENV_TEST");
        std::env::remove_var("SCHEMAC_ENV_TEST__OUTPUT__SHOW_ANONYMOUS");
        std::env::remove_var("SCHEMAC_ENV_TEST__COMPILER__MAX_INLINE_DEPTH");

        let config = config.unwrap();
        assert!(!config.output.show_anonymous);
        assert_eq!(config.compiler.max_inline_depth, 8);
    }
}

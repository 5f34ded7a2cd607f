//! Configuration management for schema-erd
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (erd.toml, .erd.toml, config/erd.toml)
//! - The user config directory
//! - Environment variables (SCHEMA_ERD__*)
//!
//! ## Example config file (erd.toml):
//! ```toml
//! [input]
//! format = "json-schema"
//! skip_prefixes = ["target/", "legacy/"]
//! include_prefixes = ["entities/"]
//!
//! [render]
//! format = "dot"
//! show_fields = true
//! direction = "TB"
//! ```

use config_crate::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::adapters::{LoadConfig, SchemaFormat};
use crate::render::{Direction, OutputFormat, RenderOptions};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErdConfig {
    /// Input settings
    #[serde(default)]
    pub input: InputConfig,

    /// Render settings
    #[serde(default)]
    pub render: RenderConfig,
}

/// Input configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Schema framework; detected from the input path when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SchemaFormat>,

    /// Skip files under these relative path prefixes
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    /// Only load files under these prefixes (empty = everything)
    #[serde(default)]
    pub include_prefixes: Vec<String>,
}

/// Render configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_true")]
    pub show_fields: bool,

    #[serde(default)]
    pub direction: Direction,
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

fn default_true() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: None,
            skip_prefixes: default_skip_prefixes(),
            include_prefixes: Vec::new(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            show_fields: true,
            direction: Direction::default(),
        }
    }
}

impl ErdConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["erd.toml", ".erd.toml", "config/erd.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "schema-erd", "schema-erd") {
            let xdg_config = dirs.config_dir().join("erd.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // SCHEMA_ERD__RENDER__FORMAT=dot
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_ERD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Parse a TOML document on its own, without other sources
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            skip_prefixes: self.input.skip_prefixes.clone(),
            include_prefixes: self.input.include_prefixes.clone(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_fields: self.render.show_fields,
            direction: self.render.direction,
        }
    }
}

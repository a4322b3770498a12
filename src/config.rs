//! Configuration management for the metadata parser
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (metadata.toml)
//! - Environment variables (METADATA__*)
//!
//! ## Example config file (metadata.toml):
//! ```toml
//! [parser]
//! lenient = true
//! max_depth = 32
//!
//! [dataset]
//! default_protocol = "doi"
//! default_authority = "10.5072"
//! allowed_metadata_languages = ["en", "fi"]
//! allow_custom_terms = true
//!
//! [registry]
//! schema_path = "./metadatablocks"
//!
//! [remap]
//! enabled = true
//!
//! [[remap.policies]]
//! field = "geographicCoverage"
//! overflow_child = "otherGeographicCoverage"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RegistryError;
use crate::registry::InMemoryRegistry;

/// Main configuration for the metadata parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Field parsing behaviour
    #[serde(default)]
    pub parser: ParserSection,

    /// Dataset envelope defaults
    #[serde(default)]
    pub dataset: DatasetSection,

    /// Where field type definitions come from
    #[serde(default)]
    pub registry: RegistrySection,

    /// Vocabulary remap policies
    #[serde(default)]
    pub remap: RemapSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSection {
    /// Accept alternate spellings for controlled vocabulary values
    #[serde(default)]
    pub lenient: bool,

    /// Deepest compound nesting accepted in a document
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSection {
    /// Used when a dataset names no authority
    #[serde(default)]
    pub default_authority: Option<String>,

    /// Used when a dataset names no protocol
    #[serde(default = "default_protocol")]
    pub default_protocol: Option<String>,

    /// Metadata languages a dataset may declare
    #[serde(default)]
    pub allowed_metadata_languages: Vec<String>,

    /// Allow custom terms of use in place of a license
    #[serde(default = "default_true")]
    pub allow_custom_terms: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Block definition file or directory; builtin blocks when unset
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemapSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_policies")]
    pub policies: Vec<RemapPolicyConfig>,
}

/// Relocate invalid vocabulary values of a compound field into a free-text child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapPolicyConfig {
    pub field: String,
    pub overflow_child: String,
}

// Default value functions
fn default_max_depth() -> usize {
    32
}

fn default_protocol() -> Option<String> {
    Some("doi".to_string())
}

fn default_true() -> bool {
    true
}

fn default_policies() -> Vec<RemapPolicyConfig> {
    vec![RemapPolicyConfig {
        field: "geographicCoverage".to_string(),
        overflow_child: "otherGeographicCoverage".to_string(),
    }]
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            lenient: false,
            max_depth: default_max_depth(),
        }
    }
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            default_authority: None,
            default_protocol: default_protocol(),
            allowed_metadata_languages: Vec::new(),
            allow_custom_terms: true,
        }
    }
}

impl Default for RemapSection {
    fn default() -> Self {
        Self {
            enabled: true,
            policies: default_policies(),
        }
    }
}

impl ParserConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["metadata.toml", ".metadata.toml", "config/metadata.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "dataset-metadata", "metadata") {
            let xdg_config = config_dir.config_dir().join("metadata.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (METADATA__*)
        builder = builder.add_source(
            Environment::with_prefix("METADATA")
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

    /// Load the configured field type registry
    pub fn load_registry(&self) -> Result<InMemoryRegistry, RegistryError> {
        match &self.registry.schema_path {
            Some(path) => InMemoryRegistry::load(path),
            None => InMemoryRegistry::builtin(),
        }
    }
}

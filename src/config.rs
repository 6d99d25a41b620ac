//! Configuration management for imports
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (unischema.toml)
//! - Environment variables (UNISCHEMA__*)
//!
//! ## Example config file (unischema.toml):
//! ```toml
//! [importer]
//! app_name = "Petstore"
//! package_name = "pets"
//! imports = ["common.sysl"]
//! shallow = false
//! format = "openapi3"
//!
//! [output]
//! header = true
//! checksum = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::importer::ImporterArg;

/// Main configuration for the importer CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Metadata applied to every import
    #[serde(default)]
    pub importer: ImporterSection,

    /// Rendering settings
    #[serde(default)]
    pub output: OutputSection,
}

/// Import metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImporterSection {
    #[serde(default)]
    pub app_name: String,

    #[serde(default)]
    pub package_name: String,

    /// Import paths emitted at the top of the model text
    #[serde(default)]
    pub imports: Vec<String>,

    /// Keep references to other documents as string aliases
    #[serde(default)]
    pub shallow: bool,

    /// Format token; sniffed from the input when absent
    #[serde(default)]
    pub format: Option<String>,
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    /// Emit the generated-code banner
    #[serde(default = "default_true")]
    pub header: bool,

    /// Append a checksum comment of the rendered model
    #[serde(default)]
    pub checksum: bool,

    /// Write here instead of stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            header: true,
            checksum: false,
            path: None,
        }
    }
}

impl ImportConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["unischema.toml", ".unischema.toml", "config/unischema.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "unischema", "unischema") {
            let xdg_config = dirs.config_dir().join("unischema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // UNISCHEMA__IMPORTER__APP_NAME=... overrides importer.app_name
        builder = builder.add_source(
            Environment::with_prefix("UNISCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Importer metadata as passed to [`Importer::configure`](crate::importer::Importer::configure)
    pub fn importer_arg(&self) -> ImporterArg {
        ImporterArg {
            app_name: self.importer.app_name.clone(),
            package_name: self.importer.package_name.clone(),
            imports: self.importer.imports.join(", "),
            shallow: self.importer.shallow,
        }
    }

    /// Explicit format token, ignoring an empty value
    pub fn format_name(&self) -> Option<&str> {
        self.importer.format.as_deref().filter(|f| !f.is_empty())
    }
}

//! Per-format importers
//!
//! Every importer turns source text of one format into a [`TypeList`] and
//! renders it as model text. Callers normally obtain one through
//! [`factory`], which picks the implementation from the detected [`Format`].

pub mod avro;
pub mod factory;
pub mod openapi;
pub mod protobuf;
pub(crate) mod schema;
pub mod sql;
pub mod transform;
pub mod xsd;

pub use factory::{configured, factory, importer_for};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::format::Format;
use crate::render::render;
use crate::types::TypeList;

/// Metadata applied to every import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImporterArg {
    /// Name of the application block the types are emitted under
    pub app_name: String,
    /// Value of the `package` attribute; omitted when empty
    pub package_name: String,
    /// Comma-separated import paths
    pub imports: String,
    /// Do not follow references into other documents
    pub shallow: bool,
}

impl ImporterArg {
    pub fn new(app_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    /// Individual import paths, trimmed, empties dropped
    pub fn import_list(&self) -> Vec<&str> {
        self.imports
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A converter from one source format to the canonical type graph.
///
/// Importers hold no state between calls besides their [`ImporterArg`], so
/// a configured importer can be used for any number of independent jobs.
pub trait Importer: Send + Sync {
    /// Format this importer reads
    fn format(&self) -> Format;

    /// Replace the import metadata
    fn configure(&mut self, arg: &ImporterArg) -> Result<()>;

    fn arg(&self) -> &ImporterArg;

    /// Parse `content` into a finalized, sorted type list
    fn import(&self, content: &str) -> Result<TypeList>;

    /// Parse `content` and render it as model text
    fn load(&self, content: &str) -> Result<String> {
        let types = self.import(content)?;
        Ok(render(self.arg(), &types))
    }

    /// Read a file (or every matching file of a directory) and render it
    fn load_file(&self, path: &Path) -> Result<String> {
        let content = read_source(path, &self.format())?;
        self.load(&content)
    }
}

/// Read a single file, or concatenate every file below a directory whose
/// extension belongs to `format`, in path order.
pub fn read_source(path: &Path, format: &Format) -> Result<String> {
    if !path.is_dir() {
        return Ok(fs::read_to_string(path)?);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| format.matches_extension(p))
        .collect();
    files.sort();
    debug!(path = %path.display(), files = files.len(), "reading source directory");

    let mut content = String::new();
    for file in files {
        content.push_str(&fs::read_to_string(&file)?);
        content.push('\n');
    }
    Ok(content)
}

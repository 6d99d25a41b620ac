//! Error types for schema importing

use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Import errors
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("an importer does not exist for {0}")]
    UnknownFormat(String),

    #[error("importer disabled for: {0}")]
    ImporterDisabled(String),

    #[error("error converting file at {0}: unrecognised type")]
    UnrecognisedType(String),

    #[error("duplicate fields exist: {0:?}")]
    DuplicateField(String),

    #[error("failed to parse {format} input: {message}")]
    Parse { format: String, message: String },

    #[error("unresolved type reference: {0}")]
    UnresolvedReference(String),

    #[error("no transform registered for format {0}")]
    NoTransform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl ImportError {
    /// Build a parse error for the given format
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }
}

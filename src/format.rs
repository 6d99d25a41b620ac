//! Supported import formats and format detection
//!
//! A format is identified by a case-insensitive name token. When no token is
//! given, the path and content are sniffed against [`FORMATS`] in order and
//! the first structural match wins.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{ImportError, Result};

/// Descriptor of one supported input format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Format {
    /// Name token callers select the format by
    pub name: &'static str,
    /// Pattern that must occur in the content, if any
    pub signature: Option<&'static str>,
    /// File extensions (with leading dot) this format is read from
    pub extensions: &'static [&'static str],
    /// Whether the format reads a directory of files
    pub directory: bool,
}

impl Format {
    const fn file(
        name: &'static str,
        signature: Option<&'static str>,
        extensions: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            signature,
            extensions,
            directory: false,
        }
    }

    const fn dir(name: &'static str, extensions: &'static [&'static str]) -> Self {
        Self {
            name,
            signature: None,
            extensions,
            directory: true,
        }
    }

    /// Whether `token` names this format
    pub fn is(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
    }

    pub(crate) fn matches_extension(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        self.extensions.iter().any(|e| *e == ext)
    }

    fn matches_content(&self, content: &str) -> Result<bool> {
        match self.signature {
            None => Ok(true),
            Some(pattern) => Ok(Regex::new(pattern)?.is_match(content)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Registry
// =============================================================================

pub const GRAMMAR: Format = Format::file("grammar", None, &[".g"]);
pub const OPENAPI3: Format = Format::file(
    "openapi3",
    Some(r#"(?m)(^|[{,])\s*"?openapi"?\s*:"#),
    &[".yaml", ".yml", ".json"],
);
pub const OPENAPI2: Format = Format::file(
    "openapi2",
    Some(r#"(?m)(^|[{,])\s*"?swagger"?\s*:"#),
    &[".yaml", ".yml", ".json"],
);
pub const XSD: Format = Format::file("xsd", Some(r"XMLSchema"), &[".xsd", ".xml"]);
pub const AVRO: Format = Format::file("avro", None, &[".avsc"]);
pub const SPANNER_SQL: Format = Format::file("spannerSQL", None, &[".sql"]);
pub const SPANNER_SQL_DIR: Format = Format::dir("spannerSQLdir", &[".sql"]);
pub const PROTOBUF: Format = Format::file("protobuf", None, &[".proto"]);
pub const PROTOBUF_DIR: Format = Format::dir("protobufDir", &[".proto"]);
pub const POSTGRES: Format = Format::file("postgres", None, &[".sql"]);
pub const POSTGRES_DIR: Format = Format::dir("postgresDir", &[".sql"]);
pub const MYSQL: Format = Format::file("mysql", None, &[".sql"]);
pub const MYSQL_DIR: Format = Format::dir("mysqlDir", &[".sql"]);
pub const BIGQUERY: Format = Format::file("bigquery", None, &[".sql"]);
pub const JSON_SCHEMA: Format = Format::file("jsonschema", Some(r#""\$schema""#), &[".json"]);

/// Every supported format, in detection order
pub const FORMATS: &[Format] = &[
    GRAMMAR,
    OPENAPI3,
    OPENAPI2,
    XSD,
    AVRO,
    SPANNER_SQL,
    SPANNER_SQL_DIR,
    PROTOBUF,
    PROTOBUF_DIR,
    POSTGRES,
    POSTGRES_DIR,
    MYSQL,
    MYSQL_DIR,
    BIGQUERY,
    JSON_SCHEMA,
];

/// Look up a format by its name token, ignoring case
pub fn by_name(name: &str) -> Result<Format> {
    FORMATS
        .iter()
        .copied()
        .find(|f| f.is(name))
        .ok_or_else(|| ImportError::UnknownFormat(name.to_string()))
}

/// Resolve the format of an input.
///
/// An explicit `format_name` is matched case-insensitively; otherwise the
/// input is sniffed with [`guess_file_type`].
pub fn detect(path: &Path, is_dir: bool, format_name: Option<&str>, content: &[u8]) -> Result<Format> {
    match format_name.filter(|n| !n.is_empty()) {
        Some(name) => by_name(name),
        None => guess_file_type(path, is_dir, content, FORMATS),
    }
}

/// Sniff a path and its content against `valid_formats` in order.
///
/// Directories match the first directory format whose extension occurs
/// among the files below it. Files match the first format whose extension
/// matches and whose signature, if any, is found in the content.
pub fn guess_file_type(
    path: &Path,
    is_dir: bool,
    content: &[u8],
    valid_formats: &[Format],
) -> Result<Format> {
    if is_dir {
        let files: Vec<_> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        for format in valid_formats.iter().filter(|f| f.directory) {
            if files.iter().any(|file| format.matches_extension(file)) {
                return Ok(*format);
            }
        }
        return Err(ImportError::UnrecognisedType(path.display().to_string()));
    }

    let text = String::from_utf8_lossy(content);
    for format in valid_formats.iter().filter(|f| !f.directory) {
        if format.matches_extension(path) && format.matches_content(&text)? {
            return Ok(*format);
        }
    }

    Err(ImportError::UnrecognisedType(path.display().to_string()))
}

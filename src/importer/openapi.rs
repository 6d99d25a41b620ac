//! OpenAPI 2 (Swagger) and OpenAPI 3 importer
//!
//! Only the schema definitions are imported: `components.schemas` for v3 and
//! `definitions` for v2. Paths and operations are ignored.

use serde_json::{Map, Value};
use tracing::warn;

use super::schema::SchemaConverter;
use super::{Importer, ImporterArg};
use crate::error::Result;
use crate::format::{Format, OPENAPI2};
use crate::types::TypeList;

const V3_PREFIXES: &[&str] = &["#/components/schemas/"];
const V2_PREFIXES: &[&str] = &["#/definitions/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Swagger2,
    OpenApi3,
}

impl Version {
    fn version_key(self) -> &'static str {
        match self {
            Version::Swagger2 => "swagger",
            Version::OpenApi3 => "openapi",
        }
    }

    fn schemas_pointer(self) -> &'static str {
        match self {
            Version::Swagger2 => "/definitions",
            Version::OpenApi3 => "/components/schemas",
        }
    }

    fn ref_prefixes(self) -> &'static [&'static str] {
        match self {
            Version::Swagger2 => V2_PREFIXES,
            Version::OpenApi3 => V3_PREFIXES,
        }
    }
}

/// Importer for YAML or JSON OpenAPI documents
#[derive(Debug, Clone)]
pub struct OpenApiImporter {
    format: Format,
    version: Version,
    arg: ImporterArg,
}

impl OpenApiImporter {
    pub fn new(format: Format) -> Self {
        let version = if format.is(OPENAPI2.name) {
            Version::Swagger2
        } else {
            Version::OpenApi3
        };
        Self {
            format,
            version,
            arg: ImporterArg::default(),
        }
    }
}

/// Parse YAML or JSON into a JSON value; YAML keys such as `200` become strings
pub(crate) fn parse_document(content: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(serde_json::to_value(yaml)?)
}

impl Importer for OpenApiImporter {
    fn format(&self) -> Format {
        self.format
    }

    fn configure(&mut self, arg: &ImporterArg) -> Result<()> {
        self.arg = arg.clone();
        Ok(())
    }

    fn arg(&self) -> &ImporterArg {
        &self.arg
    }

    fn import(&self, content: &str) -> Result<TypeList> {
        let doc = parse_document(content)?;
        if doc.get(self.version.version_key()).is_none() {
            warn!(
                format = self.format.name,
                key = self.version.version_key(),
                "document has no version key"
            );
        }

        let empty = Map::new();
        let defs = doc
            .pointer(self.version.schemas_pointer())
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let definitions: Vec<(&str, &Value)> = defs.iter().map(|(k, v)| (k.as_str(), v)).collect();

        SchemaConverter::new(self.format.name, self.version.ref_prefixes(), defs, self.arg.shallow)
            .convert(&definitions)
    }
}

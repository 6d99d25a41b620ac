//! Transform-driven importer
//!
//! Formats without a dedicated importer are handled by a transform looked up
//! by format token. A transform is a plain function from source text to a
//! finalized [`TypeList`]; new formats are added by registering one in
//! [`TRANSFORMS`].

use serde_json::{Map, Value};
use tracing::debug;

use super::openapi::parse_document;
use super::schema::SchemaConverter;
use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::Format;
use crate::types::TypeList;

/// Source text to type list
pub type Transform = fn(&ImporterArg, &str) -> Result<TypeList>;

/// Normalized format token to transform
const TRANSFORMS: &[(&str, Transform)] = &[("jsonschema", json_schema)];

/// Transform registered for `format`, if any
pub fn lookup(format: &str) -> Option<Transform> {
    let token = format.to_ascii_lowercase();
    TRANSFORMS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, transform)| *transform)
}

/// Importer that delegates to a registered transform
#[derive(Debug, Clone)]
pub struct TransformImporter {
    format: Format,
    arg: ImporterArg,
}

impl TransformImporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            arg: ImporterArg::default(),
        }
    }
}

impl Importer for TransformImporter {
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
        let transform =
            lookup(self.format.name).ok_or_else(|| ImportError::NoTransform(self.format.name.to_string()))?;
        debug!(format = self.format.name, "running transform");
        transform(&self.arg, content)
    }
}

// =============================================================================
// Transforms
// =============================================================================

const JSON_SCHEMA_PREFIXES: &[&str] = &["#/$defs/", "#/definitions/"];
const DEFAULT_ROOT: &str = "Root";

/// JSON Schema document: the root schema (named by its `title`) plus every
/// entry of `$defs` or `definitions`
fn json_schema(arg: &ImporterArg, content: &str) -> Result<TypeList> {
    let doc = parse_document(content)?;

    let empty = Map::new();
    let defs = doc
        .get("$defs")
        .or_else(|| doc.get("definitions"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let root_name = doc
        .get("title")
        .and_then(Value::as_str)
        .map(|title| title.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect::<String>())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ROOT.to_string());

    let mut definitions: Vec<(&str, &Value)> = Vec::with_capacity(defs.len() + 1);
    if describes_type(&doc) {
        definitions.push((root_name.as_str(), &doc));
    }
    definitions.extend(defs.iter().map(|(k, v)| (k.as_str(), v)));

    SchemaConverter::new("jsonschema", JSON_SCHEMA_PREFIXES, defs, arg.shallow)
        .with_root(&root_name)
        .convert(&definitions)
}

/// Whether a root document is a schema itself rather than a bare `$defs` container
fn describes_type(doc: &Value) -> bool {
    ["type", "properties", "$ref", "enum", "oneOf", "anyOf", "allOf"]
        .iter()
        .any(|key| doc.get(key).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, JSON_SCHEMA, OPENAPI3};
    use crate::types::{Type, TypeKind, TypeRef};

    const PERSON: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Person Record",
  "type": "object",
  "required": ["name"],
  "properties": {
    "name": {"type": "string"},
    "address": {"$ref": "#/$defs/Address"},
    "parent": {"$ref": "#"}
  },
  "$defs": {
    "Address": {
      "type": "object",
      "properties": {"city": {"type": ["string", "null"]}}
    }
  }
}"##;

    #[test]
    fn test_json_schema_transform() {
        let types = TransformImporter::new(JSON_SCHEMA).import(PERSON).unwrap();
        let names: Vec<_> = types.items().map(Type::name).collect();
        assert_eq!(names, vec!["Address", "PersonRecord"]);

        let person = types.get(types.position("PersonRecord").unwrap()).unwrap();
        let fields = person.fields().unwrap();
        assert!(!fields.get("name").unwrap().optional);
        assert_eq!(types.name_of(&fields.get("parent").unwrap().ty), "PersonRecord");

        let address = types.get(types.position("Address").unwrap()).unwrap();
        assert!(address.fields().unwrap().get("city").unwrap().optional);
    }

    #[test]
    fn test_cyclic_all_of_in_defs() {
        let doc = r##"{
  "$defs": {
    "Shape": {"allOf": [{"$ref": "#/$defs/Circle"}]},
    "Circle": {"allOf": [{"$ref": "#/$defs/Shape"}], "properties": {"r": {"type": "number"}}}
  }
}"##;
        let err = TransformImporter::new(JSON_SCHEMA).import(doc).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse jsonschema input: cyclic allOf"));
    }

    #[test]
    fn test_self_reference_through_root() {
        let doc = r##"{"title": "Tree", "type": "object", "properties": {"children": {"type": "array", "items": {"$ref": "#"}}}}"##;
        let types = TransformImporter::new(JSON_SCHEMA).import(doc).unwrap();
        let tree = types.get(types.position("Tree").unwrap()).unwrap();
        match &tree.fields().unwrap().get("children").unwrap().ty {
            TypeRef::Inline(inner) => match inner.kind() {
                TypeKind::Array { items } => assert_eq!(types.name_of(items), "Tree"),
                other => panic!("Expected array, got {:?}", other),
            },
            other => panic!("Expected inline array, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_defs_container() {
        let doc = r#"{"definitions": {"Id": {"type": "string", "format": "uuid"}}}"#;
        let types = TransformImporter::new(JSON_SCHEMA).import(doc).unwrap();
        assert_eq!(types.len(), 1);
        let id = types.items().next().unwrap();
        assert!(matches!(id.kind(), TypeKind::Alias { .. }));
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert!(lookup("JSONSchema").is_some());
        assert!(lookup(OPENAPI3.name).is_none());
    }

    #[test]
    fn test_unregistered_format() {
        let format = Format {
            name: "raml",
            signature: None,
            extensions: &[".raml"],
            directory: false,
        };
        let err = TransformImporter::new(format).import("#%RAML 1.0").unwrap_err();
        assert_eq!(err.to_string(), "no transform registered for format raml");
    }
}

//! Schema-object conversion shared by the OpenAPI and JSON Schema importers
//!
//! Both formats describe types with JSON Schema objects; they only differ in
//! where definitions live and how local `$ref`s are spelled.
//!
//! Conversion runs in two passes so forward references work: every top-level
//! definition first gets a placeholder entry, then each placeholder is
//! replaced by its converted type. Inline objects, enums and unions are lifted
//! into named types called `<Parent>_<member>`.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ImportError, Result};
use crate::types::{BuiltinType, Field, FieldList, SizeSpec, Type, TypeList, TypeRef};

/// Converts a set of named schema objects into a [`TypeList`]
pub(crate) struct SchemaConverter<'a> {
    format: &'static str,
    /// Local `$ref` prefixes, e.g. `#/components/schemas/`
    ref_prefixes: &'a [&'a str],
    /// Raw definitions, used to merge `allOf` members
    defs: &'a Map<String, Value>,
    /// Name a bare `#` reference resolves to, if any
    root_name: Option<&'a str>,
    shallow: bool,
    types: TypeList,
}

impl<'a> SchemaConverter<'a> {
    pub(crate) fn new(
        format: &'static str,
        ref_prefixes: &'a [&'a str],
        defs: &'a Map<String, Value>,
        shallow: bool,
    ) -> Self {
        Self {
            format,
            ref_prefixes,
            defs,
            root_name: None,
            shallow,
            types: TypeList::new(),
        }
    }

    pub(crate) fn with_root(mut self, root_name: &'a str) -> Self {
        self.root_name = Some(root_name);
        self
    }

    /// Convert named definitions and finalize the list
    pub(crate) fn convert(mut self, definitions: &[(&'a str, &'a Value)]) -> Result<TypeList> {
        let mut slots = Vec::with_capacity(definitions.len());
        for &(name, _) in definitions {
            let placeholder = Type::standard(name, FieldList::new());
            if let Some(id) = self.types.insert(placeholder) {
                slots.push(id);
            }
        }

        for (&(name, schema), id) in definitions.iter().zip(slots) {
            trace!(format = self.format, name, "converting definition");
            let ty = self.define(name, schema)?;
            if let Some(slot) = self.types.get_mut(id) {
                *slot = ty;
            }
        }

        debug!(format = self.format, count = self.types.len(), "converted schema definitions");
        self.types.sort_all()?;
        Ok(self.types)
    }

    /// Convert a named definition into a type
    fn define(&mut self, name: &str, schema: &'a Value) -> Result<Type> {
        let mut ty = if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            Type::alias(name, self.resolve_ref(reference)?)
        } else if let Some(values) = schema.get("enum").and_then(Value::as_array) {
            Type::enumeration(name).with_attrs(values.iter().map(enumerant))
        } else if let Some(options) = union_members(schema) {
            Type::union(name, self.options(name, options)?)
        } else if is_object(schema) {
            Type::standard(name, self.properties(name, schema)?)
        } else if schema_type(schema) == Some("array") {
            let items = self.items(name, schema)?;
            Type::array(name, items)
        } else {
            Type::alias(name, builtin_for(schema))
        };

        if schema.get("deprecated").and_then(Value::as_bool) == Some(true) {
            ty.add_attributes(["~deprecated"]);
        }
        Ok(ty)
    }

    /// Convert a schema at a use site into a reference
    fn type_ref(&mut self, hint: &str, schema: &'a Value) -> Result<TypeRef> {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return self.resolve_ref(reference);
        }
        if schema.get("enum").is_some() || union_members(schema).is_some() || is_object(schema) {
            let lifted = self.define(hint, schema)?;
            return Ok(self.types.add_and_ret(lifted));
        }
        if schema_type(schema) == Some("array") {
            let items = self.items(hint, schema)?;
            return Ok(TypeRef::inline(Type::array("", items)));
        }
        Ok(builtin_for(schema).into())
    }

    fn items(&mut self, hint: &str, schema: &'a Value) -> Result<TypeRef> {
        match schema.get("items") {
            Some(items) => self.type_ref(hint, items),
            None => Ok(BuiltinType::Any.into()),
        }
    }

    fn properties(&mut self, name: &str, schema: &'a Value) -> Result<FieldList> {
        let mut path = Vec::new();
        let defs: &'a Map<String, Value> = self.defs;
        if let Some(own) = defs.keys().find(|key| *key == name) {
            path.push(own.as_str());
        }
        let parts = self.object_parts(schema, &mut path)?;
        let required: Vec<&str> = parts
            .iter()
            .filter_map(|part| part.get("required")?.as_array())
            .flatten()
            .filter_map(Value::as_str)
            .collect();

        let mut fields = FieldList::new();
        for part in parts {
            let Some(props) = part.get("properties").and_then(Value::as_object) else {
                continue;
            };
            for (prop_name, prop) in props {
                let hint = format!("{name}_{prop_name}");
                let ty = self.type_ref(&hint, prop)?;
                let optional = !required.contains(&prop_name.as_str()) || is_nullable(prop);
                let mut field = Field::new(prop_name.as_str(), ty)
                    .with_optional(optional)
                    .with_size(size_spec(prop));
                if prop.get("readOnly").and_then(Value::as_bool) == Some(true) {
                    field.attrs.push("~readonly".to_string());
                }
                fields.push(field);
            }
        }
        Ok(fields)
    }

    /// The schema itself plus every `allOf` member, with local refs followed.
    ///
    /// `path` holds the definitions currently being expanded; reaching one
    /// of them again is a cycle.
    fn object_parts(&self, schema: &'a Value, path: &mut Vec<&'a str>) -> Result<Vec<&'a Value>> {
        let mut parts = vec![schema];
        if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
            for member in all_of {
                match member.get("$ref").and_then(Value::as_str) {
                    Some(reference) => {
                        let name = self
                            .local_name(reference)
                            .ok_or_else(|| ImportError::UnresolvedReference(reference.to_string()))?;
                        let target = self
                            .defs
                            .get(name)
                            .ok_or_else(|| ImportError::UnresolvedReference(reference.to_string()))?;
                        if path.contains(&name) {
                            return Err(ImportError::parse(
                                self.format,
                                format!("cyclic allOf through {} -> {name}", path.join(" -> ")),
                            ));
                        }
                        path.push(name);
                        parts.extend(self.object_parts(target, path)?);
                        path.pop();
                    }
                    None => parts.extend(self.object_parts(member, path)?),
                }
            }
        }
        Ok(parts)
    }

    fn options(&mut self, name: &str, options: &'a [Value]) -> Result<FieldList> {
        let mut fields = FieldList::new();
        for (index, option) in options.iter().enumerate() {
            let hint = format!("{name}_{index}");
            let ty = self.type_ref(&hint, option)?;
            let option_name = self.types.name_of(&ty).to_string();
            let option_name = if option_name.is_empty() { hint } else { option_name };
            fields.push(Field::new(option_name, ty));
        }
        Ok(fields)
    }

    fn local_name<'r>(&self, reference: &'r str) -> Option<&'r str> {
        self.ref_prefixes
            .iter()
            .find_map(|prefix| reference.strip_prefix(prefix))
    }

    fn resolve_ref(&mut self, reference: &str) -> Result<TypeRef> {
        if reference == "#" {
            if let Some(root) = self.root_name {
                return self
                    .types
                    .find(root)
                    .ok_or_else(|| ImportError::UnresolvedReference(reference.to_string()));
            }
        }

        if let Some(name) = self.local_name(reference) {
            return self
                .types
                .find(name)
                .ok_or_else(|| ImportError::UnresolvedReference(reference.to_string()));
        }

        if reference.starts_with('#') || !self.shallow {
            return Err(ImportError::UnresolvedReference(reference.to_string()));
        }

        // External document: recorded as a string-backed alias, not followed
        let name = external_name(reference);
        if let Some(existing) = self.types.find(&name) {
            return Ok(existing);
        }
        debug!(format = self.format, reference, "keeping external reference as string alias");
        Ok(self
            .types
            .add_and_ret(Type::string_alias(name, [format!("~ref={reference}")])))
    }
}

// =============================================================================
// Schema inspection helpers
// =============================================================================

/// First non-null entry of `type`, which may be a string or a list
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(ty) => Some(ty.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    }
}

fn is_object(schema: &Value) -> bool {
    schema_type(schema) == Some("object")
        || schema.get("properties").is_some()
        || schema.get("allOf").is_some()
}

fn is_nullable(schema: &Value) -> bool {
    if schema.get("nullable").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    matches!(schema.get("type"), Some(Value::Array(types)) if types.iter().any(|t| t == "null"))
}

fn union_members(schema: &Value) -> Option<&[Value]> {
    schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn enumerant(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn size_spec(schema: &Value) -> Option<SizeSpec> {
    let bound = |key: &str| schema.get(key).and_then(Value::as_i64);
    match schema_type(schema) {
        Some("array") => SizeSpec::from_bounds(bound("minItems"), bound("maxItems")),
        _ => SizeSpec::from_bounds(bound("minLength"), bound("maxLength")),
    }
}

/// Map a primitive schema onto the canonical builtin
pub(crate) fn builtin_for(schema: &Value) -> BuiltinType {
    let format = schema.get("format").and_then(Value::as_str);
    match (schema_type(schema), format) {
        (Some("string"), Some("date")) => BuiltinType::Date,
        (Some("string"), Some("date-time")) => BuiltinType::Datetime,
        (Some("string"), Some("byte" | "binary")) => BuiltinType::Bytes,
        (Some("string"), Some("uuid")) => BuiltinType::Uuid,
        (Some("string"), _) => BuiltinType::String,
        (Some("integer"), Some("int32")) => BuiltinType::Int32,
        (Some("integer"), Some("int64")) => BuiltinType::Int64,
        (Some("integer"), _) => BuiltinType::Int,
        (Some("number"), Some("float")) => BuiltinType::Float32,
        (Some("number"), Some("double")) => BuiltinType::Float64,
        (Some("number"), _) => BuiltinType::Float,
        (Some("boolean"), _) => BuiltinType::Bool,
        _ => BuiltinType::Any,
    }
}

/// Type name for an external `$ref` such as `common.yaml#/components/schemas/Money`
fn external_name(reference: &str) -> String {
    let tail = reference.rsplit(['/', '#']).find(|s| !s.is_empty()).unwrap_or(reference);
    tail.trim_end_matches(".yaml")
        .trim_end_matches(".yml")
        .trim_end_matches(".json")
        .to_string()
}

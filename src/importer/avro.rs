//! Avro schema importer
//!
//! Named Avro types (records, enums, fixed) are registered under their simple
//! name. A top-level JSON array is read as a list of schemas.

use apache_avro::schema::{RecordField, Schema, UnionSchema};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::Format;
use crate::types::{BuiltinType, Field, FieldList, SizeSpec, Type, TypeList, TypeRef};

/// Importer for `.avsc` documents
#[derive(Debug, Clone)]
pub struct AvroImporter {
    format: Format,
    arg: ImporterArg,
}

impl AvroImporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            arg: ImporterArg::default(),
        }
    }
}

impl Importer for AvroImporter {
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
        let schema = Schema::parse_str(content)?;
        let mut converter = Converter::default();

        match &schema {
            Schema::Union(union) => {
                for variant in union.variants() {
                    converter.top_level(variant)?;
                }
            }
            other => converter.top_level(other)?,
        }

        debug!(count = converter.types.len(), "converted avro schema");
        converter.types.sort_all()?;
        Ok(converter.types)
    }
}

#[derive(Default)]
struct Converter {
    types: TypeList,
    /// Byte sizes of fixed types, applied to the fields that use them
    fixed_sizes: HashMap<String, i64>,
}

impl Converter {
    fn top_level(&mut self, schema: &Schema) -> Result<()> {
        match schema {
            Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_) => {
                self.type_ref("", schema)?;
            }
            other => warn!(schema = ?other, "ignoring unnamed top-level avro schema"),
        }
        Ok(())
    }

    fn type_ref(&mut self, hint: &str, schema: &Schema) -> Result<TypeRef> {
        let ty = match schema {
            Schema::Null => BuiltinType::Any.into(),
            Schema::Boolean => BuiltinType::Bool.into(),
            Schema::Int | Schema::TimeMillis => BuiltinType::Int32.into(),
            Schema::Long | Schema::TimeMicros => BuiltinType::Int64.into(),
            Schema::Float => BuiltinType::Float32.into(),
            Schema::Double => BuiltinType::Float64.into(),
            Schema::Bytes | Schema::Duration => BuiltinType::Bytes.into(),
            Schema::String => BuiltinType::String.into(),
            Schema::Uuid => BuiltinType::Uuid.into(),
            Schema::Date => BuiltinType::Date.into(),
            Schema::TimestampMillis | Schema::TimestampMicros => BuiltinType::Datetime.into(),
            Schema::Decimal { .. } => BuiltinType::Decimal.into(),
            Schema::Array(items) => {
                TypeRef::inline(Type::array("", self.type_ref(hint, items)?))
            }
            Schema::Map(values) => TypeRef::inline(
                Type::array("", self.type_ref(hint, values)?).with_attrs(["~map", "~key=string"]),
            ),
            Schema::Union(union) => self.union(hint, union)?,
            Schema::Record(record) => {
                let name = record.name.name.as_str();
                let Some(id) = self.types.insert(Type::standard(name, FieldList::new())) else {
                    return Ok(BuiltinType::Any.into());
                };
                let fields = self.fields(name, &record.fields)?;
                if let Some(slot) = self.types.get_mut(id) {
                    *slot = Type::standard(name, fields);
                }
                id.into()
            }
            Schema::Enum(enumeration) => {
                let symbols = enumeration.symbols.iter().cloned();
                self.types
                    .add_and_ret(Type::enumeration(enumeration.name.name.as_str()).with_attrs(symbols))
            }
            Schema::Fixed(fixed) => {
                let name = fixed.name.name.clone();
                self.fixed_sizes.insert(name.clone(), fixed.size as i64);
                self.types.add_and_ret(Type::alias(name, BuiltinType::Bytes))
            }
            Schema::Ref { name } => self
                .types
                .find(&name.name)
                .ok_or_else(|| ImportError::UnresolvedReference(name.fullname(None)))?,
            other => {
                warn!(schema = ?other, "unsupported avro schema, using any");
                BuiltinType::Any.into()
            }
        };
        Ok(ty)
    }

    /// A `null` branch makes the field optional; any other mix becomes a named union
    fn union(&mut self, hint: &str, union: &UnionSchema) -> Result<TypeRef> {
        let present: Vec<&Schema> = non_null(union).collect();
        match present.as_slice() {
            [] => Ok(BuiltinType::Any.into()),
            [single] => self.type_ref(hint, single),
            variants => {
                let mut options = FieldList::new();
                for (index, variant) in variants.iter().enumerate() {
                    let ty = self.type_ref(&format!("{hint}_{index}"), variant)?;
                    let name = self.types.name_of(&ty).to_string();
                    options.push(Field::new(name, ty));
                }
                Ok(self.types.add_and_ret(Type::union(hint, options)))
            }
        }
    }

    fn fields(&mut self, record: &str, fields: &[RecordField]) -> Result<FieldList> {
        let mut list = FieldList::new();
        for field in fields {
            let hint = format!("{record}_{}", field.name);
            let ty = self.type_ref(&hint, &field.schema)?;
            let optional = matches!(&field.schema, Schema::Union(u) if u.is_nullable());
            list.push(
                Field::new(field.name.as_str(), ty)
                    .with_optional(optional)
                    .with_size(self.size_of(&field.schema)),
            );
        }
        Ok(list)
    }

    fn size_of(&self, schema: &Schema) -> Option<SizeSpec> {
        match schema {
            Schema::Fixed(fixed) => Some(SizeSpec::min_only(fixed.size as i64)),
            Schema::Ref { name } => self.fixed_sizes.get(&name.name).copied().map(SizeSpec::min_only),
            Schema::Union(union) => {
                let mut present = non_null(union);
                match (present.next(), present.next()) {
                    (Some(single), None) => self.size_of(single),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn non_null(union: &UnionSchema) -> impl Iterator<Item = &Schema> {
    union
        .variants()
        .iter()
        .filter(|variant| !matches!(variant, Schema::Null))
}

//! Canonical Type Model
//!
//! Every source format converges onto the same eight type kinds. A [`Type`]
//! carries the shared base attributes (name, attribute tags) and a
//! [`TypeKind`] payload.
//!
//! Ownership follows the symbol table: every named type is owned by exactly
//! one [`TypeList`]. Anything that points at another type (alias targets,
//! array items, field types) holds a [`TypeRef`], which is either a builtin,
//! a stable [`TypeId`] into the owning list, or an anonymous inline type that
//! is never registered.

pub mod builtin;
pub mod field;
pub mod list;

pub use builtin::BuiltinType;
pub use field::{Field, FieldList, MaxType, SizeSpec};
pub use list::TypeList;

use serde::Serialize;

use crate::error::Result;

// =============================================================================
// References
// =============================================================================

/// Stable handle to a type owned by a [`TypeList`].
///
/// Handles stay valid across [`TypeList::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Non-owning reference from one type (or field) to another
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// A canonical builtin
    Builtin(BuiltinType),
    /// A named type registered in the same [`TypeList`]
    Named(TypeId),
    /// An anonymous type that only exists at this use site
    Inline(Box<Type>),
}

impl TypeRef {
    pub fn inline(ty: Type) -> Self {
        Self::Inline(Box::new(ty))
    }

    pub fn as_builtin(&self) -> Option<BuiltinType> {
        match self {
            TypeRef::Builtin(b) => Some(*b),
            TypeRef::Inline(ty) => match ty.kind() {
                TypeKind::Builtin(b) => Some(*b),
                _ => None,
            },
            TypeRef::Named(_) => None,
        }
    }
}

impl From<BuiltinType> for TypeRef {
    fn from(value: BuiltinType) -> Self {
        Self::Builtin(value)
    }
}

impl From<TypeId> for TypeRef {
    fn from(value: TypeId) -> Self {
        Self::Named(value)
    }
}

// =============================================================================
// Types
// =============================================================================

/// Variant payload of a [`Type`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A record with its own properties
    Standard { properties: FieldList },
    /// Mutually exclusive options, shaped like record fields
    Union { options: FieldList },
    Builtin(BuiltinType),
    /// Same-ecosystem rename of exactly one type
    Alias { target: TypeRef },
    /// Alias that crosses an external namespace boundary
    ExternalAlias { target: TypeRef },
    /// Input-format spelling of a builtin; `target` is the canonical builtin
    ImportedBuiltinAlias { target: TypeRef },
    Array { items: TypeRef },
    /// Enumerants are carried as attributes
    Enum,
}

/// A node of the canonical type graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    name: String,
    attrs: Vec<String>,
    kind: TypeKind,
}

impl Type {
    fn with_kind(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            kind,
        }
    }

    pub fn standard(name: impl Into<String>, properties: FieldList) -> Self {
        Self::with_kind(name, TypeKind::Standard { properties })
    }

    pub fn union(name: impl Into<String>, options: FieldList) -> Self {
        Self::with_kind(name, TypeKind::Union { options })
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::with_kind(String::new(), TypeKind::Builtin(builtin))
    }

    pub fn alias(name: impl Into<String>, target: impl Into<TypeRef>) -> Self {
        Self::with_kind(
            name,
            TypeKind::Alias {
                target: target.into(),
            },
        )
    }

    pub fn external_alias(name: impl Into<String>, target: impl Into<TypeRef>) -> Self {
        Self::with_kind(
            name,
            TypeKind::ExternalAlias {
                target: target.into(),
            },
        )
    }

    /// String-backed external alias
    pub fn string_alias<I, S>(name: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::external_alias(name, BuiltinType::String).with_attrs(attrs)
    }

    pub fn imported_builtin_alias(name: impl Into<String>, target: BuiltinType) -> Self {
        Self::with_kind(
            name,
            TypeKind::ImportedBuiltinAlias {
                target: target.into(),
            },
        )
    }

    pub fn array(name: impl Into<String>, items: impl Into<TypeRef>) -> Self {
        Self::with_kind(
            name,
            TypeKind::Array {
                items: items.into(),
            },
        )
    }

    /// An enum whose enumerants are given as attributes
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::with_kind(name, TypeKind::Enum)
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_attributes(attrs);
        self
    }

    /// Name this type is referenced by; builtins always answer their token
    pub fn name(&self) -> &str {
        match &self.kind {
            TypeKind::Builtin(builtin) => builtin.as_str(),
            _ => &self.name,
        }
    }

    /// Anonymous types are never registered in a [`TypeList`]
    pub fn is_anonymous(&self) -> bool {
        self.name().is_empty()
    }

    pub fn attributes(&self) -> &[String] {
        &self.attrs
    }

    /// Append attributes and return the full sequence
    pub fn add_attributes<I, S>(&mut self, more: I) -> &[String]
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.extend(more.into_iter().map(Into::into));
        &self.attrs
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut TypeKind {
        &mut self.kind
    }

    /// Short keyword for the variant
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TypeKind::Standard { .. } => "standard",
            TypeKind::Union { .. } => "union",
            TypeKind::Builtin(_) => "builtin",
            TypeKind::Alias { .. } => "alias",
            TypeKind::ExternalAlias { .. } => "external_alias",
            TypeKind::ImportedBuiltinAlias { .. } => "imported_builtin_alias",
            TypeKind::Array { .. } => "array",
            TypeKind::Enum => "enum",
        }
    }

    /// Properties of a record or options of a union
    pub fn fields(&self) -> Option<&FieldList> {
        match &self.kind {
            TypeKind::Standard { properties } => Some(properties),
            TypeKind::Union { options } => Some(options),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldList> {
        match &mut self.kind {
            TypeKind::Standard { properties } => Some(properties),
            TypeKind::Union { options } => Some(options),
            _ => None,
        }
    }

    /// Finalize the field list of a record or union.
    ///
    /// The list is replaced only when dedup-sorting succeeds.
    pub fn sort_fields(&mut self) -> Result<()> {
        if let Some(fields) = self.fields_mut() {
            let sorted = fields.sort_without_dupl()?;
            *fields = sorted;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_name_is_its_token() {
        let ty = Type::builtin(BuiltinType::Int64);
        assert_eq!(ty.name(), "int64");
        assert!(!ty.is_anonymous());
    }

    #[test]
    fn test_add_attributes_appends_in_order() {
        let mut ty = Type::enumeration("Color").with_attrs(["~red"]);
        let attrs = ty.add_attributes(["~green", "~red"]);
        assert_eq!(attrs, ["~red", "~green", "~red"]);
        assert_eq!(ty.attributes().len(), 3);
    }

    #[test]
    fn test_string_alias() {
        let ty = Type::string_alias("Email", ["~external"]);
        assert_eq!(ty.name(), "Email");
        assert_eq!(ty.attributes(), ["~external"]);
        match ty.kind() {
            TypeKind::ExternalAlias { target } => {
                assert_eq!(target.as_builtin(), Some(BuiltinType::String));
            }
            other => panic!("Expected ExternalAlias, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_fields_replaces_on_success() {
        let mut ty = Type::standard(
            "Pet",
            vec![
                Field::new("name", BuiltinType::String),
                Field::new("id", BuiltinType::Int),
            ]
            .into(),
        );
        ty.sort_fields().unwrap();
        let names: Vec<_> = ty.fields().unwrap().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_sort_fields_keeps_list_on_conflict() {
        let mut ty = Type::union(
            "Shape",
            vec![
                Field::new("circle", BuiltinType::Float),
                Field::new("circle", BuiltinType::Int),
            ]
            .into(),
        );
        assert!(ty.sort_fields().is_err());
        assert_eq!(ty.fields().unwrap().len(), 2);
    }

    #[test]
    fn test_sort_fields_ignores_non_records() {
        let mut ty = Type::array("Tags", BuiltinType::String);
        assert!(ty.sort_fields().is_ok());
        assert!(ty.fields().is_none());
    }
}

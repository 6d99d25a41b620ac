//! Record and union member descriptors
//!
//! A [`FieldList`] is built incrementally while an importer walks one schema
//! construct, then finalized once with [`FieldList::sort_without_dupl`].

use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::ops::Deref;

use super::TypeRef;
use crate::error::{ImportError, Result};

/// How the upper bound of a [`SizeSpec`] is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxType {
    /// A single size value carried in `min` (e.g. `VARCHAR(50)`)
    MinOnly,
    /// Both bounds are given
    MaxSpecified,
    /// `min` or more, no upper bound
    OpenEnded,
}

/// Length or size constraint attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SizeSpec {
    pub min: i64,
    pub max: i64,
    pub max_type: MaxType,
}

impl SizeSpec {
    pub fn min_only(min: i64) -> Self {
        Self {
            min,
            max: 0,
            max_type: MaxType::MinOnly,
        }
    }

    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            max_type: MaxType::MaxSpecified,
        }
    }

    pub fn open_ended(min: i64) -> Self {
        Self {
            min,
            max: 0,
            max_type: MaxType::OpenEnded,
        }
    }

    /// Build a spec from optional lower/upper bounds as most formats express them
    pub fn from_bounds(min: Option<i64>, max: Option<i64>) -> Option<Self> {
        match (min, max) {
            (None, None) => None,
            (min, Some(max)) => Some(Self::between(min.unwrap_or(0), max)),
            (Some(min), None) => Some(Self::open_ended(min)),
        }
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_type {
            MaxType::MinOnly => write!(f, "({})", self.min),
            MaxType::MaxSpecified => write!(f, "({}..{})", self.min, self.max),
            MaxType::OpenEnded => write!(f, "({}..)", self.min),
        }
    }
}

/// A named member of a record or union
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    /// Non-owning reference into the type graph
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub optional: bool,
    pub attrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_spec: Option<SizeSpec>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            optional: false,
            attrs: Vec::new(),
            size_spec: None,
        }
    }

    /// Mark the field optional (or required)
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn with_size(mut self, size_spec: Option<SizeSpec>) -> Self {
        self.size_spec = size_spec;
        self
    }
}

/// Ordered collection of [`Field`]s owned by a record or union
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldList(Vec<Field>);

impl FieldList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: Field) {
        self.0.push(field);
    }

    pub fn as_slice(&self) -> &[Field] {
        &self.0
    }

    /// Find a field by exact name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name == name)
    }

    /// Deduplicate by name and sort by name.
    ///
    /// Identical repeats collapse into one field. Two fields sharing a name
    /// with any difference is a modeling conflict and fails with
    /// [`ImportError::DuplicateField`]; `self` is never modified.
    pub fn sort_without_dupl(&self) -> Result<FieldList> {
        let mut by_name: BTreeMap<&str, &Field> = BTreeMap::new();
        for field in &self.0 {
            match by_name.entry(field.name.as_str()) {
                Entry::Occupied(existing) => {
                    if *existing.get() != field {
                        return Err(ImportError::DuplicateField(field.name.clone()));
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(field);
                }
            }
        }
        // BTreeMap<&str, _> iterates in byte-wise lexicographic key order
        Ok(by_name.into_values().cloned().collect())
    }
}

impl From<Vec<Field>> for FieldList {
    fn from(value: Vec<Field>) -> Self {
        Self(value)
    }
}

impl From<FieldList> for Vec<Field> {
    fn from(value: FieldList) -> Self {
        value.0
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Field> for FieldList {
    fn extend<T: IntoIterator<Item = Field>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl Deref for FieldList {
    type Target = [Field];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

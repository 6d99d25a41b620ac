//! Builtin primitive registry
//!
//! The fixed set of primitive type tokens every importer resolves onto.
//! Matching is case-insensitive; the canonical token is always lowercase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive type recognized without a user-supplied definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinType {
    Any,
    Bool,
    Bytes,
    Date,
    Datetime,
    Decimal,
    Float,
    Float32,
    Float64,
    Int,
    Int32,
    Int64,
    String,
    #[serde(rename = "string_8")]
    String8,
    Uuid,
    Xml,
}

impl BuiltinType {
    /// Every builtin, in canonical token order
    pub const ALL: [BuiltinType; 16] = [
        BuiltinType::Any,
        BuiltinType::Bool,
        BuiltinType::Bytes,
        BuiltinType::Date,
        BuiltinType::Datetime,
        BuiltinType::Decimal,
        BuiltinType::Float,
        BuiltinType::Float32,
        BuiltinType::Float64,
        BuiltinType::Int,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::String,
        BuiltinType::String8,
        BuiltinType::Uuid,
        BuiltinType::Xml,
    ];

    /// Canonical token for this builtin
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinType::Any => "any",
            BuiltinType::Bool => "bool",
            BuiltinType::Bytes => "bytes",
            BuiltinType::Date => "date",
            BuiltinType::Datetime => "datetime",
            BuiltinType::Decimal => "decimal",
            BuiltinType::Float => "float",
            BuiltinType::Float32 => "float32",
            BuiltinType::Float64 => "float64",
            BuiltinType::Int => "int",
            BuiltinType::Int32 => "int32",
            BuiltinType::Int64 => "int64",
            BuiltinType::String => "string",
            BuiltinType::String8 => "string_8",
            BuiltinType::Uuid => "uuid",
            BuiltinType::Xml => "xml",
        }
    }

    /// Look up a builtin by name, ignoring ASCII case
    pub fn lookup(name: &str) -> Option<BuiltinType> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether `name` spells a builtin
    pub fn is_builtin(name: &str) -> bool {
        Self::lookup(name).is_some()
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

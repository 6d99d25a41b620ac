//! Per-import symbol table
//!
//! A [`TypeList`] owns every top-level named type produced by one import
//! job. It is created fresh per job and never shared between jobs.
//!
//! Entries are stored in insertion order and addressed by [`TypeId`];
//! sorting only reorders the view, so handles held by fields and aliases
//! stay valid.
//!
//! Name uniqueness is not enforced: adding two types with the same name keeps
//! both, and lookups return the first one in list order.

use serde::Serialize;

use super::{BuiltinType, FieldList, Type, TypeId, TypeKind, TypeRef};
use crate::error::Result;

/// Symbol table of the types discovered while importing one schema
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeList {
    /// Owned types, indexed by [`TypeId`]
    entries: Vec<Type>,
    /// Current listing order
    order: Vec<TypeId>,
}

impl TypeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every named item in call order; anonymous items are skipped
    pub fn add<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Type>,
    {
        for item in items {
            self.insert(item);
        }
    }

    /// Register `item` if it is named and return a reference to it.
    ///
    /// Anonymous items come back as [`TypeRef::Inline`] so they can still be
    /// used at the site that created them.
    pub fn add_and_ret(&mut self, item: Type) -> TypeRef {
        if item.is_anonymous() {
            return TypeRef::inline(item);
        }
        TypeRef::Named(self.push(item))
    }

    /// Register a named item, returning its handle
    pub fn insert(&mut self, item: Type) -> Option<TypeId> {
        if item.is_anonymous() {
            return None;
        }
        Some(self.push(item))
    }

    fn push(&mut self, item: Type) -> TypeId {
        let id = TypeId(self.entries.len());
        self.entries.push(item);
        self.order.push(id);
        id
    }

    /// Resolve a name to a type.
    ///
    /// Builtins always win over user types of the same name (case-insensitive).
    /// Otherwise the first exact match in list order is returned; an
    /// imported builtin alias resolves to its canonical target.
    pub fn find(&self, name: &str) -> Option<TypeRef> {
        if let Some(builtin) = BuiltinType::lookup(name) {
            return Some(TypeRef::Builtin(builtin));
        }

        let id = self.position(name)?;
        match self.entries[id.0].kind() {
            TypeKind::ImportedBuiltinAlias { target } => Some(target.clone()),
            _ => Some(TypeRef::Named(id)),
        }
    }

    /// Handle of the first registered type named exactly `name`
    pub fn position(&self, name: &str) -> Option<TypeId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.entries[id.0].name() == name)
    }

    /// Stable sort of the listing by type name
    pub fn sort(&mut self) {
        let entries = &self.entries;
        self.order
            .sort_by(|a, b| entries[a.0].name().cmp(entries[b.0].name()));
    }

    /// Dedup-sort every record and union field list, then sort the listing.
    ///
    /// Fails on the first modeling conflict and leaves the list unchanged.
    pub fn sort_all(&mut self) -> Result<()> {
        let sorted = self
            .entries
            .iter()
            .map(|ty| ty.fields().map(FieldList::sort_without_dupl).transpose())
            .collect::<Result<Vec<_>>>()?;

        for (ty, fields) in self.entries.iter_mut().zip(sorted) {
            if let (Some(slot), Some(fields)) = (ty.fields_mut(), fields) {
                *slot = fields;
            }
        }
        self.sort();
        Ok(())
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.entries.get(id.0)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut Type> {
        self.entries.get_mut(id.0)
    }

    /// Types in listing order
    pub fn items(&self) -> impl Iterator<Item = &Type> + '_ {
        self.order.iter().map(move |id| &self.entries[id.0])
    }

    /// Handles in listing order
    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name of a reference; inline types answer their own name
    pub fn name_of<'a>(&'a self, ty: &'a TypeRef) -> &'a str {
        match ty {
            TypeRef::Builtin(builtin) => builtin.as_str(),
            TypeRef::Named(id) => self.get(*id).map(Type::name).unwrap_or_default(),
            TypeRef::Inline(inner) => inner.name(),
        }
    }
}

//! Model text rendering
//!
//! Turns a finalized [`TypeList`] into the textual model form returned by
//! [`Importer::load`](crate::importer::Importer::load). The layout is fixed:
//! one application block, one declaration per registered type, in list order.

use std::fmt::{self, Display, Formatter, Write as _};

use crate::importer::ImporterArg;
use crate::types::{Field, Type, TypeKind, TypeList, TypeRef};

const HEADER: &str = "# Code generated by unischema. DO NOT EDIT.";
const INDENT: &str = "    ";
const DEFAULT_APP_NAME: &str = "App";

/// Render `types` as model text
pub fn render(arg: &ImporterArg, types: &TypeList) -> String {
    ModelText::new(arg, types).to_string()
}

/// Displayable model text for one import
pub struct ModelText<'a> {
    arg: &'a ImporterArg,
    types: &'a TypeList,
    header: bool,
}

impl<'a> ModelText<'a> {
    pub fn new(arg: &'a ImporterArg, types: &'a TypeList) -> Self {
        Self {
            arg,
            types,
            header: true,
        }
    }

    /// Toggle the generated-code banner
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    fn type_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Inline(inner) => match inner.kind() {
                TypeKind::Array { items } => format!("sequence of {}", self.type_name(items)),
                _ if inner.is_anonymous() => "any".to_string(),
                _ => inner.name().to_string(),
            },
            other => self.types.name_of(other).to_string(),
        }
    }

    fn write_type(&self, f: &mut Formatter<'_>, ty: &Type) -> fmt::Result {
        let keyword = match ty.kind() {
            TypeKind::Standard { .. } => "!type",
            TypeKind::Union { .. } => "!union",
            TypeKind::Enum => "!enum",
            // input spellings of builtins are resolved at use sites
            TypeKind::Builtin(_) | TypeKind::ImportedBuiltinAlias { .. } => return Ok(()),
            TypeKind::Alias { .. } | TypeKind::ExternalAlias { .. } | TypeKind::Array { .. } => {
                "!alias"
            }
        };

        write!(f, "{INDENT}{keyword} {}", ty.name())?;
        if !matches!(ty.kind(), TypeKind::Enum) {
            write_attrs(f, ty.attributes())?;
        }
        writeln!(f, ":")?;

        let body = INDENT.repeat(2);
        match ty.kind() {
            TypeKind::Standard { properties } => {
                if properties.is_empty() {
                    writeln!(f, "{body}...")?;
                }
                for field in properties {
                    self.write_field(f, field)?;
                }
            }
            TypeKind::Union { options } => {
                if options.is_empty() {
                    writeln!(f, "{body}...")?;
                }
                for option in options {
                    writeln!(f, "{body}{}", self.type_name(&option.ty))?;
                }
            }
            TypeKind::Enum => {
                if ty.attributes().is_empty() {
                    writeln!(f, "{body}...")?;
                }
                for (index, value) in ty.attributes().iter().enumerate() {
                    writeln!(f, "{body}{value}: {index}")?;
                }
            }
            TypeKind::Alias { target } | TypeKind::ExternalAlias { target } => {
                writeln!(f, "{body}{}", self.type_name(target))?;
            }
            TypeKind::Array { items } => {
                writeln!(f, "{body}sequence of {}", self.type_name(items))?;
            }
            TypeKind::Builtin(_) | TypeKind::ImportedBuiltinAlias { .. } => {}
        }
        Ok(())
    }

    fn write_field(&self, f: &mut Formatter<'_>, field: &Field) -> fmt::Result {
        let mut line = format!("{}{} <: {}", INDENT.repeat(2), field.name, self.type_name(&field.ty));
        if let Some(size) = &field.size_spec {
            write!(line, "{size}")?;
        }
        if field.optional {
            line.push('?');
        }
        f.write_str(&line)?;
        write_attrs(f, &field.attrs)?;
        writeln!(f)
    }
}

fn write_attrs(f: &mut Formatter<'_>, attrs: &[String]) -> fmt::Result {
    if attrs.is_empty() {
        return Ok(());
    }
    write!(f, " [{}]", attrs.join(", "))
}

impl Display for ModelText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.header {
            writeln!(f, "{HEADER}")?;
            writeln!(f)?;
        }

        let imports = self.arg.import_list();
        for import in &imports {
            writeln!(f, "import {import}")?;
        }
        if !imports.is_empty() {
            writeln!(f)?;
        }

        let app_name = if self.arg.app_name.is_empty() {
            DEFAULT_APP_NAME
        } else {
            &self.arg.app_name
        };
        write!(f, "{app_name}")?;
        if !self.arg.package_name.is_empty() {
            write!(f, " [package={:?}]", self.arg.package_name)?;
        }
        writeln!(f, ":")?;

        let declared = self.types.items().filter(|ty| {
            !matches!(
                ty.kind(),
                TypeKind::Builtin(_) | TypeKind::ImportedBuiltinAlias { .. }
            )
        });
        if declared.count() == 0 {
            return writeln!(f, "{INDENT}...");
        }
        for ty in self.types.items() {
            self.write_type(f, ty)?;
        }
        Ok(())
    }
}

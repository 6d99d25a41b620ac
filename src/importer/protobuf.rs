//! Protocol Buffers importer
//!
//! `.proto` sources are tokenized and parsed into message and enum
//! declarations first, then converted, so a field may name a message declared
//! further down the file (or in another file of a `protobufDir` input).
//!
//! Nested declarations are flattened: `Outer.Inner` becomes `Outer_Inner`.

use regex::Regex;
use tracing::{debug, trace};

use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::Format;
use crate::types::{BuiltinType, Field, FieldList, Type, TypeList, TypeRef};

/// Importer for `.proto` files and directories
#[derive(Debug, Clone)]
pub struct ProtobufImporter {
    format: Format,
    arg: ImporterArg,
}

impl ProtobufImporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            arg: ImporterArg::default(),
        }
    }
}

impl Importer for ProtobufImporter {
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
        let comment = Regex::new(r"(?s)//[^\n]*|/\*.*?\*/")?;
        let token = Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[A-Za-z_.][\w.]*|-?\d[\w.]*|\S"#)?;

        let source = comment.replace_all(content, " ");
        let tokens: Vec<&str> = token.find_iter(&source).map(|m| m.as_str()).collect();

        let mut parser = Parser::new(self.format.name, tokens);
        parser.file()?;
        debug!(
            messages = parser.messages.len(),
            enums = parser.enums.len(),
            "parsed protobuf declarations"
        );

        Converter {
            types: TypeList::new(),
            packages: parser.packages,
            shallow: self.arg.shallow,
        }
        .convert(parser.messages, parser.enums)
    }
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Singular,
    Optional,
    Required,
    Repeated,
}

#[derive(Debug)]
enum FieldType {
    Named(String),
    Map(String, String),
}

#[derive(Debug)]
struct FieldDecl {
    label: Label,
    ty: FieldType,
    name: String,
    deprecated: bool,
}

#[derive(Debug)]
struct OneofDecl {
    name: String,
    fields: Vec<FieldDecl>,
}

#[derive(Debug)]
struct MessageDecl {
    /// Enclosing message names followed by this message's name
    path: Vec<String>,
    fields: Vec<FieldDecl>,
    oneofs: Vec<OneofDecl>,
}

#[derive(Debug)]
struct EnumDecl {
    path: Vec<String>,
    values: Vec<String>,
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'t> {
    format: &'static str,
    tokens: Vec<&'t str>,
    pos: usize,
    packages: Vec<String>,
    messages: Vec<MessageDecl>,
    enums: Vec<EnumDecl>,
}

impl<'t> Parser<'t> {
    fn new(format: &'static str, tokens: Vec<&'t str>) -> Self {
        Self {
            format,
            tokens,
            pos: 0,
            packages: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ImportError {
        ImportError::parse(self.format, message)
    }

    fn peek(&self) -> Option<&'t str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<&'t str> {
        let token = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, want: &str) -> Result<()> {
        let got = self.next()?;
        if got != want {
            return Err(self.error(format!("expected `{want}`, found `{got}`")));
        }
        Ok(())
    }

    /// Skip through the next top-level `;`
    fn skip_statement(&mut self) -> Result<()> {
        let mut depth = 0;
        loop {
            match self.next()? {
                "{" => depth += 1,
                "}" => depth -= 1,
                ";" if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    /// Skip a header and its `{ ... }` body
    fn skip_block(&mut self) -> Result<()> {
        while self.next()? != "{" {}
        let mut depth = 1;
        while depth > 0 {
            match self.next()? {
                "{" => depth += 1,
                "}" => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn file(&mut self) -> Result<()> {
        while let Some(token) = self.peek() {
            match token {
                "syntax" | "edition" | "import" | "option" => self.skip_statement()?,
                "package" => {
                    self.next()?;
                    let name = self.next()?;
                    self.packages.push(name.to_string());
                    self.expect(";")?;
                }
                "message" => {
                    self.next()?;
                    self.message(&[])?;
                }
                "enum" => {
                    self.next()?;
                    self.enumeration(&[])?;
                }
                "service" | "extend" => self.skip_block()?,
                ";" => {
                    self.next()?;
                }
                other => return Err(self.error(format!("unexpected token `{other}`"))),
            }
        }
        Ok(())
    }

    fn message(&mut self, scope: &[String]) -> Result<()> {
        let mut path = scope.to_vec();
        path.push(self.next()?.to_string());
        self.expect("{")?;

        let mut fields = Vec::new();
        let mut oneofs = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error(format!("unterminated message {}", path.join(".")))),
                Some("}") => {
                    self.next()?;
                    break;
                }
                Some("message") => {
                    self.next()?;
                    self.message(&path)?;
                }
                Some("enum") => {
                    self.next()?;
                    self.enumeration(&path)?;
                }
                Some("oneof") => {
                    self.next()?;
                    oneofs.push(self.oneof()?);
                }
                Some("option" | "reserved" | "extensions") => self.skip_statement()?,
                Some("extend") => self.skip_block()?,
                Some(";") => {
                    self.next()?;
                }
                Some(_) => fields.push(self.field()?),
            }
        }

        trace!(message = %path.join("."), fields = fields.len(), "parsed message");
        self.messages.push(MessageDecl {
            path,
            fields,
            oneofs,
        });
        Ok(())
    }

    fn oneof(&mut self) -> Result<OneofDecl> {
        let name = self.next()?.to_string();
        self.expect("{")?;
        let mut fields = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error(format!("unterminated oneof {name}"))),
                Some("}") => {
                    self.next()?;
                    break;
                }
                Some("option") => self.skip_statement()?,
                Some(_) => fields.push(self.field()?),
            }
        }
        Ok(OneofDecl { name, fields })
    }

    fn field(&mut self) -> Result<FieldDecl> {
        let mut token = self.next()?;
        let label = match token {
            "optional" => Label::Optional,
            "required" => Label::Required,
            "repeated" => Label::Repeated,
            _ => Label::Singular,
        };
        if label != Label::Singular {
            token = self.next()?;
        }

        let ty = if token == "map" && self.peek() == Some("<") {
            self.expect("<")?;
            let key = self.next()?.to_string();
            self.expect(",")?;
            let value = self.next()?.to_string();
            self.expect(">")?;
            FieldType::Map(key, value)
        } else {
            FieldType::Named(token.to_string())
        };

        let name = self.next()?.to_string();
        self.expect("=")?;
        self.next()?;

        let mut options = Vec::new();
        if self.peek() == Some("[") {
            self.next()?;
            loop {
                match self.next()? {
                    "]" => break,
                    option => options.push(option),
                }
            }
        }
        self.expect(";")?;

        Ok(FieldDecl {
            label,
            ty,
            name,
            deprecated: options.windows(3).any(|w| w == ["deprecated", "=", "true"]),
        })
    }

    fn enumeration(&mut self, scope: &[String]) -> Result<()> {
        let mut path = scope.to_vec();
        path.push(self.next()?.to_string());
        self.expect("{")?;

        let mut values = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error(format!("unterminated enum {}", path.join(".")))),
                Some("}") => {
                    self.next()?;
                    break;
                }
                Some("option" | "reserved") => self.skip_statement()?,
                Some(";") => {
                    self.next()?;
                }
                Some(_) => {
                    values.push(self.next()?.to_string());
                    // `= N [options];`
                    self.skip_statement()?;
                }
            }
        }
        self.enums.push(EnumDecl { path, values });
        Ok(())
    }
}

// =============================================================================
// Conversion
// =============================================================================

struct Converter {
    types: TypeList,
    packages: Vec<String>,
    shallow: bool,
}

impl Converter {
    fn convert(mut self, messages: Vec<MessageDecl>, enums: Vec<EnumDecl>) -> Result<TypeList> {
        for decl in enums {
            self.types
                .add([Type::enumeration(decl.path.join("_")).with_attrs(decl.values)]);
        }

        let mut slots = Vec::with_capacity(messages.len());
        for decl in &messages {
            if let Some(id) = self
                .types
                .insert(Type::standard(decl.path.join("_"), FieldList::new()))
            {
                slots.push(id);
            }
        }

        for (decl, id) in messages.iter().zip(slots) {
            let ty = self.message(decl)?;
            if let Some(slot) = self.types.get_mut(id) {
                *slot = ty;
            }
        }

        self.types.sort_all()?;
        Ok(self.types)
    }

    fn message(&mut self, decl: &MessageDecl) -> Result<Type> {
        let name = decl.path.join("_");
        let mut fields = FieldList::new();

        for field in &decl.fields {
            fields.push(self.field(&decl.path, field)?);
        }

        for oneof in &decl.oneofs {
            let mut options = FieldList::new();
            for field in &oneof.fields {
                options.push(self.field(&decl.path, field)?);
            }
            let union = self
                .types
                .add_and_ret(Type::union(format!("{name}_{}", oneof.name), options));
            fields.push(Field::new(oneof.name.as_str(), union).with_optional(true));
        }

        Ok(Type::standard(name, fields))
    }

    fn field(&mut self, scope: &[String], field: &FieldDecl) -> Result<Field> {
        let ty = match &field.ty {
            FieldType::Named(name) => self.resolve(scope, name)?,
            FieldType::Map(key, value) => {
                let key = self.resolve(scope, key)?;
                let key = format!("~key={}", self.types.name_of(&key));
                let value = self.resolve(scope, value)?;
                TypeRef::inline(Type::array("", value).with_attrs(["~map".to_string(), key]))
            }
        };
        let ty = if field.label == Label::Repeated {
            TypeRef::inline(Type::array("", ty))
        } else {
            ty
        };

        let mut result = Field::new(field.name.as_str(), ty).with_optional(field.label == Label::Optional);
        if field.deprecated {
            result.attrs.push("~deprecated".to_string());
        }
        Ok(result)
    }

    /// Resolve a type name from inside the message at `scope`, innermost first
    fn resolve(&mut self, scope: &[String], name: &str) -> Result<TypeRef> {
        if let Some(builtin) = scalar(name) {
            return Ok(builtin.into());
        }

        let mut qualified = name.trim_start_matches('.');
        for package in &self.packages {
            if let Some(rest) = qualified
                .strip_prefix(package.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
            {
                qualified = rest;
                break;
            }
        }
        let flat = qualified.replace('.', "_");

        for depth in (0..=scope.len()).rev() {
            let candidate = match depth {
                0 => flat.clone(),
                _ => format!("{}_{flat}", scope[..depth].join("_")),
            };
            if let Some(found) = self.types.find(&candidate) {
                return Ok(found);
            }
        }

        if !self.shallow {
            return Err(ImportError::UnresolvedReference(name.to_string()));
        }
        debug!(reference = name, "keeping unresolved protobuf type as string alias");
        Ok(self
            .types
            .add_and_ret(Type::string_alias(flat, [format!("~ref={name}")])))
    }
}

fn scalar(name: &str) -> Option<BuiltinType> {
    let builtin = match name {
        "double" => BuiltinType::Float64,
        "float" => BuiltinType::Float32,
        "int32" | "sint32" | "sfixed32" => BuiltinType::Int32,
        "int64" | "sint64" | "sfixed64" | "uint32" | "fixed32" => BuiltinType::Int64,
        "uint64" | "fixed64" => BuiltinType::Int,
        "bool" => BuiltinType::Bool,
        "string" => BuiltinType::String,
        "bytes" => BuiltinType::Bytes,
        "google.protobuf.Timestamp" => BuiltinType::Datetime,
        "google.protobuf.Any" | "google.protobuf.Struct" | "google.protobuf.Value" => BuiltinType::Any,
        _ => return None,
    };
    Some(builtin)
}

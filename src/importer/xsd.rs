//! XML Schema importer
//!
//! Top-level `complexType`, `simpleType` and `element` declarations become
//! named types. XML Schema builtins are registered under their prefixed
//! spelling (e.g. `xs:integer`) as imported builtin aliases so every use
//! resolves to the canonical builtin.

use roxmltree::{Document, Node};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::Format;
use crate::types::{BuiltinType, Field, FieldList, SizeSpec, Type, TypeKind, TypeList, TypeRef};

const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Importer for `.xsd` documents
#[derive(Debug, Clone)]
pub struct XsdImporter {
    format: Format,
    arg: ImporterArg,
}

impl XsdImporter {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            arg: ImporterArg::default(),
        }
    }
}

impl Importer for XsdImporter {
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
        let doc = Document::parse(content)?;
        let root = doc.root_element();
        if root.tag_name().name() != "schema" {
            return Err(ImportError::parse(
                self.format.name,
                format!("expected <schema> root element, found <{}>", root.tag_name().name()),
            ));
        }
        Converter::new(root).convert(root)
    }
}

// =============================================================================
// Conversion
// =============================================================================

struct Converter<'a, 'input> {
    /// Top-level complex types, for `extension base=...`
    complex: HashMap<&'a str, Node<'a, 'input>>,
    /// Length facets of top-level simple types, applied where they are used
    sizes: HashMap<&'a str, SizeSpec>,
    /// Bases currently being merged through `complexContent` extensions
    extending: Vec<&'a str>,
    types: TypeList,
}

impl<'a, 'input> Converter<'a, 'input> {
    fn new(root: Node<'a, 'input>) -> Self {
        let mut complex = HashMap::new();
        let mut sizes = HashMap::new();
        for node in root.children().filter(Node::is_element) {
            let Some(name) = node.attribute("name") else {
                continue;
            };
            match node.tag_name().name() {
                "complexType" => {
                    complex.insert(name, node);
                }
                "simpleType" => {
                    if let Some(size) = child(node, "restriction").and_then(facets) {
                        sizes.insert(name, size);
                    }
                }
                _ => {}
            }
        }
        Self {
            complex,
            sizes,
            extending: Vec::new(),
            types: TypeList::new(),
        }
    }

    fn convert(mut self, root: Node<'a, 'input>) -> Result<TypeList> {
        let definitions: Vec<(&'a str, Node<'a, 'input>)> = root
            .children()
            .filter(|n| is_any(n, &["complexType", "simpleType", "element"]))
            .filter_map(|n| Some((n.attribute("name")?, n)))
            // `<element name="X" type="X"/>` adds nothing over the type itself
            .filter(|(name, n)| n.attribute("type").map(local) != Some(*name))
            .collect();

        let mut slots = Vec::with_capacity(definitions.len());
        for &(name, _) in &definitions {
            if let Some(id) = self.types.insert(Type::standard(name, FieldList::new())) {
                slots.push(id);
            }
        }

        for (&(name, node), id) in definitions.iter().zip(slots) {
            trace!(name, kind = node.tag_name().name(), "converting xsd declaration");
            let ty = self.define(name, node)?;
            if let Some(slot) = self.types.get_mut(id) {
                *slot = ty;
            }
        }

        debug!(count = self.types.len(), "converted xsd declarations");
        self.types.sort_all()?;
        Ok(self.types)
    }

    fn define(&mut self, name: &str, node: Node<'a, 'input>) -> Result<Type> {
        match node.tag_name().name() {
            "complexType" => Ok(Type::standard(name, self.complex_fields(name, node)?)),
            "simpleType" => self.simple(name, node),
            _ => {
                if let Some(qname) = node.attribute("type") {
                    Ok(Type::alias(name, self.resolve(node, qname)?))
                } else if let Some(ct) = child(node, "complexType") {
                    Ok(Type::standard(name, self.complex_fields(name, ct)?))
                } else if let Some(st) = child(node, "simpleType") {
                    self.simple(name, st)
                } else {
                    Ok(Type::alias(name, BuiltinType::Any))
                }
            }
        }
    }

    fn simple(&mut self, name: &str, node: Node<'a, 'input>) -> Result<Type> {
        if let Some(restriction) = child(node, "restriction") {
            let values: Vec<&str> = restriction
                .children()
                .filter(|n| is(n, "enumeration"))
                .filter_map(|n| n.attribute("value"))
                .collect();
            if !values.is_empty() {
                return Ok(Type::enumeration(name).with_attrs(values));
            }
            let target = match restriction.attribute("base") {
                Some(base) => self.resolve(restriction, base)?,
                None => BuiltinType::String.into(),
            };
            return Ok(Type::alias(name, target));
        }

        if let Some(list) = child(node, "list") {
            let items = match (list.attribute("itemType"), child(list, "simpleType")) {
                (Some(item), _) => self.resolve(list, item)?,
                (None, Some(inline)) => {
                    let lifted = self.simple(&format!("{name}_item"), inline)?;
                    self.types.add_and_ret(lifted)
                }
                (None, None) => BuiltinType::String.into(),
            };
            return Ok(Type::array(name, items));
        }

        if let Some(union) = child(node, "union") {
            let mut options = FieldList::new();
            for member in union.attribute("memberTypes").unwrap_or_default().split_whitespace() {
                options.push(Field::new(local(member), self.resolve(union, member)?));
            }
            return Ok(Type::union(name, options));
        }

        Ok(Type::alias(name, BuiltinType::String))
    }

    fn complex_fields(&mut self, parent: &str, node: Node<'a, 'input>) -> Result<FieldList> {
        let mut fields = FieldList::new();
        self.collect(parent, node, false, &mut fields)?;
        Ok(fields)
    }

    /// Walk model groups, attributes and content extensions of a complex type
    fn collect(
        &mut self,
        parent: &str,
        node: Node<'a, 'input>,
        optional: bool,
        fields: &mut FieldList,
    ) -> Result<()> {
        for c in node.children().filter(Node::is_element) {
            match c.tag_name().name() {
                "sequence" | "all" => self.collect(parent, c, optional || min_occurs(c) == 0, fields)?,
                "choice" => self.collect(parent, c, true, fields)?,
                "element" => fields.push(self.element_field(parent, c, optional)?),
                "attribute" => fields.push(self.attribute_field(parent, c)?),
                "simpleContent" => {
                    for ext in c.children().filter(|n| is_any(n, &["extension", "restriction"])) {
                        if let Some(base) = ext.attribute("base") {
                            fields.push(Field::new("value", self.resolve(ext, base)?));
                        }
                        self.collect(parent, ext, optional, fields)?;
                    }
                }
                "complexContent" => {
                    for ext in c.children().filter(|n| is_any(n, &["extension", "restriction"])) {
                        let base = ext.attribute("base").map(local);
                        if is(&ext, "extension") {
                            if let Some((name, node)) =
                                base.and_then(|b| Some((b, self.complex.get(b).copied()?)))
                            {
                                if self.extending.contains(&name) {
                                    return Err(ImportError::parse(
                                        "xsd",
                                        format!("cyclic extension of {name} in {parent}"),
                                    ));
                                }
                                self.extending.push(name);
                                self.collect(parent, node, optional, fields)?;
                                self.extending.pop();
                            }
                        }
                        self.collect(parent, ext, optional, fields)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn element_field(&mut self, parent: &str, el: Node<'a, 'input>, in_choice: bool) -> Result<Field> {
        let reference = el.attribute("ref");
        let name = el
            .attribute("name")
            .or(reference.map(local))
            .ok_or_else(|| ImportError::parse("xsd", format!("element without name in {parent}")))?;

        let (ty, size) = if let Some(qname) = el.attribute("type") {
            (self.resolve(el, qname)?, self.sizes.get(local(qname)).copied())
        } else if let Some(reference) = reference {
            let ty = self
                .types
                .find(local(reference))
                .ok_or_else(|| ImportError::UnresolvedReference(reference.to_string()))?;
            (ty, None)
        } else {
            self.inline_type(parent, name, el)?
        };

        let optional = in_choice || min_occurs(el) == 0 || el.attribute("nillable") == Some("true");
        let ty = if is_repeated(el) {
            TypeRef::inline(Type::array("", ty))
        } else {
            ty
        };
        Ok(Field::new(name, ty).with_optional(optional).with_size(size))
    }

    fn attribute_field(&mut self, parent: &str, at: Node<'a, 'input>) -> Result<Field> {
        let name = at
            .attribute("name")
            .or(at.attribute("ref").map(local))
            .ok_or_else(|| ImportError::parse("xsd", format!("attribute without name in {parent}")))?;

        let (ty, size) = match at.attribute("type") {
            Some(qname) => (self.resolve(at, qname)?, self.sizes.get(local(qname)).copied()),
            None => self.inline_type(parent, name, at)?,
        };
        Ok(Field::new(name, ty)
            .with_optional(at.attribute("use") != Some("required"))
            .with_size(size)
            .with_attrs(["~xml_attribute"]))
    }

    /// Anonymous type declared inside an element or attribute, lifted as `<parent>_<name>`
    fn inline_type(
        &mut self,
        parent: &str,
        name: &str,
        node: Node<'a, 'input>,
    ) -> Result<(TypeRef, Option<SizeSpec>)> {
        let hint = format!("{parent}_{name}");
        if let Some(ct) = child(node, "complexType") {
            let fields = self.complex_fields(&hint, ct)?;
            return Ok((self.types.add_and_ret(Type::standard(hint, fields)), None));
        }
        if let Some(st) = child(node, "simpleType") {
            let size = child(st, "restriction").and_then(facets);
            let lifted = self.simple(&hint, st)?;
            // a plain restriction of a builtin stays inline
            if let TypeKind::Alias { target } = lifted.kind() {
                if target.as_builtin().is_some() {
                    return Ok((target.clone(), size));
                }
            }
            return Ok((self.types.add_and_ret(lifted), size));
        }
        Ok((BuiltinType::String.into(), None))
    }

    /// Resolve a qualified type name in the scope of `ctx`
    fn resolve(&mut self, ctx: Node<'a, 'input>, qname: &str) -> Result<TypeRef> {
        let (prefix, name) = match qname.split_once(':') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, qname),
        };

        if ctx.lookup_namespace_uri(prefix) == Some(XS_NS) {
            if self.types.position(qname).is_none() {
                let builtin = xs_builtin(name).unwrap_or(BuiltinType::Any);
                self.types.add([Type::imported_builtin_alias(qname, builtin)]);
            }
            return self
                .types
                .find(qname)
                .ok_or_else(|| ImportError::UnresolvedReference(qname.to_string()));
        }

        if let Some(found) = self.types.find(name) {
            return Ok(found);
        }
        xs_builtin(name)
            .map(TypeRef::Builtin)
            .ok_or_else(|| ImportError::UnresolvedReference(qname.to_string()))
    }
}

// =============================================================================
// Node helpers
// =============================================================================

fn is(node: &Node, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn is_any(node: &Node, tags: &[&str]) -> bool {
    node.is_element() && tags.contains(&node.tag_name().name())
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(n, tag))
}

fn local(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

fn min_occurs(node: Node) -> u64 {
    node.attribute("minOccurs")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

fn is_repeated(node: Node) -> bool {
    match node.attribute("maxOccurs") {
        Some("unbounded") => true,
        Some(value) => value.parse::<u64>().map_or(false, |max| max > 1),
        None => false,
    }
}

/// Length facets of a restriction
fn facets(restriction: Node) -> Option<SizeSpec> {
    let facet = |tag: &str| {
        child(restriction, tag)
            .and_then(|n| n.attribute("value"))
            .and_then(|v| v.parse::<i64>().ok())
    };
    if let Some(length) = facet("length") {
        return Some(SizeSpec::between(length, length));
    }
    SizeSpec::from_bounds(facet("minLength"), facet("maxLength"))
}

/// Canonical builtin for an XML Schema datatype
fn xs_builtin(name: &str) -> Option<BuiltinType> {
    let builtin = match name {
        "string" | "normalizedString" | "token" | "anyURI" | "QName" | "NCName" | "ID" | "IDREF"
        | "language" | "time" | "duration" => BuiltinType::String,
        "boolean" => BuiltinType::Bool,
        "int" | "short" | "byte" | "unsignedShort" | "unsignedByte" => BuiltinType::Int32,
        "long" | "unsignedInt" | "unsignedLong" => BuiltinType::Int64,
        "integer" | "nonNegativeInteger" | "positiveInteger" | "negativeInteger"
        | "nonPositiveInteger" => BuiltinType::Int,
        "decimal" => BuiltinType::Decimal,
        "float" => BuiltinType::Float32,
        "double" => BuiltinType::Float64,
        "date" => BuiltinType::Date,
        "dateTime" => BuiltinType::Datetime,
        "base64Binary" | "hexBinary" => BuiltinType::Bytes,
        "anyType" | "anySimpleType" => BuiltinType::Any,
        _ => return None,
    };
    Some(builtin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::XSD;

    const ORDERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:tns="urn:orders" targetNamespace="urn:orders">
  <xs:element name="Order" type="tns:Order"/>
  <xs:complexType name="Order">
    <xs:sequence>
      <xs:element name="id" type="xs:long"/>
      <xs:element name="code" type="tns:Code"/>
      <xs:element name="note" type="xs:string" minOccurs="0"/>
      <xs:element name="line" type="tns:Line" maxOccurs="unbounded"/>
      <xs:element name="status" type="tns:Status"/>
    </xs:sequence>
    <xs:attribute name="version" type="xs:integer" use="required"/>
  </xs:complexType>
  <xs:complexType name="Line">
    <xs:sequence>
      <xs:element name="sku" type="xs:string"/>
      <xs:element name="quantity" type="xs:int"/>
    </xs:sequence>
  </xs:complexType>
  <xs:complexType name="DiscountLine">
    <xs:complexContent>
      <xs:extension base="tns:Line">
        <xs:sequence>
          <xs:element name="percent" type="xs:decimal"/>
        </xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:simpleType name="Code">
    <xs:restriction base="xs:string">
      <xs:minLength value="2"/>
      <xs:maxLength value="8"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="Status">
    <xs:restriction base="xs:string">
      <xs:enumeration value="OPEN"/>
      <xs:enumeration value="CLOSED"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

    fn import(content: &str) -> Result<TypeList> {
        XsdImporter::new(XSD).import(content)
    }

    fn get<'a>(types: &'a TypeList, name: &str) -> &'a Type {
        types.get(types.position(name).unwrap()).unwrap()
    }

    #[test]
    fn test_import_orders() {
        let types = import(ORDERS).unwrap();
        let order = get(&types, "Order");
        let fields = order.fields().unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["code", "id", "line", "note", "status", "version"]);

        assert_eq!(fields.get("id").unwrap().ty, TypeRef::Builtin(BuiltinType::Int64));
        assert!(fields.get("note").unwrap().optional);
        assert!(!fields.get("id").unwrap().optional);
        assert_eq!(fields.get("code").unwrap().size_spec, Some(SizeSpec::between(2, 8)));
        assert!(matches!(fields.get("line").unwrap().ty, TypeRef::Inline(_)));

        let version = fields.get("version").unwrap();
        assert_eq!(version.ty, TypeRef::Builtin(BuiltinType::Int));
        assert_eq!(version.attrs, ["~xml_attribute"]);
        assert!(!version.optional);

        assert_eq!(get(&types, "Status").attributes(), ["OPEN", "CLOSED"]);
    }

    #[test]
    fn test_builtin_spellings_are_registered() {
        let types = import(ORDERS).unwrap();
        assert_eq!(types.find("xs:long"), Some(TypeRef::Builtin(BuiltinType::Int64)));
        assert_eq!(get(&types, "xs:string").kind_name(), "imported_builtin_alias");
    }

    #[test]
    fn test_extension_merges_base_fields() {
        let types = import(ORDERS).unwrap();
        let discount = get(&types, "DiscountLine");
        let names: Vec<_> = discount.fields().unwrap().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["percent", "quantity", "sku"]);
    }

    #[test]
    fn test_cyclic_extension_is_an_error() {
        let doc = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="A">
    <xs:complexContent><xs:extension base="B"/></xs:complexContent>
  </xs:complexType>
  <xs:complexType name="B">
    <xs:complexContent><xs:extension base="A"/></xs:complexContent>
  </xs:complexType>
</xs:schema>"#;
        let err = import(doc).unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(err.to_string().contains("cyclic extension"));
    }

    #[test]
    fn test_inline_complex_type_is_lifted() {
        let doc = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="Person">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="address">
          <xs:complexType>
            <xs:sequence><xs:element name="city" type="xs:string"/></xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let types = import(doc).unwrap();
        let person = get(&types, "Person");
        let address = person.fields().unwrap().get("address").unwrap();
        assert_eq!(types.name_of(&address.ty), "Person_address");
        assert!(types.position("Person_address").is_some());
    }

    #[test]
    fn test_unknown_type_reference() {
        let doc = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="A">
    <xs:sequence><xs:element name="b" type="Missing"/></xs:sequence>
  </xs:complexType>
</xs:schema>"#;
        let err = import(doc).unwrap_err();
        assert!(matches!(err, ImportError::UnresolvedReference(ref name) if name == "Missing"));
    }

    #[test]
    fn test_rejects_non_schema_root() {
        let err = import("<root/>").unwrap_err();
        assert!(matches!(err, ImportError::Parse { .. }));
        assert!(matches!(import("<xs:schema").unwrap_err(), ImportError::Xml(_)));
    }
}

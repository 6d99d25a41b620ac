//! End-to-end import tests
//!
//! Every fixture is detected from its path and content, imported through
//! the factory and checked both as a type list and as rendered model text.

use std::path::{Path, PathBuf};

use unischema::importer::read_source;
use unischema::types::SizeSpec;
use unischema::{configured, BuiltinType, Importer, ImporterArg, Type, TypeKind, TypeList, TypeRef};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn importer(name: &str, arg: &ImporterArg) -> Box<dyn Importer> {
    let path = fixture(name);
    let content = if path.is_dir() {
        Vec::new()
    } else {
        std::fs::read(&path).unwrap()
    };
    configured(&path, path.is_dir(), None, &content, arg).unwrap()
}

fn import(name: &str) -> TypeList {
    let importer = importer(name, &ImporterArg::default());
    let source = read_source(&fixture(name), &importer.format()).unwrap();
    importer.import(&source).unwrap()
}

fn get<'a>(types: &'a TypeList, name: &str) -> &'a Type {
    types.get(types.position(name).unwrap()).unwrap()
}

fn names(types: &TypeList) -> Vec<&str> {
    types
        .items()
        .filter(|t| !matches!(t.kind(), TypeKind::ImportedBuiltinAlias { .. }))
        .map(Type::name)
        .collect()
}

// =============================================================================
// Per-format Imports
// =============================================================================

#[test]
fn test_openapi_fixture() {
    let importer = importer("library.yaml", &ImporterArg::new("Library", "library"));
    assert_eq!(importer.format().name, "openapi3");

    let types = import("library.yaml");
    assert_eq!(names(&types), vec!["Author", "Book", "Genre"]);

    let book = get(&types, "Book").fields().unwrap();
    assert_eq!(book.get("published").unwrap().ty, TypeRef::Builtin(BuiltinType::Date));
    assert_eq!(book.get("isbn").unwrap().size_spec, Some(SizeSpec::between(0, 13)));
    assert!(matches!(get(&types, "Genre").kind(), TypeKind::Enum));

    let text = importer.load_file(&fixture("library.yaml")).unwrap();
    assert!(text.contains("Library [package=\"library\"]:\n"));
    assert!(text.contains("        author <: Author?\n"));
    assert!(text.contains("        genres <: sequence of Genre?\n"));
    assert!(text.contains("        isbn <: string(0..13)\n"));
    assert!(text.contains("    !enum Genre:\n        fiction: 0\n        poetry: 1\n"));
}

#[test]
fn test_xsd_fixture() {
    let types = import("catalog.xsd");
    assert!(names(&types).contains(&"Item"));
    assert!(names(&types).contains(&"Sku"));

    let item = get(&types, "Item").fields().unwrap();
    assert_eq!(item.get("sku").unwrap().size_spec, Some(SizeSpec::between(12, 12)));
    assert_eq!(item.get("price").unwrap().ty, TypeRef::Builtin(BuiltinType::Decimal));

    let currency = item.get("currency").unwrap();
    assert!(currency.optional);
    assert_eq!(currency.attrs, ["~xml_attribute"]);

    let label = item.get("label").unwrap();
    assert!(label.optional);
    assert!(matches!(&label.ty, TypeRef::Inline(inner) if matches!(inner.kind(), TypeKind::Array { .. })));
}

#[test]
fn test_avro_fixture() {
    let types = import("inventory.avsc");
    assert_eq!(names(&types), vec!["Stock", "StockState"]);

    let stock = get(&types, "Stock").fields().unwrap();
    assert_eq!(stock.get("quantity").unwrap().ty, TypeRef::Builtin(BuiltinType::Int32));
    assert!(stock.get("warehouse").unwrap().optional);
    assert_eq!(get(&types, "StockState").attributes(), ["IN_STOCK", "BACKORDER"]);
}

#[test]
fn test_sql_fixture_detected_as_spanner() {
    let importer = importer("music.sql", &ImporterArg::default());
    assert_eq!(importer.format().name, "spannerSQL");

    let types = import("music.sql");
    assert_eq!(names(&types), vec!["Albums", "Singers"]);
    assert!(get(&types, "Albums")
        .attributes()
        .contains(&"~interleave=Singers".to_string()));

    let singers = get(&types, "Singers").fields().unwrap();
    assert_eq!(singers.get("Name").unwrap().size_spec, Some(SizeSpec::min_only(256)));
}

#[test]
fn test_protobuf_directory_fixture() {
    let importer = importer("protos", &ImporterArg::default());
    assert_eq!(importer.format().name, "protobufDir");

    let types = import("protos");
    assert_eq!(names(&types), vec!["Contact", "Phone", "Phone_Kind"]);

    let phone = get(&types, "Phone").fields().unwrap();
    assert_eq!(types.name_of(&phone.get("kind").unwrap().ty), "Phone_Kind");
}

#[test]
fn test_json_schema_fixture_uses_transform() {
    let importer = importer("person.json", &ImporterArg::default());
    assert_eq!(importer.format().name, "jsonschema");

    let types = import("person.json");
    assert_eq!(names(&types), vec!["Person"]);
    let person = get(&types, "Person").fields().unwrap();
    assert!(!person.get("name").unwrap().optional);
    assert!(person.get("born").unwrap().optional);
}

// =============================================================================
// Rendering Options
// =============================================================================

#[test]
fn test_imports_and_header_in_loaded_text() {
    let arg = ImporterArg {
        app_name: "Inventory".to_string(),
        imports: "common.sysl, money.sysl".to_string(),
        ..ImporterArg::default()
    };
    let text = importer("inventory.avsc", &arg)
        .load_file(&fixture("inventory.avsc"))
        .unwrap();

    assert!(text.starts_with("# Code generated by unischema. DO NOT EDIT.\n\nimport common.sysl\nimport money.sysl\n\nInventory:\n"));
}

#[test]
fn test_load_is_deterministic() {
    let importer = importer("library.yaml", &ImporterArg::new("Library", ""));
    let first = importer.load_file(&fixture("library.yaml")).unwrap();
    let second = importer.load_file(&fixture("library.yaml")).unwrap();
    assert_eq!(first, second);
}

//! Importer dispatch and concurrent use

use std::path::Path;
use std::thread;

use unischema::format::{self, FORMATS};
use unischema::{configured, factory, importer_for, ImportError, ImporterArg, Type};

fn dispatch(format_name: &str) -> Result<Box<dyn unischema::Importer>, ImportError> {
    factory(Path::new("input.txt"), false, Some(format_name), b"")
}

// =============================================================================
// Format Dispatch
// =============================================================================

#[test]
fn test_explicit_format_ignores_case() {
    let importer = dispatch("OpenAPI3").unwrap();
    assert_eq!(importer.format().name, "openapi3");
    assert_eq!(dispatch("SPANNERSQL").unwrap().format().name, "spannerSQL");
}

#[test]
fn test_unknown_format() {
    let err = dispatch("not-a-format").err().unwrap();
    assert!(matches!(err, ImportError::UnknownFormat(ref name) if name == "not-a-format"));
    assert_eq!(err.to_string(), "an importer does not exist for not-a-format");
}

#[test]
fn test_grammar_is_disabled() {
    let err = dispatch("grammar").err().unwrap();
    assert_eq!(err.to_string(), "importer disabled for: grammar");
}

#[test]
fn test_every_enabled_format_builds() {
    for f in FORMATS.iter().filter(|f| f.name != "grammar") {
        let importer = importer_for(*f).unwrap();
        assert_eq!(importer.format(), *f);
    }
}

#[test]
fn test_unrecognised_input() {
    let err = factory(Path::new("notes.txt"), false, None, b"hello").err().unwrap();
    assert_eq!(err.to_string(), "error converting file at notes.txt: unrecognised type");
}

#[test]
fn test_swagger_sniffed_before_json_schema() {
    let doc = br#"{"swagger": "2.0", "$schema": "x", "definitions": {}}"#;
    let detected = format::detect(Path::new("api.json"), false, None, doc).unwrap();
    assert_eq!(detected.name, "openapi2");
}

#[test]
fn test_jsonschema_uses_transform_importer() {
    let arg = ImporterArg::new("People", "");
    let importer = configured(Path::new("p.json"), false, Some("jsonschema"), b"", &arg).unwrap();
    let text = importer
        .load(r#"{"title": "Person", "type": "object", "properties": {"age": {"type": "integer"}}}"#)
        .unwrap();
    assert!(text.contains("People:\n    !type Person:\n        age <: int?\n"));
}

// =============================================================================
// Concurrency
// =============================================================================

/// OpenAPI document with a chain of `count` records named `<prefix>0..`
fn chained_document(prefix: &str, count: usize) -> String {
    let mut doc = String::from("openapi: 3.0.0\ncomponents:\n  schemas:\n");
    for i in 0..count {
        doc.push_str(&format!("    {prefix}{i:03}:\n      type: object\n      properties:\n"));
        doc.push_str("        id: {type: string}\n");
        if i + 1 < count {
            doc.push_str(&format!(
                "        next: {{$ref: '#/components/schemas/{prefix}{:03}'}}\n",
                i + 1
            ));
        }
    }
    doc
}

#[test]
fn test_concurrent_imports_do_not_interfere() {
    let importer = dispatch("openapi3").unwrap();
    let alpha = chained_document("Alpha", 60);
    let beta = chained_document("Beta", 75);

    let expected_alpha = importer.load(&alpha).unwrap();
    let expected_beta = importer.load(&beta).unwrap();

    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let importer = &importer;
                let doc = if i % 2 == 0 { &alpha } else { &beta };
                s.spawn(move || (i, importer.import(doc).unwrap(), importer.load(doc).unwrap()))
            })
            .collect();

        for handle in handles {
            let (i, types, text) = handle.join().unwrap();
            let (prefix, count, expected) = if i % 2 == 0 {
                ("Alpha", 60, &expected_alpha)
            } else {
                ("Beta", 75, &expected_beta)
            };
            assert_eq!(types.len(), count);
            assert!(types.items().map(Type::name).all(|n| n.starts_with(prefix)));
            assert_eq!(&text, expected);
        }
    });
}

//! Importer dispatch
//!
//! The only place a format token is turned into behavior. Tokens are
//! normalized to lowercase and looked up in [`CONSTRUCTORS`]; formats without
//! a native importer fall through to the transform importer.

use std::path::Path;
use tracing::debug;

use super::avro::AvroImporter;
use super::openapi::OpenApiImporter;
use super::protobuf::ProtobufImporter;
use super::sql::SqlImporter;
use super::transform::TransformImporter;
use super::xsd::XsdImporter;
use super::{Importer, ImporterArg};
use crate::error::{ImportError, Result};
use crate::format::{self, Format};

type Constructor = fn(Format) -> Result<Box<dyn Importer>>;

/// Normalized format token to importer constructor
const CONSTRUCTORS: &[(&str, Constructor)] = &[
    ("openapi2", openapi),
    ("openapi3", openapi),
    ("xsd", xsd),
    ("grammar", disabled),
    ("avro", avro),
    ("spannersql", sql),
    ("spannersqldir", sql),
    ("postgres", sql),
    ("postgresdir", sql),
    ("mysql", sql),
    ("mysqldir", sql),
    ("bigquery", sql),
    ("protobuf", protobuf),
    ("protobufdir", protobuf),
];

fn openapi(format: Format) -> Result<Box<dyn Importer>> {
    Ok(Box::new(OpenApiImporter::new(format)))
}

fn xsd(format: Format) -> Result<Box<dyn Importer>> {
    Ok(Box::new(XsdImporter::new(format)))
}

fn avro(format: Format) -> Result<Box<dyn Importer>> {
    Ok(Box::new(AvroImporter::new(format)))
}

fn sql(format: Format) -> Result<Box<dyn Importer>> {
    Ok(Box::new(SqlImporter::new(format)))
}

fn protobuf(format: Format) -> Result<Box<dyn Importer>> {
    Ok(Box::new(ProtobufImporter::new(format)))
}

fn disabled(format: Format) -> Result<Box<dyn Importer>> {
    Err(ImportError::ImporterDisabled(format.name.to_string()))
}

/// Build the importer for a resolved format
pub fn importer_for(format: Format) -> Result<Box<dyn Importer>> {
    let token = format.name.to_ascii_lowercase();
    match CONSTRUCTORS.iter().find(|(name, _)| *name == token) {
        Some((_, construct)) => construct(format),
        None => Ok(Box::new(TransformImporter::new(format))),
    }
}

/// Resolve the format of an input and build its importer.
///
/// `format_name` selects a format explicitly (case-insensitive); when it is
/// `None` or empty the path and content are sniffed instead.
pub fn factory(
    path: &Path,
    is_dir: bool,
    format_name: Option<&str>,
    content: &[u8],
) -> Result<Box<dyn Importer>> {
    let format = format::detect(path, is_dir, format_name, content)?;
    debug!(format = format.name, path = %path.display(), "detected import format");
    importer_for(format)
}

/// [`factory`] followed by [`Importer::configure`]
pub fn configured(
    path: &Path,
    is_dir: bool,
    format_name: Option<&str>,
    content: &[u8],
    arg: &ImporterArg,
) -> Result<Box<dyn Importer>> {
    let mut importer = factory(path, is_dir, format_name, content)?;
    importer.configure(arg)?;
    Ok(importer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FORMATS;

    #[test]
    fn test_every_native_token_is_registered() {
        for (token, _) in CONSTRUCTORS {
            assert!(
                FORMATS.iter().any(|f| f.is(token)),
                "constructor token {token} has no format"
            );
        }
    }

    #[test]
    fn test_sql_dialects_share_importer() {
        for name in ["spannerSQL", "postgres", "mysqlDir", "bigquery"] {
            let importer = importer_for(format::by_name(name).unwrap()).unwrap();
            assert_eq!(importer.format().name, name);
        }
    }

    #[test]
    fn test_grammar_is_disabled() {
        let err = importer_for(format::GRAMMAR).err().unwrap();
        assert_eq!(err.to_string(), "importer disabled for: grammar");
    }

    #[test]
    fn test_jsonschema_falls_back_to_transform() {
        let importer = importer_for(format::JSON_SCHEMA).unwrap();
        assert_eq!(importer.format(), format::JSON_SCHEMA);
    }

    #[test]
    fn test_configured_applies_arg() {
        let arg = ImporterArg::new("Petstore", "pets");
        let importer = configured(Path::new("a.avsc"), false, None, b"{}", &arg).unwrap();
        assert_eq!(importer.arg(), &arg);
    }
}

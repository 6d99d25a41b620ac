//! Unischema
//!
//! Imports schema definitions written in several external formats and
//! converts them into one canonical, sorted type graph that renders as
//! model text.
//!
//! ## Supported formats
//!
//! - **OpenAPI**: Swagger 2.0 and OpenAPI 3.x documents (JSON or YAML)
//! - **XSD**: XML Schema documents
//! - **Avro**: `.avsc` schemas
//! - **SQL**: Spanner, PostgreSQL, MySQL and BigQuery DDL, single files or directories
//! - **Protobuf**: `.proto` files or directories
//! - **JSON Schema**: through the transform importer
//!
//! ## Architecture
//!
//! ```text
//! path + content ──► format::detect ──► importer::factory ──► Box<dyn Importer>
//!                                                                   │
//!                                        render::render ◄── TypeList ◄┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use unischema::{configured, ImporterArg};
//!
//! let path = Path::new("petstore.yaml");
//! let content = std::fs::read(path)?;
//! let arg = ImporterArg::new("Petstore", "pets");
//! let importer = configured(path, false, None, &content, &arg)?;
//! println!("{}", importer.load(&String::from_utf8_lossy(&content))?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod format;
pub mod importer;
pub mod render;
pub mod types;

pub use checksum::Checksum;
pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use format::Format;
pub use importer::{configured, factory, importer_for, Importer, ImporterArg};
pub use render::{render, ModelText};
pub use types::{BuiltinType, Field, FieldList, Type, TypeId, TypeKind, TypeList, TypeRef};

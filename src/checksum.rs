//! Checksums of rendered model text
//!
//! Rendering is deterministic, so the checksum of a model identifies the
//! imported schema independently of its source formatting.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::importer::ImporterArg;
use crate::render::render;
use crate::types::TypeList;

const TRAILER_PREFIX: &str = "# checksum: sha256:";

/// SHA256 checksum of model text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    pub fn from_text(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Checksum of the model text `types` renders to, banner included
    pub fn of_model(arg: &ImporterArg, types: &TypeList) -> Self {
        Self::from_text(&render(arg, types))
    }

    /// Hash `text` as emitted and append the trailer line
    pub fn append_to(text: &mut String) -> Self {
        let checksum = Self::from_text(text);
        text.push_str(&checksum.comment());
        text.push('\n');
        checksum
    }

    /// Check a text ending in a trailer written by [`Checksum::append_to`]
    pub fn verify_trailer(text: &str) -> bool {
        let Some(content) = text.strip_suffix('\n') else {
            return false;
        };
        let (body, last) = match content.rfind('\n') {
            Some(i) => (&text[..=i], &content[i + 1..]),
            None => ("", content),
        };
        match last.strip_prefix(TRAILER_PREFIX) {
            Some(hex) => Self::from_text(body).as_str() == hex,
            None => false,
        }
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        Self::from_text(content) == *self
    }

    /// Trailer line appended to model text
    pub fn comment(&self) -> String {
        format!("{TRAILER_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ModelText;
    use crate::types::{BuiltinType, Field, Type};

    fn pets() -> TypeList {
        let mut types = TypeList::new();
        types.add([Type::standard("Pet", vec![Field::new("id", BuiltinType::Int)].into())]);
        types
    }

    #[test]
    fn test_checksum_consistency() {
        let arg = ImporterArg::new("Petstore", "");
        assert_eq!(Checksum::of_model(&arg, &pets()), Checksum::of_model(&arg, &pets()));
    }

    #[test]
    fn test_checksum_depends_on_metadata() {
        let a = Checksum::of_model(&ImporterArg::new("A", ""), &pets());
        let b = Checksum::of_model(&ImporterArg::new("B", ""), &pets());
        assert_ne!(a, b);
    }

    #[test]
    fn test_trailer_matches_headerless_body() {
        let arg = ImporterArg::new("Petstore", "");
        let mut text = ModelText::new(&arg, &pets()).with_header(false).to_string();
        let body = text.clone();

        let checksum = Checksum::append_to(&mut text);
        assert!(checksum.verify(&body));
        assert!(text.ends_with(&format!("{}\n", checksum.comment())));
        assert!(Checksum::verify_trailer(&text));
        assert_ne!(checksum, Checksum::of_model(&arg, &pets()));
    }

    #[test]
    fn test_tampered_trailer_fails() {
        let mut text = "App:\n    ...\n".to_string();
        Checksum::append_to(&mut text);
        assert!(!Checksum::verify_trailer(&text.replace("App", "Api")));
        assert!(!Checksum::verify_trailer("App:\n    ...\n"));
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_text("Pet:\n    ...\n");
        assert!(checksum.verify("Pet:\n    ...\n"));
        assert!(!checksum.verify("different content"));
        assert_eq!(checksum.as_str().len(), 64);
        assert!(checksum.comment().starts_with("# checksum: sha256:"));
    }
}

use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::encoding;
use crate::error::SpecError;

/// Loads a YAML/JSON document from a file into an order-preserving tree.
///
/// The raw bytes go through byte-order-mark normalization before parsing,
/// so documents saved by editors that prepend a mark load transparently.
/// Mapping key order and scalar tags survive exactly as authored.
pub fn load_document(path: &Path) -> Result<Value, SpecError> {
    let raw = fs::read(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = encoding::normalize(&raw).map_err(|source| SpecError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text).map_err(|source| SpecError::Syntax {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses already-normalized text into a document tree.
pub fn parse_document(text: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

/// Serializes a document tree back to YAML text.
pub fn to_yaml_string(document: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(document)
}

/// Writes a document tree to a file as YAML with default permissions.
pub fn write_document(path: &Path, document: &Value) -> Result<(), SpecError> {
    let text = to_yaml_string(document).map_err(|source| SpecError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_is_preserved_through_a_round_trip() {
        let doc = parse_document("zebra: 1\nalpha: 2\nmiddle: 3\n").unwrap();
        let out = to_yaml_string(&doc).unwrap();
        let zebra = out.find("zebra").unwrap();
        let alpha = out.find("alpha").unwrap();
        let middle = out.find("middle").unwrap();
        assert!(zebra < alpha && alpha < middle);
    }

    #[test]
    fn scalar_tags_survive_parsing() {
        let doc = parse_document("count: 3\nname: demo\nactive: true\nempty: null\n").unwrap();
        assert!(doc.get("count").unwrap().is_number());
        assert!(doc.get("name").unwrap().is_string());
        assert!(doc.get("active").unwrap().is_bool());
        assert!(doc.get("empty").unwrap().is_null());
    }

    #[test]
    fn syntax_errors_carry_a_position() {
        let err = parse_document("key: [unclosed\nother: 1\n").unwrap_err();
        assert!(err.location().is_some());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        assert!(parse_document("a: 1\na: 2\n").is_err());
    }
}

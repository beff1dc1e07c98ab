//! Schema detection and dual-dialect decoding.
//!
//! Contract `data.xml` files come in two generations:
//!
//! - **modern**: attribute-tagged XML under a `contractingAnnouncement` root,
//!   decoded generically: attributes become `@name` keys, element text next
//!   to attributes or children becomes `#text`, repeated siblings become lists.
//! - **legacy**: a flat list of `<item name="...">` elements whose `<value>`
//!   holds either text or further items, decoded into a tree keyed by `name`.
//!
//! Files are read with the fixed ISO-8859-15 charset. A missing or malformed
//! file decodes to the empty tree.

use std::fmt;
use std::path::Path;

use encoding_rs::ISO_8859_15;
use procura_core::{Mapping, RawTree};
use tracing::{debug, warn};

use crate::DecodeError;
use crate::xml::{self, Element};

/// Literal whose presence in the decoded text selects the modern dialect.
pub const MODERN_MARKER: &str = "contractingAnnouncement";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Modern,
    Legacy,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modern => write!(f, "modern"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

pub fn detect_dialect(text: &str) -> Dialect {
    if text.contains(MODERN_MARKER) {
        Dialect::Modern
    } else {
        Dialect::Legacy
    }
}

/// Decode raw bytes with the feed's fixed single-byte charset.
pub fn decode_latin9(bytes: &[u8]) -> String {
    let (text, _) = ISO_8859_15.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Decode already-decoded text, surfacing XML errors.
pub(crate) fn decode_text(text: &str) -> Result<RawTree, DecodeError> {
    let root = xml::parse(text)?;
    Ok(match detect_dialect(text) {
        Dialect::Modern => modern_tree(&root),
        Dialect::Legacy => legacy_tree(&root),
    })
}

/// Decode a document's bytes; malformed XML yields the empty tree.
pub fn decode_document(bytes: &[u8]) -> RawTree {
    decode_text(&decode_latin9(bytes)).unwrap_or_else(|e| {
        debug!(error = %e, "undecodable contract document");
        RawTree::empty()
    })
}

/// Read and decode a document file, reporting why nothing was decoded.
pub(crate) fn read_document(path: &Path) -> Result<RawTree, DecodeError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DecodeError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    decode_text(&decode_latin9(&bytes))
}

/// Read and decode a document file; missing or malformed files yield the empty tree.
pub fn decode_file(path: &Path) -> RawTree {
    read_document(path).unwrap_or_else(|e| {
        if e.is_missing() {
            debug!(path = %path.display(), "no contract document");
        } else {
            warn!(path = %path.display(), error = %e, "undecodable contract document");
        }
        RawTree::empty()
    })
}

// ── Modern dialect ──

fn modern_tree(root: &Element) -> RawTree {
    let mut doc = Mapping::new();
    doc.insert(root.name.clone(), modern_value(root));
    RawTree::Node(doc)
}

fn modern_value(element: &Element) -> RawTree {
    if element.attrs.is_empty() && element.children.is_empty() {
        return RawTree::Scalar(element.text.clone());
    }

    let mut node = Mapping::new();
    for (key, value) in &element.attrs {
        node.insert(format!("@{key}"), RawTree::Scalar(value.clone()));
    }
    for child in &element.children {
        node.append(child.name.clone(), modern_value(child));
    }
    if !element.text.is_empty() {
        node.insert(procura_core::tree::TEXT_KEY, RawTree::Scalar(element.text.clone()));
    }
    RawTree::Node(node)
}

// ── Legacy dialect ──

fn legacy_tree(root: &Element) -> RawTree {
    RawTree::Node(legacy_items(root.children_named("item")))
}

fn legacy_items<'a>(items: impl Iterator<Item = &'a Element>) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, value) in items.filter_map(legacy_item) {
        mapping.insert(key, value);
    }
    mapping
}

/// Collapse an `<item>` to its text value, or to a subtree of its nested items.
fn legacy_item(item: &Element) -> Option<(String, RawTree)> {
    let key = item.attr("name")?.to_string();
    let first_value = item.children_named("value").next();

    let mut nested = item
        .children_named("value")
        .flat_map(|v| v.children_named("item"))
        .peekable();
    if nested.peek().is_some() {
        return Some((key, RawTree::Node(legacy_items(nested))));
    }

    first_value.map(|v| (key, RawTree::Scalar(v.text.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: &str = r#"<?xml version="1.0" encoding="ISO-8859-15"?>
<contractingAnnouncement>
  <contracting>
    <subject>Mantenimiento de ascensores</subject>
    <processingStatus id="3">Adjudicado</processingStatus>
    <offersManagement>
      <offerManagement><name>Uno</name></offerManagement>
    </offersManagement>
    <resolutions>
      <resolution><priceWithVAT>10</priceWithVAT></resolution>
      <resolution><priceWithVAT>20</priceWithVAT></resolution>
    </resolutions>
  </contracting>
</contractingAnnouncement>"#;

    const LEGACY: &str = r#"<?xml version="1.0" encoding="ISO-8859-15"?>
<contenido>
  <item name="contratacion">
    <value>
      <item name="contratacion_titulo_contrato"><value>Limpieza</value></item>
      <item name="contratacion_estado_contrato">
        <value>
          <item name="valor"><value>Adjudicado</value></item>
          <item name="codigo"><value>3</value></item>
        </value>
      </item>
      <item name="vacio"></item>
    </value>
  </item>
</contenido>"#;

    #[test]
    fn detects_dialect_by_marker() {
        assert_eq!(detect_dialect(MODERN), Dialect::Modern);
        assert_eq!(detect_dialect(LEGACY), Dialect::Legacy);
    }

    #[test]
    fn modern_decodes_attributes_text_and_lists() {
        let tree = decode_text(MODERN).unwrap();
        let contracting = tree.path(&["contractingAnnouncement", "contracting"]).unwrap();
        assert_eq!(
            contracting.get("subject").and_then(RawTree::text),
            Some("Mantenimiento de ascensores")
        );
        let status = contracting.get("processingStatus").unwrap();
        assert_eq!(status.attr("id"), Some("3"));
        assert_eq!(status.text(), Some("Adjudicado"));

        // Single offer stays a node, repeated resolutions become a list.
        let offer = contracting.path(&["offersManagement", "offerManagement"]).unwrap();
        assert!(offer.as_node().is_some());
        let resolutions = contracting.path(&["resolutions", "resolution"]).unwrap();
        assert!(matches!(resolutions, RawTree::List(items) if items.len() == 2));
    }

    #[test]
    fn legacy_decodes_items_by_name() {
        let tree = decode_text(LEGACY).unwrap();
        let contract = tree.get("contratacion").unwrap();
        assert_eq!(
            contract.get("contratacion_titulo_contrato").and_then(RawTree::as_scalar),
            Some("Limpieza")
        );
        let status = contract.get("contratacion_estado_contrato").unwrap();
        assert_eq!(status.get("valor").and_then(RawTree::as_scalar), Some("Adjudicado"));
        assert_eq!(status.get("codigo").and_then(RawTree::as_scalar), Some("3"));
        // Items without a value are dropped.
        assert!(!contract.contains_key("vacio"));
    }

    #[test]
    fn latin9_bytes_are_decoded() {
        let (bytes, _, _) = ISO_8859_15.encode(
            "<contenido><item name=\"t\"><value>Señalización € año</value></item></contenido>",
        );
        let tree = decode_document(&bytes);
        assert_eq!(tree.get("t").and_then(RawTree::as_scalar), Some("Señalización € año"));
    }

    #[test]
    fn malformed_document_is_empty_tree() {
        let tree = decode_document(b"<contractingAnnouncement><contracting></contractingAnnouncement>");
        assert!(tree.is_empty());
    }

    #[test]
    fn missing_file_is_empty_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.xml");
        assert!(decode_file(&path).is_empty());
        assert!(read_document(&path).unwrap_err().is_missing());
    }

    #[test]
    fn file_roundtrip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.xml");
        let (bytes, _, _) = ISO_8859_15.encode(LEGACY);
        std::fs::write(&path, &bytes).unwrap();
        let tree = decode_file(&path);
        assert!(tree.contains_key("contratacion"));
    }
}

//! Relationships between parts of an OPC package.
use crate::common::xml::attr;
use crate::ooxml::opc::constants::{relationship_type, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// A single relationship from a source part to a target.
///
/// Internal relationships point at another part; external ones carry a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: impl Into<String>,
        reltype: impl Into<String>,
        target_ref: impl Into<String>,
        base_uri: impl Into<String>,
        is_external: bool,
    ) -> Self {
        Self {
            r_id: r_id.into(),
            reltype: reltype.into(),
            target_ref: target_ref.into(),
            base_uri: base_uri.into(),
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Relative part reference, or the URL of an external target.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Whether the relationship type ends with `kind` (see [`relationship_type`]).
    #[inline]
    pub fn is_type(&self, kind: &str) -> bool {
        relationship_type::matches(&self.reltype, kind)
    }

    /// Absolute partname of an internal target.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} targets external '{}'",
                self.r_id, self.target_ref
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Relationships of one source part, in the order they were declared.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    rels: Vec<Relationship>,
    by_id: HashMap<String, usize>,
}

impl Relationships {
    /// Parse a `.rels` part. Targets resolve against `base_uri`.
    pub fn from_xml(xml: &[u8], base_uri: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Relationships::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let (Some(r_id), Some(reltype), Some(target)) =
                        (attr(&e, b"Id"), attr(&e, b"Type"), attr(&e, b"Target"))
                    else {
                        continue;
                    };
                    let is_external = attr(&e, b"TargetMode").as_deref() == Some(target_mode::EXTERNAL);
                    rels.push(Relationship::new(r_id, reltype, target, base_uri, is_external));
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(rels)
    }

    pub fn push(&mut self, rel: Relationship) {
        self.by_id.insert(rel.r_id.clone(), self.rels.len());
        self.rels.push(rel);
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.by_id.get(r_id).map(|&i| &self.rels[i])
    }

    /// Relationships of the given kind, in declaration order.
    pub fn of_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.rels.iter().filter(move |r| r.is_type(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_parse_preserves_order() {
        let rels = Relationships::from_xml(RELS.as_bytes(), "/word").unwrap();
        assert_eq!(rels.len(), 3);
        let ids: Vec<_> = rels.iter().map(|r| r.r_id()).collect();
        assert_eq!(ids, ["rId2", "rId1", "rId3"]);
    }

    #[test]
    fn test_internal_and_external_targets() {
        let rels = Relationships::from_xml(RELS.as_bytes(), "/word").unwrap();

        let image = rels.get("rId2").unwrap();
        assert!(image.is_type(relationship_type::IMAGE));
        assert_eq!(image.target_partname().unwrap().as_str(), "/word/media/image1.png");

        let link = rels.get("rId3").unwrap();
        assert!(link.is_external());
        assert_eq!(link.target_ref(), "https://example.com/?a=1&b=2");
        assert!(link.target_partname().is_err());

        assert_eq!(rels.of_type(relationship_type::STYLES).count(), 1);
        assert!(rels.get("rId9").is_none());
    }
}

//! In-memory OPC package.
//!
//! Every ZIP member is read when the package is opened, so later lookups
//! only borrow.
use crate::common::xml::attr;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_MEMBER, PACKAGE_URI, PackURI};
use crate::ooxml::opc::rel::Relationships;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

/// A part of the package with its content type and bytes.
#[derive(Debug, Clone)]
pub struct Part {
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
}

impl Part {
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

/// Content types from `[Content_Types].xml`.
///
/// Overrides match a full partname, defaults match an extension. Both are
/// compared case-insensitively.
#[derive(Debug, Default)]
struct ContentTypeMap {
    overrides: HashMap<String, String>,
    defaults: HashMap<String, String>,
}

impl ContentTypeMap {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut map = ContentTypeMap::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"Override" => {
                        if let (Some(name), Some(value)) = (attr(&e, b"PartName"), attr(&e, b"ContentType")) {
                            map.overrides.insert(name.to_ascii_lowercase(), value);
                        }
                    },
                    b"Default" => {
                        if let (Some(ext), Some(value)) = (attr(&e, b"Extension"), attr(&e, b"ContentType")) {
                            map.defaults.insert(ext.to_ascii_lowercase(), value);
                        }
                    },
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(map)
    }

    fn lookup(&self, partname: &PackURI) -> &str {
        self.overrides
            .get(&partname.as_str().to_ascii_lowercase())
            .or_else(|| self.defaults.get(&partname.ext().to_ascii_lowercase()))
            .map(String::as_str)
            .unwrap_or(ct::OCTET_STREAM)
    }
}

/// An Open Packaging Convention package (the container of .docx and .pptx).
#[derive(Debug)]
pub struct OpcPackage {
    parts: HashMap<PackURI, Part>,
    rels: Relationships,
}

impl OpcPackage {
    /// Open a package file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a package from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        let mut members: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.push((name, blob));
        }

        let content_types = members
            .iter()
            .find(|(name, _)| name == CONTENT_TYPES_MEMBER)
            .map(|(_, xml)| ContentTypeMap::from_xml(xml))
            .transpose()?
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_MEMBER.to_string()))?;

        let mut parts = HashMap::with_capacity(members.len());
        for (name, blob) in members {
            if name == CONTENT_TYPES_MEMBER {
                continue;
            }
            let partname = PackURI::from_member_name(&name);
            let content_type = content_types.lookup(&partname).to_string();
            parts.insert(
                partname.clone(),
                Part {
                    partname,
                    content_type,
                    blob,
                },
            );
        }
        debug!(parts = parts.len(), "loaded OPC package");

        let package_rels = PackURI::package().rels_uri();
        let rels = match parts.get(&package_rels) {
            Some(part) => Relationships::from_xml(part.blob(), PACKAGE_URI)?,
            None => Relationships::default(),
        };

        Ok(Self { parts, rels })
    }

    /// Package-level relationships (`/_rels/.rels`).
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Look up a part by partname.
    #[inline]
    pub fn part(&self, partname: &PackURI) -> Option<&Part> {
        self.parts.get(partname)
    }

    /// Look up a part, failing when it is absent.
    pub fn require_part(&self, partname: &PackURI) -> Result<&Part> {
        self.part(partname)
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Relationships declared by a part. A part without a `.rels` has none.
    pub fn rels_for(&self, partname: &PackURI) -> Result<Relationships> {
        match self.parts.get(&partname.rels_uri()) {
            Some(part) => Relationships::from_xml(part.blob(), partname.base_uri()),
            None => Ok(Relationships::default()),
        }
    }

    /// The part targeted by the package `officeDocument` relationship.
    pub fn main_document_part(&self) -> Result<&Part> {
        let rel = self
            .rels
            .of_type(relationship_type::OFFICE_DOCUMENT)
            .next()
            .ok_or_else(|| OpcError::InvalidRelationship("no officeDocument relationship".to_string()))?;
        self.require_part(&rel.target_partname()?)
    }

    /// Iterate over all parts in no particular order.
    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }
}

/// Build an in-memory ZIP from `(member name, content)` pairs.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="PNG" ContentType="image/png"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    fn sample() -> Vec<u8> {
        build_zip(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", b"<w:document/>"),
            ("word/media/image1.png", &[0x89, b'P', b'N', b'G']),
        ])
    }

    #[test]
    fn test_content_types_and_main_part() {
        let pkg = OpcPackage::from_bytes(&sample()).unwrap();

        let main = pkg.main_document_part().unwrap();
        assert_eq!(main.partname().as_str(), "/word/document.xml");
        assert_eq!(main.content_type(), ct::WML_DOCUMENT_MAIN);

        let image = pkg
            .part(&PackURI::new("/word/media/image1.png").unwrap())
            .unwrap();
        assert_eq!(image.content_type(), "image/png");
        assert_eq!(image.blob(), &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_missing_rels_is_empty() {
        let pkg = OpcPackage::from_bytes(&sample()).unwrap();
        let rels = pkg
            .rels_for(&PackURI::new("/word/document.xml").unwrap())
            .unwrap();
        assert!(rels.is_empty());
    }

    #[test]
    fn test_missing_content_types() {
        let bytes = build_zip(&[("word/document.xml", b"<w:document/>")]);
        assert!(matches!(
            OpcPackage::from_bytes(&bytes),
            Err(OpcError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            OpcPackage::from_bytes(b"plain text"),
            Err(OpcError::Zip(_))
        ));
        assert!(matches!(
            OpcPackage::open("/nonexistent/file.docx"),
            Err(OpcError::PackageNotFound(_))
        ));
    }
}

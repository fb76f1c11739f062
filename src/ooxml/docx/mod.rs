//! Word (.docx) documents.
//!
//! [`DocxDocument::open`] reads the package, the style table and the body
//! once. Everything afterwards borrows from that model.
//!
//! ```rust,no_run
//! use docsift::ooxml::docx::{Block, DocxDocument};
//!
//! let doc = DocxDocument::open("report.docx")?;
//! for block in doc.blocks() {
//!     if let Block::Paragraph(p) = block {
//!         println!("{}", p.text());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod body;
pub mod styles;
pub mod table;

pub use body::{Block, Drawing, LinkTarget, Paragraph, ParagraphLink, Run};
pub use styles::{Style, StyleTable};
pub use table::{Cell, Row, Table, VMerge};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type as ct, relationship_type};
use crate::ooxml::opc::{OpcPackage, PackURI, Part, Relationships};
use std::path::Path;
use tracing::{debug, warn};

/// Main part content types accepted as a Word document.
const WORD_MAIN_TYPES: [&str; 3] = [ct::WML_DOCUMENT_MAIN, ct::WML_DOCUMENT_MACRO, ct::WML_TEMPLATE_MAIN];

/// A parsed Word document.
#[derive(Debug)]
pub struct DocxDocument {
    package: OpcPackage,
    document_part: PackURI,
    rels: Relationships,
    styles: StyleTable,
    blocks: Vec<Block>,
}

impl DocxDocument {
    /// Open a .docx file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(OpcPackage::open(path)?)
    }

    /// Parse a .docx held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(OpcPackage::from_bytes(bytes)?)
    }

    fn from_package(package: OpcPackage) -> Result<Self> {
        let main = package
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main document part: {}", e)))?;
        if !WORD_MAIN_TYPES.contains(&main.content_type()) {
            return Err(OoxmlError::InvalidContentType {
                expected: ct::WML_DOCUMENT_MAIN.to_string(),
                got: main.content_type().to_string(),
            });
        }

        let document_part = main.partname().clone();
        let rels = package.rels_for(&document_part)?;

        let styles = match rels.of_type(relationship_type::STYLES).next() {
            Some(rel) => match package.part(&rel.target_partname()?) {
                Some(part) => StyleTable::from_xml(part.blob())?,
                None => {
                    warn!(target = rel.target_ref(), "styles part is missing");
                    StyleTable::default()
                },
            },
            None => StyleTable::default(),
        };

        let blocks = body::parse_body(main.blob())?;
        debug!(blocks = blocks.len(), styles = styles.len(), "parsed document body");

        Ok(Self {
            package,
            document_part,
            rels,
            styles,
            blocks,
        })
    }

    /// Body blocks in document order.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Relationships of `document.xml`.
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn package(&self) -> &OpcPackage {
        &self.package
    }

    #[inline]
    pub fn document_part(&self) -> &PackURI {
        &self.document_part
    }

    /// Top-level body paragraphs (table cells excluded).
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    /// Every paragraph, table cells included, in document order.
    pub fn all_paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => out.push(p),
                Block::Table(t) => t.paragraphs_into(&mut out),
            }
        }
        out
    }

    /// Every table, each followed by the tables nested in it.
    pub fn tables(&self) -> Vec<&Table> {
        let mut out = Vec::new();
        for block in &self.blocks {
            if let Block::Table(t) = block {
                t.collect_into(&mut out);
            }
        }
        out
    }

    /// The image part behind a drawing's relationship id.
    pub fn image_part(&self, r_id: &str) -> Option<&Part> {
        let rel = self.rels.get(r_id)?;
        if rel.is_external() {
            return None;
        }
        let partname = rel.target_partname().ok()?;
        self.package.part(&partname)
    }

    /// External URL of a hyperlink relationship.
    pub fn hyperlink_url(&self, r_id: &str) -> Option<&str> {
        self.rels
            .get(r_id)
            .filter(|rel| rel.is_external())
            .map(|rel| rel.target_ref())
    }
}

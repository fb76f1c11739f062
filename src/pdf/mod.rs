//! PDF documents on top of `lopdf`.
//!
//! [`PdfDocument`] caches page ids in page order and exposes, per page, the
//! interpreted layout ([`layout`]), link annotations and image XObjects.
//! Lattice tables are detected from the layout by [`tables`].
pub mod cmap;
pub mod layout;
pub mod tables;

use std::collections::HashSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;
use tracing::debug;

pub use layout::{PageLayout, Segment, TextRun};
use layout::{decode_text_string, number, page_resources, resolve_dict};
pub use tables::{LatticeTable, detect_tables};

/// Error type for PDF access
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF error: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("Encrypted PDF documents are not supported")]
    Encrypted,

    #[error("Page {0} does not exist")]
    PageOutOfRange(u32),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// A `/Link` annotation with a URI action.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    pub url: String,
    /// Normalised `[x_min, y_min, x_max, y_max]`
    pub rect: [f32; 4],
}

impl PageLink {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.rect[0] && x <= self.rect[2] && y >= self.rect[1] && y <= self.rect[3]
    }
}

/// An image XObject referenced from a page's resources.
#[derive(Debug, Clone)]
pub struct PageImage<'a> {
    pub id: ObjectId,
    /// Resource name, e.g. `Im1`
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_space: Option<String>,
    pub bits_per_component: Option<u32>,
    pub filters: Vec<String>,
    /// Stream data as stored, filters not applied
    pub content: &'a [u8],
}

/// A loaded PDF document.
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_document(Document::load(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_document(Document::load_mem(bytes)?)
    }

    fn from_document(doc: Document) -> Result<Self> {
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfError::Encrypted);
        }
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(pages = pages.len(), "loaded PDF");
        Ok(Self { doc, pages })
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page ids, first page first.
    #[inline]
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    fn page_id(&self, number: u32) -> Result<ObjectId> {
        number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or(PdfError::PageOutOfRange(number))
    }

    /// Text runs and ruling lines of a 1-based page.
    pub fn page_layout(&self, number: u32) -> Result<PageLayout> {
        Ok(layout::interpret_page(&self.doc, self.page_id(number)?)?)
    }

    /// `/Link` annotations whose action is `/S /URI`.
    pub fn page_links(&self, number: u32) -> Result<Vec<PageLink>> {
        let page = self.doc.get_dictionary(self.page_id(number)?)?;
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .and_then(|a| self.doc.dereference(a).ok())
            .and_then(|(_, a)| a.as_array().ok())
        else {
            return Ok(Vec::new());
        };

        let mut links = Vec::new();
        for annot in annots {
            let Some(dict) = resolve_dict(&self.doc, annot) else {
                continue;
            };
            if !name_is(dict, b"Subtype", b"Link") {
                continue;
            }
            let Some(action) = dict.get(b"A").ok().and_then(|a| resolve_dict(&self.doc, a)) else {
                continue;
            };
            if !name_is(action, b"S", b"URI") {
                continue;
            }
            let Some(url) = action
                .get(b"URI")
                .ok()
                .and_then(|u| self.doc.dereference(u).ok())
                .and_then(|(_, u)| u.as_str().ok())
                .map(decode_text_string)
            else {
                continue;
            };
            links.push(PageLink {
                url,
                rect: self.rect(dict).unwrap_or_default(),
            });
        }
        Ok(links)
    }

    fn rect(&self, annot: &Dictionary) -> Option<[f32; 4]> {
        let (_, rect) = self.doc.dereference(annot.get(b"Rect").ok()?).ok()?;
        let values: Vec<f32> = rect.as_array().ok()?.iter().filter_map(number).collect();
        let [x1, y1, x2, y2] = <[f32; 4]>::try_from(values).ok()?;
        Some([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
    }

    /// Image XObjects of a page, inherited resources included.
    ///
    /// Images inside form XObjects are collected too, down to
    /// [`layout::MAX_FORM_DEPTH`] levels. Each image object is reported once
    /// per page.
    pub fn page_images(&self, page: u32) -> Result<Vec<PageImage<'_>>> {
        let page_id = self.page_id(page)?;
        let mut images = Vec::new();
        let mut seen = HashSet::new();
        if let Some(xobjects) = page_resources(&self.doc, page_id).and_then(|r| self.xobjects(r)) {
            self.collect_images(xobjects, 0, &mut seen, &mut images);
        }
        Ok(images)
    }

    fn xobjects<'a>(&'a self, resources: &'a Dictionary) -> Option<&'a Dictionary> {
        resources
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve_dict(&self.doc, x))
    }

    fn collect_images<'a>(
        &'a self,
        xobjects: &'a Dictionary,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
        images: &mut Vec<PageImage<'a>>,
    ) {
        for (name, object) in xobjects.iter() {
            let Ok((id, object)) = self.doc.dereference(object) else {
                continue;
            };
            if let Some(id) = id
                && !seen.insert(id)
            {
                continue;
            }
            let Ok(stream) = object.as_stream() else {
                continue;
            };
            let dict = &stream.dict;
            if name_is(dict, b"Subtype", b"Form") {
                if depth >= layout::MAX_FORM_DEPTH {
                    debug!(depth, "form XObject nesting limit reached");
                    continue;
                }
                let nested = dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(&self.doc, r))
                    .and_then(|r| self.xobjects(r));
                if let Some(nested) = nested {
                    self.collect_images(nested, depth + 1, seen, images);
                }
                continue;
            }
            if !name_is(dict, b"Subtype", b"Image") {
                continue;
            }
            let int = |key: &[u8]| dict.get(key).ok().and_then(number).map(|v| v as u32);
            images.push(PageImage {
                id: id.unwrap_or((0, 0)),
                name: String::from_utf8_lossy(name).into_owned(),
                width: int(b"Width"),
                height: int(b"Height"),
                color_space: dict
                    .get(b"ColorSpace")
                    .ok()
                    .and_then(|c| c.as_name().ok())
                    .map(|c| String::from_utf8_lossy(c).into_owned()),
                bits_per_component: int(b"BitsPerComponent"),
                filters: filters(dict),
                content: &stream.content,
            });
        }
    }
}

fn name_is(dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .is_some_and(|name| name == expected)
}

/// `/Filter` as a list of names; a single name or an array.
fn filters(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

/// PDF documents built with the `lopdf` writer for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];

    fn text(font: &str, size: i64, x: i64, y: i64, s: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(s)]),
            Operation::new("ET", vec![]),
        ]
    }

    fn rect(x: i64, y: i64, w: i64, h: i64) -> Operation {
        Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()])
    }

    /// Assemble pages from their content operations; every page shares the
    /// fonts F1 (Helvetica) and F2 (Helvetica-Bold) and the image Im1.
    pub fn build(pages: Vec<(Vec<Operation>, Option<&str>)>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica-Bold",
        });
        let image = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            JPEG.to_vec(),
        ));
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold },
            "XObject" => dictionary! { "Im1" => image },
        });

        let mut kids: Vec<Object> = Vec::new();
        for (operations, link) in pages {
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if let Some(url) = link {
                let annot = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Link",
                    "Rect" => vec![70.into(), 715.into(), 250.into(), 735.into()],
                    "A" => dictionary! { "S" => "URI", "URI" => Object::string_literal(url) },
                });
                page.set("Annots", vec![Object::Reference(annot)]);
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// "Hello World" linked to example.com, one image and a 2x2 ruled table.
    pub fn hello_page() -> Vec<Operation> {
        let mut ops = text("F1", 12, 72, 720, "Hello World");
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![100.into(), 0.into(), 0.into(), 100.into(), 300.into(), 650.into()],
        ));
        ops.push(Operation::new("Do", vec!["Im1".into()]));
        ops.push(Operation::new("Q", vec![]));
        ops.push(rect(72, 550, 100, 50));
        ops.push(rect(172, 550, 100, 50));
        ops.push(rect(72, 500, 100, 50));
        ops.push(rect(172, 500, 100, 50));
        ops.push(Operation::new("S", vec![]));
        ops.extend(text("F1", 10, 80, 570, "a"));
        ops.extend(text("F1", 10, 180, 570, "b"));
        ops.extend(text("F1", 10, 80, 520, "c"));
        ops.extend(text("F1", 10, 180, 520, "d"));
        ops
    }

    pub fn sample_pdf() -> Vec<u8> {
        build(vec![(hello_page(), Some("https://example.com"))])
    }

    /// Two pages with headings at 24pt and 16pt over 11pt body text.
    pub fn headings_pdf() -> Vec<u8> {
        let mut first = text("F2", 24, 72, 760, "Annual Report");
        first.extend(text("F1", 11, 72, 700, "Body text"));
        let mut second = text("F2", 16, 72, 760, "Details");
        second.extend(text("F2", 24, 72, 700, "Appendix"));
        build(vec![(first, None), (second, None)])
    }
}

//! Legacy PowerPoint 97-2003 (`.ppt`) presentations.
//!
//! A `.ppt` file is an OLE2 compound file. The `PowerPoint Document` stream
//! holds a tree of records: one `DocumentContainer` (slide list, hyperlink
//! list, picture store) plus one `SlideContainer` per slide, located through
//! the persist directory. Picture blobs live in the optional `Pictures` stream.
//!
//! Slide text comes from two places: placeholder text stored in the
//! document's `SlideListWithText`, and free text boxes stored inside each
//! slide's drawing. Both are collected; they do not overlap.
pub mod directory;
pub mod pictures;
pub mod records;

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::common::binary::{cp1252_string, read_u32_le, utf16le_string};
pub use directory::PersistDirectory;
pub use pictures::{Blip, BlipKind};
use records::{Record, RecordIter, record_type};

pub const DOCUMENT_STREAM: &str = "PowerPoint Document";
pub const CURRENT_USER_STREAM: &str = "Current User";
pub const PICTURES_STREAM: &str = "Pictures";

/// `pib` property of `OfficeArtFOPT`: 1-based index into the picture store.
const PROP_PIB: u16 = 0x0104;

/// Error type for `.ppt` parsing
#[derive(Debug, Error)]
pub enum PptError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Invalid PPT format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, PptError>;

/// `TextHeaderAtom.textType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Title,
    Body,
    Notes,
    Other,
    CenterBody,
    CenterTitle,
    HalfBody,
    QuarterBody,
    Unknown(u32),
}

impl TextType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Title,
            1 => Self::Body,
            2 => Self::Notes,
            4 => Self::Other,
            5 => Self::CenterBody,
            6 => Self::CenterTitle,
            7 => Self::HalfBody,
            8 => Self::QuarterBody,
            other => Self::Unknown(other),
        }
    }

    #[inline]
    pub fn is_title(self) -> bool {
        matches!(self, Self::Title | Self::CenterTitle)
    }
}

/// One text atom with the type of its header.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text_type: TextType,
    pub text: String,
}

impl TextBlock {
    /// Paragraphs of the block. PowerPoint separates paragraphs with `\r`
    /// and soft line breaks with `\x0B`.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.text.split(['\r', '\x0B'])
    }
}

/// A slide in presentation order.
#[derive(Debug, Clone, Default)]
pub struct PptSlide {
    number: u32,
    slide_id: u32,
    texts: Vec<TextBlock>,
    hyperlink_refs: Vec<u32>,
    picture_refs: Vec<u32>,
}

impl PptSlide {
    /// 1-based position in the presentation.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[inline]
    pub fn slide_id(&self) -> u32 {
        self.slide_id
    }

    /// Text blocks: slide-list placeholders first, then drawing text boxes.
    #[inline]
    pub fn texts(&self) -> &[TextBlock] {
        &self.texts
    }

    /// `exHyperlinkIdRef`s of the slide's interactive info atoms.
    #[inline]
    pub fn hyperlink_refs(&self) -> &[u32] {
        &self.hyperlink_refs
    }

    /// Picture store indexes (1-based) of the slide's picture shapes.
    #[inline]
    pub fn picture_refs(&self) -> &[u32] {
        &self.picture_refs
    }
}

/// An `ExHyperlinkContainer` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PptHyperlink {
    pub id: u32,
    pub friendly_name: String,
    pub target: String,
    pub location: String,
}

/// A parsed `.ppt` presentation.
#[derive(Debug)]
pub struct PptPresentation {
    slides: Vec<PptSlide>,
    hyperlinks: Vec<PptHyperlink>,
    blips: Vec<Blip>,
    /// `foDelay` of each picture store entry, in store order
    blip_store: Vec<u32>,
}

impl PptPresentation {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Read the compound file and parse every stream up front.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut compound = cfb::CompoundFile::open(reader)?;
        if !compound.is_stream(DOCUMENT_STREAM) {
            return Err(PptError::StreamNotFound(DOCUMENT_STREAM.to_string()));
        }
        let document = read_stream(&mut compound, DOCUMENT_STREAM)?;
        let current_user = if compound.is_stream(CURRENT_USER_STREAM) {
            Some(read_stream(&mut compound, CURRENT_USER_STREAM)?)
        } else {
            None
        };
        let pictures = if compound.is_stream(PICTURES_STREAM) {
            read_stream(&mut compound, PICTURES_STREAM)?
        } else {
            Vec::new()
        };
        Self::parse(&document, current_user.as_deref(), &pictures)
    }

    fn parse(document: &[u8], current_user: Option<&[u8]>, pictures: &[u8]) -> Result<Self> {
        let directory = current_user.and_then(|cu| PersistDirectory::load(cu, document));
        if directory.is_none() {
            debug!("no usable persist directory, scanning top-level records");
        }
        let lookup = |persist_id: u32, rec_type: u16| {
            directory
                .as_ref()
                .and_then(|d| d.offset(persist_id))
                .and_then(|offset| Record::parse(document, offset as usize).ok())
                .filter(|r| r.rec_type() == rec_type)
        };

        let doc_container = directory
            .as_ref()
            .and_then(|d| lookup(d.document_persist_id(), record_type::DOCUMENT))
            .or_else(|| RecordIter::new(document).find(|r| r.rec_type() == record_type::DOCUMENT))
            .ok_or_else(|| PptError::InvalidFormat("no DocumentContainer".to_string()))?;

        let top_level_slides: Vec<Record<'_>> = RecordIter::new(document)
            .filter(|r| r.rec_type() == record_type::SLIDE)
            .collect();

        let listed = slide_list(&doc_container);
        let mut slides = Vec::new();
        if listed.is_empty() {
            for (index, container) in top_level_slides.iter().enumerate() {
                let mut slide = PptSlide {
                    number: index as u32 + 1,
                    ..PptSlide::default()
                };
                read_slide_container(container, &mut slide);
                slides.push(slide);
            }
        } else {
            for (index, entry) in listed.into_iter().enumerate() {
                let mut slide = PptSlide {
                    number: index as u32 + 1,
                    slide_id: entry.slide_id,
                    texts: entry.texts,
                    ..PptSlide::default()
                };
                let container = lookup(entry.persist_id, record_type::SLIDE)
                    .or_else(|| top_level_slides.get(index).copied());
                match container {
                    Some(container) => read_slide_container(&container, &mut slide),
                    None => warn!(slide = slide.number, "slide container not found"),
                }
                slides.push(slide);
            }
        }

        Ok(Self {
            slides,
            hyperlinks: hyperlink_list(&doc_container),
            blips: pictures::parse_pictures(pictures),
            blip_store: blip_store(&doc_container),
        })
    }

    #[inline]
    pub fn slides(&self) -> &[PptSlide] {
        &self.slides
    }

    #[inline]
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    #[inline]
    pub fn hyperlinks(&self) -> &[PptHyperlink] {
        &self.hyperlinks
    }

    /// Pictures in `Pictures` stream order.
    #[inline]
    pub fn blips(&self) -> &[Blip] {
        &self.blips
    }

    /// Number of the first slide whose interactive info references `link_id`.
    pub fn slide_for_hyperlink(&self, link_id: u32) -> Option<u32> {
        self.slides
            .iter()
            .find(|s| s.hyperlink_refs.contains(&link_id))
            .map(|s| s.number)
    }

    /// Number of the first slide with a picture shape showing `blip`.
    pub fn slide_for_blip(&self, blip: &Blip) -> Option<u32> {
        let store_index = self.blip_store.iter().position(|&fo| fo == blip.offset)? as u32 + 1;
        self.slides
            .iter()
            .find(|s| s.picture_refs.contains(&store_index))
            .map(|s| s.number)
    }
}

fn read_stream<R: Read + Seek>(compound: &mut cfb::CompoundFile<R>, name: &str) -> Result<Vec<u8>> {
    let mut stream = compound.open_stream(name)?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}

struct ListedSlide {
    persist_id: u32,
    slide_id: u32,
    texts: Vec<TextBlock>,
}

/// Slides of the instance-0 `SlideListWithText`, with their placeholder text.
fn slide_list(doc: &Record<'_>) -> Vec<ListedSlide> {
    let Some(list) = doc
        .children()
        .find(|r| r.rec_type() == record_type::SLIDE_LIST_WITH_TEXT && r.instance() == 0)
    else {
        return Vec::new();
    };

    let mut slides: Vec<ListedSlide> = Vec::new();
    for record in list.children() {
        if record.rec_type() == record_type::SLIDE_PERSIST_ATOM {
            slides.push(ListedSlide {
                persist_id: read_u32_le(record.body, 0).unwrap_or(0),
                slide_id: read_u32_le(record.body, 12).unwrap_or(0),
                texts: Vec::new(),
            });
        } else if let Some(current) = slides.last_mut() {
            collect_text(&record, &mut current.texts);
        }
    }
    slides
}

/// Fold one text-related record into `texts`.
fn collect_text(record: &Record<'_>, texts: &mut Vec<TextBlock>) {
    let text = match record.rec_type() {
        record_type::TEXT_HEADER_ATOM => {
            texts.push(TextBlock {
                text_type: TextType::from_raw(read_u32_le(record.body, 0).unwrap_or(4)),
                text: String::new(),
            });
            return;
        },
        record_type::TEXT_CHARS_ATOM => utf16le_string(record.body),
        record_type::TEXT_BYTES_ATOM => cp1252_string(record.body),
        _ => return,
    };
    match texts.last_mut() {
        Some(block) if block.text.is_empty() => block.text = text,
        _ => texts.push(TextBlock {
            text_type: TextType::Other,
            text,
        }),
    }
}

/// Drawing text, hyperlink references and picture references of a slide.
fn read_slide_container(container: &Record<'_>, slide: &mut PptSlide) {
    let mut texts = Vec::new();
    container.walk(&mut |record| match record.rec_type() {
        record_type::TEXT_HEADER_ATOM | record_type::TEXT_CHARS_ATOM | record_type::TEXT_BYTES_ATOM => {
            collect_text(record, &mut texts)
        },
        record_type::INTERACTIVE_INFO_ATOM => {
            if let Ok(id) = read_u32_le(record.body, 4)
                && id != 0
            {
                slide.hyperlink_refs.push(id);
            }
        },
        record_type::OFFICE_ART_FOPT => {
            if let Some(pib) = fopt_property(record, PROP_PIB)
                && pib != 0
            {
                slide.picture_refs.push(pib);
            }
        },
        _ => {},
    });
    slide.texts.extend(texts.into_iter().filter(|t| !t.text.is_empty()));
}

/// Value of a simple property in an `OfficeArtFOPT` property table.
fn fopt_property(record: &Record<'_>, id: u16) -> Option<u32> {
    let count = record.instance() as usize;
    record
        .body
        .chunks_exact(6)
        .take(count)
        .find(|op| u16::from_le_bytes([op[0], op[1]]) & 0x3FFF == id)
        .map(|op| u32::from_le_bytes([op[2], op[3], op[4], op[5]]))
}

fn hyperlink_list(doc: &Record<'_>) -> Vec<PptHyperlink> {
    let Some(list) = doc.child(record_type::EX_OBJ_LIST) else {
        return Vec::new();
    };
    list.children()
        .filter(|r| r.rec_type() == record_type::EX_HYPERLINK)
        .map(|container| {
            let mut link = PptHyperlink::default();
            for child in container.children() {
                match (child.rec_type(), child.instance()) {
                    (record_type::EX_HYPERLINK_ATOM, _) => link.id = read_u32_le(child.body, 0).unwrap_or(0),
                    (record_type::CSTRING, 0) => link.friendly_name = utf16le_string(child.body),
                    (record_type::CSTRING, 1) => link.target = utf16le_string(child.body),
                    (record_type::CSTRING, 3) => link.location = utf16le_string(child.body),
                    _ => {},
                }
            }
            link
        })
        .collect()
}

/// `foDelay` of every `OfficeArtFBSE` in the drawing group's picture store.
fn blip_store(doc: &Record<'_>) -> Vec<u32> {
    doc.child(record_type::PP_DRAWING_GROUP)
        .and_then(|g| g.child(record_type::OFFICE_ART_DGG_CONTAINER))
        .and_then(|dgg| dgg.child(record_type::OFFICE_ART_BSTORE_CONTAINER))
        .map(|store| {
            store
                .children()
                .filter(|r| r.rec_type() == record_type::OFFICE_ART_BSE)
                .map(|bse| read_u32_le(bse.body, 28).unwrap_or(u32::MAX))
                .collect()
        })
        .unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_slides_follow_slide_list() {
        let pres = PptPresentation::from_bytes(&sample_ppt()).unwrap();
        assert_eq!(pres.slide_count(), 2);

        let first = &pres.slides()[0];
        assert_eq!(first.number(), 1);
        assert_eq!(first.slide_id(), 256);
        assert_eq!(first.texts()[0].text_type, TextType::Title);
        assert_eq!(first.texts()[0].text, "Quarterly Review");
        let body: Vec<&str> = first.texts()[1].paragraphs().collect();
        assert_eq!(body, ["Revenue up", "Costs down"]);
        assert_eq!(first.picture_refs(), [1]);

        let second = &pres.slides()[1];
        assert!(second.texts()[0].text_type.is_title());
        assert_eq!(second.texts()[1].text, "Visit us");
        assert_eq!(second.hyperlink_refs(), [1]);
    }

    #[test]
    fn test_hyperlinks_and_pictures() {
        let pres = PptPresentation::from_bytes(&sample_ppt()).unwrap();
        let link = &pres.hyperlinks()[0];
        assert_eq!(link.id, 1);
        assert_eq!(link.friendly_name, "Example");
        assert_eq!(link.target, "https://example.com");
        assert_eq!(pres.slide_for_hyperlink(1), Some(2));
        assert_eq!(pres.slide_for_hyperlink(9), None);

        let blip = &pres.blips()[0];
        assert_eq!(blip.kind, BlipKind::Png);
        assert_eq!(pres.slide_for_blip(blip), Some(1));
    }

    #[test]
    fn test_missing_document_stream() {
        let bytes = compound(&[("Other", vec![1, 2, 3])]);
        assert!(matches!(
            PptPresentation::from_bytes(&bytes),
            Err(PptError::StreamNotFound(_))
        ));
    }

    #[test]
    fn test_not_a_compound_file() {
        assert!(matches!(
            PptPresentation::from_bytes(b"plain text"),
            Err(PptError::Io(_))
        ));
    }

    #[test]
    fn test_text_type_mapping() {
        assert!(TextType::from_raw(0).is_title());
        assert!(TextType::from_raw(6).is_title());
        assert!(!TextType::from_raw(1).is_title());
        assert_eq!(TextType::from_raw(42), TextType::Unknown(42));
    }
}

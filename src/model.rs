//! Extraction result types shared by extractors and storage backends.
use crate::format::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File-level metadata of the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// File name with extension, e.g. `report.pdf`
    pub file_name: String,
    /// Path as given to the loader
    pub file_path: String,
    /// Size in bytes
    pub file_size: u64,
    /// Extension with the leading dot, e.g. `.pdf`
    pub file_type: String,
    pub format: DocumentFormat,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
    /// Number of pages (PDF), slides (PPT/PPTX) or 1 (DOCX)
    pub page_count: u32,
}

/// Where an extracted item was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// 1-based page or slide number
    pub page: u32,
    /// Shape name, for presentation shapes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

impl SourceLocation {
    #[inline]
    pub fn page(page: u32) -> Self {
        Self { page, shape: None }
    }

    #[inline]
    pub fn shape(page: u32, shape: impl Into<String>) -> Self {
        Self {
            page,
            shape: Some(shape.into()),
        }
    }
}

/// Font information reported for a text segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontStyle {
    /// Font or paragraph style name
    pub font: Option<String>,
    /// Size in points
    pub size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
}

/// A run of text in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub location: SourceLocation,
    /// 1 for titles and top-level headings
    pub heading_level: Option<u8>,
    pub style: Option<FontStyle>,
}

impl TextSegment {
    pub fn plain(text: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            location: SourceLocation::page(page),
            heading_level: None,
            style: None,
        }
    }

    #[inline]
    pub fn is_heading(&self) -> bool {
        self.heading_level.is_some()
    }
}

/// A hyperlink target and its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    /// Display text, empty when the engine reports none
    pub text: String,
    pub location: SourceLocation,
}

/// Encoded image formats recognised in embedded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Jpeg2000,
    Gif,
    Bmp,
    Tiff,
    Emf,
    Wmf,
    Pict,
    Svg,
    /// Undecoded PDF image samples
    Raw,
    Unknown,
}

impl ImageFormat {
    /// Detect format from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => ImageFormat::Png,
            "jpg" | "jpeg" | "jpe" | "jfif" => ImageFormat::Jpeg,
            "jp2" | "jpx" | "j2k" => ImageFormat::Jpeg2000,
            "gif" => ImageFormat::Gif,
            "bmp" | "dib" => ImageFormat::Bmp,
            "tif" | "tiff" => ImageFormat::Tiff,
            "emf" => ImageFormat::Emf,
            "wmf" => ImageFormat::Wmf,
            "pict" | "pct" => ImageFormat::Pict,
            "svg" => ImageFormat::Svg,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect format from a MIME content type.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.to_ascii_lowercase().as_str() {
            "image/png" => ImageFormat::Png,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => ImageFormat::Jpeg,
            "image/jp2" | "image/jpx" => ImageFormat::Jpeg2000,
            "image/gif" => ImageFormat::Gif,
            "image/bmp" | "image/x-bmp" => ImageFormat::Bmp,
            "image/tiff" => ImageFormat::Tiff,
            "image/x-emf" | "image/emf" => ImageFormat::Emf,
            "image/x-wmf" | "image/wmf" => ImageFormat::Wmf,
            "image/x-pict" | "image/pict" => ImageFormat::Pict,
            "image/svg+xml" => ImageFormat::Svg,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect format from byte signature.
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return ImageFormat::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return ImageFormat::Jpeg;
        }
        if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20])
            || data.starts_with(&[0xFF, 0x4F, 0xFF, 0x51])
        {
            return ImageFormat::Jpeg2000;
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return ImageFormat::Gif;
        }
        if data.starts_with(b"BM") {
            return ImageFormat::Bmp;
        }
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
            return ImageFormat::Tiff;
        }
        if data.len() >= 44 && data[40..44] == [0x20, 0x45, 0x4D, 0x46] {
            return ImageFormat::Emf;
        }
        if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) || data.starts_with(&[0x01, 0x00, 0x09, 0x00]) {
            return ImageFormat::Wmf;
        }
        let head = &data[..data.len().min(256)];
        if head.starts_with(b"<svg") || (head.starts_with(b"<?xml") && contains(head, b"<svg")) {
            return ImageFormat::Svg;
        }
        ImageFormat::Unknown
    }

    /// Pick the first known format among content type, extension and signature.
    pub fn infer(content_type: Option<&str>, extension: Option<&str>, data: &[u8]) -> Self {
        content_type
            .map(Self::from_content_type)
            .filter(|f| *f != ImageFormat::Unknown)
            .or_else(|| {
                extension
                    .map(Self::from_extension)
                    .filter(|f| *f != ImageFormat::Unknown)
            })
            .unwrap_or_else(|| Self::sniff(data))
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Jpeg2000 => "jp2",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Emf => "emf",
            ImageFormat::Wmf => "wmf",
            ImageFormat::Pict => "pict",
            ImageFormat::Svg => "svg",
            ImageFormat::Raw => "raw",
            ImageFormat::Unknown => "bin",
        }
    }

    /// MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Jpeg2000 => "image/jp2",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Emf => "image/x-emf",
            ImageFormat::Wmf => "image/x-wmf",
            ImageFormat::Pict => "image/x-pict",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Raw | ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// An embedded image, exactly as stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub location: SourceLocation,
    /// Part or object name inside the document, e.g. `media/image1.png`
    pub name: Option<String>,
    pub alt_text: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A table as a grid of cell text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Position of the table in the document, starting at 0
    pub index: usize,
    pub location: SourceLocation,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(|cell| cell.trim().is_empty())
    }
}

/// Everything extracted from one document.
///
/// All four sequences are always present; a document without links has
/// `links == []`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document: DocumentInfo,
    pub text: Vec<TextSegment>,
    pub links: Vec<Link>,
    pub images: Vec<ExtractedImage>,
    pub tables: Vec<ExtractedTable>,
}

impl ExtractionResult {
    /// An empty result for the given document.
    pub fn empty(document: DocumentInfo) -> Self {
        Self {
            document,
            text: Vec::new(),
            links: Vec::new(),
            images: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Heading segments in document order.
    pub fn headings(&self) -> impl Iterator<Item = &TextSegment> {
        self.text.iter().filter(|s| s.is_heading())
    }

    /// Plain-text rendering grouped by page.
    ///
    /// Each page with text becomes `Page N`, its segments one per line, and a
    /// blank line.
    pub fn render_text(&self) -> String {
        render_pages(self.text.iter())
    }

    /// Same layout as [`render_text`](Self::render_text), headings only.
    pub fn render_headings(&self) -> String {
        render_pages(self.headings())
    }

    /// Table grids without their metadata.
    pub fn table_grids(&self) -> Vec<&[Vec<String>]> {
        self.tables.iter().map(|t| t.rows.as_slice()).collect()
    }
}

fn render_pages<'a>(segments: impl Iterator<Item = &'a TextSegment>) -> String {
    let mut pages: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for segment in segments {
        pages
            .entry(segment.location.page)
            .or_default()
            .push(segment.text.as_str());
    }

    let mut out = String::new();
    for (page, lines) in pages {
        out.push_str("Page ");
        out.push_str(&page.to_string());
        out.push('\n');
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    out
}

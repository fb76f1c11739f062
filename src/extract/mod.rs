//! Extraction passes over an opened document.
//!
//! The four passes are independent: each reads the immutable
//! [`DocumentHandle`] and may run in any order, any number of times.
//!
//! ```rust,no_run
//! use docsift::extract::{ExtractConfig, Extractor};
//!
//! let handle = docsift::loader::open("slides.pptx")?;
//! let config = ExtractConfig::default();
//! let result = Extractor::new(&handle, &config).extract_all();
//! println!("{} links", result.links.len());
//! # Ok::<(), docsift::Error>(())
//! ```
mod docx;
mod pdf;
mod ppt;
mod pptx;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{Operation, Result};
use crate::loader::{DocumentHandle, ParsedDocument};
use crate::model::{ExtractedImage, ExtractedTable, ExtractionResult, Link, TextSegment};

/// Tunables for the extraction passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// PDF text strictly larger than this (points) is a heading
    pub heading_min_font_size: f32,
    /// Distance in points under which PDF baselines and ruling lines coincide
    pub pdf_line_tolerance: f32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            heading_min_font_size: 12.0,
            pdf_line_tolerance: 2.0,
        }
    }
}

/// Runs extraction passes over one document.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    handle: &'a DocumentHandle,
    config: &'a ExtractConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(handle: &'a DocumentHandle, config: &'a ExtractConfig) -> Self {
        Self { handle, config }
    }

    /// Text segments in document order, headings marked.
    pub fn extract_text(&self) -> Result<Vec<TextSegment>> {
        match self.handle.document() {
            ParsedDocument::Pdf(doc) => pdf::text(doc, self.config),
            ParsedDocument::Docx(doc) => Ok(docx::text(doc)),
            ParsedDocument::Pptx(pres) => Ok(pptx::text(pres)),
            ParsedDocument::Ppt(pres) => Ok(ppt::text(pres)),
        }
    }

    /// External hyperlinks with their display text.
    pub fn extract_links(&self) -> Result<Vec<Link>> {
        match self.handle.document() {
            ParsedDocument::Pdf(doc) => pdf::links(doc, self.config),
            ParsedDocument::Docx(doc) => Ok(docx::links(doc)),
            ParsedDocument::Pptx(pres) => Ok(pptx::links(pres)),
            ParsedDocument::Ppt(pres) => Ok(ppt::links(pres)),
        }
    }

    /// Embedded images as stored.
    pub fn extract_images(&self) -> Result<Vec<ExtractedImage>> {
        match self.handle.document() {
            ParsedDocument::Pdf(doc) => pdf::images(doc),
            ParsedDocument::Docx(doc) => Ok(docx::images(doc)),
            ParsedDocument::Pptx(pres) => Ok(pptx::images(pres)),
            ParsedDocument::Ppt(pres) => Ok(ppt::images(pres)),
        }
    }

    /// Tables as cell grids. Legacy `.ppt` files yield none.
    pub fn extract_tables(&self) -> Result<Vec<ExtractedTable>> {
        match self.handle.document() {
            ParsedDocument::Pdf(doc) => pdf::tables(doc, self.config),
            ParsedDocument::Docx(doc) => Ok(docx::tables(doc)),
            ParsedDocument::Pptx(pres) => Ok(pptx::tables(pres)),
            ParsedDocument::Ppt(_) => Ok(Vec::new()),
        }
    }

    /// Run all four passes. A failing pass contributes an empty sequence.
    pub fn extract_all(&self) -> ExtractionResult {
        let mut result = ExtractionResult::empty(self.handle.info().clone());
        result.text = self.recover(Operation::Text, self.extract_text());
        result.links = self.recover(Operation::Links, self.extract_links());
        result.images = self.recover(Operation::Images, self.extract_images());
        result.tables = self.recover(Operation::Tables, self.extract_tables());
        info!(
            file = %result.document.file_name,
            text = result.text.len(),
            links = result.links.len(),
            images = result.images.len(),
            tables = result.tables.len(),
            "extracted document"
        );
        result
    }

    fn recover<T>(&self, operation: Operation, outcome: Result<Vec<T>>) -> Vec<T> {
        outcome.unwrap_or_else(|err| {
            error!(
                file = %self.handle.info().file_name,
                %operation,
                error = %err,
                "extraction pass failed"
            );
            Vec::new()
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::loader::{DocumentHandle, Loader};

    /// Parse in-memory bytes with `loader` as if read from `name`.
    pub fn handle(loader: &dyn Loader, name: &str, bytes: &[u8]) -> DocumentHandle {
        let path = Path::new(name);
        let document = loader.parse(path, bytes).unwrap();
        DocumentHandle::new(path, bytes, document)
    }
}

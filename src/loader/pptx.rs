use std::path::Path;

use crate::error::{Error, Result};
use crate::format::DocumentFormat;
use crate::loader::{Loader, ParsedDocument};
use crate::ooxml::pptx::PptxPresentation;

/// Loads `.pptx` packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxLoader;

impl Loader for PptxLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pptx
    }

    fn extensions(&self) -> &[&'static str] {
        &["pptx"]
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedDocument> {
        PptxPresentation::from_bytes(bytes)
            .map(ParsedDocument::Pptx)
            .map_err(|e| Error::corrupt(path, e))
    }
}

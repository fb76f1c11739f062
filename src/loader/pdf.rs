use std::path::Path;

use crate::error::{Error, Result};
use crate::format::DocumentFormat;
use crate::loader::{Loader, ParsedDocument};
use crate::pdf::PdfDocument;

/// Loads `.pdf` files with lopdf. Encrypted documents are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl Loader for PdfLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedDocument> {
        PdfDocument::from_bytes(bytes)
            .map(ParsedDocument::Pdf)
            .map_err(|e| Error::corrupt(path, e))
    }
}

use std::path::Path;

use crate::error::{Error, Result};
use crate::format::DocumentFormat;
use crate::loader::{Loader, ParsedDocument};
use crate::ole::ppt::PptPresentation;

/// Loads legacy `.ppt` compound files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptLoader;

impl Loader for PptLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Ppt
    }

    fn extensions(&self) -> &[&'static str] {
        &["ppt"]
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedDocument> {
        PptPresentation::from_bytes(bytes)
            .map(ParsedDocument::Ppt)
            .map_err(|e| Error::corrupt(path, e))
    }
}

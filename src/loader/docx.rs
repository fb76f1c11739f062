use std::path::Path;

use crate::error::{Error, Result};
use crate::format::DocumentFormat;
use crate::loader::{Loader, ParsedDocument};
use crate::ooxml::docx::DocxDocument;

/// Loads `.docx` packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxLoader;

impl Loader for DocxLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedDocument> {
        DocxDocument::from_bytes(bytes)
            .map(ParsedDocument::Docx)
            .map_err(|e| Error::corrupt(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::fixtures::docx;

    #[test]
    fn test_parse_docx() {
        let bytes = docx("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>", "");
        let parsed = DocxLoader.parse(Path::new("a.docx"), &bytes).unwrap();
        assert_eq!(parsed.format(), DocumentFormat::Docx);
        assert_eq!(parsed.page_count(), 1);
    }

    #[test]
    fn test_parse_garbage() {
        let err = DocxLoader.parse(Path::new("a.docx"), b"PK garbage").unwrap_err();
        assert!(matches!(err, Error::CorruptFile { path, .. } if path == Path::new("a.docx")));
    }
}

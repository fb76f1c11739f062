//! Opening documents.
//!
//! A [`Loader`] knows one format. The [`LoaderRegistry`] picks the loader by
//! file extension. Opening yields a [`DocumentHandle`]: the parsed document
//! plus its [`DocumentInfo`].
//!
//! ```rust,no_run
//! use docsift::loader::LoaderRegistry;
//!
//! let registry = LoaderRegistry::with_defaults();
//! let handle = registry.open("report.pdf")?;
//! println!("{} pages", handle.page_count());
//! # Ok::<(), docsift::Error>(())
//! ```
mod docx;
mod pdf;
mod ppt;
mod pptx;

pub use docx::DocxLoader;
pub use pdf::PdfLoader;
pub use ppt::PptLoader;
pub use pptx::PptxLoader;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{DocumentFormat, extension_of};
use crate::model::DocumentInfo;
use crate::ole::ppt::PptPresentation;
use crate::ooxml::docx::DocxDocument;
use crate::ooxml::pptx::PptxPresentation;
use crate::pdf::PdfDocument;

/// Opens files of one format.
pub trait Loader: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// Extensions handled, lower-case and without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Parse file contents. `path` is used for error reporting only.
    fn parse(&self, path: &Path, bytes: &[u8]) -> Result<ParsedDocument>;

    /// Read and parse a file.
    fn open(&self, path: &Path) -> Result<DocumentHandle> {
        let extension = extension_of(path);
        if !self.extensions().contains(&extension.as_str()) {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            });
        }
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|e| Error::corrupt(path, e))?;
        let document = self.parse(path, &bytes)?;
        debug!(path = %path.display(), format = %self.format(), "opened document");
        Ok(DocumentHandle::new(path, &bytes, document))
    }
}

/// A parsed document of any supported format.
#[derive(Debug)]
pub enum ParsedDocument {
    Pdf(PdfDocument),
    Docx(DocxDocument),
    Pptx(PptxPresentation),
    Ppt(PptPresentation),
}

impl ParsedDocument {
    pub fn format(&self) -> DocumentFormat {
        match self {
            ParsedDocument::Pdf(_) => DocumentFormat::Pdf,
            ParsedDocument::Docx(_) => DocumentFormat::Docx,
            ParsedDocument::Pptx(_) => DocumentFormat::Pptx,
            ParsedDocument::Ppt(_) => DocumentFormat::Ppt,
        }
    }

    /// Pages, slides, or 1 for unpaginated DOCX.
    pub fn page_count(&self) -> u32 {
        match self {
            ParsedDocument::Pdf(doc) => doc.page_count() as u32,
            ParsedDocument::Docx(_) => 1,
            ParsedDocument::Pptx(pres) => pres.slide_count() as u32,
            ParsedDocument::Ppt(pres) => pres.slide_count() as u32,
        }
    }
}

/// An opened, immutable document.
#[derive(Debug)]
pub struct DocumentHandle {
    info: DocumentInfo,
    document: ParsedDocument,
}

impl DocumentHandle {
    /// Wrap a parsed document, computing [`DocumentInfo`] from the source bytes.
    pub fn new(path: &Path, bytes: &[u8], document: ParsedDocument) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();

        let extension = extension_of(path);
        let info = DocumentInfo {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: path.to_string_lossy().into_owned(),
            file_size: bytes.len() as u64,
            file_type: format!(".{extension}"),
            format: document.format(),
            sha256,
            page_count: document.page_count(),
        };
        Self { info, document }
    }

    #[inline]
    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[inline]
    pub fn document(&self) -> &ParsedDocument {
        &self.document
    }

    #[inline]
    pub fn format(&self) -> DocumentFormat {
        self.document.format()
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }
}

/// Loaders keyed by file extension.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    by_extension: HashMap<String, Arc<dyn Loader>>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        f.debug_struct("LoaderRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the PDF, DOCX, PPTX and PPT loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PdfLoader));
        registry.register(Box::new(DocxLoader));
        registry.register(Box::new(PptxLoader));
        registry.register(Box::new(PptLoader));
        registry
    }

    /// Add a loader, replacing any loader registered for the same extensions.
    pub fn register(&mut self, loader: Box<dyn Loader>) -> &mut Self {
        let loader: Arc<dyn Loader> = Arc::from(loader);
        for ext in loader.extensions() {
            self.by_extension.insert(ext.to_string(), Arc::clone(&loader));
        }
        self
    }

    /// The loader for a path's extension, compared case-insensitively.
    pub fn loader_for(&self, path: &Path) -> Result<&dyn Loader> {
        let extension = extension_of(path);
        self.by_extension
            .get(&extension)
            .map(|l| l.as_ref())
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
    }

    /// Open a file with the matching loader.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<DocumentHandle> {
        let path = path.as_ref();
        self.loader_for(path)?.open(path)
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

/// Open a file with the default loaders.
pub fn open<P: AsRef<Path>>(path: P) -> Result<DocumentHandle> {
    LoaderRegistry::with_defaults().open(path)
}

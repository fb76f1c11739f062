//! docsift - extract text, hyperlinks, images and tables from documents
//!
//! Supported inputs are PDF, Word (.docx) and PowerPoint (.pptx and legacy
//! .ppt). Results go to a directory of plain files, a SQLite database, or
//! both.
//!
//! # Features
//!
//! - **Text**: segments in reading order with page, heading level and font style
//! - **Links**: external hyperlinks with their display text
//! - **Images**: embedded blobs as stored, with format and placement
//! - **Tables**: cell grids, merged cells expanded
//! - **Storage**: file and SQLite backends behind one [`storage::Storage`] trait
//!
//! # Example - Extract one file
//!
//! ```no_run
//! use docsift::extract::{ExtractConfig, Extractor};
//!
//! # fn main() -> docsift::Result<()> {
//! let handle = docsift::open("report.pdf")?;
//! let config = ExtractConfig::default();
//! let extractor = Extractor::new(&handle, &config);
//!
//! for segment in extractor.extract_text()? {
//!     println!("p{}: {}", segment.location.page, segment.text);
//! }
//! for link in extractor.extract_links()? {
//!     println!("{} -> {}", link.text, link.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Extract and store a batch
//!
//! ```no_run
//! use docsift::config::Config;
//! use docsift::pipeline::Pipeline;
//!
//! # fn main() -> docsift::Result<()> {
//! let config = Config::load("docsift.yaml")?;
//! let report = Pipeline::from_config(&config).process_all(["a.docx", "b.ppt"]);
//! println!("{} processed, {} failed", report.processed().len(), report.failures().len());
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod loader;
pub mod model;

/// OLE2 formats: legacy PowerPoint (.ppt)
pub mod ole;

/// OOXML formats: Word (.docx) and PowerPoint (.pptx)
pub mod ooxml;

pub mod pdf;
pub mod pipeline;
pub mod storage;

pub use error::{Error, Operation, Result, Stage, StorageError};
pub use format::DocumentFormat;
pub use loader::{DocumentHandle, LoaderRegistry, open};
pub use model::{
    DocumentInfo, ExtractedImage, ExtractedTable, ExtractionResult, FontStyle, ImageFormat, Link,
    SourceLocation, TextSegment,
};

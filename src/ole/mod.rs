//! OLE2 compound-file formats.
//!
//! The compound file container itself is read with `cfb`; this module parses
//! the format-specific streams inside it.

/// Legacy PowerPoint presentation (.ppt) reader
pub mod ppt;

pub use ppt::{PptError, PptPresentation};

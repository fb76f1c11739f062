//! Open Packaging Conventions (OPC) reader.
//!
//! The ZIP container, content types and relationships shared by .docx and
//! .pptx files.

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod rel;

pub use error::OpcError;
pub use package::{OpcPackage, Part};
pub use packuri::PackURI;
pub use rel::{Relationship, Relationships};

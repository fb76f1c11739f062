//! Office Open XML (OOXML) documents: Word (.docx) and PowerPoint (.pptx).
//!
//! Both formats sit on the OPC layer (`opc`): a ZIP of XML parts linked by
//! relationships. The format modules parse the parts they need into plain
//! read-only models at open time.

pub mod docx;
pub mod error;
pub mod opc;
pub mod pptx;

pub use error::{OoxmlError, Result};
pub use opc::{OpcPackage, PackURI};

//! Helpers shared by the format parsers.

pub mod binary;
pub mod xml;

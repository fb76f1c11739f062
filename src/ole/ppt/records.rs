//! Record layer of the `PowerPoint Document` stream.
//!
//! Every record starts with an 8-byte header: `recVer` (low 4 bits) and
//! `recInstance` (high 12 bits) packed in one u16, then `recType` (u16) and
//! `recLen` (u32). A record with `recVer == 0xF` is a container whose body is
//! a sequence of child records. OfficeArt drawing records share the layout.
use crate::common::binary::{BinaryResult, read_u16_le, read_u32_le};

/// Record types read by the presentation parser.
pub mod record_type {
    pub const DOCUMENT: u16 = 0x03E8;
    pub const SLIDE: u16 = 0x03EE;
    pub const SLIDE_PERSIST_ATOM: u16 = 0x03F3;
    pub const EX_OBJ_LIST: u16 = 0x0409;
    pub const PP_DRAWING_GROUP: u16 = 0x040B;
    pub const PP_DRAWING: u16 = 0x040C;
    pub const TEXT_HEADER_ATOM: u16 = 0x0F9F;
    pub const TEXT_CHARS_ATOM: u16 = 0x0FA0;
    pub const TEXT_BYTES_ATOM: u16 = 0x0FA8;
    pub const CSTRING: u16 = 0x0FBA;
    pub const EX_HYPERLINK_ATOM: u16 = 0x0FD3;
    pub const EX_HYPERLINK: u16 = 0x0FD7;
    pub const SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
    pub const INTERACTIVE_INFO: u16 = 0x0FF2;
    pub const INTERACTIVE_INFO_ATOM: u16 = 0x0FF3;
    pub const USER_EDIT_ATOM: u16 = 0x0FF5;
    pub const CURRENT_USER_ATOM: u16 = 0x0FF6;
    pub const PERSIST_DIRECTORY_ATOM: u16 = 0x1772;

    pub const OFFICE_ART_DGG_CONTAINER: u16 = 0xF000;
    pub const OFFICE_ART_BSTORE_CONTAINER: u16 = 0xF001;
    pub const OFFICE_ART_DG_CONTAINER: u16 = 0xF002;
    pub const OFFICE_ART_SP_CONTAINER: u16 = 0xF004;
    pub const OFFICE_ART_BSE: u16 = 0xF007;
    pub const OFFICE_ART_FOPT: u16 = 0xF00B;
    pub const OFFICE_ART_CLIENT_TEXTBOX: u16 = 0xF00D;
    pub const OFFICE_ART_CLIENT_DATA: u16 = 0xF011;
}

/// Size of a record header in bytes.
pub const HEADER_LEN: usize = 8;

/// A parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub instance: u16,
    pub rec_type: u16,
    pub length: u32,
}

impl RecordHeader {
    pub fn parse(data: &[u8], offset: usize) -> BinaryResult<Self> {
        let ver_instance = read_u16_le(data, offset)?;
        Ok(Self {
            version: (ver_instance & 0x000F) as u8,
            instance: ver_instance >> 4,
            rec_type: read_u16_le(data, offset + 2)?,
            length: read_u32_le(data, offset + 4)?,
        })
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.version == 0x0F
    }
}

/// A record borrowed from its stream.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub header: RecordHeader,
    /// Offset of the header within the parsed slice
    pub offset: usize,
    /// Record body, truncated to the available data
    pub body: &'a [u8],
}

impl<'a> Record<'a> {
    /// Parse one record at `offset`.
    pub fn parse(data: &'a [u8], offset: usize) -> BinaryResult<Self> {
        let header = RecordHeader::parse(data, offset)?;
        let start = offset + HEADER_LEN;
        let end = start.saturating_add(header.length as usize).min(data.len());
        Ok(Self {
            header,
            offset,
            body: &data[start..end],
        })
    }

    #[inline]
    pub fn rec_type(&self) -> u16 {
        self.header.rec_type
    }

    #[inline]
    pub fn instance(&self) -> u16 {
        self.header.instance
    }

    /// Child records; empty for atoms.
    pub fn children(&self) -> RecordIter<'a> {
        if self.header.is_container() {
            RecordIter::new(self.body)
        } else {
            RecordIter::new(&[])
        }
    }

    /// First direct child of the given type.
    pub fn child(&self, rec_type: u16) -> Option<Record<'a>> {
        self.children().find(|r| r.rec_type() == rec_type)
    }

    /// Visit this record's descendants depth-first, in stream order.
    pub fn walk<F: FnMut(&Record<'a>)>(&self, visit: &mut F) {
        for child in self.children() {
            visit(&child);
            child.walk(visit);
        }
    }
}

/// Iterator over sibling records in a byte slice.
///
/// Stops at the first header that does not fit.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = Record::parse(self.data, self.pos).ok()?;
        self.pos = record.offset + HEADER_LEN + record.body.len();
        Some(record)
    }
}


#[cfg(test)]
mod tests {
    use super::build::*;
    use super::record_type::*;
    use super::*;

    #[test]
    fn test_header_layout() {
        // recVer 0xF, recInstance 0x001, recType 0x0FF0
        let data = [0x1F, 0x00, 0xF0, 0x0F, 0x00, 0x00, 0x00, 0x00];
        let header = RecordHeader::parse(&data, 0).unwrap();
        assert_eq!(header.version, 0x0F);
        assert_eq!(header.instance, 1);
        assert_eq!(header.rec_type, SLIDE_LIST_WITH_TEXT);
        assert!(header.is_container());
    }

    #[test]
    fn test_children_and_walk() {
        let data = container(
            0,
            SLIDE,
            &[
                atom(0, TEXT_HEADER_ATOM, &0u32.to_le_bytes()),
                container(0, PP_DRAWING, &[atom(0, TEXT_CHARS_ATOM, &utf16("Hi"))]),
            ],
        );
        let root = Record::parse(&data, 0).unwrap();
        assert_eq!(root.children().count(), 2);
        assert!(root.child(PP_DRAWING).is_some());
        assert!(root.child(DOCUMENT).is_none());

        let mut types = Vec::new();
        root.walk(&mut |r| types.push(r.rec_type()));
        assert_eq!(types, [TEXT_HEADER_ATOM, PP_DRAWING, TEXT_CHARS_ATOM]);
    }

    #[test]
    fn test_truncated_record_is_clamped() {
        let mut data = atom(0, TEXT_CHARS_ATOM, &utf16("Hello"));
        data.truncate(12);
        let record = Record::parse(&data, 0).unwrap();
        assert_eq!(record.body.len(), 4);
        assert_eq!(RecordIter::new(&data).count(), 1);
        assert_eq!(RecordIter::new(&data[..5]).count(), 0);
    }
}

//! OfficeArt BLIP records of the `Pictures` stream.
use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::warn;

use crate::common::binary::read_u32_le;
use crate::ole::ppt::records::RecordIter;

const BLIP_EMF: u16 = 0xF01A;
const BLIP_WMF: u16 = 0xF01B;
const BLIP_PICT: u16 = 0xF01C;
const BLIP_JPEG: u16 = 0xF01D;
const BLIP_PNG: u16 = 0xF01E;
const BLIP_DIB: u16 = 0xF01F;
const BLIP_TIFF: u16 = 0xF029;
const BLIP_JPEG_CMYK: u16 = 0xF02A;

/// Size of `OfficeArtMetafileHeader`.
const METAFILE_HEADER_LEN: usize = 34;
/// `compression` value for a deflated metafile.
const COMPRESSION_DEFLATE: u8 = 0x00;

/// Picture encoding named by the BLIP record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlipKind {
    Emf,
    Wmf,
    Pict,
    Jpeg,
    Png,
    Dib,
    Tiff,
}

impl BlipKind {
    fn from_rec_type(rec_type: u16) -> Option<Self> {
        Some(match rec_type {
            BLIP_EMF => Self::Emf,
            BLIP_WMF => Self::Wmf,
            BLIP_PICT => Self::Pict,
            BLIP_JPEG | BLIP_JPEG_CMYK => Self::Jpeg,
            BLIP_PNG => Self::Png,
            BLIP_DIB => Self::Dib,
            BLIP_TIFF => Self::Tiff,
            _ => return None,
        })
    }

    #[inline]
    pub fn is_metafile(self) -> bool {
        matches!(self, Self::Emf | Self::Wmf | Self::Pict)
    }
}

/// A decoded picture blob.
#[derive(Debug, Clone)]
pub struct Blip {
    pub kind: BlipKind,
    /// Offset of the record in the `Pictures` stream; this is what
    /// `OfficeArtFBSE.foDelay` points at.
    pub offset: u32,
    pub data: Vec<u8>,
}

/// Parse every BLIP record in a `Pictures` stream, in stream order.
///
/// Records of unknown type are skipped, as are metafiles that fail to inflate.
pub fn parse_pictures(stream: &[u8]) -> Vec<Blip> {
    let mut blips = Vec::new();
    for record in RecordIter::new(stream) {
        let Some(kind) = BlipKind::from_rec_type(record.rec_type()) else {
            continue;
        };
        // Odd instances carry a second 16-byte UID.
        let uid_len = if record.instance() & 1 == 1 { 32 } else { 16 };
        let data = if kind.is_metafile() {
            match metafile_data(record.body, uid_len) {
                Some(data) => data,
                None => {
                    warn!(offset = record.offset, "skipping unreadable metafile BLIP");
                    continue;
                },
            }
        } else {
            // Bitmaps have a one-byte tag after the UIDs.
            match record.body.get(uid_len + 1..) {
                Some(data) => data.to_vec(),
                None => continue,
            }
        };
        blips.push(Blip {
            kind,
            offset: record.offset as u32,
            data,
        });
    }
    blips
}

fn metafile_data(body: &[u8], uid_len: usize) -> Option<Vec<u8>> {
    let header = body.get(uid_len..uid_len + METAFILE_HEADER_LEN)?;
    let cb_save = read_u32_le(header, 28).ok()? as usize;
    let compression = header[32];
    let start = uid_len + METAFILE_HEADER_LEN;
    let end = start.saturating_add(cb_save).min(body.len());
    let payload = body.get(start..end)?;
    if compression == COMPRESSION_DEFLATE {
        let mut out = Vec::new();
        ZlibDecoder::new(payload).read_to_end(&mut out).ok()?;
        Some(out)
    } else {
        Some(payload.to_vec())
    }
}


#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;
    use crate::ole::ppt::records::build::atom;

    #[test]
    fn test_parse_bitmap_and_metafile() {
        let emf = b" EMF payload bytes".to_vec();
        let mut stream = png_blip(PNG);
        stream.extend(atom(0, 0x1234, b"not a picture"));
        let emf_offset = stream.len() as u32;
        stream.extend(emf_blip(&emf));

        let blips = parse_pictures(&stream);
        assert_eq!(blips.len(), 2);
        assert_eq!(blips[0].kind, BlipKind::Png);
        assert_eq!(blips[0].offset, 0);
        assert_eq!(blips[0].data, PNG);
        assert_eq!(blips[1].kind, BlipKind::Emf);
        assert_eq!(blips[1].offset, emf_offset);
        assert_eq!(blips[1].data, emf);
    }

    #[test]
    fn test_second_uid_is_skipped() {
        let mut body = vec![0u8; 33];
        body.extend_from_slice(b"JPEGDATA");
        let stream = atom(0x46B, BLIP_JPEG, &body);
        let blips = parse_pictures(&stream);
        assert_eq!(blips[0].kind, BlipKind::Jpeg);
        assert_eq!(blips[0].data, b"JPEGDATA");
    }
}

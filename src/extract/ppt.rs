use crate::model::{ExtractedImage, ImageFormat, Link, SourceLocation, TextSegment};
use crate::ole::ppt::{BlipKind, PptPresentation};

/// Page reported for items no slide refers to.
const FIRST_SLIDE: u32 = 1;

pub(crate) fn text(pres: &PptPresentation) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    for slide in pres.slides() {
        for block in slide.texts() {
            let heading_level = block.text_type.is_title().then_some(1);
            for paragraph in block.paragraphs() {
                let text = paragraph.trim();
                if text.is_empty() {
                    continue;
                }
                segments.push(TextSegment {
                    heading_level,
                    ..TextSegment::plain(text, slide.number())
                });
            }
        }
    }
    segments
}

/// Hyperlink list entries on the first slide that uses them.
pub(crate) fn links(pres: &PptPresentation) -> Vec<Link> {
    pres.hyperlinks()
        .iter()
        .filter(|link| !link.target.is_empty())
        .map(|link| {
            let text = if link.friendly_name.is_empty() {
                link.target.clone()
            } else {
                link.friendly_name.clone()
            };
            Link {
                url: link.target.clone(),
                text,
                location: SourceLocation::page(pres.slide_for_hyperlink(link.id).unwrap_or(FIRST_SLIDE)),
            }
        })
        .collect()
}

const BMP_FILE_HEADER_LEN: usize = 14;
const BI_BITFIELDS: u32 = 3;

fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Prefix a packed DIB with a `BITMAPFILEHEADER` so it reads as a .bmp file.
///
/// Returns `None` when the info header is truncated or malformed.
fn bmp_from_dib(dib: &[u8]) -> Option<Vec<u8>> {
    let header_len = le_u32(dib, 0)? as usize;
    let (bit_count, entry_len, colors_used, masks) = if header_len == 12 {
        // BITMAPCOREHEADER
        (le_u16(dib, 10)?, 3, 0, 0)
    } else if header_len >= 40 {
        let compression = le_u32(dib, 16)?;
        let masks = if header_len == 40 && compression == BI_BITFIELDS { 12 } else { 0 };
        (le_u16(dib, 14)?, 4, le_u32(dib, 32)? as usize, masks)
    } else {
        return None;
    };
    let palette = match colors_used {
        0 if bit_count <= 8 => 1usize << bit_count,
        n => n,
    };
    let offset = BMP_FILE_HEADER_LEN + header_len + masks + palette.checked_mul(entry_len)?;
    let size = BMP_FILE_HEADER_LEN + dib.len();
    if offset > size {
        return None;
    }
    let mut bmp = Vec::with_capacity(size);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&u32::try_from(size).ok()?.to_le_bytes());
    bmp.extend_from_slice(&[0; 4]);
    bmp.extend_from_slice(&u32::try_from(offset).ok()?.to_le_bytes());
    bmp.extend_from_slice(dib);
    Some(bmp)
}

fn image_format(kind: BlipKind) -> ImageFormat {
    match kind {
        BlipKind::Emf => ImageFormat::Emf,
        BlipKind::Wmf => ImageFormat::Wmf,
        BlipKind::Pict => ImageFormat::Pict,
        BlipKind::Jpeg => ImageFormat::Jpeg,
        BlipKind::Png => ImageFormat::Png,
        BlipKind::Dib => ImageFormat::Bmp,
        BlipKind::Tiff => ImageFormat::Tiff,
    }
}

/// Every picture of the `Pictures` stream, in stream order.
pub(crate) fn images(pres: &PptPresentation) -> Vec<ExtractedImage> {
    pres.blips()
        .iter()
        .enumerate()
        .map(|(i, blip)| {
            let (data, format) = match blip.kind {
                BlipKind::Dib => match bmp_from_dib(&blip.data) {
                    Some(bmp) => (bmp, ImageFormat::Bmp),
                    None => (blip.data.clone(), ImageFormat::Unknown),
                },
                kind => (blip.data.clone(), image_format(kind)),
            };
            ExtractedImage {
                data,
                format,
                location: SourceLocation::page(pres.slide_for_blip(blip).unwrap_or(FIRST_SLIDE)),
                name: Some(format!("image{}.{}", i + 1, format.extension())),
                alt_text: None,
                width: None,
                height: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::ppt::fixtures::sample_ppt;

    fn deck() -> PptPresentation {
        PptPresentation::from_bytes(&sample_ppt()).unwrap()
    }

    #[test]
    fn test_titles_are_headings() {
        let text = text(&deck());
        let summary: Vec<(&str, Option<u8>, u32)> = text
            .iter()
            .map(|s| (s.text.as_str(), s.heading_level, s.location.page))
            .collect();
        assert_eq!(
            summary,
            [
                ("Quarterly Review", Some(1), 1),
                ("Revenue up", None, 1),
                ("Costs down", None, 1),
                ("Thanks", Some(1), 2),
                ("Visit us", None, 2),
            ]
        );
    }

    #[test]
    fn test_links_and_images_are_placed_on_slides() {
        let deck = deck();
        let links = links(&deck);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com");
        assert_eq!(links[0].text, "Example");
        assert_eq!(links[0].location.page, 2);

        let images = images(&deck);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].format, ImageFormat::Png);
        assert_eq!(images[0].location.page, 1);
        assert_eq!(images[0].name.as_deref(), Some("image1.png"));
    }

    fn dib(bit_count: u16, colors_used: u32, pixels: &[u8]) -> Vec<u8> {
        let mut dib = Vec::new();
        dib.extend_from_slice(&40u32.to_le_bytes());
        dib.extend_from_slice(&2i32.to_le_bytes());
        dib.extend_from_slice(&1i32.to_le_bytes());
        dib.extend_from_slice(&1u16.to_le_bytes());
        dib.extend_from_slice(&bit_count.to_le_bytes());
        dib.extend_from_slice(&[0; 16]);
        dib.extend_from_slice(&colors_used.to_le_bytes());
        dib.extend_from_slice(&[0; 4]);
        dib.extend_from_slice(pixels);
        dib
    }

    #[test]
    fn test_dib_gets_bitmap_file_header() {
        let raw = dib(24, 0, &[0xff, 0, 0, 0, 0xff, 0, 0, 0]);
        let bmp = bmp_from_dib(&raw).unwrap();
        assert_eq!(&bmp[..2], b"BM");
        assert_eq!(le_u32(&bmp, 2), Some(14 + raw.len() as u32));
        assert_eq!(le_u32(&bmp, 10), Some(54));
        assert_eq!(&bmp[14..], &raw[..]);

        // 8-bit with two palette entries declared
        let raw = dib(8, 2, &[0; 8 + 4]);
        assert_eq!(le_u32(&bmp_from_dib(&raw).unwrap(), 10), Some(54 + 8));

        assert_eq!(bmp_from_dib(&[40, 0, 0]), None);
        assert_eq!(bmp_from_dib(&dib(8, 0, &[0; 4])), None);
    }
}

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::{debug, warn};

use crate::error::{Error, Operation, Result};
use crate::extract::ExtractConfig;
use crate::model::{
    ExtractedImage, ExtractedTable, FontStyle, ImageFormat, Link, SourceLocation, TextSegment,
};
use crate::pdf::{PageImage, PageLayout, PdfDocument, TextRun, detect_tables};

/// Deepest heading level reported.
const MAX_HEADING_LEVEL: usize = 6;

/// Layouts of every page that could be interpreted, with their page numbers.
///
/// Fails only when the document has pages and none of them can be read.
fn layouts(doc: &PdfDocument, operation: Operation) -> Result<Vec<(u32, PageLayout)>> {
    let mut layouts = Vec::with_capacity(doc.page_count());
    let mut last_error = None;
    for number in 1..=doc.page_count() as u32 {
        match doc.page_layout(number) {
            Ok(layout) => layouts.push((number, layout)),
            Err(err) => {
                warn!(page = number, error = %err, "skipping unreadable page");
                last_error = Some(err);
            },
        }
    }
    match last_error {
        Some(err) if layouts.is_empty() => Err(Error::extraction(operation, err)),
        _ => Ok(layouts),
    }
}

struct Line<'a> {
    text: String,
    first: &'a TextRun,
}

/// Merge runs sharing a text object and a baseline.
fn lines<'a>(runs: impl IntoIterator<Item = &'a TextRun>, tolerance: f32) -> Vec<Line<'a>> {
    let mut lines: Vec<Line<'a>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line)
                if line.first.text_object == run.text_object
                    && (line.first.y - run.y).abs() <= tolerance =>
            {
                let needs_space = !run.adjoins_previous
                    && !line.text.ends_with(char::is_whitespace)
                    && !run.text.starts_with(char::is_whitespace);
                if needs_space {
                    line.text.push(' ');
                }
                line.text.push_str(&run.text);
            },
            _ => lines.push(Line {
                text: run.text.clone(),
                first: run,
            }),
        }
    }
    lines
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn text(doc: &PdfDocument, config: &ExtractConfig) -> Result<Vec<TextSegment>> {
    let mut segments = Vec::new();
    for (page, layout) in layouts(doc, Operation::Text)? {
        for line in lines(&layout.runs, config.pdf_line_tolerance) {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            let run = line.first;
            segments.push(TextSegment {
                text: text.to_string(),
                location: SourceLocation::page(page),
                heading_level: None,
                style: Some(FontStyle {
                    font: run.font.clone(),
                    size: Some(round2(run.size)),
                    bold: run.bold,
                    italic: run.italic,
                }),
            });
        }
    }
    assign_heading_levels(&mut segments, config.heading_min_font_size);
    Ok(segments)
}

/// Rank distinct sizes above `min_size`, largest first, as levels 1 to 6.
fn assign_heading_levels(segments: &mut [TextSegment], min_size: f32) {
    let size_of = |s: &TextSegment| s.style.as_ref().and_then(|st| st.size);
    let mut sizes: Vec<f32> = segments
        .iter()
        .filter_map(size_of)
        .filter(|&size| size > min_size)
        .collect();
    sizes.sort_by(|a, b| b.total_cmp(a));
    sizes.dedup();

    for segment in segments.iter_mut() {
        let Some(size) = size_of(segment) else {
            continue;
        };
        if let Some(rank) = sizes.iter().position(|&s| s == size) {
            segment.heading_level = Some((rank + 1).min(MAX_HEADING_LEVEL) as u8);
        }
    }
}

pub(crate) fn links(doc: &PdfDocument, config: &ExtractConfig) -> Result<Vec<Link>> {
    let mut links = Vec::new();
    let mut failed = 0usize;
    for page in 1..=doc.page_count() as u32 {
        let annotations = match doc.page_links(page) {
            Ok(annotations) => annotations,
            Err(err) => {
                warn!(page, error = %err, "skipping link annotations");
                failed += 1;
                continue;
            },
        };
        if annotations.is_empty() {
            continue;
        }
        let runs = match doc.page_layout(page) {
            Ok(layout) => layout.runs,
            Err(err) => {
                debug!(page, error = %err, "link text unavailable");
                Vec::new()
            },
        };
        for annotation in annotations {
            let covered: Vec<&TextRun> = runs
                .iter()
                .filter(|run| annotation.contains(run.x, run.y))
                .collect();
            let text = lines(covered, config.pdf_line_tolerance)
                .iter()
                .map(|line| line.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            links.push(Link {
                url: annotation.url,
                text,
                location: SourceLocation::page(page),
            });
        }
    }
    if failed > 0 && failed == doc.page_count() {
        return Err(Error::extraction(
            Operation::Links,
            format!("no page annotations could be read ({failed} pages)"),
        ));
    }
    Ok(links)
}

pub(crate) fn images(doc: &PdfDocument) -> Result<Vec<ExtractedImage>> {
    let mut images = Vec::new();
    let mut failed = 0usize;
    for page in 1..=doc.page_count() as u32 {
        let page_images = match doc.page_images(page) {
            Ok(page_images) => page_images,
            Err(err) => {
                warn!(page, error = %err, "skipping page images");
                failed += 1;
                continue;
            },
        };
        for image in page_images {
            match image_bytes(&image) {
                Ok((format, data)) => images.push(ExtractedImage {
                    data,
                    format,
                    location: SourceLocation::page(page),
                    name: Some(image.name.clone()),
                    alt_text: None,
                    width: image.width,
                    height: image.height,
                }),
                Err(err) => warn!(page, image = %image.name, error = %err, "skipping image"),
            }
        }
    }
    if failed > 0 && failed == doc.page_count() {
        return Err(Error::extraction(
            Operation::Images,
            format!("no page resources could be read ({failed} pages)"),
        ));
    }
    Ok(images)
}

/// Undo leading `FlateDecode` filters and classify what remains.
///
/// Image codecs (`DCTDecode`, `JPXDecode`) are left encoded.
fn image_bytes(image: &PageImage<'_>) -> std::io::Result<(ImageFormat, Vec<u8>)> {
    let mut data = image.content.to_vec();
    let mut filters = image.filters.iter().map(String::as_str).peekable();
    while filters.next_if(|f| matches!(*f, "FlateDecode" | "Fl")).is_some() {
        let mut inflated = Vec::new();
        ZlibDecoder::new(data.as_slice()).read_to_end(&mut inflated)?;
        data = inflated;
    }
    let format = match filters.next() {
        None => ImageFormat::Raw,
        Some("DCTDecode" | "DCT") => ImageFormat::Jpeg,
        Some("JPXDecode") => ImageFormat::Jpeg2000,
        Some(_) => ImageFormat::Unknown,
    };
    Ok((format, data))
}

pub(crate) fn tables(doc: &PdfDocument, config: &ExtractConfig) -> Result<Vec<ExtractedTable>> {
    let mut tables = Vec::new();
    for (page, layout) in layouts(doc, Operation::Tables)? {
        for table in detect_tables(&layout.runs, &layout.segments, config.pdf_line_tolerance) {
            tables.push(ExtractedTable {
                index: tables.len(),
                location: SourceLocation::page(page),
                rows: table.rows,
            });
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    use super::*;
    use crate::pdf::fixtures::{JPEG, headings_pdf, sample_pdf};

    fn config() -> ExtractConfig {
        ExtractConfig::default()
    }

    #[test]
    fn test_hello_world_page() {
        let doc = PdfDocument::from_bytes(&sample_pdf()).unwrap();

        let text = text(&doc, &config()).unwrap();
        let lines: Vec<&str> = text.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(lines, ["Hello World", "a", "b", "c", "d"]);
        assert!(text.iter().all(|s| s.heading_level.is_none()));
        let style = text[0].style.as_ref().unwrap();
        assert_eq!(style.font.as_deref(), Some("Helvetica"));
        assert_eq!(style.size, Some(12.0));

        let links = links(&doc, &config()).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com");
        assert_eq!(links[0].text, "Hello World");

        let images = images(&doc).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].format, ImageFormat::Jpeg);
        assert_eq!(images[0].data, JPEG);

        let tables = tables(&doc, &config()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, [["a", "b"], ["c", "d"]]);
    }

    #[test]
    fn test_heading_levels_rank_sizes() {
        let doc = PdfDocument::from_bytes(&headings_pdf()).unwrap();
        let text = text(&doc, &config()).unwrap();
        let levels: Vec<(&str, Option<u8>, u32)> = text
            .iter()
            .map(|s| (s.text.as_str(), s.heading_level, s.location.page))
            .collect();
        assert_eq!(
            levels,
            [
                ("Annual Report", Some(1), 1),
                ("Body text", None, 1),
                ("Details", Some(2), 2),
                ("Appendix", Some(1), 2),
            ]
        );
        assert!(text[0].style.as_ref().unwrap().bold);
        assert!(links(&doc, &config()).unwrap().is_empty());
    }

    #[test]
    fn test_flate_image_is_inflated() {
        let samples = [10u8, 20, 30, 40];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples).unwrap();
        let compressed = encoder.finish().unwrap();
        let image = PageImage {
            id: (1, 0),
            name: "Im9".to_string(),
            width: Some(2),
            height: Some(2),
            color_space: Some("DeviceGray".to_string()),
            bits_per_component: Some(8),
            filters: vec!["FlateDecode".to_string()],
            content: &compressed,
        };
        let (format, data) = image_bytes(&image).unwrap();
        assert_eq!(format, ImageFormat::Raw);
        assert_eq!(data, samples);
    }

    #[test]
    fn test_merge_adjoining_runs() {
        let run = |text: &str, x: f32, adjoins: bool| TextRun {
            text: text.to_string(),
            x,
            y: 100.0,
            font: None,
            size: 10.0,
            bold: false,
            italic: false,
            text_object: 0,
            adjoins_previous: adjoins,
        };
        let runs = [run("Hel", 0.0, false), run("lo", 20.0, true), run("there", 40.0, false)];
        let merged = lines(&runs, 2.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello there");
    }
}

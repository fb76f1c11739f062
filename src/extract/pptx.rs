use tracing::warn;

use crate::model::{
    ExtractedImage, ExtractedTable, FontStyle, ImageFormat, Link, SourceLocation, TextSegment,
};
use crate::ooxml::pptx::{Placeholder, PptxPresentation, Shape, ShapeKind, TextParagraph};

/// Style of the first run carrying any formatting.
fn paragraph_style(paragraph: &TextParagraph) -> Option<FontStyle> {
    paragraph
        .runs()
        .iter()
        .filter(|r| !r.text().trim().is_empty())
        .find(|r| r.font().is_some() || r.size_pt().is_some() || r.bold().is_some() || r.italic().is_some())
        .map(|r| FontStyle {
            font: r.font().map(str::to_string),
            size: r.size_pt(),
            bold: r.bold().unwrap_or(false),
            italic: r.italic().unwrap_or(false),
        })
}

fn push_shape_text(out: &mut Vec<TextSegment>, page: u32, shape: &Shape, heading_level: Option<u8>) {
    for paragraph in shape.paragraphs() {
        let text = paragraph.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        out.push(TextSegment {
            text: text.to_string(),
            location: SourceLocation::shape(page, shape.name()),
            heading_level,
            style: paragraph_style(paragraph),
        });
    }
}

/// Per slide: the title, then every other text shape in z-order.
pub(crate) fn text(pres: &PptxPresentation) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    for slide in pres.slides() {
        let title = slide.title();
        if let Some(shape) = title {
            push_shape_text(&mut segments, slide.number(), shape, Some(1));
        }
        for shape in slide.shapes() {
            if title.is_some_and(|t| std::ptr::eq(t, shape)) {
                continue;
            }
            let level = match shape.placeholder() {
                Some(Placeholder::Title) => Some(1),
                Some(Placeholder::SubTitle) => Some(2),
                _ => None,
            };
            push_shape_text(&mut segments, slide.number(), shape, level);
        }
    }
    segments
}

/// Shape click actions and run hyperlinks with external targets.
pub(crate) fn links(pres: &PptxPresentation) -> Vec<Link> {
    let mut links = Vec::new();
    for slide in pres.slides() {
        for shape in slide.shapes() {
            let location = SourceLocation::shape(slide.number(), shape.name());
            if let Some(url) = shape.click_r_id().and_then(|r_id| slide.hyperlink_url(r_id)) {
                links.push(Link {
                    url: url.to_string(),
                    text: shape.text().trim().to_string(),
                    location: location.clone(),
                });
            }
            for run in shape.paragraphs().iter().flat_map(TextParagraph::runs) {
                if let Some(url) = run.link_r_id().and_then(|r_id| slide.hyperlink_url(r_id)) {
                    links.push(Link {
                        url: url.to_string(),
                        text: run.text().trim().to_string(),
                        location: location.clone(),
                    });
                }
            }
        }
    }
    links
}

pub(crate) fn images(pres: &PptxPresentation) -> Vec<ExtractedImage> {
    let mut images = Vec::new();
    for slide in pres.slides() {
        for shape in slide.shapes() {
            let ShapeKind::Picture { r_id, .. } = shape.kind() else {
                continue;
            };
            let Some(part) = pres.image_part(slide, r_id) else {
                warn!(slide = slide.number(), r_id = %r_id, "picture refers to a missing image part");
                continue;
            };
            let (width, height) = shape.size_px().unzip();
            images.push(ExtractedImage {
                data: part.blob().to_vec(),
                format: ImageFormat::infer(Some(part.content_type()), Some(part.partname().ext()), part.blob()),
                location: SourceLocation::shape(slide.number(), shape.name()),
                name: Some(part.partname().as_str().trim_start_matches('/').to_string()),
                alt_text: shape.descr().filter(|d| !d.is_empty()).map(str::to_string),
                width,
                height,
            });
        }
    }
    images
}

/// Graphic-frame tables; tables without any cell text are dropped.
pub(crate) fn tables(pres: &PptxPresentation) -> Vec<ExtractedTable> {
    let mut tables: Vec<ExtractedTable> = Vec::new();
    for slide in pres.slides() {
        for shape in slide.shapes() {
            let ShapeKind::Table(rows) = shape.kind() else {
                continue;
            };
            let table = ExtractedTable {
                index: tables.len(),
                location: SourceLocation::shape(slide.number(), shape.name()),
                rows: rows.clone(),
            };
            if !table.is_blank() {
                tables.push(table);
            }
        }
    }
    tables
}

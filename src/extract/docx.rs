use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::{
    ExtractedImage, ExtractedTable, FontStyle, ImageFormat, Link, SourceLocation, TextSegment,
};
use crate::ooxml::docx::{DocxDocument, LinkTarget, Paragraph};
use crate::ooxml::opc::Part;
use crate::ooxml::opc::constants::relationship_type;

/// Word documents have no fixed pagination; everything is on page 1.
const PAGE: u32 = 1;

/// Text of links recovered from bare relationships.
const RELATIONSHIP_LINK_TEXT: &str = "Link";

/// Body paragraphs. Table cell text is reported with the tables.
pub(crate) fn text(doc: &DocxDocument) -> Vec<TextSegment> {
    doc.paragraphs()
        .filter_map(|paragraph| {
            let text = paragraph.text();
            let text = text.trim();
            (!text.is_empty()).then(|| segment(doc, paragraph, text))
        })
        .collect()
}

fn segment(doc: &DocxDocument, paragraph: &Paragraph, text: &str) -> TextSegment {
    let styles = doc.styles();
    let style = styles.paragraph_style(paragraph.style_id());
    let heading_level = style
        .and_then(|s| styles.heading_level(s))
        .or_else(|| paragraph.outline_level().map(|l| l + 1));

    let (mut font, mut size, mut bold, mut italic) = style
        .map(|s| styles.run_defaults(s))
        .unwrap_or_default();
    let runs = paragraph.runs().iter().filter(|r| !r.text().trim().is_empty());
    for run in runs {
        font = run.font().map(str::to_string).or(font);
        size = run.size_pt().or(size);
        bold = run.bold().or(bold);
        italic = run.italic().or(italic);
        if run.font().is_some() || run.size_pt().is_some() {
            break;
        }
    }

    let style_name = style.map(|s| s.name().unwrap_or(s.style_id()).to_string());
    TextSegment {
        text: text.to_string(),
        location: SourceLocation::page(PAGE),
        heading_level,
        style: Some(FontStyle {
            font: style_name.or(font),
            size,
            bold: bold.unwrap_or(false),
            italic: italic.unwrap_or(false),
        }),
    }
}

/// Hyperlinks and `HYPERLINK` fields from every paragraph, table cells
/// included, then unreferenced external `http` hyperlink relationships.
pub(crate) fn links(doc: &DocxDocument) -> Vec<Link> {
    let mut links = Vec::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for paragraph in doc.all_paragraphs() {
        for link in paragraph.links() {
            let url = match link.target() {
                LinkTarget::Relationship(r_id) => match doc.hyperlink_url(r_id) {
                    Some(url) => {
                        reported.insert(r_id.as_str());
                        url.to_string()
                    },
                    None => {
                        debug!(r_id = %r_id, "hyperlink without external target");
                        continue;
                    },
                },
                LinkTarget::Url(url) => url.clone(),
                LinkTarget::Anchor(_) => continue,
            };
            links.push(Link {
                url,
                text: link.text().trim().to_string(),
                location: SourceLocation::page(PAGE),
            });
        }
    }

    for rel in doc.rels().of_type(relationship_type::HYPERLINK) {
        if !rel.is_external() || !rel.target_ref().starts_with("http") || reported.contains(rel.r_id()) {
            continue;
        }
        links.push(Link {
            url: rel.target_ref().to_string(),
            text: RELATIONSHIP_LINK_TEXT.to_string(),
            location: SourceLocation::page(PAGE),
        });
    }
    links
}

fn image_from_part(part: &Part) -> ExtractedImage {
    let name = part.partname().as_str().trim_start_matches('/').to_string();
    ExtractedImage {
        data: part.blob().to_vec(),
        format: ImageFormat::infer(Some(part.content_type()), Some(part.partname().ext()), part.blob()),
        location: SourceLocation::page(PAGE),
        name: Some(name),
        alt_text: None,
        width: None,
        height: None,
    }
}

/// Drawings in document order, one item per occurrence, then image parts
/// no drawing refers to.
pub(crate) fn images(doc: &DocxDocument) -> Vec<ExtractedImage> {
    let mut images = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for paragraph in doc.all_paragraphs() {
        for drawing in paragraph.drawings() {
            let Some(part) = doc.image_part(drawing.r_id()) else {
                warn!(r_id = drawing.r_id(), "drawing refers to a missing image part");
                continue;
            };
            seen.insert(part.partname().as_str().to_string());
            let mut image = image_from_part(part);
            image.alt_text = drawing.descr().filter(|d| !d.is_empty()).map(str::to_string);
            if let Some((width, height)) = drawing.size_px() {
                image.width = Some(width);
                image.height = Some(height);
            }
            images.push(image);
        }
    }

    for rel in doc.rels().of_type(relationship_type::IMAGE) {
        if rel.is_external() {
            continue;
        }
        let Some(part) = doc.image_part(rel.r_id()) else {
            warn!(r_id = rel.r_id(), target = rel.target_ref(), "image relationship without part");
            continue;
        };
        if seen.insert(part.partname().as_str().to_string()) {
            images.push(image_from_part(part));
        }
    }
    images
}

/// Every table, nested tables after their parent.
pub(crate) fn tables(doc: &DocxDocument) -> Vec<ExtractedTable> {
    doc.tables()
        .into_iter()
        .enumerate()
        .map(|(index, table)| ExtractedTable {
            index,
            location: SourceLocation::page(PAGE),
            rows: table.grid(),
        })
        .collect()
}

//! Shapes of a slide's shape tree (`p:spTree`).
use crate::common::xml::{attr, attr_prefixed, push_ref, push_text};
use crate::ooxml::error::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

type XmlReader<'a> = Reader<&'a [u8]>;

/// EMUs per pixel at 96 dpi.
const EMU_PER_PIXEL: i64 = 9525;

/// Placeholder role of a shape (`p:ph@type`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `title` or `ctrTitle`
    Title,
    SubTitle,
    /// `body`, or a placeholder without a type
    Body,
    Other(String),
}

impl Placeholder {
    fn from_xml(kind: Option<&str>) -> Self {
        match kind {
            Some("title") | Some("ctrTitle") => Placeholder::Title,
            Some("subTitle") => Placeholder::SubTitle,
            None | Some("body") | Some("obj") => Placeholder::Body,
            Some(other) => Placeholder::Other(other.to_string()),
        }
    }
}

/// A run of DrawingML text (`a:r`, `a:fld` or a line break).
#[derive(Debug, Clone, Default)]
pub struct TextRun {
    text: String,
    /// Hundredths of a point
    size: Option<u32>,
    bold: Option<bool>,
    italic: Option<bool>,
    font: Option<String>,
    link_r_id: Option<String>,
}

impl TextRun {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Font size in points.
    pub fn size_pt(&self) -> Option<f32> {
        self.size.map(|s| s as f32 / 100.0)
    }

    #[inline]
    pub fn bold(&self) -> Option<bool> {
        self.bold
    }

    #[inline]
    pub fn italic(&self) -> Option<bool> {
        self.italic
    }

    /// Latin typeface.
    #[inline]
    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    /// Relationship id of the run's `a:hlinkClick`.
    #[inline]
    pub fn link_r_id(&self) -> Option<&str> {
        self.link_r_id.as_deref()
    }
}

/// An `a:p` paragraph.
#[derive(Debug, Clone, Default)]
pub struct TextParagraph {
    runs: Vec<TextRun>,
}

impl TextParagraph {
    #[inline]
    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(TextRun::text).collect()
    }
}

/// What a shape holds.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// `p:sp` with its text body (possibly empty)
    Text(Vec<TextParagraph>),
    /// `p:pic` with the relationship id of its image
    Picture {
        r_id: String,
        /// Width and height in EMUs
        extent: Option<(i64, i64)>,
    },
    /// `a:tbl` inside a graphic frame, as cell text per row
    Table(Vec<Vec<String>>),
    /// Charts, diagrams, connectors and pictures without an embedded image
    Other,
}

/// A shape with its non-visual properties.
#[derive(Debug, Clone)]
pub struct Shape {
    id: Option<u32>,
    name: String,
    descr: Option<String>,
    placeholder: Option<Placeholder>,
    click_r_id: Option<String>,
    kind: ShapeKind,
}

impl Shape {
    #[inline]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative text.
    #[inline]
    pub fn descr(&self) -> Option<&str> {
        self.descr.as_deref()
    }

    #[inline]
    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    pub fn is_title(&self) -> bool {
        self.placeholder == Some(Placeholder::Title)
    }

    /// Relationship id of the shape's click action.
    #[inline]
    pub fn click_r_id(&self) -> Option<&str> {
        self.click_r_id.as_deref()
    }

    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Text paragraphs of a text shape; empty for other kinds.
    pub fn paragraphs(&self) -> &[TextParagraph] {
        match &self.kind {
            ShapeKind::Text(paragraphs) => paragraphs,
            _ => &[],
        }
    }

    /// Paragraph texts joined with newlines.
    pub fn text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(TextParagraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Display size of a picture in pixels at 96 dpi.
    pub fn size_px(&self) -> Option<(u32, u32)> {
        match self.kind {
            ShapeKind::Picture {
                extent: Some((cx, cy)),
                ..
            } => Some((
                (cx / EMU_PER_PIXEL).max(0) as u32,
                (cy / EMU_PER_PIXEL).max(0) as u32,
            )),
            _ => None,
        }
    }
}

/// Parse every shape of a slide, flattening group shapes, in z-order.
pub fn parse_shapes(xml: &[u8]) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_reader(xml);
    let mut shapes = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" | b"pic" | b"graphicFrame" | b"cxnSp" => {
                    let local = e.local_name().as_ref().to_vec();
                    shapes.push(parse_shape(&mut reader, &local)?);
                },
                b"Fallback" => {
                    reader.read_to_end(e.name())?;
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(shapes)
}

#[derive(Default)]
struct ShapeBuilder {
    id: Option<u32>,
    name: String,
    descr: Option<String>,
    placeholder: Option<Placeholder>,
    click_r_id: Option<String>,
    paragraphs: Option<Vec<TextParagraph>>,
    blip: Option<String>,
    extent: Option<(i64, i64)>,
    table: Option<Vec<Vec<String>>>,
}

/// Parse one shape; the reader is positioned after its start tag.
fn parse_shape(reader: &mut XmlReader<'_>, end: &[u8]) -> Result<Shape> {
    let mut shape = ShapeBuilder::default();
    let mut in_cnvpr = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"cNvPr" => {
                    apply_cnvpr(&mut shape, &e);
                    in_cnvpr = true;
                },
                b"txBody" => shape.paragraphs = Some(parse_text_body(reader, b"txBody")?),
                b"tbl" => shape.table = Some(parse_table(reader)?),
                b"Fallback" => {
                    reader.read_to_end(e.name())?;
                },
                _ => apply_property(&mut shape, &e, in_cnvpr),
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"cNvPr" => apply_cnvpr(&mut shape, &e),
                _ => apply_property(&mut shape, &e, in_cnvpr),
            },
            Event::End(e) => {
                let local = e.local_name();
                if local.as_ref() == b"cNvPr" {
                    in_cnvpr = false;
                } else if local.as_ref() == end {
                    break;
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    let kind = if let Some(grid) = shape.table {
        ShapeKind::Table(grid)
    } else if let Some(r_id) = shape.blip {
        ShapeKind::Picture {
            r_id,
            extent: shape.extent,
        }
    } else if end == b"sp" {
        ShapeKind::Text(shape.paragraphs.unwrap_or_default())
    } else {
        ShapeKind::Other
    };

    Ok(Shape {
        id: shape.id,
        name: shape.name,
        descr: shape.descr,
        placeholder: shape.placeholder,
        click_r_id: shape.click_r_id,
        kind,
    })
}

fn apply_cnvpr(shape: &mut ShapeBuilder, e: &BytesStart<'_>) {
    shape.id = attr(e, b"id").and_then(|v| v.parse().ok());
    shape.name = attr(e, b"name").unwrap_or_default();
    shape.descr = attr(e, b"descr").filter(|d| !d.is_empty());
}

fn apply_property(shape: &mut ShapeBuilder, e: &BytesStart<'_>, in_cnvpr: bool) {
    match e.local_name().as_ref() {
        b"hlinkClick" if in_cnvpr => shape.click_r_id = attr_prefixed(e, b"id").filter(|id| !id.is_empty()),
        b"ph" => shape.placeholder = Some(Placeholder::from_xml(attr(e, b"type").as_deref())),
        b"blip" if shape.blip.is_none() => shape.blip = attr(e, b"embed"),
        b"ext" if shape.extent.is_none() => {
            let cx = attr(e, b"cx").and_then(|v| v.parse::<i64>().ok());
            let cy = attr(e, b"cy").and_then(|v| v.parse::<i64>().ok());
            shape.extent = cx.zip(cy);
        },
        _ => {},
    }
}

/// Parse paragraphs until the end tag `end` (`txBody` or `tc`'s body).
fn parse_text_body(reader: &mut XmlReader<'_>, end: &[u8]) -> Result<Vec<TextParagraph>> {
    let mut paragraphs = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"p" => paragraphs.push(parse_paragraph(reader)?),
            Event::Empty(e) if e.local_name().as_ref() == b"p" => paragraphs.push(TextParagraph::default()),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(paragraphs)
}

fn parse_paragraph(reader: &mut XmlReader<'_>) -> Result<TextParagraph> {
    let mut paragraph = TextParagraph::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => paragraph.runs.push(parse_run(reader, b"r")?),
                b"fld" => paragraph.runs.push(parse_run(reader, b"fld")?),
                _ => {},
            },
            Event::Empty(e) if e.local_name().as_ref() == b"br" => paragraph.runs.push(TextRun {
                text: "\n".to_string(),
                ..TextRun::default()
            }),
            Event::End(e) if e.local_name().as_ref() == b"p" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(paragraph)
}

fn parse_run(reader: &mut XmlReader<'_>, end: &[u8]) -> Result<TextRun> {
    let mut run = TextRun::default();
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"rPr" => {
                    run.size = attr(&e, b"sz").and_then(|v| v.parse().ok());
                    run.bold = flag(&e, b"b");
                    run.italic = flag(&e, b"i");
                },
                b"latin" => run.font = attr(&e, b"typeface").filter(|f| !f.is_empty()),
                b"hlinkClick" => run.link_r_id = attr_prefixed(&e, b"id").filter(|id| !id.is_empty()),
                b"t" => in_text = true,
                _ => {},
            },
            Event::Text(t) if in_text => push_text(&mut run.text, &t),
            Event::GeneralRef(r) if in_text => push_ref(&mut run.text, &r),
            Event::End(e) => {
                let local = e.local_name();
                if local.as_ref() == b"t" {
                    in_text = false;
                } else if local.as_ref() == end {
                    break;
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(run)
}

/// `b="1"` style attribute flags of DrawingML run properties.
fn flag(e: &BytesStart<'_>, name: &[u8]) -> Option<bool> {
    attr(e, name).map(|v| v == "1" || v == "true")
}

/// Parse an `a:tbl`; the reader is positioned after its start tag.
fn parse_table(reader: &mut XmlReader<'_>) -> Result<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tr" => rows.push(Vec::new()),
                b"tc" => {
                    let text = parse_cell(reader)?;
                    if let Some(row) = rows.last_mut() {
                        row.push(text);
                    }
                },
                _ => {},
            },
            Event::Empty(e) if e.local_name().as_ref() == b"tc" => {
                if let Some(row) = rows.last_mut() {
                    row.push(String::new());
                }
            },
            Event::End(e) if e.local_name().as_ref() == b"tbl" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(rows)
}

fn parse_cell(reader: &mut XmlReader<'_>) -> Result<String> {
    let mut paragraphs = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"txBody" => {
                paragraphs = parse_text_body(reader, b"txBody")?;
            },
            Event::End(e) if e.local_name().as_ref() == b"tc" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(paragraphs
        .iter()
        .map(TextParagraph::text)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn slide(tree: &str) -> Vec<Shape> {
        let xml = format!(r#"<p:sld {NS}><p:cSld><p:spTree>{tree}</p:spTree></p:cSld></p:sld>"#);
        parse_shapes(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_title_and_body_text() {
        let shapes = slide(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr>
                 <p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" sz="4400" b="1"><a:latin typeface="Calibri Light"/></a:rPr><a:t>Quarterly</a:t></a:r><a:r><a:t> &amp; Review</a:t></a:r></a:p></p:txBody></p:sp>
               <p:sp><p:nvSpPr><p:cNvPr id="3" name="Content"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
                 <p:txBody><a:p><a:r><a:t>first</a:t></a:r><a:br/><a:r><a:t>second</a:t></a:r></a:p><a:p/></p:txBody></p:sp>"#,
        );
        assert_eq!(shapes.len(), 2);
        assert!(shapes[0].is_title());
        assert_eq!(shapes[0].name(), "Title 1");
        assert_eq!(shapes[0].text(), "Quarterly & Review");
        let run = &shapes[0].paragraphs()[0].runs()[0];
        assert_eq!(run.size_pt(), Some(44.0));
        assert_eq!(run.bold(), Some(true));
        assert_eq!(run.font(), Some("Calibri Light"));

        assert_eq!(shapes[1].placeholder(), Some(&Placeholder::Body));
        assert_eq!(shapes[1].paragraphs().len(), 2);
        assert_eq!(shapes[1].paragraphs()[0].text(), "first\nsecond");
    }

    #[test]
    fn test_links_pictures_and_groups() {
        let shapes = slide(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="9" name="Group"/></p:nvGrpSpPr>
                 <p:sp><p:nvSpPr><p:cNvPr id="4" name="Button"><a:hlinkClick r:id="rId3"/></p:cNvPr></p:nvSpPr>
                   <p:txBody><a:p><a:r><a:rPr><a:hlinkClick r:id="rId4"/></a:rPr><a:t>docs</a:t></a:r></a:p></p:txBody></p:sp>
               </p:grpSp>
               <p:pic><p:nvPicPr><p:cNvPr id="5" name="Picture 4" descr="Company logo"/></p:nvPicPr>
                 <p:blipFill><a:blip r:embed="rId2"/></p:blipFill>
                 <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1905000" cy="952500"/></a:xfrm></p:spPr></p:pic>"#,
        );
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].click_r_id(), Some("rId3"));
        assert_eq!(shapes[0].paragraphs()[0].runs()[0].link_r_id(), Some("rId4"));

        assert!(matches!(shapes[1].kind(), ShapeKind::Picture { r_id, .. } if r_id == "rId2"));
        assert_eq!(shapes[1].descr(), Some("Company logo"));
        assert_eq!(shapes[1].size_px(), Some((200, 100)));
    }

    #[test]
    fn test_table_frame() {
        let shapes = slide(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="6" name="Table 5"/></p:nvGraphicFramePr>
                 <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl>
                   <a:tblGrid><a:gridCol w="100"/><a:gridCol w="100"/></a:tblGrid>
                   <a:tr h="10"><a:tc><a:txBody><a:p><a:r><a:t>a</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t>b</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
                   <a:tr h="10"><a:tc><a:txBody><a:p/></a:txBody></a:tc><a:tc hMerge="1"><a:txBody><a:p/></a:txBody></a:tc></a:tr>
                 </a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        );
        assert_eq!(shapes.len(), 1);
        match shapes[0].kind() {
            ShapeKind::Table(rows) => assert_eq!(rows, &vec![vec!["a", "b"], vec!["", ""]]),
            other => panic!("unexpected {other:?}"),
        }
    }
}

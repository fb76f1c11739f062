//! Paragraph content of `word/document.xml`.
//!
//! The body is parsed with a recursive descent over quick-xml events. Each
//! `parse_*` function is called right after the start tag of its element
//! and returns once the matching end tag has been consumed.
use crate::common::xml::{attr, attr_prefixed, push_ref, push_text, toggle};
use crate::ooxml::docx::table::{Table, parse_table};
use crate::ooxml::error::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub(crate) type XmlReader<'a> = Reader<&'a [u8]>;

/// EMUs per pixel at 96 dpi.
const EMU_PER_PIXEL: i64 = 9525;

/// A top-level element of the document body.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// A `<w:r>` run with the formatting set directly on it.
#[derive(Debug, Clone, Default)]
pub struct Run {
    text: String,
    font: Option<String>,
    /// Half-points
    size: Option<u32>,
    bold: Option<bool>,
    italic: Option<bool>,
}

impl Run {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    /// Font size in points.
    pub fn size_pt(&self) -> Option<f32> {
        self.size.map(|hp| hp as f32 / 2.0)
    }

    #[inline]
    pub fn bold(&self) -> Option<bool> {
        self.bold
    }

    #[inline]
    pub fn italic(&self) -> Option<bool> {
        self.italic
    }
}

/// Where a hyperlink points before relationships are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// `w:hyperlink r:id`, resolved through the document relationships
    Relationship(String),
    /// URL written directly in a `HYPERLINK` field
    Url(String),
    /// Bookmark inside the document
    Anchor(String),
}

/// A hyperlink found in a paragraph with its display text.
#[derive(Debug, Clone)]
pub struct ParagraphLink {
    target: LinkTarget,
    text: String,
}

impl ParagraphLink {
    #[inline]
    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An embedded picture referenced from a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawing {
    r_id: String,
    name: Option<String>,
    descr: Option<String>,
    /// Width and height in EMUs
    extent: Option<(i64, i64)>,
}

impl Drawing {
    /// Relationship id of the image part.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Alternative text.
    #[inline]
    pub fn descr(&self) -> Option<&str> {
        self.descr.as_deref()
    }

    /// Display size in pixels at 96 dpi.
    pub fn size_px(&self) -> Option<(u32, u32)> {
        self.extent.map(|(cx, cy)| {
            (
                (cx / EMU_PER_PIXEL).max(0) as u32,
                (cy / EMU_PER_PIXEL).max(0) as u32,
            )
        })
    }
}

/// A `<w:p>` paragraph.
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    style_id: Option<String>,
    outline_level: Option<u8>,
    runs: Vec<Run>,
    links: Vec<ParagraphLink>,
    drawings: Vec<Drawing>,
}

impl Paragraph {
    /// Style id from `w:pStyle`, if set.
    #[inline]
    pub fn style_id(&self) -> Option<&str> {
        self.style_id.as_deref()
    }

    /// Outline level set directly on the paragraph (0 is the top level).
    #[inline]
    pub fn outline_level(&self) -> Option<u8> {
        self.outline_level
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[inline]
    pub fn links(&self) -> &[ParagraphLink] {
        &self.links
    }

    #[inline]
    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldChar {
    Begin,
    Separate,
    End,
}

#[derive(Debug, Default)]
struct FieldState {
    instr: String,
    result: String,
    in_result: bool,
}

#[derive(Debug, Default)]
struct RunParts {
    run: Run,
    field: Option<FieldChar>,
    instr: String,
    drawings: Vec<Drawing>,
}

/// Parse the body blocks of `document.xml`.
pub fn parse_body(xml: &[u8]) -> Result<Vec<Block>> {
    let mut reader = Reader::from_reader(xml);
    let mut blocks = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => blocks.push(Block::Paragraph(parse_paragraph(&mut reader)?)),
                b"tbl" => blocks.push(Block::Table(parse_table(&mut reader)?)),
                b"Fallback" | b"del" | b"moveFrom" => {
                    reader.read_to_end(e.name())?;
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(blocks)
}

/// Parse a paragraph; the reader is positioned after `<w:p>`.
pub(crate) fn parse_paragraph(reader: &mut XmlReader<'_>) -> Result<Paragraph> {
    let mut paragraph = Paragraph::default();
    let mut open_links: Vec<ParagraphLink> = Vec::new();
    let mut fields: Vec<FieldState> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => depth += 1,
                b"r" => {
                    let parts = parse_run(reader)?;
                    absorb_run(&mut paragraph, &mut open_links, &mut fields, parts);
                },
                b"hyperlink" => open_links.push(hyperlink_from_start(&e)),
                b"fldSimple" => fields.push(FieldState {
                    instr: attr(&e, b"instr").unwrap_or_default(),
                    in_result: true,
                    ..FieldState::default()
                }),
                b"Fallback" | b"txbxContent" | b"del" | b"moveFrom" => {
                    reader.read_to_end(e.name())?;
                },
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"pStyle" => paragraph.style_id = attr(&e, b"val"),
                b"outlineLvl" => {
                    paragraph.outline_level = attr(&e, b"val")
                        .and_then(|v| v.parse::<u8>().ok())
                        .filter(|&l| l < 9);
                },
                _ => {},
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                },
                b"hyperlink" => {
                    if let Some(link) = open_links.pop() {
                        paragraph.links.push(link);
                    }
                },
                b"fldSimple" => {
                    if let Some(field) = fields.pop() {
                        finish_field(&mut paragraph, field);
                    }
                },
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(paragraph)
}

fn hyperlink_from_start(e: &BytesStart<'_>) -> ParagraphLink {
    let target = match (attr_prefixed(e, b"id"), attr(e, b"anchor")) {
        (Some(r_id), _) => LinkTarget::Relationship(r_id),
        (None, Some(anchor)) => LinkTarget::Anchor(anchor),
        (None, None) => LinkTarget::Anchor(String::new()),
    };
    ParagraphLink {
        target,
        text: String::new(),
    }
}

fn absorb_run(
    paragraph: &mut Paragraph,
    open_links: &mut [ParagraphLink],
    fields: &mut Vec<FieldState>,
    parts: RunParts,
) {
    match parts.field {
        Some(FieldChar::Begin) => fields.push(FieldState::default()),
        Some(FieldChar::Separate) => {
            if let Some(field) = fields.last_mut() {
                field.in_result = true;
            }
        },
        Some(FieldChar::End) => {
            if let Some(field) = fields.pop() {
                finish_field(paragraph, field);
            }
        },
        None => {},
    }

    if !parts.instr.is_empty()
        && let Some(field) = fields.last_mut()
        && !field.in_result
    {
        field.instr.push_str(&parts.instr);
    }

    let text = parts.run.text();
    if !text.is_empty() {
        for link in open_links.iter_mut() {
            link.text.push_str(text);
        }
        for field in fields.iter_mut().filter(|f| f.in_result) {
            field.result.push_str(text);
        }
    }

    paragraph.drawings.extend(parts.drawings);
    paragraph.runs.push(parts.run);
}

fn finish_field(paragraph: &mut Paragraph, field: FieldState) {
    if let Some(target) = hyperlink_field_target(&field.instr) {
        paragraph.links.push(ParagraphLink {
            target,
            text: field.result,
        });
    }
}

/// Target of a `HYPERLINK "url" \l "anchor" \o "tip"` field instruction.
pub(crate) fn hyperlink_field_target(instr: &str) -> Option<LinkTarget> {
    let tokens = field_tokens(instr);
    let (keyword, args) = tokens.split_first()?;
    if !keyword.eq_ignore_ascii_case("HYPERLINK") {
        return None;
    }

    let mut url = None;
    let mut anchor = None;
    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "\\l" => anchor = iter.next().cloned(),
            "\\o" | "\\t" => {
                iter.next();
            },
            t if t.starts_with('\\') => {},
            t if url.is_none() => url = Some(t.to_string()),
            _ => {},
        }
    }
    url.filter(|u| !u.is_empty())
        .map(LinkTarget::Url)
        .or_else(|| anchor.map(LinkTarget::Anchor))
}

/// Split a field instruction on whitespace, keeping quoted arguments whole.
fn field_tokens(instr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in instr.chars() {
        match ch {
            '"' => {
                if quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            },
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse a run; the reader is positioned after `<w:r>`.
fn parse_run(reader: &mut XmlReader<'_>) -> Result<RunParts> {
    let mut parts = RunParts::default();
    let mut in_rpr = false;
    let mut in_text = false;
    let mut in_instr = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPr" => in_rpr = true,
                b"t" => in_text = true,
                b"instrText" => in_instr = true,
                b"drawing" => parts.drawings.extend(parse_drawing(reader, b"drawing")?),
                b"pict" => parts.drawings.extend(parse_drawing(reader, b"pict")?),
                b"Fallback" | b"delText" | b"delInstrText" => {
                    reader.read_to_end(e.name())?;
                },
                _ if in_rpr => apply_run_property(&mut parts.run, &e),
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                _ if in_rpr => apply_run_property(&mut parts.run, &e),
                b"tab" => parts.run.text.push('\t'),
                b"br" | b"cr" => parts.run.text.push('\n'),
                b"noBreakHyphen" => parts.run.text.push('-'),
                b"fldChar" => {
                    parts.field = match attr(&e, b"fldCharType").as_deref() {
                        Some("begin") => Some(FieldChar::Begin),
                        Some("separate") => Some(FieldChar::Separate),
                        Some("end") => Some(FieldChar::End),
                        _ => None,
                    };
                },
                _ => {},
            },
            Event::Text(t) => {
                if in_text {
                    push_text(&mut parts.run.text, &t);
                } else if in_instr {
                    push_text(&mut parts.instr, &t);
                }
            },
            Event::GeneralRef(r) => {
                if in_text {
                    push_ref(&mut parts.run.text, &r);
                } else if in_instr {
                    push_ref(&mut parts.instr, &r);
                }
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"rPr" => in_rpr = false,
                b"t" => in_text = false,
                b"instrText" => in_instr = false,
                b"r" => break,
                _ => {},
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(parts)
}

fn apply_run_property(run: &mut Run, e: &BytesStart<'_>) {
    match e.local_name().as_ref() {
        b"rFonts" => {
            run.font = attr(e, b"ascii")
                .or_else(|| attr(e, b"hAnsi"))
                .or_else(|| attr(e, b"cs"));
        },
        b"sz" => run.size = attr(e, b"val").and_then(|v| v.parse().ok()),
        b"b" => run.bold = Some(toggle(e)),
        b"i" => run.italic = Some(toggle(e)),
        _ => {},
    }
}

/// Collect pictures from a `w:drawing` or VML `w:pict` subtree.
fn parse_drawing(reader: &mut XmlReader<'_>, end: &[u8]) -> Result<Vec<Drawing>> {
    let mut drawings = Vec::new();
    let mut name = None;
    let mut descr = None;
    let mut extent = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Fallback" => {
                reader.read_to_end(e.name())?;
            },
            Event::Start(e) if e.local_name().as_ref() == end => depth += 1,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"docPr" => {
                    name = attr(&e, b"name");
                    descr = attr(&e, b"descr").filter(|d| !d.is_empty());
                },
                b"cNvPr" => {
                    if let Some(d) = attr(&e, b"descr").filter(|d| !d.is_empty()) {
                        descr = Some(d);
                    }
                },
                b"extent" => {
                    let cx = attr(&e, b"cx").and_then(|v| v.parse::<i64>().ok());
                    let cy = attr(&e, b"cy").and_then(|v| v.parse::<i64>().ok());
                    extent = cx.zip(cy);
                },
                b"blip" => {
                    if let Some(r_id) = attr(&e, b"embed") {
                        drawings.push(Drawing {
                            r_id,
                            name: name.clone(),
                            descr: descr.clone(),
                            extent,
                        });
                    }
                },
                b"imagedata" => {
                    if let Some(r_id) = attr_prefixed(&e, b"id") {
                        drawings.push(Drawing {
                            r_id,
                            name: name.clone(),
                            descr: attr(&e, b"title").filter(|t| !t.is_empty()).or(descr.clone()),
                            extent,
                        });
                    }
                },
                _ => {},
            },
            Event::End(e) if e.local_name().as_ref() == end => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(drawings)
}

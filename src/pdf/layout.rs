//! Content-stream interpretation: positioned text runs and ruling lines.
//!
//! Glyph advances are not computed. A run's position is the text origin at
//! the moment its show operator executes, in default user space.
use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::pdf::cmap::ToUnicode;

/// Nesting limit for form XObjects.
pub const MAX_FORM_DEPTH: usize = 8;

/// `TJ` adjustment (thousandths of an em) below which a gap becomes a space.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// An affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (x * a + y * c + e, x * b + y * d + f)
    }

    /// Length of the transformed unit vertical vector.
    pub fn vertical_scale(&self) -> f32 {
        self.0[2].hypot(self.0[3])
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, operand) in m.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        Some(Self(m))
    }
}

/// A run of text from one show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font: Option<String>,
    /// Font size scaled by the text and transformation matrices
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    /// Ordinal of the enclosing `BT`/`ET` block on the page
    pub text_object: usize,
    /// No positioning operator ran since the previous run of this text object
    pub adjoins_previous: bool,
}

/// A straight line segment in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Segment {
    #[inline]
    pub fn is_horizontal(&self, tolerance: f32) -> bool {
        (self.y1 - self.y2).abs() <= tolerance
    }

    #[inline]
    pub fn is_vertical(&self, tolerance: f32) -> bool {
        (self.x1 - self.x2).abs() <= tolerance
    }
}

/// Everything drawn on one page that extraction cares about.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
    pub segments: Vec<Segment>,
}

/// A font resource reduced to what text decoding needs.
#[derive(Debug, Clone, Default)]
pub struct PdfFont {
    pub base_font: Option<String>,
    /// Composite (Type0) fonts use two-byte codes
    pub composite: bool,
    pub to_unicode: Option<ToUnicode>,
    pub bold: bool,
    pub italic: bool,
}

impl PdfFont {
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|name| strip_subset_prefix(&String::from_utf8_lossy(name)).to_string());
        let composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Type0");
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_stream().ok())
            .map(|stream| ToUnicode::parse(&stream_bytes(stream)))
            .filter(|cmap| !cmap.is_empty());
        let (bold, italic) = base_font.as_deref().map(style_from_name).unwrap_or_default();
        Self {
            base_font,
            composite,
            to_unicode,
            bold,
            italic,
        }
    }

    /// Decode a string operand to Unicode.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if let Some(cmap) = &self.to_unicode {
            let code_len = cmap.code_len().unwrap_or(if self.composite { 2 } else { 1 });
            return cmap.decode(bytes, code_len);
        }
        decode_text_string(bytes)
    }
}

/// UTF-16BE when the bytes carry a BOM, Windows-1252 otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Bold and italic flags guessed from a PostScript font name.
pub fn style_from_name(name: &str) -> (bool, bool) {
    let lower = name.to_ascii_lowercase();
    let bold = ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|k| lower.contains(k));
    let italic = lower.contains("italic") || lower.contains("oblique");
    (bold, italic)
}

fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Stream data with filters applied when there are any.
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.get(b"Filter").is_err() {
        return stream.content.clone();
    }
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(e) => {
            debug!("cannot decode stream filters: {e}");
            stream.content.clone()
        },
    }
}

/// Resolve an object to a dictionary, following one reference.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    doc.dereference(object).ok().and_then(|(_, o)| o.as_dict().ok())
}

/// The page's resource dictionary, inherited through `/Parent` when absent.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Interpret a page's content stream.
pub fn interpret_page(doc: &Document, page_id: ObjectId) -> lopdf::Result<PageLayout> {
    let content = doc.get_page_content(page_id)?;
    let mut interpreter = Interpreter {
        doc,
        layout: PageLayout::default(),
        text_objects: 0,
    };
    interpreter.run(&content, page_resources(doc, page_id), Matrix::IDENTITY, 0)?;
    Ok(interpreter.layout)
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    leading: f32,
}

#[derive(Debug, Default)]
struct PathBuilder {
    current: Option<(f32, f32)>,
    start: Option<(f32, f32)>,
    rects: Vec<Segment>,
    lines: Vec<Segment>,
}

impl PathBuilder {
    fn line_to(&mut self, ctm: &Matrix, x: f32, y: f32) {
        if let Some((cx, cy)) = self.current {
            let (x1, y1) = ctm.apply(cx, cy);
            let (x2, y2) = ctm.apply(x, y);
            self.lines.push(Segment { x1, y1, x2, y2 });
        }
        self.current = Some((x, y));
    }

    fn rect(&mut self, ctm: &Matrix, x: f32, y: f32, w: f32, h: f32) {
        let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
        for i in 0..4 {
            let (x1, y1) = ctm.apply(corners[i].0, corners[i].1);
            let (x2, y2) = ctm.apply(corners[(i + 1) % 4].0, corners[(i + 1) % 4].1);
            self.rects.push(Segment { x1, y1, x2, y2 });
        }
        self.current = Some((x, y));
        self.start = Some((x, y));
    }

    fn close(&mut self, ctm: &Matrix) {
        if let Some((sx, sy)) = self.start {
            self.line_to(ctm, sx, sy);
        }
    }

    fn finish(&mut self, out: &mut Vec<Segment>, stroked: bool) {
        out.append(&mut self.rects);
        if stroked {
            out.append(&mut self.lines);
        }
        self.clear();
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    layout: PageLayout,
    text_objects: usize,
}

impl<'a> Interpreter<'a> {
    fn run(&mut self, content: &[u8], resources: Option<&'a Dictionary>, ctm: Matrix, depth: usize) -> lopdf::Result<()> {
        let content = Content::decode(content)?;
        let mut fonts: HashMap<Vec<u8>, PdfFont> = HashMap::new();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = GraphicsState {
            ctm,
            font: None,
            font_size: 0.0,
            leading: 0.0,
        };
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut adjoins = false;
        let mut path = PathBuilder::default();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            let num = |i: usize| operands.get(i).and_then(number);
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                },
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                },
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                    adjoins = false;
                    self.text_objects += 1;
                },
                "ET" => adjoins = false,
                "Tf" => {
                    gs.font = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
                    gs.font_size = num(1).unwrap_or(0.0);
                },
                "TL" => gs.leading = num(0).unwrap_or(0.0),
                "Td" | "TD" => {
                    let (tx, ty) = (num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                    if op.operator == "TD" {
                        gs.leading = -ty;
                    }
                    tlm = Matrix::translate(tx, ty).then(&tlm);
                    tm = tlm;
                    adjoins = false;
                },
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                    adjoins = false;
                },
                "T*" => {
                    tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    adjoins = false;
                },
                "Tj" | "'" | "\"" | "TJ" => {
                    if op.operator != "Tj" && op.operator != "TJ" {
                        tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                        tm = tlm;
                        adjoins = false;
                    }
                    let font = self.font(&mut fonts, resources, gs.font.as_deref());
                    let text = match (op.operator.as_str(), operands) {
                        ("TJ", [Object::Array(items), ..]) => {
                            let mut text = String::new();
                            for item in items {
                                match item {
                                    Object::String(bytes, _) => text.push_str(&font.decode(bytes)),
                                    other => {
                                        if number(other).is_some_and(|n| n < TJ_SPACE_THRESHOLD) {
                                            text.push(' ');
                                        }
                                    },
                                }
                            }
                            text
                        },
                        (_, [.., Object::String(bytes, _)]) => font.decode(bytes),
                        _ => continue,
                    };
                    let m = tm.then(&gs.ctm);
                    let (x, y) = m.apply(0.0, 0.0);
                    self.layout.runs.push(TextRun {
                        text,
                        x,
                        y,
                        font: font.base_font.clone(),
                        size: gs.font_size * m.vertical_scale(),
                        bold: font.bold,
                        italic: font.italic,
                        text_object: self.text_objects,
                        adjoins_previous: adjoins,
                    });
                    adjoins = true;
                },
                "m" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        path.current = Some((x, y));
                        path.start = Some((x, y));
                    }
                },
                "l" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        path.line_to(&gs.ctm, x, y);
                    }
                },
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (num(0), num(1), num(2), num(3)) {
                        path.rect(&gs.ctm, x, y, w, h);
                    }
                },
                "h" => path.close(&gs.ctm),
                "S" => path.finish(&mut self.layout.segments, true),
                "s" | "b" | "b*" => {
                    path.close(&gs.ctm);
                    path.finish(&mut self.layout.segments, true);
                },
                "B" | "B*" => path.finish(&mut self.layout.segments, true),
                "f" | "F" | "f*" => path.finish(&mut self.layout.segments, false),
                "n" => path.clear(),
                "Do" if depth < MAX_FORM_DEPTH => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        self.form(name, resources, &gs.ctm, depth)?;
                    }
                },
                _ => {},
            }
        }
        Ok(())
    }

    fn font<'f>(
        &self,
        fonts: &'f mut HashMap<Vec<u8>, PdfFont>,
        resources: Option<&'a Dictionary>,
        name: Option<&[u8]>,
    ) -> &'f PdfFont {
        let key = name.unwrap_or_default().to_vec();
        fonts.entry(key).or_insert_with_key(|key| {
            resources
                .and_then(|r| r.get(b"Font").ok())
                .and_then(|f| resolve_dict(self.doc, f))
                .and_then(|f| f.get(key).ok())
                .and_then(|f| resolve_dict(self.doc, f))
                .map(|dict| PdfFont::from_dict(self.doc, dict))
                .unwrap_or_default()
        })
    }

    /// Run a form XObject's content with its own matrix and resources.
    fn form(&mut self, name: &[u8], resources: Option<&'a Dictionary>, ctm: &Matrix, depth: usize) -> lopdf::Result<()> {
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve_dict(doc, x))
            .and_then(|x| x.get(name).ok())
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, o)| o.as_stream().ok())
        else {
            return Ok(());
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .is_some_and(|s| s == b"Form");
        if !is_form {
            return Ok(());
        }
        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| m.as_array().ok())
            .and_then(|m| Matrix::from_operands(m))
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
            .or(resources);
        let content = stream_bytes(stream);
        if let Err(e) = self.run(&content, form_resources, matrix.then(ctm), depth + 1) {
            debug!("skipping unreadable form XObject: {e}");
        }
        Ok(())
    }
}

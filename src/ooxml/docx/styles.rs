//! Style table of a Word document (`word/styles.xml`).
use crate::common::xml::{attr, toggle};
use crate::ooxml::error::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Longest `basedOn` chain followed before giving up.
const MAX_STYLE_DEPTH: usize = 16;

/// Kind of a style definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleKind {
    #[default]
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    fn from_xml(value: &str) -> Self {
        match value {
            "character" => StyleKind::Character,
            "table" => StyleKind::Table,
            "numbering" => StyleKind::Numbering,
            _ => StyleKind::Paragraph,
        }
    }
}

/// A single `<w:style>` definition.
#[derive(Debug, Clone, Default)]
pub struct Style {
    style_id: String,
    name: Option<String>,
    kind: StyleKind,
    is_default: bool,
    based_on: Option<String>,
    outline_level: Option<u8>,
    font: Option<String>,
    /// Half-points, as stored in `w:sz`
    size: Option<u32>,
    bold: Option<bool>,
    italic: Option<bool>,
}

impl Style {
    #[inline]
    pub fn style_id(&self) -> &str {
        &self.style_id
    }

    /// Name as shown in Word, e.g. `Heading 1` for the stored `heading 1`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    #[inline]
    pub fn based_on(&self) -> Option<&str> {
        self.based_on.as_deref()
    }
}

/// All styles of a document, indexed by style id.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: HashMap<String, Style>,
    default_paragraph: Option<String>,
}

impl StyleTable {
    /// Parse `styles.xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut table = StyleTable::default();
        let mut current: Option<Style> = None;
        let mut in_ppr = false;
        let mut in_rpr = false;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"style" => current = Some(style_from_start(&e)),
                    b"pPr" => in_ppr = true,
                    b"rPr" => in_rpr = true,
                    _ => {
                        if let Some(style) = current.as_mut() {
                            apply_property(style, &e, in_ppr, in_rpr);
                        }
                    },
                },
                Event::Empty(e) => {
                    if let Some(style) = current.as_mut() {
                        apply_property(style, &e, in_ppr, in_rpr);
                    }
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"style" => {
                        if let Some(style) = current.take()
                            && !style.style_id.is_empty()
                        {
                            if style.is_default && style.kind == StyleKind::Paragraph {
                                table.default_paragraph = Some(style.style_id.clone());
                            }
                            table.styles.insert(style.style_id.clone(), style);
                        }
                    },
                    b"pPr" => in_ppr = false,
                    b"rPr" => in_rpr = false,
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
        }
        Ok(table)
    }

    #[inline]
    pub fn get(&self, style_id: &str) -> Option<&Style> {
        self.styles.get(style_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// The style a paragraph without `w:pStyle` uses.
    pub fn default_paragraph_style(&self) -> Option<&Style> {
        self.default_paragraph.as_deref().and_then(|id| self.get(id))
    }

    /// Resolve a paragraph's style id, falling back to the default style.
    pub fn paragraph_style(&self, style_id: Option<&str>) -> Option<&Style> {
        style_id
            .and_then(|id| self.get(id))
            .or_else(|| self.default_paragraph_style())
    }

    /// Iterate a style and its ancestors through `basedOn`.
    pub fn chain<'a>(&'a self, style: &'a Style) -> impl Iterator<Item = &'a Style> + 'a {
        std::iter::successors(Some(style), |s| s.based_on().and_then(|id| self.get(id)))
            .take(MAX_STYLE_DEPTH)
    }

    /// Heading level of a style: `Title` and `Heading N` by name, otherwise
    /// the first outline level found along the `basedOn` chain.
    pub fn heading_level(&self, style: &Style) -> Option<u8> {
        if let Some(level) = style.name().and_then(heading_level_from_name) {
            return Some(level);
        }
        self.chain(style).find_map(|s| s.outline_level).map(|l| l + 1)
    }

    /// Font name, size in points, bold and italic inherited along the chain.
    pub fn run_defaults(&self, style: &Style) -> (Option<String>, Option<f32>, Option<bool>, Option<bool>) {
        let chain: Vec<&Style> = self.chain(style).collect();
        let font = chain.iter().find_map(|s| s.font.clone());
        let size = chain.iter().find_map(|s| s.size).map(|hp| hp as f32 / 2.0);
        let bold = chain.iter().find_map(|s| s.bold);
        let italic = chain.iter().find_map(|s| s.italic);
        (font, size, bold, italic)
    }
}

fn style_from_start(e: &BytesStart<'_>) -> Style {
    Style {
        style_id: attr(e, b"styleId").unwrap_or_default(),
        kind: attr(e, b"type")
            .map(|t| StyleKind::from_xml(&t))
            .unwrap_or_default(),
        is_default: attr(e, b"default").is_some_and(|v| v == "1" || v == "true"),
        ..Style::default()
    }
}

fn apply_property(style: &mut Style, e: &BytesStart<'_>, in_ppr: bool, in_rpr: bool) {
    match e.local_name().as_ref() {
        b"name" => style.name = attr(e, b"val").map(|n| ui_name(&n)),
        b"basedOn" => style.based_on = attr(e, b"val"),
        b"outlineLvl" if in_ppr => {
            // 9 marks body text
            style.outline_level = attr(e, b"val")
                .and_then(|v| v.parse::<u8>().ok())
                .filter(|&l| l < 9);
        },
        b"rFonts" if in_rpr => {
            style.font = attr(e, b"ascii").or_else(|| attr(e, b"hAnsi"));
        },
        b"sz" if in_rpr => style.size = attr(e, b"val").and_then(|v| v.parse().ok()),
        b"b" if in_rpr => style.bold = Some(toggle(e)),
        b"i" if in_rpr => style.italic = Some(toggle(e)),
        _ => {},
    }
}

/// Word stores built-in style names in lower case (`heading 1`) and shows
/// them capitalised.
fn ui_name(name: &str) -> String {
    const BUILT_IN: [&str; 8] = [
        "normal", "title", "subtitle", "caption", "header", "footer", "heading", "toc heading",
    ];
    let lower = name.to_ascii_lowercase();
    let is_built_in = BUILT_IN.contains(&lower.as_str())
        || lower
            .strip_prefix("heading ")
            .is_some_and(|n| n.parse::<u8>().is_ok());
    if !is_built_in || name.chars().next().is_some_and(char::is_uppercase) {
        return name.to_string();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Title` and `Heading` are level 1, `Heading N` is level N.
pub fn heading_level_from_name(name: &str) -> Option<u8> {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "title" || lower == "heading" {
        return Some(1);
    }
    lower
        .strip_prefix("heading ")
        .and_then(|n| n.trim().parse::<u8>().ok())
        .filter(|&n| (1..=9).contains(&n))
}

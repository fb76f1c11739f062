//! A slide part with its relationships and shapes.
use crate::ooxml::opc::{PackURI, Relationships};
use crate::ooxml::pptx::shapes::Shape;

/// A parsed slide.
#[derive(Debug)]
pub struct Slide {
    number: u32,
    partname: PackURI,
    rels: Relationships,
    shapes: Vec<Shape>,
}

impl Slide {
    pub(crate) fn new(number: u32, partname: PackURI, rels: Relationships, shapes: Vec<Shape>) -> Self {
        Self {
            number,
            partname,
            rels,
            shapes,
        }
    }

    /// 1-based position in the presentation.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Shapes in z-order, group members flattened.
    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// The title placeholder shape, if the slide has one.
    pub fn title(&self) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.is_title())
    }

    /// External URL behind a hyperlink relationship id.
    ///
    /// Jumps to other slides (internal targets) resolve to `None`.
    pub fn hyperlink_url(&self, r_id: &str) -> Option<&str> {
        self.rels
            .get(r_id)
            .filter(|rel| rel.is_external())
            .map(|rel| rel.target_ref())
    }
}

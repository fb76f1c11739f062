//! PowerPoint (.pptx) presentations.
//!
//! Slides are taken in `p:sldIdLst` order and resolved through the
//! relationships of `presentation.xml`.
pub mod shapes;
pub mod slide;

pub use shapes::{Placeholder, Shape, ShapeKind, TextParagraph, TextRun};
pub use slide::Slide;

use crate::common::xml::attr_prefixed;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::{OpcPackage, Part};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;
use tracing::{debug, warn};

/// Main part content types accepted as a presentation.
const PRESENTATION_MAIN_TYPES: [&str; 3] = [
    ct::PML_PRESENTATION_MAIN,
    ct::PML_PRESENTATION_MACRO,
    ct::PML_SLIDESHOW_MAIN,
];

/// A parsed presentation.
#[derive(Debug)]
pub struct PptxPresentation {
    package: OpcPackage,
    slides: Vec<Slide>,
}

impl PptxPresentation {
    /// Open a .pptx file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(OpcPackage::open(path)?)
    }

    /// Parse a .pptx held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(OpcPackage::from_bytes(bytes)?)
    }

    fn from_package(package: OpcPackage) -> Result<Self> {
        let main = package
            .main_document_part()
            .map_err(|e| OoxmlError::PartNotFound(format!("main presentation part: {}", e)))?;
        if !PRESENTATION_MAIN_TYPES.contains(&main.content_type()) {
            return Err(OoxmlError::InvalidContentType {
                expected: ct::PML_PRESENTATION_MAIN.to_string(),
                got: main.content_type().to_string(),
            });
        }

        let rels = package.rels_for(main.partname())?;
        let mut slides = Vec::new();
        for (index, r_id) in slide_id_list(main.blob())?.into_iter().enumerate() {
            let number = index as u32 + 1;
            let Some(rel) = rels.get(&r_id) else {
                warn!(slide = number, r_id = %r_id, "slide relationship is missing");
                continue;
            };
            let partname = rel.target_partname()?;
            let Some(part) = package.part(&partname) else {
                warn!(slide = number, part = %partname, "slide part is missing");
                continue;
            };
            slides.push(parse_slide(&package, number, part)?);
        }
        debug!(slides = slides.len(), "parsed presentation");

        Ok(Self { package, slides })
    }

    /// Slides in presentation order.
    #[inline]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[inline]
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    #[inline]
    pub fn package(&self) -> &OpcPackage {
        &self.package
    }

    /// The image part a picture on `slide` refers to.
    pub fn image_part(&self, slide: &Slide, r_id: &str) -> Option<&Part> {
        let rel = slide.rels().get(r_id)?;
        if rel.is_external() {
            return None;
        }
        let partname = rel.target_partname().ok()?;
        self.package.part(&partname)
    }
}

fn parse_slide(package: &OpcPackage, number: u32, part: &Part) -> Result<Slide> {
    let rels = package.rels_for(part.partname())?;
    let shapes = shapes::parse_shapes(part.blob())?;
    Ok(Slide::new(number, part.partname().clone(), rels, shapes))
}

/// Relationship ids from `p:sldIdLst`, in order.
fn slide_id_list(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut in_list = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"sldIdLst" => in_list = true,
            Event::End(e) if e.local_name().as_ref() == b"sldIdLst" => in_list = false,
            Event::Start(e) | Event::Empty(e) if in_list && e.local_name().as_ref() == b"sldId" => {
                if let Some(r_id) = attr_prefixed(&e, b"id") {
                    ids.push(r_id);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(ids)
}

/// Minimal .pptx packages for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::ooxml::opc::package::build_zip;

    pub const P_NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    /// A slide's shape tree XML and the extra relationships it needs.
    pub struct SlideSpec<'a> {
        pub tree: &'a str,
        pub rels: &'a str,
    }

    /// Build a .pptx whose slides are listed in reverse part order, so the
    /// presentation order differs from the part names.
    pub fn pptx(slides: &[SlideSpec<'_>]) -> Vec<u8> {
        let count = slides.len();
        let mut overrides = String::new();
        let mut id_list = String::new();
        let mut pres_rels = String::new();
        for i in 0..count {
            let part = count - i;
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{part}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));
            id_list.push_str(&format!(r#"<p:sldId id="{}" r:id="rIdS{part}"/>"#, 256 + i));
            pres_rels.push_str(&format!(
                r#"<Relationship Id="rIdS{part}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{part}.xml"/>"#
            ));
        }

        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  {overrides}
</Types>"#
        );
        let package_rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#;
        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {P_NS}><p:sldMasterIdLst/><p:sldIdLst>{id_list}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#
        );
        let presentation_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{pres_rels}</Relationships>"#
        );

        let mut members: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), content_types.into_bytes()),
            ("_rels/.rels".to_string(), package_rels.as_bytes().to_vec()),
            ("ppt/presentation.xml".to_string(), presentation.into_bytes()),
            ("ppt/_rels/presentation.xml.rels".to_string(), presentation_rels.into_bytes()),
            ("ppt/media/image1.png".to_string(), PNG.to_vec()),
        ];
        for (i, spec) in slides.iter().enumerate() {
            let part = count - i;
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {P_NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr>{}</p:spTree></p:cSld></p:sld>"#,
                spec.tree
            );
            let rels = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rIdL" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>{}</Relationships>"#,
                spec.rels
            );
            members.push((format!("ppt/slides/slide{part}.xml"), xml.into_bytes()));
            members.push((format!("ppt/slides/_rels/slide{part}.xml.rels"), rels.into_bytes()));
        }

        let entries: Vec<(&str, &[u8])> = members
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
            .collect();
        build_zip(&entries)
    }

    pub fn title_shape(text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" sz="3600"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        )
    }

    pub fn text_shape(name: &str, text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
        )
    }

    pub fn picture_shape(r_id: &str, descr: &str) -> String {
        format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture 3" descr="{descr}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{r_id}"/></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="952500" cy="952500"/></a:xfrm></p:spPr></p:pic>"#
        )
    }

    pub fn image_rel(id: &str) -> String {
        format!(
            r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>"#
        )
    }

    pub fn link_rel(id: &str, url: &str) -> String {
        format!(
            r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{url}" TargetMode="External"/>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_slides_follow_id_list() {
        let first = title_shape("First");
        let second = title_shape("Second");
        let bytes = pptx(&[
            SlideSpec {
                tree: &first,
                rels: "",
            },
            SlideSpec {
                tree: &second,
                rels: "",
            },
        ]);
        let pres = PptxPresentation::from_bytes(&bytes).unwrap();
        assert_eq!(pres.slide_count(), 2);

        let titles: Vec<String> = pres
            .slides()
            .iter()
            .map(|s| s.title().unwrap().text())
            .collect();
        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(pres.slides()[0].number(), 1);
        // presentation order is independent of part names
        assert_eq!(pres.slides()[0].partname().as_str(), "/ppt/slides/slide2.xml");
    }

    #[test]
    fn test_image_and_link_resolution() {
        let tree = picture_shape("rId2", "logo");
        let rels = format!("{}{}", image_rel("rId2"), link_rel("rId3", "https://example.com"));
        let bytes = pptx(&[SlideSpec {
            tree: &tree,
            rels: &rels,
        }]);
        let pres = PptxPresentation::from_bytes(&bytes).unwrap();
        let slide = &pres.slides()[0];

        let part = pres.image_part(slide, "rId2").unwrap();
        assert_eq!(part.partname().as_str(), "/ppt/media/image1.png");
        assert_eq!(slide.hyperlink_url("rId3"), Some("https://example.com"));
        assert_eq!(slide.hyperlink_url("rIdL"), None);
    }
}

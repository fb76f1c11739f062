//! Content types, target modes and relationship types used when reading
//! OOXML packages.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    pub const WML_DOCUMENT_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const WML_DOCUMENT_MACRO: &str = "application/vnd.ms-word.document.macroEnabled.main+xml";
    pub const WML_TEMPLATE_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";

    pub const PML_PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const PML_PRESENTATION_MACRO: &str =
        "application/vnd.ms-powerpoint.presentation.macroEnabled.main+xml";
    pub const PML_SLIDESHOW_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideshow.main+xml";

    /// Fallback for parts without a Default or Override entry
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Relationship types, matched by their final path segment so that both the
/// transitional (`schemas.openxmlformats.org`) and strict (`purl.oclc.org`)
/// namespaces are accepted.
pub mod relationship_type {
    pub const OFFICE_DOCUMENT: &str = "officeDocument";
    pub const STYLES: &str = "styles";
    pub const SLIDE: &str = "slide";
    pub const IMAGE: &str = "image";
    pub const HYPERLINK: &str = "hyperlink";

    /// Whether a full relationship type URI has the given final segment.
    pub fn matches(reltype: &str, kind: &str) -> bool {
        reltype.rsplit('/').next() == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::relationship_type;

    #[test]
    fn test_reltype_matches_both_namespaces() {
        assert!(relationship_type::matches(
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image",
            relationship_type::IMAGE
        ));
        assert!(relationship_type::matches(
            "http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument",
            relationship_type::OFFICE_DOCUMENT
        ));
        assert!(!relationship_type::matches(
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout",
            relationship_type::SLIDE
        ));
    }
}

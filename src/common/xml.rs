//! Small helpers shared by the quick-xml event loops.
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesRef, BytesStart, BytesText};

/// Append the decoded content of a text event.
pub fn push_text(out: &mut String, text: &BytesText<'_>) {
    match text.decode() {
        Ok(s) => out.push_str(&s),
        Err(_) => out.push_str(&String::from_utf8_lossy(text.as_ref())),
    }
}

/// Append the character an entity or character reference stands for.
///
/// quick-xml reports `&amp;` and `&#x41;` as separate events.
pub fn push_ref(out: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        out.push(ch);
        return;
    }
    if let Ok(name) = reference.decode()
        && let Some(resolved) = resolve_predefined_entity(&name)
    {
        out.push_str(resolved);
    }
}

/// Value of an attribute matched by local name, unescaped.
pub fn attr(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local_name)
        .map(|a| attr_value(&a))
}

/// Value of an attribute matched by its full qualified name, unescaped.
pub fn attr_qualified(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| attr_value(&a))
}

/// Value of a prefixed attribute (`r:id`) matched by local name, whatever
/// the prefix. Unprefixed attributes of the same local name are skipped.
pub fn attr_prefixed(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == local_name)
        .map(|a| attr_value(&a))
}

fn attr_value(attribute: &Attribute<'_>) -> String {
    attribute
        .unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attribute.value).into_owned())
}

/// OOXML boolean toggle (`<w:b/>`, `<w:b w:val="0"/>`, `b="1"`).
pub fn toggle(element: &BytesStart<'_>) -> bool {
    match attr(element, b"val") {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "none"),
        None => true,
    }
}

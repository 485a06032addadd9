//! Parse Custom Object metadata XML into an element tree and render it back.

mod tree;

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::trace;

pub use tree::{Document, Element, Node};

/// Name of the root element every document must carry.
pub const ROOT_ELEMENT: &str = "CustomObject";
/// Namespace declared on the root of Salesforce metadata files.
pub const METADATA_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";
/// Header line written in front of every serialized document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const INDENT: &str = "    ";

#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not well-formed XML.
    #[error("xml: {0}")]
    Xml(String),
    /// The document root is not a `CustomObject` element.
    #[error("unexpected root element: {0}")]
    Root(String),
    /// A recognised construct does not have the required shape.
    #[error("invalid shape: {0}")]
    Shape(String),
}

/// Parse XML text into a [`Document`].
///
/// Attributes are stored apart from child nodes. Comments and CDATA sections
/// inside the root survive; the prolog (declaration, doctype, processing
/// instructions and comments outside the root) is discarded.
pub fn parse_document(text: &str) -> Result<Document, ParseError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut elements = 0usize;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|err| ParseError::Xml(format!("{err} at byte {position}")))?;
        match event {
            Event::Start(e) => {
                ensure_single_root(&root, position)?;
                stack.push(start_element(&e)?);
                elements += 1;
            }
            Event::Empty(e) => {
                ensure_single_root(&root, position)?;
                let element = start_element(&e)?;
                elements += 1;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(e) => {
                let mut element = stack.pop().ok_or_else(|| {
                    ParseError::Xml(format!(
                        "unmatched closing tag </{}> at byte {position}",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                element.normalize_whitespace();
                close_element(element, &mut stack, &mut root);
            }
            Event::Text(e) => {
                let value = e
                    .unescape()
                    .map_err(|err| ParseError::Xml(format!("{err} at byte {position}")))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(value.into_owned())),
                    None if value.trim().is_empty() => {}
                    None => {
                        return Err(ParseError::Xml(format!(
                            "text outside the root element at byte {position}"
                        )))
                    }
                }
            }
            Event::CData(e) => {
                let value = utf8(&e, position)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(value.to_string())),
                    None => {
                        return Err(ParseError::Xml(format!(
                            "CDATA outside the root element at byte {position}"
                        )))
                    }
                }
            }
            Event::Comment(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Comment(utf8(&e, position)?.to_string()));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Xml(format!(
            "unexpected end of input: <{}> is not closed",
            open.name
        )));
    }
    let root = root.ok_or_else(|| ParseError::Xml("document has no root element".into()))?;
    if root.name != ROOT_ELEMENT {
        return Err(ParseError::Root(root.name));
    }
    trace!(elements, "parsed custom object document");
    Ok(Document { root })
}

/// Render a [`Document`] as XML text.
///
/// The output starts with [`XML_DECLARATION`] on its own line, indents each
/// nesting level by four spaces and ends with a newline.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    write_element(&mut out, &doc.root, 0);
    out
}

impl Document {
    /// See [`parse_document`].
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_document(text)
    }

    /// See [`serialize_document`].
    pub fn to_xml_string(&self) -> String {
        serialize_document(self)
    }
}

fn ensure_single_root(root: &Option<Element>, position: usize) -> Result<(), ParseError> {
    if root.is_some() {
        return Err(ParseError::Xml(format!(
            "second root element at byte {position}"
        )));
    }
    Ok(())
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn start_element(event: &BytesStart<'_>) -> Result<Element, ParseError> {
    let name = std::str::from_utf8(event.name().as_ref())
        .map_err(|err| ParseError::Xml(format!("invalid UTF-8 in tag name: {err}")))?
        .to_string();
    let mut element = Element::new(name);
    for attr in event.attributes() {
        let attr = attr.map_err(|err| ParseError::Xml(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| ParseError::Xml(format!("invalid UTF-8 in attribute name: {err}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::Xml(err.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn utf8(bytes: &[u8], position: usize) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes)
        .map_err(|err| ParseError::Xml(format!("invalid UTF-8 at byte {position}: {err}")))
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    write_indent(out, depth);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        // Writing into a String cannot fail.
        let _ = write!(out, " {key}=\"{}\"", escape(value));
    }

    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push('>');

    if element.has_structure() {
        out.push('\n');
        for child in &element.children {
            match child {
                Node::Element(nested) => write_element(out, nested, depth + 1),
                Node::Text(text) => {
                    write_indent(out, depth + 1);
                    out.push_str(&escape(text));
                    out.push('\n');
                }
                Node::CData(text) => {
                    write_indent(out, depth + 1);
                    write_cdata(out, text);
                    out.push('\n');
                }
                Node::Comment(text) => {
                    write_indent(out, depth + 1);
                    let _ = write!(out, "<!--{text}-->");
                    out.push('\n');
                }
            }
        }
        write_indent(out, depth);
    } else {
        for child in &element.children {
            match child {
                Node::Text(text) => out.push_str(&escape(text)),
                Node::CData(text) => write_cdata(out, text),
                Node::Element(_) | Node::Comment(_) => {}
            }
        }
    }

    let _ = writeln!(out, "</{}>", element.name);
}

fn write_cdata(out: &mut String, text: &str) {
    out.push_str("<![CDATA[");
    out.push_str(text);
    out.push_str("]]>");
}

fn write_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">
    <fields>
        <fullName>City__c</fullName>
        <label>City &amp; Town</label>
        <type>Picklist</type>
        <valueSet>
            <controllingField>Country__c</controllingField>
            <valueSettings>
                <controllingFieldValue>DE</controllingFieldValue>
                <valueName>Berlin</valueName>
            </valueSettings>
        </valueSet>
    </fields>
    <!-- trailing note -->
    <label>Address</label>
    <description/>
</CustomObject>
"#;

    #[test]
    fn parse_keeps_attributes_apart_from_children() {
        let doc = parse_document(FIXTURE).expect("parse");
        assert_eq!(doc.root.name, ROOT_ELEMENT);
        assert_eq!(doc.root.attribute("xmlns"), Some(METADATA_NAMESPACE));
        assert!(doc.root.child("xmlns").is_none());

        let field = doc.root.child("fields").expect("fields element");
        assert_eq!(field.child_text("label").as_deref(), Some("City & Town"));
        let value_set = field.child("valueSet").expect("valueSet");
        assert_eq!(value_set.children_named("valueSettings").count(), 1);
        assert!(matches!(doc.root.children[1], Node::Comment(_)));
    }

    #[test]
    fn serialize_reproduces_canonical_layout() {
        let doc = parse_document(FIXTURE).expect("parse");
        let text = serialize_document(&doc);
        assert_eq!(text, FIXTURE);
    }

    #[test]
    fn round_trip_is_content_equal() {
        let compact = concat!(
            r#"<CustomObject xmlns="http://soap.sforce.com/2006/04/metadata">"#,
            "<fields><fullName>A</fullName><inlineHelpText><![CDATA[1 < 2]]></inlineHelpText>",
            "<label> padded </label></fields><enableHistory>true</enableHistory></CustomObject>"
        );
        let first = parse_document(compact).expect("first parse");
        let rendered = serialize_document(&first);
        assert!(rendered.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CustomObject"));
        assert!(rendered.contains("\n        <fullName>A</fullName>\n"));
        let second = parse_document(&rendered).expect("second parse");
        assert_eq!(first, second);
    }

    #[test]
    fn escapes_attribute_and_text_values() {
        let xml = r#"<CustomObject note="a &quot;b&quot; &lt;c&gt;"><label>x &lt; y</label></CustomObject>"#;
        let doc = parse_document(xml).expect("parse");
        assert_eq!(doc.root.attribute("note"), Some(r#"a "b" <c>"#));
        let rendered = serialize_document(&doc);
        assert!(rendered.contains(r#"note="a &quot;b&quot; &lt;c&gt;""#));
        assert!(rendered.contains("<label>x &lt; y</label>"));
        assert_eq!(parse_document(&rendered).expect("reparse"), doc);
    }

    #[test]
    fn rejects_unclosed_element() {
        let err = parse_document("<CustomObject><fields><type>Picklist</type></CustomObject>")
            .expect_err("mismatched end tag");
        assert!(matches!(err, ParseError::Xml(_)));

        let err = parse_document("<CustomObject><fields>").expect_err("unclosed");
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn rejects_foreign_root_and_empty_input() {
        let err = parse_document("<Layout/>").expect_err("foreign root");
        assert!(matches!(err, ParseError::Root(name) if name == "Layout"));

        let err = parse_document("   ").expect_err("no root");
        assert!(matches!(err, ParseError::Xml(_)));

        let err = parse_document("<CustomObject/><CustomObject/>").expect_err("two roots");
        assert!(matches!(err, ParseError::Xml(_)));
    }
}

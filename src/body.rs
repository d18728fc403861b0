//! Response body decoding.
//!
//! Alma does not reliably label what it sends back, so the representation is
//! sniffed from the first non-whitespace character of the body rather than from
//! the `Content-Type` header.

use crate::error::API_CLIENT_ERROR_CODE;
use crate::{Error, Result};
use xml::reader::{EventReader, XmlEvent};
use xmltree::{Element, XMLNode};

/// Deepest element nesting accepted in an XML body.
pub const MAX_XML_DEPTH: usize = 256;

/// What a response body looks like, judged by its first non-whitespace character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Starts with `<`.
    Xml,
    /// Starts with `{`.
    Json,
    /// Empty or whitespace only.
    Blank,
    /// Anything else.
    Unsupported,
}

/// Classifies a body by its first non-whitespace character.
///
/// # Examples
///
/// ```
/// use alma_api::body::{sniff, BodyKind};
///
/// assert_eq!(sniff("  <user/>"), BodyKind::Xml);
/// assert_eq!(sniff("{\"a\":1}"), BodyKind::Json);
/// assert_eq!(sniff(" \n"), BodyKind::Blank);
/// assert_eq!(sniff("OK"), BodyKind::Unsupported);
/// ```
pub fn sniff(body: &str) -> BodyKind {
    match body.trim_start().chars().next() {
        None => BodyKind::Blank,
        Some('<') => BodyKind::Xml,
        Some('{') => BodyKind::Json,
        Some(_) => BodyKind::Unsupported,
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A JSON document.
    Json(serde_json::Value),
    /// An XML document.
    Xml(XmlDocument),
}

impl Body {
    /// Returns the JSON value, if this is a JSON body.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Xml(_) => None,
        }
    }

    /// Returns the XML document, if this is an XML body.
    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Body::Xml(document) => Some(document),
            Body::Json(_) => None,
        }
    }

    /// Consumes the body and returns the JSON value, if any.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Xml(_) => None,
        }
    }
}

/// Parses a successful response body.
///
/// Returns `Ok(None)` for a blank body.
///
/// # Errors
///
/// Returns a generic error with code `API_CLIENT_ERROR` when the body is neither
/// XML nor JSON, or when it looks like one of them but fails to decode.
pub fn parse_body(body: &str) -> Result<Option<Body>> {
    match sniff(body) {
        BodyKind::Blank => Ok(None),
        BodyKind::Xml => XmlDocument::parse(body)
            .map(|doc| Some(Body::Xml(doc)))
            .map_err(|e| client_error(format!("Malformed XML in response from API: {}", e))),
        BodyKind::Json => serde_json::from_str(body)
            .map(|value| Some(Body::Json(value)))
            .map_err(|e| client_error(format!("Malformed JSON in response from API: {}", e))),
        BodyKind::Unsupported => Err(client_error(
            "Unsupported content type in response from API.".to_string(),
        )),
    }
}

fn client_error(message: String) -> Error {
    Error::generic(Some(&message), Some(API_CLIENT_ERROR_CODE))
}

/// An owned XML document tree.
///
/// Element lookups match on the local name, so `errorCode` finds both
/// `<errorCode>` and `<ns:errorCode>`.
///
/// # Examples
///
/// ```
/// use alma_api::body::XmlDocument;
///
/// let doc = XmlDocument::parse("<user><primary_id>jdoe</primary_id></user>").unwrap();
/// assert_eq!(doc.root().name, "user");
/// assert_eq!(doc.text("primary_id").as_deref(), Some("jdoe"));
/// assert_eq!(doc.text_at("primary_id").as_deref(), Some("jdoe"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: Element,
}

/// Why an XML body could not be turned into an [`XmlDocument`].
#[derive(thiserror::Error, Debug)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("{0}")]
    Malformed(#[from] xml::reader::Error),

    /// The tree could not be built.
    #[error("{0}")]
    Tree(#[from] xmltree::ParseError),

    /// Elements are nested deeper than [`MAX_XML_DEPTH`].
    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),
}

impl XmlDocument {
    /// Parses an XML document. Leading whitespace before the declaration is ignored.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and on documents nested deeper than
    /// [`MAX_XML_DEPTH`]; the tree is built and walked recursively.
    pub fn parse(xml: &str) -> std::result::Result<Self, XmlError> {
        let xml = xml.trim_start();
        check_depth(xml, MAX_XML_DEPTH)?;
        let root = Element::parse(xml.as_bytes())?;
        Ok(Self { root })
    }

    /// The document element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Returns the first element named `name` in document order, including the root.
    pub fn find(&self, name: &str) -> Option<&Element> {
        find_descendant(&self.root, name)
    }

    /// Returns every element named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_descendants(&self.root, name, &mut found);
        found
    }

    /// Returns the element at a `/`-separated path of child names below the root.
    ///
    /// An empty path returns the root itself.
    pub fn at_path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.root, |element, segment| child(element, segment))
    }

    /// Returns the text content of the first element named `name`.
    pub fn text(&self, name: &str) -> Option<String> {
        self.find(name).map(text_content)
    }

    /// Returns the text content of the element at `path`.
    pub fn text_at(&self, path: &str) -> Option<String> {
        self.at_path(path).map(text_content)
    }

    /// Trimmed text of the first element named `name`; `None` when missing or blank.
    pub(crate) fn trimmed_text(&self, name: &str) -> Option<String> {
        let text = self.text(name)?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Streams through `xml` without building a tree and fails once nesting exceeds `limit`.
fn check_depth(xml: &str, limit: usize) -> std::result::Result<(), XmlError> {
    let mut depth = 0usize;
    for event in EventReader::new(xml.as_bytes()) {
        match event? {
            XmlEvent::StartElement { .. } => {
                depth += 1;
                if depth > limit {
                    return Err(XmlError::TooDeep(limit));
                }
            }
            XmlEvent::EndElement { .. } => depth = depth.saturating_sub(1),
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }
    Ok(())
}

fn child<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) if child.name == name => Some(child),
        _ => None,
    })
}

fn find_descendant<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    if element.name == name {
        return Some(element);
    }
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) => find_descendant(child, name),
        _ => None,
    })
}

fn collect_descendants<'a>(element: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    if element.name == name {
        found.push(element);
    }
    for node in &element.children {
        if let XMLNode::Element(child) = node {
            collect_descendants(child, name, found);
        }
    }
}

/// Concatenated text of an element and all of its descendants.
pub fn text_content(element: &Element) -> String {
    let mut text = String::new();
    push_text(element, &mut text);
    text
}

fn push_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            XMLNode::Text(text) | XMLNode::CData(text) => out.push_str(text),
            XMLNode::Element(child) => push_text(child, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sniff() {
        assert_eq!(sniff("<foo>bar</foo>"), BodyKind::Xml);
        assert_eq!(sniff("\n  <?xml version=\"1.0\"?><foo/>"), BodyKind::Xml);
        assert_eq!(sniff("{\"foo\":\"bar\"}"), BodyKind::Json);
        assert_eq!(sniff("   "), BodyKind::Blank);
        assert_eq!(sniff(""), BodyKind::Blank);
        assert_eq!(sniff("[1, 2]"), BodyKind::Unsupported);
        assert_eq!(sniff("unsupported"), BodyKind::Unsupported);
    }

    #[test]
    fn test_parse_body_with_json() {
        let body = parse_body("{\"foo\":\"bar\"}").unwrap().unwrap();
        assert_eq!(body.as_json(), Some(&json!({"foo": "bar"})));
        assert!(body.as_xml().is_none());
    }

    #[test]
    fn test_parse_body_with_xml() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<foo>\n  <bar>baz</bar>\n</foo>\n";
        let body = parse_body(xml).unwrap().unwrap();
        let doc = body.as_xml().unwrap();

        assert_eq!(doc.root().name, "foo");
        assert_eq!(doc.text("bar").as_deref(), Some("baz"));
    }

    #[test]
    fn test_parse_body_blank() {
        assert!(parse_body("").unwrap().is_none());
        assert!(parse_body(" \r\n ").unwrap().is_none());
    }

    #[test]
    fn test_parse_body_with_unsupported_content_type() {
        let err = parse_body("unsupported").unwrap_err();
        assert_eq!(err.code(), "API_CLIENT_ERROR");
        assert_eq!(err.message(), "Unsupported content type in response from API.");
    }

    #[test]
    fn test_parse_body_malformed_json() {
        let err = parse_body("{\"foo\":").unwrap_err();
        assert_eq!(err.code(), "API_CLIENT_ERROR");
    }

    #[test]
    fn test_xml_queries() {
        let doc = XmlDocument::parse(
            r#"<user xmlns="http://com/exlibris/urm/general/xmlbeans">
                 <primary_id>jdoe</primary_id>
                 <contact_info>
                   <emails>
                     <email><email_address>a@example.org</email_address></email>
                     <email><email_address>b@example.org</email_address></email>
                   </emails>
                 </contact_info>
               </user>"#,
        )
        .unwrap();

        assert_eq!(doc.find("user").map(|e| e.name.as_str()), Some("user"));
        assert_eq!(doc.find_all("email_address").len(), 2);
        assert_eq!(
            doc.text_at("contact_info/emails/email/email_address")
                .as_deref(),
            Some("a@example.org")
        );
        assert!(doc.at_path("contact_info/phones").is_none());
        assert_eq!(doc.at_path("").map(|e| e.name.as_str()), Some("user"));
    }

    fn nested(depth: usize, inner: &str) -> String {
        format!("{}{}{}", "<a>".repeat(depth), inner, "</a>".repeat(depth))
    }

    #[test]
    fn test_deeply_nested_xml_is_rejected() {
        let err = XmlDocument::parse(&nested(10_000, "")).unwrap_err();
        assert!(matches!(err, XmlError::TooDeep(MAX_XML_DEPTH)));

        let err = parse_body(&nested(10_000, "<bar>baz</bar>")).unwrap_err();
        assert_eq!(err.code(), "API_CLIENT_ERROR");
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() {
        let doc = XmlDocument::parse(&nested(MAX_XML_DEPTH - 1, "<bar>baz</bar>")).unwrap();
        assert_eq!(doc.text("bar").as_deref(), Some("baz"));

        assert!(XmlDocument::parse(&nested(MAX_XML_DEPTH + 1, "")).is_err());
    }

    #[test]
    fn test_text_content_is_recursive() {
        let doc = XmlDocument::parse("<a>one<b>two</b><![CDATA[three]]></a>").unwrap();
        assert_eq!(text_content(doc.root()), "onetwothree");
    }
}

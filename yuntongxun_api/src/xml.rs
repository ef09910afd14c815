//! Minimal XML element tree used for request documents and XML responses.
//!
//! Attributes, comments and processing instructions are dropped on parse: the
//! platform's XML payloads carry everything in element text.

use std::io::{Cursor, Write};
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::value::{AttrMap, Value};
use crate::Error;

/// An XML element: tag name, direct text content, and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// An element holding only text, e.g. `<to>13800000000</to>`.
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(tag).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Whitespace-trimmed text of the first child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).map(|c| c.text.trim())
    }

    /// Parses a complete XML document and returns its root element.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(Element::new(tag_name(&start)?)),
                Ok(Event::Empty(start)) => {
                    attach(&mut stack, &mut root, Element::new(tag_name(&start)?))?
                }
                Ok(Event::End(_)) => {
                    let done = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, done)?;
                }
                // Only text before the first child element counts as an element's text.
                Ok(Event::Text(text)) => {
                    if let Some(current) = stack.last_mut().filter(|e| e.children.is_empty()) {
                        let text = text.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut().filter(|e| e.children.is_empty()) {
                        let text = std::str::from_utf8(&data)
                            .map_err(|e| Error::Xml(format!("CDATA is not UTF-8: {}", e)))?;
                        current.text.push_str(text);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Xml(e.to_string())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Xml(format!("unclosed element <{}>", open.tag)));
        }
        root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// Serializes the tree as a UTF-8 document with an XML declaration.
    pub fn to_document_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_document(&mut writer)
            .map_err(|e| Error::InvalidRequest(format!("failed to serialize XML body: {}", e)))?;
        Ok(writer.into_inner().into_inner())
    }

    fn write_document<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), quick_xml::Error> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_to(writer)
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), quick_xml::Error> {
        if self.text.is_empty() && self.children.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(self.tag.as_str())))?;
            return Ok(());
        }
        writer.write_event(Event::Start(BytesStart::new(self.tag.as_str())))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.tag.as_str())))?;
        Ok(())
    }
}

impl FromStr for Element {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn tag_name(start: &BytesStart<'_>) -> Result<String, Error> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("tag name is not UTF-8: {}", e)))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), Error> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(Error::Xml(format!(
            "second root element <{}>",
            element.tag
        )));
    } else {
        *root = Some(element);
    }
    Ok(())
}

/// Converts an element into `(tag, value)`.
///
/// An element with non-blank text becomes a string. Otherwise its children become
/// a map keyed by each child's own tag; a tag seen more than once among siblings
/// turns into a list in document order.
pub fn flatten(element: &Element) -> (String, Value) {
    let text = element.text.trim();
    if !text.is_empty() {
        return (element.tag.clone(), Value::String(text.to_string()));
    }

    let mut map = AttrMap::new();
    for child in &element.children {
        let (_, value) = flatten(child);
        match map.get_mut(&child.tag) {
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::List(vec![first, value]);
            }
            None => {
                map.insert(child.tag.clone(), value);
            }
        }
    }
    (element.tag.clone(), Value::Map(map))
}

//! Minimal owned XML tree used to read and rebuild report documents.
//!
//! Declarations, comments, processing instructions and doctypes are dropped.
//! Whitespace-only text is dropped; any other text is kept verbatim.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// An element with its attributes (in document order), text and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute value in place, or append it.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }
}

/// Parse a document and return its root element.
pub fn parse_document(content: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(format!("at byte {}: {}", reader.buffer_position(), e)),
        };
        match event {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "closing tag without matching opening tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data).map_err(|e| e.to_string())?;
                push_text(&mut stack, text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("element <{}> is never closed", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| e.to_string())?
            .to_string();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(current) => {
            current.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside of the root element".to_string()),
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    mut element: XmlElement,
) -> Result<(), String> {
    if element.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        element.text = None;
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(format!("second root element <{}>", element.name)),
    }
    Ok(())
}

/// Serialize a tree as an indented document with an XML declaration.
pub fn to_pretty_string(root: &XmlElement) -> Result<String, String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| e.to_string())?;
    write_element(&mut writer, root)?;

    let mut out = String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())?;
    out.push('\n');
    Ok(out)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), String> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if element.children.is_empty() && text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| e.to_string());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| e.to_string())?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| e.to_string())?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| e.to_string())
}

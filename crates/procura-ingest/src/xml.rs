//! Minimal element tree over `quick-xml` events.
//!
//! Both dialects are small documents, so they are read fully into an
//! [`Element`] tree first and then mapped to a `RawTree` by dialect rules.

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::DecodeError;

#[derive(Debug, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Concatenated, trimmed character data directly under this element.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a whole document and return its root element.
pub(crate) fn parse(text: &str) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_str(text);
    // Entity references split text events; trimming happens once per element.
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(open_element(e)?),
            Event::Empty(ref e) => {
                let element = open_element(e)?;
                close_element(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                if let Some(mut element) = stack.pop() {
                    element.text = element.text.trim().to_string();
                    close_element(element, &mut stack, &mut root);
                }
            }
            Event::Text(ref e) => {
                if let Some(top) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    top.text.push_str(&unescape(&raw)?);
                }
            }
            Event::CData(ref e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(top) = stack.last_mut() {
                    let name = String::from_utf8_lossy(e.as_ref());
                    push_reference(&mut top.text, &name);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(DecodeError::UnclosedElement(open.name));
    }
    root.ok_or(DecodeError::NoRoot)
}

fn open_element(e: &BytesStart<'_>) -> Result<Element, DecodeError> {
    let mut element = Element {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        element.attrs.push((key, unescape(&raw)?.into_owned()));
    }
    Ok(element)
}

fn close_element(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Append the expansion of `&name;`. Unknown entities are kept verbatim.
fn push_reference(out: &mut String, name: &str) {
    if let Some(c) = name.strip_prefix('#').and_then(char_reference) {
        out.push(c);
    } else if let Some(expanded) = resolve_predefined_entity(name) {
        out.push_str(expanded);
    } else {
        out.push('&');
        out.push_str(name);
        out.push(';');
    }
}

fn char_reference(body: &str) -> Option<char> {
    let code = match body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => body.parse().ok()?,
    };
    char::from_u32(code)
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV/CardDAV processing.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, Event};
use quick_xml::{Reader, Writer};

use crate::error::DavError;

/// XML namespaces used in `WebDAV` requests.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// Apple calendar server extensions (`getctag`).
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
}

/// A namespace binding emitted on request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    /// `DAV:`, always bound.
    Dav,
    /// `urn:ietf:params:xml:ns:caldav`.
    CalDav,
    /// `urn:ietf:params:xml:ns:carddav`.
    CardDav,
    /// `http://calendarserver.org/ns/`.
    CalendarServer,
}

impl Namespace {
    /// The namespace URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Dav => ns::DAV,
            Self::CalDav => ns::CALDAV,
            Self::CardDav => ns::CARDDAV,
            Self::CalendarServer => ns::CALENDARSERVER,
        }
    }

    /// The prefix this crate binds the namespace to.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Dav => "d",
            Self::CalDav => "c",
            Self::CardDav => "card",
            Self::CalendarServer => "cs",
        }
    }

    /// Qualifies a local name with this namespace's prefix.
    pub(crate) fn qualify(self, local: &str) -> String {
        format!("{}:{local}", self.prefix())
    }
}

/// Creates an indented writer with the XML declaration already written.
pub(crate) fn new_writer() -> Result<Writer<Cursor<Vec<u8>>>, DavError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

/// Finishes a request body. Some servers reject bodies without a trailing CRLF.
pub(crate) fn finish(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, DavError> {
    let bytes = writer.into_inner().into_inner();
    let mut body =
        String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))?;
    body.push_str("\r\n");
    Ok(body)
}

/// A namespace-free element tree.
///
/// Names are local names only: servers disagree on prefixes, so matching
/// must never depend on them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// The first child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parses a document into an [`Element`] tree and returns its root.
///
/// # Errors
///
/// Returns [`DavError::Xml`] if the document is not well-formed.
pub(crate) fn parse_document(xml: &str) -> Result<Element, DavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let mut element = Element::new(local_name(e.local_name().as_ref())?);
                element.attrs = read_attributes(e)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let mut element = Element::new(local_name(e.local_name().as_ref())?);
                element.attrs = read_attributes(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DavError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.decode()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(current) = stack.last_mut() {
                    if let Some(ch) = e.resolve_char_ref()? {
                        current.text.push(ch);
                    } else {
                        let name = e.decode()?;
                        let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                            .ok_or_else(|| DavError::Xml(format!("unknown entity &{name};")))?;
                        current.text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DavError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| DavError::Xml("document has no root element".to_string()))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DavError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DavError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

fn local_name(bytes: &[u8]) -> Result<String, DavError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}

fn read_attributes(
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<Vec<(String, String)>, DavError> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let raw_key = attr.key.as_ref();
        if raw_key == b"xmlns" || raw_key.starts_with(b"xmlns:") {
            continue;
        }
        let key = local_name(attr.key.local_name().as_ref())?;
        let value = local_name(&attr.value)?;
        attrs.push((key, value));
    }
    Ok(attrs)
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Multistatus response parsing.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::error::DavError;
use crate::types::Href;
use crate::xml::{Element, parse_document};

/// A property value of unknown shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// Leaf text, trimmed of whitespace and surrounding quotes.
    ///
    /// Object payloads such as `calendar-data` are kept verbatim.
    Scalar(String),
    /// Repeated keys at the same nesting level.
    List(Vec<PropValue>),
    /// Child elements and attributes.
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    /// The text of a scalar value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The entries of a map value.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, PropValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Iterates a value that may be either a single item or a list.
    pub fn items(&self) -> impl Iterator<Item = &PropValue> {
        let items: Vec<&PropValue> = match self {
            Self::List(list) => list.iter().collect(),
            other => vec![other],
        };
        items.into_iter()
    }

    /// Whether this map has `key` as a child element or attribute.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.as_map().is_some_and(|m| m.contains_key(key))
    }

    /// Whether any item under `child` carries `attr == value`.
    ///
    /// Matches both `<comp name="VEVENT"/>` alone and a list of `<comp>` elements.
    #[must_use]
    pub fn contains_attr(&self, child: &str, attr: &str, value: &str) -> bool {
        let Some(entry) = self.as_map().and_then(|m| m.get(child)) else {
            return false;
        };
        entry.items().any(|item| {
            item.as_map()
                .and_then(|m| m.get(attr))
                .and_then(PropValue::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
        })
    }

    fn from_element(element: &Element) -> Self {
        if element.children.is_empty() && element.attrs.is_empty() {
            return match VERBATIM_PROPS.contains(&element.name.as_str()) {
                true => Self::Scalar(element.text.clone()),
                false => Self::Scalar(clean_text(&element.text)),
            };
        }

        let mut map = BTreeMap::new();
        for (key, value) in &element.attrs {
            insert_coalesced(&mut map, key.clone(), Self::Scalar(value.clone()));
        }
        for child in &element.children {
            insert_coalesced(&mut map, child.name.clone(), Self::from_element(child));
        }
        Self::Map(map)
    }
}

/// Properties of one resource, keyed by local element name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropMap(BTreeMap<String, PropValue>);

impl PropMap {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw value of a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    /// Whether a property is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The text of a scalar property.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// The text of a scalar property, ignoring empty values.
    #[must_use]
    pub fn non_empty_text(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|s| !s.is_empty())
    }

    /// The `<href>` children of a property such as `calendar-home-set`.
    #[must_use]
    pub fn hrefs(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .and_then(PropValue::as_map)
            .and_then(|m| m.get("href"))
            .map(|v| {
                v.items()
                    .filter_map(PropValue::as_str)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a property such as `resourcetype` has a child with the given name.
    #[must_use]
    pub fn has_child(&self, name: &str, child: &str) -> bool {
        self.get(name).is_some_and(|v| v.has_key(child))
    }

    /// Property names, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no property is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, name: String, value: PropValue) {
        insert_coalesced(&mut self.0, name, value);
    }
}

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    /// The response items, in document order.
    pub responses: Vec<ResponseItem>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    /// The href the response describes.
    pub href: Href,
    /// Status code of the response element, or of its first propstat.
    pub status: Option<String>,
    /// Properties reported with status 200.
    pub props: PropMap,
}

impl MultiStatusResponse {
    /// Parses a multistatus response from XML.
    ///
    /// Only properties inside a `200` propstat are kept; others are dropped
    /// per href, so a response can succeed partially.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Xml`] if the body is not well-formed and
    /// [`DavError::InvalidResponse`] if the root is not `multistatus`.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let root = parse_document(xml)?;
        if root.name != "multistatus" {
            return Err(DavError::InvalidResponse(format!(
                "expected multistatus, found <{}>",
                root.name
            )));
        }

        let mut responses = Vec::new();
        for response in root.children_named("response") {
            let Some(href) = response.child("href").map(|h| h.text.trim().to_string()) else {
                tracing::warn!("skipping multistatus response without href");
                continue;
            };

            let mut status = response
                .child("status")
                .and_then(|s| parse_http_status_line(&s.text))
                .map(str::to_string);

            let mut props = PropMap::new();
            for propstat in response.children_named("propstat") {
                let code = propstat
                    .child("status")
                    .and_then(|s| parse_http_status_line(&s.text));
                if status.is_none() {
                    status = code.map(str::to_string);
                }
                if code != Some("200") {
                    tracing::debug!(%href, ?code, "dropping propstat with non-200 status");
                    continue;
                }
                if let Some(prop) = propstat.child("prop") {
                    for child in &prop.children {
                        props.insert(child.name.clone(), PropValue::from_element(child));
                    }
                }
            }

            responses.push(ResponseItem {
                href: Href::new(href),
                status,
                props,
            });
        }

        Ok(Self { responses })
    }

    /// Converts the response into a `href -> properties` map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<Href, PropMap> {
        self.responses
            .into_iter()
            .map(|r| (r.href, r.props))
            .collect()
    }
}

/// Extracts the numeric code from a status line such as `HTTP/1.1 200 OK`.
#[must_use]
pub fn parse_http_status_line(line: &str) -> Option<&str> {
    line.split_whitespace()
        .nth(1)
        .filter(|code| code.len() == 3 && code.bytes().all(|b| b.is_ascii_digit()))
}

/// Properties whose text is an object payload.
const VERBATIM_PROPS: [&str; 2] = ["calendar-data", "address-data"];

fn clean_text(text: &str) -> String {
    text.trim().trim_matches('"').to_string()
}

fn insert_coalesced(map: &mut BTreeMap<String, PropValue>, key: String, value: PropValue) {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            PropValue::List(list) => list.push(value),
            existing => {
                let first = std::mem::replace(existing, PropValue::List(Vec::new()));
                *existing = PropValue::List(vec![first, value]);
            }
        },
    }
}

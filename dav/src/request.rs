// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for PROPFIND and REPORT bodies.

use std::collections::BTreeSet;
use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::DavError;
use crate::types::Href;
use crate::xml::{self, Namespace};

/// Properties that can be requested in PROPFIND and REPORT bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Last modification date.
    GetLastModified,
    /// Collection tag (calendar server extension).
    GetCTag,
    /// Sync token (RFC 6578).
    SyncToken,
    /// Current user principal.
    CurrentUserPrincipal,
    /// Calendar home set.
    CalendarHomeSet,
    /// Address book home set.
    AddressbookHomeSet,
    /// Supported calendar components.
    SupportedCalendarComponentSet,
    /// Calendar data.
    CalendarData,
    /// Address data.
    AddressData,
    /// Calendar description.
    CalendarDescription,
    /// Address book description.
    AddressbookDescription,
}

impl Prop {
    /// The local element name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetLastModified => "getlastmodified",
            Self::GetCTag => "getctag",
            Self::SyncToken => "sync-token",
            Self::CurrentUserPrincipal => "current-user-principal",
            Self::CalendarHomeSet => "calendar-home-set",
            Self::AddressbookHomeSet => "addressbook-home-set",
            Self::SupportedCalendarComponentSet => "supported-calendar-component-set",
            Self::CalendarData => "calendar-data",
            Self::AddressData => "address-data",
            Self::CalendarDescription => "calendar-description",
            Self::AddressbookDescription => "addressbook-description",
        }
    }

    /// The namespace the element belongs to.
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::DisplayName
            | Self::ResourceType
            | Self::GetETag
            | Self::GetLastModified
            | Self::SyncToken
            | Self::CurrentUserPrincipal => Namespace::Dav,
            Self::GetCTag => Namespace::CalendarServer,
            Self::CalendarHomeSet
            | Self::SupportedCalendarComponentSet
            | Self::CalendarData
            | Self::CalendarDescription => Namespace::CalDav,
            Self::AddressbookHomeSet | Self::AddressData | Self::AddressbookDescription => {
                Namespace::CardDav
            }
        }
    }
}

/// PROPFIND request builder.
#[derive(Debug, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
    namespaces: BTreeSet<Namespace>,
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a PROPFIND request for the given properties.
    #[must_use]
    pub fn with_props(props: &[Prop]) -> Self {
        let mut request = Self::new();
        for prop in props {
            request.add_property(*prop);
        }
        request
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Binds an extra namespace on the envelope even if no property uses it.
    pub fn add_namespace(&mut self, namespace: Namespace) -> &mut Self {
        self.namespaces.insert(namespace);
        self
    }

    /// The requested properties.
    #[must_use]
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = xml::new_writer()?;

        // <d:propfind xmlns:d="DAV:" ...>
        let mut propfind = BytesStart::new("d:propfind");
        for namespace in bindings(&self.props, &self.namespaces, Namespace::Dav) {
            push_binding(&mut propfind, namespace);
        }
        writer.write_event(Event::Start(propfind))?;

        write_props(&mut writer, &self.props)?;

        writer.write_event(Event::End(BytesEnd::new("d:propfind")))?;
        xml::finish(writer)
    }
}

/// The REPORT variants used for collection queries and multigets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// `calendar-query` (RFC 4791 §7.8).
    CalendarQuery,
    /// `calendar-multiget` (RFC 4791 §7.9).
    CalendarMultiget,
    /// `addressbook-query` (RFC 6352 §8.6).
    AddressbookQuery,
    /// `addressbook-multiget` (RFC 6352 §8.7).
    AddressbookMultiget,
}

impl ReportKind {
    /// The local name of the report element.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CalendarQuery => "calendar-query",
            Self::CalendarMultiget => "calendar-multiget",
            Self::AddressbookQuery => "addressbook-query",
            Self::AddressbookMultiget => "addressbook-multiget",
        }
    }

    /// The namespace of the report element and its filters.
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::CalendarQuery | Self::CalendarMultiget => Namespace::CalDav,
            Self::AddressbookQuery | Self::AddressbookMultiget => Namespace::CardDav,
        }
    }
}

/// A name-attributed filter element, e.g. `<c:comp-filter name="VEVENT"/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    element: String,
    name: String,
    children: Vec<Filter>,
}

impl Filter {
    /// Creates a filter element with the given local name and `name` attribute.
    #[must_use]
    pub fn new(element: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Shorthand for a `comp-filter`.
    #[must_use]
    pub fn comp(name: impl Into<String>) -> Self {
        Self::new("comp-filter", name)
    }

    /// Nests a filter inside this one.
    #[must_use]
    pub fn with(mut self, child: Filter) -> Self {
        self.children.push(child);
        self
    }

    fn write(&self, writer: &mut Writer<Cursor<Vec<u8>>>, ns: Namespace) -> Result<(), DavError> {
        let tag = ns.qualify(&self.element);
        let mut start = BytesStart::new(tag.as_str());
        start.push_attribute(("name", self.name.as_str()));
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for child in &self.children {
                child.write(writer, ns)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        Ok(())
    }
}

/// REPORT request builder.
#[derive(Debug)]
pub struct ReportRequest {
    kind: ReportKind,
    props: Vec<Prop>,
    namespaces: BTreeSet<Namespace>,
    filters: Vec<Filter>,
    hrefs: Vec<Href>,
}

impl ReportRequest {
    /// Creates a new REPORT request of the given kind.
    #[must_use]
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            props: Vec::new(),
            namespaces: BTreeSet::new(),
            filters: Vec::new(),
            hrefs: Vec::new(),
        }
    }

    /// The report kind.
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Adds a property to the `<prop>` block.
    #[must_use]
    pub fn prop(mut self, prop: Prop) -> Self {
        self.props.push(prop);
        self
    }

    /// Binds an extra namespace on the envelope.
    #[must_use]
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.insert(namespace);
        self
    }

    /// Adds a top-level filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an explicit href, used by multiget reports.
    pub fn add_href(&mut self, href: Href) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the REPORT request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let ns = self.kind.namespace();
        let mut writer = xml::new_writer()?;

        // <c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
        let root = ns.qualify(self.kind.name());
        let mut report = BytesStart::new(root.as_str());
        for namespace in bindings(&self.props, &self.namespaces, ns) {
            push_binding(&mut report, namespace);
        }
        writer.write_event(Event::Start(report))?;

        write_props(&mut writer, &self.props)?;

        if !self.filters.is_empty() {
            let tag = ns.qualify("filter");
            writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
            for filter in &self.filters {
                filter.write(&mut writer, ns)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        }

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("d:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("d:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new(root.as_str())))?;
        xml::finish(writer)
    }
}

/// DAV: first, then every namespace used by the body or added by the caller.
fn bindings(
    props: &[Prop],
    extra: &BTreeSet<Namespace>,
    envelope: Namespace,
) -> BTreeSet<Namespace> {
    let mut set: BTreeSet<Namespace> = extra.clone();
    set.insert(Namespace::Dav);
    set.insert(envelope);
    set.extend(props.iter().map(|p| p.namespace()));
    set
}

fn push_binding(start: &mut BytesStart<'_>, namespace: Namespace) {
    let key = format!("xmlns:{}", namespace.prefix());
    start.push_attribute((key.as_str(), namespace.uri()));
}

fn write_props(writer: &mut Writer<Cursor<Vec<u8>>>, props: &[Prop]) -> Result<(), DavError> {
    writer.write_event(Event::Start(BytesStart::new("d:prop")))?;
    for prop in props {
        let tag = prop.namespace().qualify(prop.name());
        writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new("d:prop")))?;
    Ok(())
}

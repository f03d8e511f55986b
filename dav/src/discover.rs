// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Server discovery: well-known URIs, principal and home-set traversal.

use std::collections::{BTreeMap, VecDeque};

use reqwest::Url;

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::{self, HttpClient, XML_CONTENT_TYPE};
use crate::request::{Prop, PropFindRequest};
use crate::response::{MultiStatusResponse, PropMap};

/// Calendars and address books found on a server, keyed by absolute URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverResult {
    /// Calendar collection URL to display name.
    pub calendars: BTreeMap<String, String>,
    /// Address book collection URL to display name.
    pub addressbooks: BTreeMap<String, String>,
}

impl DiscoverResult {
    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty() && self.addressbooks.is_empty()
    }
}

/// Discovery run against one server.
///
/// Redirects are never followed by the HTTP layer here: a 3xx reply is
/// re-issued as PROPFIND against its `Location`, bounded by
/// `DavConfig::max_redirects` hops per run.
#[derive(Debug)]
pub struct Discovery {
    http: HttpClient,
    max_redirects: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HomeKind {
    Calendar,
    Addressbook,
}

impl Discovery {
    /// Creates a discovery client from credentials and limits in `config`.
    ///
    /// `config.base_url` is not used.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &DavConfig) -> Result<Self, DavError> {
        Ok(Self {
            http: HttpClient::new(config, false)?,
            max_redirects: config.max_redirects,
        })
    }

    /// Finds calendars and address books reachable from `host_or_uri`.
    ///
    /// Finding nothing is not an error; the result is then empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request bodies cannot be built.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, host_or_uri: &str) -> Result<DiscoverResult, DavError> {
        let principals = dedup_principals(self.find_principals(host_or_uri).await?);
        tracing::debug!(?principals, "discovered principals");

        let mut calendar_homes = Vec::new();
        let mut addressbook_homes = Vec::new();
        for principal in &principals {
            let Ok(url) = Url::parse(principal) else {
                continue;
            };
            calendar_homes.extend(self.home_set(&url, Prop::CalendarHomeSet).await?);
            addressbook_homes.extend(self.home_set(&url, Prop::AddressbookHomeSet).await?);
        }

        let mut result = DiscoverResult::default();
        for home in &calendar_homes {
            result
                .calendars
                .extend(self.collections(home, HomeKind::Calendar).await?);
        }
        for home in &addressbook_homes {
            result
                .addressbooks
                .extend(self.collections(home, HomeKind::Addressbook).await?);
        }

        tracing::info!(
            calendars = result.calendars.len(),
            addressbooks = result.addressbooks.len(),
            "discovery finished"
        );
        Ok(result)
    }

    async fn find_principals(&self, host_or_uri: &str) -> Result<Vec<String>, DavError> {
        let body = PropFindRequest::with_props(&[Prop::CurrentUserPrincipal]).build()?;
        let mut queue: VecDeque<String> = candidates(host_or_uri).into();
        let mut principals = Vec::new();
        let mut hops = 0;

        while let Some(candidate) = queue.pop_front() {
            let url = match Url::parse(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(%candidate, error = %e, "skipping unparsable candidate");
                    continue;
                }
            };

            let builder = self.http.build_request(http::method("PROPFIND")?, url.clone());
            let builder = HttpClient::depth(builder, 0);
            let builder = HttpClient::with_body(builder, XML_CONTENT_TYPE, body.clone());
            let resp = match self.http.send(builder).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!(%url, error = %e, "candidate unreachable");
                    hops = 0;
                    continue;
                }
            };

            if resp.status.is_redirection() {
                match resp.location() {
                    Some(location) if hops < self.max_redirects => {
                        tracing::debug!(%url, %location, hops, "following redirect");
                        hops += 1;
                        queue.push_front(location.to_string());
                    }
                    Some(location) => {
                        tracing::debug!(%url, %location, "redirect limit reached");
                    }
                    None => tracing::debug!(%url, "redirect without Location"),
                }
                continue;
            }

            hops = 0;
            if resp.status.as_u16() != 207 {
                tracing::debug!(%url, status = %resp.status, "no principal at candidate");
                continue;
            }

            let multistatus = match MultiStatusResponse::from_xml(&resp.body) {
                Ok(ms) => ms,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "unparsable principal response");
                    continue;
                }
            };
            for item in &multistatus.responses {
                for href in item.props.hrefs(Prop::CurrentUserPrincipal.name()) {
                    match join_on_host(&resp.url, href) {
                        Ok(principal) => principals.push(principal.to_string()),
                        Err(e) => tracing::debug!(%href, error = %e, "bad principal href"),
                    }
                }
            }
        }

        Ok(principals)
    }

    async fn home_set(&self, principal: &Url, prop: Prop) -> Result<Vec<Url>, DavError> {
        let Some(ms) = self
            .propfind(principal, &PropFindRequest::with_props(&[prop]), 0)
            .await?
        else {
            return Ok(Vec::new());
        };

        let homes = ms
            .responses
            .iter()
            .flat_map(|item| item.props.hrefs(prop.name()))
            .filter_map(|href| join_on_host(principal, href).ok())
            .collect();
        Ok(homes)
    }

    async fn collections(
        &self,
        home: &Url,
        kind: HomeKind,
    ) -> Result<Vec<(String, String)>, DavError> {
        let props: &[Prop] = match kind {
            HomeKind::Calendar => &[
                Prop::ResourceType,
                Prop::DisplayName,
                Prop::GetCTag,
                Prop::SupportedCalendarComponentSet,
            ],
            HomeKind::Addressbook => &[Prop::ResourceType, Prop::DisplayName, Prop::GetCTag],
        };
        let Some(ms) = self
            .propfind(home, &PropFindRequest::with_props(props), 1)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for item in ms.responses {
            let keep = match kind {
                HomeKind::Calendar => is_event_calendar(&item.props),
                HomeKind::Addressbook => item.props.has_child("resourcetype", "addressbook"),
            };
            if !keep {
                continue;
            }
            let Ok(url) = home.join(item.href.as_str()) else {
                continue;
            };
            let name = item.props.text("displayname").unwrap_or_default().to_string();
            found.push((url.to_string(), name));
        }
        Ok(found)
    }

    /// PROPFIND whose failures are logged and skipped.
    async fn propfind(
        &self,
        url: &Url,
        req: &PropFindRequest,
        depth: u8,
    ) -> Result<Option<MultiStatusResponse>, DavError> {
        let builder = self.http.build_request(http::method("PROPFIND")?, url.clone());
        let builder = HttpClient::depth(builder, depth);
        let builder = HttpClient::with_body(builder, XML_CONTENT_TYPE, req.build()?);
        let resp = match self.http.execute(builder).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%url, error = %e, "PROPFIND failed during discovery");
                return Ok(None);
            }
        };
        match MultiStatusResponse::from_xml(&resp.body) {
            Ok(ms) => Ok(Some(ms)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "unparsable PROPFIND response");
                Ok(None)
            }
        }
    }
}

/// A calendar collection that can hold events.
fn is_event_calendar(props: &PropMap) -> bool {
    props.has_child("resourcetype", "calendar")
        && props
            .get("supported-calendar-component-set")
            .is_some_and(|set| set.contains_attr("comp", "name", "VEVENT"))
}

/// Candidate URLs in probing order.
fn candidates(host_or_uri: &str) -> Vec<String> {
    let input = host_or_uri.trim();
    let bare = input
        .split_once("://")
        .map_or(input, |(_, rest)| rest)
        .trim_end_matches('/');
    let authority = bare.split('/').next().unwrap_or(bare);

    let mut out = vec![format!("https://{bare}"), format!("http://{bare}")];
    for scheme in ["https", "http"] {
        for service in ["caldav", "carddav"] {
            out.push(format!("{scheme}://{authority}/.well-known/{service}"));
        }
    }
    out
}

/// Removes duplicate principal URLs, keeping the `https://` variant when a
/// URL was found under both schemes. First-seen order is preserved.
#[must_use]
pub fn dedup_principals<I, S>(principals: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for principal in principals {
        let principal = principal.as_ref();
        let rest = strip_scheme(principal);
        match out.iter_mut().find(|seen| strip_scheme(seen) == rest) {
            Some(seen) => {
                if principal.starts_with("https://") {
                    *seen = principal.to_string();
                }
            }
            None => out.push(principal.to_string()),
        }
    }
    out
}

/// Resolves `href` against the scheme and host of `base`, reading relative paths from the root.
fn join_on_host(base: &Url, href: &str) -> Result<Url, url::ParseError> {
    let mut root = base.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    root.join(href)
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

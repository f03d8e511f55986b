// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Connection-scoped `WebDAV` client.

use reqwest::{Method, Url};

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::{self, DavResponse, HttpClient, XML_CONTENT_TYPE};
use crate::request::{PropFindRequest, ReportRequest};
use crate::response::MultiStatusResponse;
use crate::types::ETag;

/// Client bound to one collection.
///
/// Construct one per connection and operation; the underlying HTTP state
/// (credentials, redirect policy, timeout) belongs to this client alone.
///
/// # Example
///
/// ```ignore
/// use davsync_dav::{AuthMethod, DavClient, DavConfig, Prop, PropFindRequest};
///
/// # async fn example() -> Result<(), davsync_dav::DavError> {
/// let config = DavConfig::new(
///     "https://dav.example.com/calendars/user/personal/",
///     AuthMethod::basic("user", "pass"),
/// );
/// let client = DavClient::new(&config)?;
/// let req = PropFindRequest::with_props(&[Prop::DisplayName, Prop::GetCTag]);
/// let status = client.propfind(client.base_url(), &req, 0).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DavClient {
    http: HttpClient,
    base: Url,
}

impl DavClient {
    /// Creates a client that follows up to `config.max_redirects` redirects.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Url`] if the base URL is invalid, or an HTTP error
    /// if the client cannot be built.
    pub fn new(config: &DavConfig) -> Result<Self, DavError> {
        let base = Url::parse(&config.base_url)?;
        let http = HttpClient::new(config, true)?;
        Ok(Self { http, base })
    }

    /// The collection URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves a server-reported href against the collection URL.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Url`] if the href cannot be resolved.
    pub fn resolve(&self, href: &str) -> Result<Url, DavError> {
        Ok(self.base.join(href)?)
    }

    /// Sends a PROPFIND and parses the multistatus reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// malformed body.
    pub async fn propfind(
        &self,
        url: &Url,
        req: &PropFindRequest,
        depth: u8,
    ) -> Result<MultiStatusResponse, DavError> {
        let body = req.build()?;
        tracing::debug!(%url, depth, "PROPFIND");
        let builder = self.http.build_request(http::method("PROPFIND")?, url.clone());
        let builder = HttpClient::depth(builder, depth);
        let builder = HttpClient::with_body(builder, XML_CONTENT_TYPE, body);
        let resp = self.http.execute(builder).await?;
        MultiStatusResponse::from_xml(&resp.body)
    }

    /// Sends a REPORT against the collection URL.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// malformed body.
    pub async fn report(
        &self,
        req: &ReportRequest,
        depth: u8,
    ) -> Result<MultiStatusResponse, DavError> {
        let body = req.build()?;
        tracing::debug!(url = %self.base, depth, report = req.kind().name(), "REPORT");
        let builder = self
            .http
            .build_request(http::method("REPORT")?, self.base.clone());
        let builder = HttpClient::depth(builder, depth);
        let builder = HttpClient::with_body(builder, XML_CONTENT_TYPE, body);
        let resp = self.http.execute(builder).await?;
        MultiStatusResponse::from_xml(&resp.body)
    }

    /// Fetches a resource.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn get(&self, url: &Url) -> Result<DavResponse, DavError> {
        self.http
            .execute(self.http.build_request(Method::GET, url.clone()))
            .await
    }

    /// Stores a resource, conditionally on `if_match` when given.
    ///
    /// Returns the new `ETag` when the server reports one.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] if `if_match` no longer
    /// matches, or another error on failure.
    pub async fn put(
        &self,
        url: &Url,
        body: String,
        content_type: &str,
        if_match: Option<&ETag>,
    ) -> Result<Option<ETag>, DavError> {
        tracing::debug!(%url, conditional = if_match.is_some(), "PUT");
        let mut builder = self.http.build_request(Method::PUT, url.clone());
        if let Some(etag) = if_match {
            builder = HttpClient::if_match(builder, etag);
        }
        let builder = HttpClient::with_body(builder, content_type, body);
        let resp = self.http.execute(builder).await?;
        Ok(resp.etag())
    }

    /// Deletes a resource, conditionally on `if_match` when given.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] if `if_match` no longer
    /// matches, or another error on failure.
    pub async fn delete(&self, url: &Url, if_match: Option<&ETag>) -> Result<(), DavError> {
        tracing::debug!(%url, conditional = if_match.is_some(), "DELETE");
        let mut builder = self.http.build_request(Method::DELETE, url.clone());
        if let Some(etag) = if_match {
            builder = HttpClient::if_match(builder, etag);
        }
        self.http.execute(builder).await?;
        Ok(())
    }
}

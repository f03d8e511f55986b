// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};

use crate::config::{AuthMethod, DavConfig};
use crate::error::DavError;
use crate::types::ETag;

/// Content type of XML request bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Status, headers and body of a completed request.
#[derive(Debug, Clone)]
pub struct DavResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL, after any automatically followed redirects.
    pub url: Url,
    /// Response body.
    pub body: String,
}

impl DavResponse {
    /// A header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `ETag` response header, unquoted.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.header("ETag").map(ETag::new)
    }

    /// The `Location` header resolved against the request URL.
    #[must_use]
    pub fn location(&self) -> Option<Url> {
        let location = self.headers.get(LOCATION)?.to_str().ok()?;
        self.url.join(location).ok()
    }
}

/// HTTP client for `WebDAV` operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    auth: AuthMethod,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// With `follow_redirects` unset, 3xx responses are returned to the
    /// caller untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: &DavConfig, follow_redirects: bool) -> Result<Self, DavError> {
        let policy = if follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(policy)
            .build()?;
        Ok(Self {
            client,
            auth: config.auth.clone(),
        })
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.auth {
            AuthMethod::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthMethod::None => req,
        }
    }

    /// Attaches a body with explicit `Content-Type` and `Content-Length`.
    pub fn with_body(req: RequestBuilder, content_type: &str, body: String) -> RequestBuilder {
        req.header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, body.len())
            .body(body)
    }

    /// Adds a `Depth` header.
    pub fn depth(req: RequestBuilder, depth: u8) -> RequestBuilder {
        req.header("Depth", depth.to_string())
    }

    /// Adds If-Match header for conditional updates.
    pub fn if_match(req: RequestBuilder, etag: &ETag) -> RequestBuilder {
        req.header("If-Match", etag.quoted())
    }

    /// Sends a request and returns whatever the server answered.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Http`] only for network-level failures and timeouts.
    pub async fn send(&self, req: RequestBuilder) -> Result<DavResponse, DavError> {
        let resp = req.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let url = resp.url().clone();
        let body = resp.text().await?;
        tracing::trace!(%url, %status, len = body.len(), "received response");
        Ok(DavResponse {
            status,
            headers,
            url,
            body,
        })
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] on 412 and [`DavError::Http`]
    /// on any status below 200 or at/above 400.
    pub async fn execute(&self, req: RequestBuilder) -> Result<DavResponse, DavError> {
        let resp = self.send(req).await?;
        match resp.status {
            StatusCode::PRECONDITION_FAILED => Err(DavError::PreconditionFailed(format!(
                "{} rejected If-Match (current ETag: {})",
                resp.url,
                resp.header("ETag").unwrap_or("unknown")
            ))),
            status if status.as_u16() < 200 || status.as_u16() >= 400 => Err(DavError::Http(
                format!("{status} from {}: {}", resp.url, resp.body.trim()),
            )),
            _ => Ok(resp),
        }
    }
}

/// Builds a WebDAV extension method.
pub(crate) fn method(name: &str) -> Result<Method, DavError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| DavError::Http(format!("Invalid method {name}: {e}")))
}

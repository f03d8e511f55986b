// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// `WebDAV` client errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum DavError {
    /// Network failure, or a status code below 200 or at/above 400.
    Http(String),

    /// Malformed XML, either in a response body or while writing a request.
    Xml(String),

    /// Well-formed response with an unexpected shape.
    InvalidResponse(String),

    /// Precondition failed (`If-Match` rejected by the server).
    PreconditionFailed(String),

    /// Invalid client configuration.
    Config(String),

    /// URL that cannot be parsed or resolved.
    Url(String),
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Xml(e) => write!(f, "XML error: {e}"),
            Self::InvalidResponse(e) => write!(f, "Invalid server response: {e}"),
            Self::PreconditionFailed(e) => write!(f, "Precondition failed: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Url(e) => write!(f, "Invalid URL: {e}"),
        }
    }
}

impl std::error::Error for DavError {}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DavError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for DavError {
    fn from(e: quick_xml::encoding::EncodingError) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for DavError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Config(format!("invalid header value: {e}"))
    }
}

impl From<url::ParseError> for DavError {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e.to_string())
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` wire layer for `CalDAV` (RFC 4791) and `CardDAV` (RFC 6352) collections:
//! request bodies, multistatus parsing, transport and server discovery.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod config;
mod discover;
mod error;
mod http;
mod request;
mod response;
mod types;
mod xml;

pub use crate::client::DavClient;
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::discover::{DiscoverResult, Discovery, dedup_principals};
pub use crate::error::DavError;
pub use crate::http::DavResponse;
pub use crate::request::{Filter, Prop, PropFindRequest, ReportKind, ReportRequest};
pub use crate::response::{
    MultiStatusResponse, PropMap, PropValue, ResponseItem, parse_http_status_line,
};
pub use crate::types::{ETag, Href};
pub use crate::xml::Namespace;

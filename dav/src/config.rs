// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Authentication method.
#[derive(Debug, Clone, Default)]
pub enum AuthMethod {
    /// No authentication.
    #[default]
    None,
    /// Basic authentication (username/password).
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
}

impl AuthMethod {
    /// Basic credentials; an empty username means no authentication.
    #[must_use]
    pub fn basic(username: &str, password: &str) -> Self {
        if username.is_empty() {
            Self::None
        } else {
            Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }
        }
    }
}

/// Request context for one collection (or one discovery run).
///
/// A config is cheap to clone but every client built from it owns its own
/// HTTP state; never share a client between connections.
#[derive(Debug, Clone)]
pub struct DavConfig {
    /// Collection URL the client operates on.
    pub base_url: String,
    /// Authentication method.
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent string.
    pub user_agent: String,
    /// Redirect hops followed automatically outside discovery.
    pub max_redirects: usize,
}

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default redirect limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 3;

fn default_user_agent() -> String {
    concat!("davsync/", env!("CARGO_PKG_VERSION")).to_string()
}

impl DavConfig {
    /// Creates a config for the given collection URL with default limits.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            ..Default::default()
        }
    }
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

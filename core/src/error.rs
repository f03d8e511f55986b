// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the sync engine.

use davsync_dav::DavError;
use thiserror::Error;

/// Errors that can occur in engine operations.
///
/// Expected control-flow conditions (not due, inactive, unchanged collection)
/// are reported through [`crate::SyncOutcome`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown connection or object.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure or a status code below 200 or at/above 400.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed XML or a multistatus of unexpected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Write rejected because the resource changed on the server.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Calendar or contact payload that cannot be normalized.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DavError> for Error {
    fn from(e: DavError) -> Self {
        match e {
            DavError::Http(msg) => Self::Transport(msg),
            DavError::PreconditionFailed(msg) => Self::Conflict(msg),
            DavError::Config(msg) => Self::Config(msg),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Config(format!("Failed to run migrations: {e}"))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

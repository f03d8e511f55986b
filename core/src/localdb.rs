// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod addressbook_objects;
mod calendar_objects;
mod connections;


use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

pub use crate::localdb::addressbook_objects::AddressbookObjects;
pub use crate::localdb::calendar_objects::CalendarObjects;
pub use crate::localdb::connections::Connections;

use crate::error::{Error, Result};

/// Distinguishes in-memory databases opened by one process.
pub(crate) static IN_MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub struct LocalDb {
    pool: SqlitePool,

    pub connections: Connections,
    pub calendar_objects: CalendarObjects,
    pub addressbook_objects: AddressbookObjects,
}

impl LocalDb {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    pub async fn open(filename: Option<&Path>) -> Result<Self> {
        let (options, pool_options) = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true)
                .foreign_keys(true);
            (options, SqlitePoolOptions::new())
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            let db_id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
            let options = SqliteConnectOptions::new()
                .filename(format!("file:davsync_{db_id}:?mode=memory&cache=shared"))
                .in_memory(true)
                .shared_cache(true)
                .foreign_keys(true);
            // the database lives only as long as one connection stays open
            let pool_options = SqlitePoolOptions::new()
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            (options, pool_options)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| Error::Config(format!("Failed to connect to SQLite database: {e}")))?;

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        let connections = Connections::new(pool.clone());
        let calendar_objects = CalendarObjects::new(pool.clone());
        let addressbook_objects = AddressbookObjects::new(pool.clone());
        Ok(LocalDb {
            pool,
            connections,
            calendar_objects,
            addressbook_objects,
        })
    }

    /// Begins a transaction; dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

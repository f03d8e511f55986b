// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::{SqliteConnection, SqlitePool};

use crate::object::AddressbookObject;

const COLUMNS: &str = "\
id, connection_id, uri, contact_data, etag, size, lastmodified, uid, formatted_name, \
structured_name";

#[derive(Debug, Clone)]
pub struct AddressbookObjects {
    pool: SqlitePool,
}

impl AddressbookObjects {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `(uri, etag)` pairs cached for one connection.
    pub async fn etags_for(&self, connection_id: i64) -> Result<Vec<(String, String)>, sqlx::Error> {
        const SQL: &str = "SELECT uri, etag FROM addressbookobjects WHERE connection_id = ?;";

        sqlx::query_as(SQL)
            .bind(connection_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list(&self, connection_id: i64) -> Result<Vec<AddressbookObject>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM addressbookobjects WHERE connection_id = ? \
             ORDER BY formatted_name ASC, uri ASC;"
        );
        sqlx::query_as(&sql)
            .bind(connection_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_by_uri(
        &self,
        connection_id: i64,
        uri: &str,
    ) -> Result<Option<AddressbookObject>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM addressbookobjects WHERE connection_id = ? AND uri = ?;"
        );
        sqlx::query_as(&sql)
            .bind(connection_id)
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
    }

    #[cfg(test)]
    pub async fn count(&self, connection_id: i64) -> Result<i64, sqlx::Error> {
        const SQL: &str = "SELECT COUNT(*) FROM addressbookobjects WHERE connection_id = ?;";

        let row: (i64,) = sqlx::query_as(SQL)
            .bind(connection_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Inserts or replaces the row at `(connection_id, uri)`. `id` is ignored.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        object: &AddressbookObject,
    ) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
INSERT INTO addressbookobjects (connection_id, uri, contact_data, etag, size, lastmodified,
    uid, formatted_name, structured_name)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(connection_id, uri) DO UPDATE SET
    contact_data    = excluded.contact_data,
    etag            = excluded.etag,
    size            = excluded.size,
    lastmodified    = excluded.lastmodified,
    uid             = excluded.uid,
    formatted_name  = excluded.formatted_name,
    structured_name = excluded.structured_name;
";

        sqlx::query(SQL)
            .bind(object.connection_id)
            .bind(&object.uri)
            .bind(&object.contact_data)
            .bind(&object.etag)
            .bind(object.size)
            .bind(object.lastmodified)
            .bind(&object.uid)
            .bind(&object.formatted_name)
            .bind(&object.structured_name)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Deletes the rows of one connection carrying `etag`.
    pub async fn delete_by_etag(
        conn: &mut SqliteConnection,
        connection_id: i64,
        etag: &str,
    ) -> Result<u64, sqlx::Error> {
        const SQL: &str = "DELETE FROM addressbookobjects WHERE connection_id = ? AND etag = ?;";

        let result = sqlx::query(SQL)
            .bind(connection_id)
            .bind(etag)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(
        conn: &mut SqliteConnection,
        connection_id: i64,
    ) -> Result<u64, sqlx::Error> {
        const SQL: &str = "DELETE FROM addressbookobjects WHERE connection_id = ?;";

        let result = sqlx::query(SQL).bind(connection_id).execute(conn).await?;
        Ok(result.rows_affected())
    }
}

// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::{SqliteConnection, SqlitePool};

use crate::object::CalendarObject;

const COLUMNS: &str = "\
id, connection_id, uri, calendar_data, etag, size, lastmodified, component_type, uid, \
first_occurrence, last_occurrence";

#[derive(Debug, Clone)]
pub struct CalendarObjects {
    pool: SqlitePool,
}

impl CalendarObjects {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `(uri, etag)` pairs cached for one connection.
    pub async fn etags_for(&self, connection_id: i64) -> Result<Vec<(String, String)>, sqlx::Error> {
        const SQL: &str = "SELECT uri, etag FROM calendarobjects WHERE connection_id = ?;";

        sqlx::query_as(SQL)
            .bind(connection_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Objects whose occurrence span intersects `(start, end)`; open bounds are ignored.
    pub async fn list(
        &self,
        connection_id: i64,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<CalendarObject>, sqlx::Error> {
        let mut sql = format!("SELECT {COLUMNS} FROM calendarobjects WHERE connection_id = ?");
        if start.is_some() {
            sql += " AND last_occurrence > ?";
        }
        if end.is_some() {
            sql += " AND first_occurrence < ?";
        }
        sql += " ORDER BY first_occurrence ASC, uri ASC;";

        let mut query = sqlx::query_as(&sql).bind(connection_id);
        if let Some(start) = start {
            query = query.bind(start);
        }
        if let Some(end) = end {
            query = query.bind(end);
        }
        query.fetch_all(&self.pool).await
    }

    pub async fn get_by_uri(
        &self,
        connection_id: i64,
        uri: &str,
    ) -> Result<Option<CalendarObject>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM calendarobjects WHERE connection_id = ? AND uri = ?;"
        );
        sqlx::query_as(&sql)
            .bind(connection_id)
            .bind(uri)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_uid(
        &self,
        connection_id: i64,
        uid: &str,
    ) -> Result<Option<CalendarObject>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM calendarobjects WHERE connection_id = ? AND uid = ? \
             ORDER BY id ASC LIMIT 1;"
        );
        sqlx::query_as(&sql)
            .bind(connection_id)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
    }

    #[cfg(test)]
    pub async fn count(&self, connection_id: i64) -> Result<i64, sqlx::Error> {
        const SQL: &str = "SELECT COUNT(*) FROM calendarobjects WHERE connection_id = ?;";

        let row: (i64,) = sqlx::query_as(SQL)
            .bind(connection_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Inserts or replaces the row at `(connection_id, uri)`. `id` is ignored.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        object: &CalendarObject,
    ) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
INSERT INTO calendarobjects (connection_id, uri, calendar_data, etag, size, lastmodified,
    component_type, uid, first_occurrence, last_occurrence)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(connection_id, uri) DO UPDATE SET
    calendar_data    = excluded.calendar_data,
    etag             = excluded.etag,
    size             = excluded.size,
    lastmodified     = excluded.lastmodified,
    component_type   = excluded.component_type,
    uid              = excluded.uid,
    first_occurrence = excluded.first_occurrence,
    last_occurrence  = excluded.last_occurrence;
";

        sqlx::query(SQL)
            .bind(object.connection_id)
            .bind(&object.uri)
            .bind(&object.calendar_data)
            .bind(&object.etag)
            .bind(object.size)
            .bind(object.lastmodified)
            .bind(&object.component_type)
            .bind(&object.uid)
            .bind(object.first_occurrence)
            .bind(object.last_occurrence)
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
        const SQL: &str = "DELETE FROM calendarobjects WHERE connection_id = ? AND etag = ?;";

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
        const SQL: &str = "DELETE FROM calendarobjects WHERE connection_id = ?;";

        let result = sqlx::query(SQL).bind(connection_id).execute(conn).await?;
        Ok(result.rows_affected())
    }
}

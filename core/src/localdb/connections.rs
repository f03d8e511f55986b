// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::{SqliteConnection, SqlitePool};

use crate::connection::{Connection, ConnectionDraft};

const COLUMNS: &str = "\
id, uri, displayname, description, username, password, type, syncinterval, \
lastsynced, ctag, synctoken, active, write";

#[derive(Debug, Clone)]
pub struct Connections {
    pool: SqlitePool,
}

impl Connections {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        draft: &ConnectionDraft,
        syncinterval: i64,
    ) -> Result<i64, sqlx::Error> {
        const SQL: &str = "\
INSERT INTO connections (uri, displayname, description, username, password, type, syncinterval, active, write)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?);
";

        let result = sqlx::query(SQL)
            .bind(&draft.uri)
            .bind(&draft.displayname)
            .bind(&draft.description)
            .bind(&draft.username)
            .bind(&draft.password)
            .bind(draft.kind)
            .bind(syncinterval)
            .bind(draft.active)
            .bind(draft.write)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Connection>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM connections WHERE id = ?;");
        sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<Connection>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM connections ORDER BY id ASC;");
        sqlx::query_as(&sql).fetch_all(&self.pool).await
    }

    /// Writes the user-editable fields back.
    pub async fn update(&self, conn: &Connection) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
UPDATE connections SET
    displayname  = ?,
    description  = ?,
    username     = ?,
    password     = ?,
    syncinterval = ?,
    active       = ?,
    write        = ?
WHERE id = ?;
";

        sqlx::query(SQL)
            .bind(&conn.displayname)
            .bind(&conn.description)
            .bind(&conn.username)
            .bind(&conn.password)
            .bind(conn.syncinterval)
            .bind(conn.active)
            .bind(conn.write)
            .bind(conn.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes a connection; its cached objects cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        const SQL: &str = "DELETE FROM connections WHERE id = ?;";

        let result = sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refreshes `lastsynced` without touching the collection tags.
    pub async fn touch(&self, id: i64, lastsynced: i64) -> Result<(), sqlx::Error> {
        const SQL: &str = "UPDATE connections SET lastsynced = ? WHERE id = ?;";

        sqlx::query(SQL)
            .bind(lastsynced)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Records a completed sync. Runs inside the sync transaction.
    pub async fn mark_synced(
        conn: &mut SqliteConnection,
        id: i64,
        lastsynced: i64,
        ctag: Option<&str>,
        synctoken: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
UPDATE connections SET lastsynced = ?, ctag = ?, synctoken = ? WHERE id = ?;
";

        sqlx::query(SQL)
            .bind(lastsynced)
            .bind(ctag)
            .bind(synctoken)
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

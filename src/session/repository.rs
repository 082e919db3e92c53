//! Session database repository.

use sqlx::SqlitePool;

use super::error::SessionResult;
use super::models::{SessionChanges, SessionRecord, SessionSelector};
use crate::db::Database;

const SELECT_COLUMNS: &str = r#"session_id, path, name, "type", kernel_id"#;

/// Repository for session persistence. Owns the storage handle.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: Database,
}

impl SessionRepository {
    /// Create a new repository over an open database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    /// Create the session table if absent. Idempotent; safe to call
    /// repeatedly.
    pub async fn ensure_schema(&self) -> SessionResult<()> {
        // Loosely typed columns and no uniqueness constraints: session_id
        // uniqueness is the generator's responsibility, not the store's.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions
                (session_id TEXT, path TEXT, name TEXT, "type" TEXT, kernel_id TEXT)
            "#,
        )
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Append one row.
    pub async fn insert(&self, record: &SessionRecord) -> SessionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, path, name, "type", kernel_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.session_id)
        .bind(&record.path)
        .bind(&record.name)
        .bind(&record.session_type)
        .bind(&record.kernel_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Rows matching every term of `selector`, in storage order.
    pub async fn select(&self, selector: &SessionSelector) -> SessionResult<Vec<SessionRecord>> {
        // Column names come from the closed SessionColumn set, never from
        // caller strings.
        let conditions = selector
            .terms()
            .iter()
            .map(|(column, _)| format!(r#""{}" = ?"#, column.as_str()))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE {conditions}");

        let mut query = sqlx::query_as::<_, SessionRecord>(&sql);
        for (_, value) in selector.terms() {
            query = query.bind(value.as_str());
        }

        Ok(query.fetch_all(self.pool()).await?)
    }

    /// Full, stable snapshot of all rows at call time. Materialized so a
    /// caller deleting rows while iterating cannot perturb the iteration.
    pub async fn select_all(&self) -> SessionResult<Vec<SessionRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions");
        let rows = sqlx::query_as::<_, SessionRecord>(&sql)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    /// Apply `changes` to the row with `session_id`. An empty change set
    /// is a no-op, not an error.
    pub async fn update(&self, session_id: &str, changes: &SessionChanges) -> SessionResult<()> {
        let terms = changes.terms();
        if terms.is_empty() {
            return Ok(());
        }

        let sets = terms
            .iter()
            .map(|(column, _)| format!(r#""{}" = ?"#, column.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE sessions SET {sets} WHERE session_id = ?");

        let mut query = sqlx::query(&sql);
        for (_, value) in &terms {
            query = query.bind(*value);
        }
        query.bind(session_id).execute(self.pool()).await?;
        Ok(())
    }

    /// Remove the row with `session_id`; absent rows are a no-op.
    pub async fn delete(&self, session_id: &str) -> SessionResult<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Release the storage handle. Idempotent.
    pub async fn close(&self) {
        self.db.close().await;
    }
}

//! SQLite target store: the single connection a run writes through.
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::path::{Path, PathBuf};

use super::writer::{InsertTemplate, TableWriter};
use crate::config::MAX_BIND_PARAMETERS;
use crate::error::{LoadError, Result};
use crate::formats::Row;

/// Label used when classifying errors from transaction control statements
const TRANSACTION: &str = "transaction";

/// Owns the connection to the target database file
///
/// Foreign-key enforcement is switched on for the connection. The store is
/// lent to each component by `&mut` and released with [`Store::close`].
pub struct Store {
    conn: SqliteConnection,
    path: PathBuf,
}

impl Store {
    /// Open the database at `path`, creating the file if absent
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true)
            .connect()
            .await
            .map_err(|source| LoadError::StoreUnavailable {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "opened target store");
        Ok(Self { conn, path })
    }

    /// Create an in-memory store for testing
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = SqliteConnectOptions::new()
            .foreign_keys(true)
            .connect()
            .await
            .map_err(|source| LoadError::StoreUnavailable {
                path: path.clone(),
                source,
            })?;

        Ok(Self { conn, path })
    }

    /// Raw connection for assertions in tests
    #[cfg(test)]
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Execute a DDL statement outside of any explicit transaction
    pub async fn execute_ddl(&mut self, table: &str, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&mut self.conn)
            .await
            .map_err(|e| LoadError::from_store(table, &self.path, e))?;
        Ok(())
    }

    pub async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| LoadError::from_store(table, &self.path, e))
    }

    /// Close the connection, flushing SQLite's state to disk
    pub async fn close(self) -> Result<()> {
        let Store { conn, path } = self;
        conn.close()
            .await
            .map_err(|source| LoadError::StoreUnavailable {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "closed target store");
        Ok(())
    }

    async fn execute_control(&mut self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&mut self.conn)
            .await
            .map_err(|e| LoadError::from_store(TRANSACTION, &self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl TableWriter for Store {
    async fn begin(&mut self) -> Result<()> {
        self.execute_control("BEGIN").await
    }

    async fn insert_batch(&mut self, template: &InsertTemplate, rows: &[Row<'_>]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Split only as far as SQLite's bound-parameter limit requires
        let rows_per_statement = (MAX_BIND_PARAMETERS / template.arity().max(1)).max(1);
        let mut rows_written = 0u64;

        for chunk in rows.chunks(rows_per_statement) {
            let insert_sql = template.render(chunk.len());

            let mut query = sqlx::query(&insert_sql);
            for row in chunk {
                for value in row {
                    query = query.bind(*value);
                }
            }

            let result = query
                .execute(&mut self.conn)
                .await
                .map_err(|e| LoadError::from_store(&template.table, &self.path, e))?;
            rows_written += result.rows_affected();
        }

        Ok(rows_written)
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute_control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute_control("ROLLBACK").await
    }
}

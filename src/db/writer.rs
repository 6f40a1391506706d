//! The write capability the chunked loader needs from a target store.

use async_trait::async_trait;

use crate::error::Result;
use crate::formats::Row;

/// Target table and column list for batched inserts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTemplate {
    pub table: String,
    pub columns: Vec<String>,
}

impl InsertTemplate {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Render a multi-row INSERT for `row_count` rows with `?` placeholders
    ///
    /// A row whose key already exists is dropped by `ON CONFLICT DO NOTHING`.
    /// That clause only absorbs uniqueness conflicts; NOT NULL and foreign-key
    /// failures still raise.
    pub fn render(&self, row_count: usize) -> String {
        let column_list = self
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");

        let placeholders = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values_clause = vec![placeholders.as_str(); row_count].join(", ");

        format!(
            "INSERT INTO \"{}\" ({}) VALUES {} ON CONFLICT DO NOTHING",
            self.table, column_list, values_clause
        )
    }
}

/// Transactional batch writes against one store connection
///
/// At most one transaction is open at a time. Callers pair every successful
/// `begin` with exactly one `commit` or `rollback`.
#[async_trait]
pub trait TableWriter: Send {
    async fn begin(&mut self) -> Result<()>;

    /// Insert `rows` using the template's conflict policy
    ///
    /// Returns the number of rows the store actually wrote, which is lower
    /// than `rows.len()` when existing keys were skipped.
    async fn insert_batch(&mut self, template: &InsertTemplate, rows: &[Row<'_>]) -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

//! Error taxonomy for a load run
//!
//! Every variant is fatal for the run. Duplicate primary keys are not part of
//! the taxonomy: the insert policy absorbs them and they never surface here.

use std::path::PathBuf;

use sqlx::error::ErrorKind;

pub type Result<T, E = LoadError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Source file missing, unreadable or not a Parquet file
    #[error("source file '{}' is unavailable", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A requested column is absent or cannot be represented as text
    #[error("schema mismatch in '{}': {message}", path.display())]
    SchemaMismatch { path: PathBuf, message: String },

    /// A non-duplicate constraint failure (NULL key, orphaned reference, check)
    #[error("constraint violation while loading {table}")]
    ConstraintViolation {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The database cannot be opened or the connection failed mid-run
    #[error("target store '{}' is unavailable", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// Any other statement the store rejected
    #[error("statement failed on {table}")]
    Statement {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("row for {table} has {found} values, expected {expected}")]
    ArityMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("load configuration is missing '{0}'")]
    MissingConfig(&'static str),

    #[error("invalid schema definition: {message}")]
    SchemaDefinition { message: String },
}

impl LoadError {
    pub(crate) fn source_unavailable(
        path: impl Into<PathBuf>,
        source: impl Into<BoxError>,
    ) -> Self {
        LoadError::SourceUnavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn schema_mismatch(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LoadError::SchemaMismatch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify an error raised by a statement against `table`
    pub(crate) fn from_store(table: &str, store_path: &std::path::Path, error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) => match db_error.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => LoadError::ConstraintViolation {
                    table: table.to_string(),
                    source: error,
                },
                _ => LoadError::Statement {
                    table: table.to_string(),
                    source: error,
                },
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => LoadError::StoreUnavailable {
                path: store_path.to_path_buf(),
                source: error,
            },
            _ => LoadError::Statement {
                table: table.to_string(),
                source: error,
            },
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for LoadError {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        LoadError::MissingConfig(error.field_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_classify_as_store_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "disk gone");
        let err = LoadError::from_store(
            "I_Customer",
            std::path::Path::new("salt.sqlite"),
            sqlx::Error::Io(io),
        );
        assert!(matches!(err, LoadError::StoreUnavailable { .. }));
        assert!(err.to_string().contains("salt.sqlite"));
    }

    #[test]
    fn test_row_not_found_classifies_as_statement_error() {
        let err = LoadError::from_store(
            "I_Customer",
            std::path::Path::new("salt.sqlite"),
            sqlx::Error::RowNotFound,
        );
        assert!(matches!(err, LoadError::Statement { ref table, .. } if table == "I_Customer"));
        assert!(!matches!(err, LoadError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_display_messages() {
        let err = LoadError::schema_mismatch("a.parquet", "column 'REGION' not found");
        assert_eq!(
            err.to_string(),
            "schema mismatch in 'a.parquet': column 'REGION' not found"
        );

        let err = LoadError::ArityMismatch {
            table: "I_Customer".to_string(),
            expected: 2,
            found: 3,
        };
        assert_eq!(err.to_string(), "row for I_Customer has 3 values, expected 2");
    }
}

//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("failed to apply database schema")]
    Schema,
    /// A row violated a uniqueness, not-null or check constraint.
    #[display("constraint violation")]
    Constraint,
    #[display("failed to merge shard: {}", _0.display())]
    Merge(#[error(not(source))] PathBuf),
    /// A value could not be represented in (or read back from) the database.
    #[display("invalid data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if the failure concerns a single row, so the caller can
    /// skip the entry that produced it and keep writing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Constraint | Self::InvalidData(_))
    }
}

/// Wrap a sqlx error, telling constraint violations apart from everything else.
#[track_caller]
pub(crate) fn classify(err: sqlx::Error) -> Error {
    let kind = match &err {
        sqlx::Error::Database(db) if !matches!(db.kind(), sqlx::error::ErrorKind::Other) => ErrorKind::Constraint,
        _ => ErrorKind::Database,
    };
    exn::Exn::from(err).raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_row_level_errors_are_recoverable() {
        assert!(ErrorKind::Constraint.is_recoverable());
        assert!(ErrorKind::InvalidData("id").is_recoverable());
        assert!(!ErrorKind::Database.is_recoverable());
        assert!(!ErrorKind::Schema.is_recoverable());
    }

    #[test]
    fn pool_errors_are_not_constraints() {
        assert!(matches!(*classify(sqlx::Error::PoolClosed), ErrorKind::Database));
    }
}

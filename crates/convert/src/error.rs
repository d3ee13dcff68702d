//! Conversion Error Types
//!
//! Only failures that abort a run surface as errors. Problems with a single
//! entry are counted in [`Stats`](crate::Stats) and logged instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A conversion error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a fatal conversion failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The archive could not be opened.
    Archive,
    /// The output or a shard database failed in a way that is not local to one row.
    Store,
    #[display("cannot read title list: {}", _0.display())]
    Titles(#[error(not(source))] PathBuf),
    /// One entry could not be read or decoded. Counted, never returned from a run.
    #[display("unreadable entry")]
    Entry,
    /// A shard worker failed or panicked; the run cannot complete.
    #[display("shard starting at entry {_0} failed")]
    Shard(#[error(not(source))] u32),
}

//! Page-view Error Types

use derive_more::{Display, Error};

/// A page-view import error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for page-view imports.
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant aborts the import. Bad lines are counted, not raised.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The input could not be opened.
    #[display("cannot open input: {_0}")]
    Input(#[error(not(source))] String),
    /// The input stream broke off or failed to decompress part-way.
    #[display("failed to read input")]
    Read,
    #[display("failed to write page views")]
    Store,
}

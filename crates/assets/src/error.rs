//! Asset Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An asset error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for asset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("ImageMagick (magick/convert) not detected on your system")]
    ToolNotFound,
    #[display("recompression tool not found at {}", _0.display())]
    ToolMissing(#[error(not(source))] PathBuf),
    #[display("failed to start recompression tool")]
    Spawn,
    /// The tool exited unsuccessfully; `None` when it was killed by a signal.
    #[display("recompression tool exited with code: {_0:?}")]
    ToolFailed(#[error(not(source))] Option<i32>),
    /// Vector and icon formats are never rasterised.
    #[display("format cannot be recompressed: {_0}")]
    Unsupported(#[error(not(source))] &'static str),
    #[display("unknown recompression profile: {_0}")]
    UnknownProfile(#[error(not(source))] String),
    Io,
}

//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The archive file could not be opened or read.
    #[display("cannot read archive: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The file is not an archive, or its structure is corrupt.
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] &'static str),
    /// An entry id past the end of the archive.
    #[display("entry id out of range: {_0}")]
    IdOutOfRange(#[error(not(source))] u32),
    /// No entry with the given path.
    #[display("entry not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A directory entry could not be decoded.
    #[display("corrupt directory entry {_0}")]
    CorruptEntry(#[error(not(source))] u32),
    /// Content was requested for an entry that has none (a redirect).
    #[display("entry has no content: {_0}")]
    NoContent(#[error(not(source))] u32),
    /// A redirect chain starting at the given entry is too long or loops.
    #[display("redirect chain from entry {_0} does not terminate")]
    RedirectChain(#[error(not(source))] u32),
    /// A cluster uses a compression scheme this reader does not support.
    #[display("unsupported cluster compression: {_0}")]
    UnsupportedCompression(#[error(not(source))] u8),
    /// A cluster failed to decompress.
    #[display("corrupt cluster {_0}")]
    CorruptCluster(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if the failure concerns one entry only, so the caller
    /// can skip that entry and carry on with the rest of the archive.
    pub fn is_entry_local(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::InvalidArchive(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_local_errors() {
        assert!(ErrorKind::NotFound("A/Dog".to_string()).is_entry_local());
        assert!(ErrorKind::CorruptCluster(4).is_entry_local());
        assert!(!ErrorKind::InvalidArchive("bad magic number").is_entry_local());
        assert!(!ErrorKind::Io(PathBuf::from("wikipedia.zim")).is_entry_local());
    }
}

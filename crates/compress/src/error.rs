//! Codec Error Types

use derive_more::{Display, Error};

/// A codec error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An encoder or decoder could not be set up.
    #[display("codec initialisation failed")]
    Encoder,
    /// The input is not valid for its format: a truncated cluster, a corrupt feed.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// Recognised, but this build was compiled without it.
    #[display("format not compiled in: {_0}")]
    DisabledFormat(#[error(not(source))] String),
    /// Writing to the in-memory encoder failed.
    #[display("I/O error")]
    Io,
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn display_names_the_format() {
        assert_eq!(ErrorKind::DisabledFormat("xz".to_string()).to_string(), "format not compiled in: xz");
    }

    #[test]
    fn raised_error_derefs_to_kind() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated cluster"));
        let err: Result<()> = result.or_raise(|| ErrorKind::InvalidData);
        assert_eq!(*err.unwrap_err(), ErrorKind::InvalidData);
    }
}

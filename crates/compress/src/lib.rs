//! Byte codecs shared by the conversion pipeline and the pageview importer.
//!
//! Three different consumers need compression in this workspace, and they
//! pull in opposite directions:
//!
//! - **Article bodies** are compressed once and read many times on slow
//!   devices, so they favour ratio at an acceptable CPU cost ([`Level::Balanced`]).
//! - **Archive clusters** inside a ZIM file are only ever decompressed (xz or
//!   zstd, depending on the age of the archive).
//! - **Pageview feeds** are huge bzip2 (sometimes gzip) streams that must be
//!   decompressed on the fly, never buffered ([`Compression::wrap_reader`]).
//!
//! Bzip2 and Gzip are always available. XZ and Zstd are behind the `xz` and
//! `zstd` feature flags.

mod construct;
pub mod error;
mod ops;
mod util;

/// A supported compression format.
///
/// Variants gated behind feature flags (`xz`, `zstd`) are only available when
/// the corresponding feature is enabled. Defaults to [`None`](Self::None).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA2 compression (.xz)
    #[cfg(feature = "xz")]
    Xz,
    /// Zstd compression (.zst)
    #[cfg(feature = "zstd")]
    Zstd,
}

/// How hard an encoder should work.
///
/// Each format maps these onto its own scale; see `ops.rs` for the numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Level {
    /// Cheapest setting that still compresses.
    Fast,
    /// Good ratio without the pathological CPU cost of the maximum levels.
    #[default]
    Balanced,
    /// Highest level available for the format.
    Smallest,
}

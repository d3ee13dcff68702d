//! Read-only access to archives of hyperlinked documents.
//!
//! The conversion pipeline only ever talks to an archive through the
//! [`Archive`] trait: a dense, zero-based id space of [`Entry`]s that can be
//! fetched by id or by namespace-prefixed path, plus the content bytes of
//! non-redirect entries. There is exactly one interface; readers for other
//! container formats implement it rather than the pipeline probing for
//! alternative method shapes.
//!
//! - [`ZimArchive`] reads ZIM files from disk.
//! - `MockArchive` (feature `mock`) is an in-memory archive for tests.

pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod zim;

use crate::error::{ErrorKind, Result};
#[cfg(feature = "mock")]
pub use crate::mock::MockArchive;
pub use crate::zim::{ZimArchive, ZimOpener};
use std::sync::Arc;

pub type ArchiveHandle = Arc<dyn Archive>;

/// Upper bound on redirect chains before [`Archive::resolve_redirect`] gives up.
pub const MAX_REDIRECT_HOPS: usize = 16;

/// One addressable unit inside an archive: an article, a redirect, or an asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Dense, zero-based index; stable for the lifetime of the archive.
    pub index: u32,
    /// Namespace-prefixed path, e.g. `A/Dog` or `-/style.css`.
    pub path: String,
    /// Display title. Falls back to the path (without namespace) when the
    /// archive does not store one.
    pub title: String,
    pub mime: Option<String>,
    redirect: Option<u32>,
}

impl Entry {
    pub fn content(index: u32, path: impl Into<String>, title: impl Into<String>, mime: Option<String>) -> Self {
        Self { index, path: path.into(), title: title.into(), mime, redirect: None }
    }

    pub fn redirect(index: u32, path: impl Into<String>, title: impl Into<String>, target: u32) -> Self {
        Self { index, path: path.into(), title: title.into(), mime: None, redirect: Some(target) }
    }

    #[inline]
    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    /// Index of the entry this one points at, if it is a redirect.
    #[inline]
    pub fn redirect_target(&self) -> Option<u32> {
        self.redirect
    }

    /// The namespace segment of the path (`A` for `A/Dog`), if there is one.
    pub fn namespace(&self) -> Option<&str> {
        self.path.split_once('/').map(|(ns, _)| ns)
    }
}

/// Read-only archive access.
///
/// Implementations must be safe to share between threads, but callers are
/// free to open one handle per worker (see [`ArchiveOpener`]) to avoid
/// contention on the underlying file.
pub trait Archive: Send + Sync {
    /// Number of entries; valid ids are `0..entry_count()`.
    fn entry_count(&self) -> u32;

    /// Fetch an entry by its dense index.
    ///
    /// Returns [`IdOutOfRange`](ErrorKind::IdOutOfRange) for ids past the end.
    fn entry_by_id(&self, id: u32) -> Result<Entry>;

    /// Fetch an entry by its namespace-prefixed path.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if no entry has that path.
    fn entry_by_path(&self, path: &str) -> Result<Entry>;

    /// Content bytes of a non-redirect entry.
    ///
    /// Returns [`NoContent`](ErrorKind::NoContent) for redirects.
    fn content(&self, id: u32) -> Result<Vec<u8>>;

    /// Follow a redirect (and any redirect it points at) to the final entry.
    ///
    /// Non-redirect entries resolve to themselves. Chains longer than
    /// `max_hops` (including loops) fail with
    /// [`RedirectChain`](ErrorKind::RedirectChain).
    fn resolve_redirect(&self, entry: &Entry, max_hops: usize) -> Result<Entry> {
        let mut current = entry.clone();
        for _ in 0..max_hops {
            match current.redirect_target() {
                Some(target) => current = self.entry_by_id(target)?,
                None => return Ok(current),
            }
        }
        if current.is_redirect() {
            exn::bail!(ErrorKind::RedirectChain(entry.index));
        }
        Ok(current)
    }
}

/// Something that can open fresh, independent handles onto the same archive.
///
/// Each shard worker opens its own handle, so workers never share a file
/// cursor or cluster cache.
pub trait ArchiveOpener: Send + Sync {
    fn open(&self) -> Result<ArchiveHandle>;
}

impl<F> ArchiveOpener for F
where
    F: Fn() -> Result<ArchiveHandle> + Send + Sync,
{
    fn open(&self) -> Result<ArchiveHandle> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A/Dog", Some("A"))]
    #[case("-/style.css", Some("-"))]
    #[case("C/_assets_/x.png", Some("C"))]
    #[case("orphan", None)]
    fn namespace_is_first_segment(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(Entry::content(0, path, "t", None).namespace(), expected);
    }

    #[test]
    fn redirect_accessors() {
        let entry = Entry::redirect(3, "A/Hound", "Hound", 7);
        assert!(entry.is_redirect());
        assert_eq!(entry.redirect_target(), Some(7));
        assert!(!Entry::content(7, "A/Dog", "Dog", None).is_redirect());
    }
}

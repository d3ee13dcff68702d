//! Inline asset rewriting.
//!
//! Archived HTML references images (and, in some archives, stylesheets) that
//! live in other archive entries. Offline readers only get the article table,
//! so the [`Rewriter`] replaces those references with self-contained `data:`
//! references, optionally shrinking large images through a [`Recompressor`]
//! first. Anything that cannot be inlined is left as it was.

mod consts;
pub mod error;
mod format;
mod profile;
mod recompress;
mod resolve;
mod rewrite;

pub use crate::format::ImageFormat;
pub use crate::profile::{AssetPolicy, MAX_INLINE_BYTES, Profile};
pub use crate::recompress::{ImageMagick, Recompressor};
pub use crate::rewrite::{DEFAULT_TIMEOUT, RewriteReport, Rewriter, Rewritten};

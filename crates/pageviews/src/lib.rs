//! Monthly page-view aggregation.
//!
//! Reads Wikimedia `pageviews-YYYYMM-user` dumps (plain or compressed, from a
//! file or standard input) and sums the monthly totals per page into the
//! `pageviews` table, with a title lookup table next to it. Sums add up
//! across runs, so several months can be imported into one database.

pub mod error;
mod import;
mod line;
mod source;

pub use crate::import::{ImportOptions, Summary, import};
pub use crate::line::{PageviewLine, Parsed, parse_line};
pub use crate::source::Source;

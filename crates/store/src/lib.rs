//! SQLite output store.
//!
//! The converted archive is a flat SQLite file with two tables that offline
//! reader applications query directly:
//!
//! - `articles(id, title, page_content_zstd)`: one row per stored article,
//!   the body compressed with zstd.
//! - `title_2_id(id, title_lower_case)`: every reachable lowercase title,
//!   articles and redirect aliases alike, pointing at an article id.
//!
//! The pageview utility writes a separate database with the same shape
//! (`pageviews` plus `title_2_wiki_domain_id`).
//!
//! Writes go through a [`Writer`], which batches them into transactions.
//! Parallel conversions write one shard database per batch and fold them into
//! the final file with [`Database::merge_shard`].

mod db;
pub mod error;
mod merge;
mod read;
mod writer;

pub use crate::db::{Database, Schema};
pub use crate::merge::MergeReport;
pub use crate::read::Article;
pub use crate::writer::Writer;

//! Archive to article database conversion.
//!
//! Two ways to run a conversion:
//!
//! - [`Converter`] walks an id range (or a list of titles) in order and
//!   writes straight into one database. Later entries win contested titles.
//! - [`convert_sharded`] cuts the id space into ranges, converts them
//!   concurrently into shard databases, and merges the shards into the
//!   output as they finish, reporting progress as a stream of
//!   [`ConvertEvent`]s.
//!
//! Both classify every entry (see [`Classifier`]), store the articles that
//! pass the [`ArticleFilter`] compressed with zstd, and index every article
//! and redirect title in lowercase.

mod articles;
mod classify;
pub mod error;
mod partition;
mod pipeline;
mod stats;
mod titles;

pub use crate::articles::{ArticleFilter, display_title, title_key};
pub use crate::classify::{Classifier, Disposition};
pub use crate::partition::{ConvertEvent, convert_sharded, plan, shard_path};
pub use crate::pipeline::Converter;
pub use crate::stats::{Outcome, Stats};
pub use crate::titles::{parse_titles, read_titles};

/// Knobs shared by sequential and sharded runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub article_prefix: String,
    pub internal_prefixes: Vec<String>,
    pub min_title_length: usize,
    pub min_content_length: usize,
    /// Ids per shard.
    pub batch_size: u32,
    pub commit_interval: usize,
    /// Shards converted at once.
    pub workers: usize,
}

impl Default for Options {
    fn default() -> Self {
        let filter = ArticleFilter::default();
        Self {
            article_prefix: "A/".to_string(),
            internal_prefixes: ["-", "M/", "X/", "W/"].map(String::from).to_vec(),
            min_title_length: filter.min_title_length,
            min_content_length: filter.min_content_length,
            batch_size: 5000,
            commit_interval: 1000,
            workers: 1,
        }
    }
}

use zimdb_compress::error::Result;
use zimdb_compress::{Compression, Level};

/// Drops entries too small to be worth reading offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArticleFilter {
    pub min_title_length: usize,
    pub min_content_length: usize,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self { min_title_length: 2, min_content_length: 100 }
    }
}

impl ArticleFilter {
    /// Lengths are counted in characters, not bytes.
    pub fn accepts_title(&self, title: &str) -> bool {
        title.chars().count() >= self.min_title_length
    }

    pub fn accepts_body(&self, body: &str) -> bool {
        body.chars().count() >= self.min_content_length
    }
}

/// The title shown to readers: underscores become spaces.
pub fn display_title(title: &str) -> String {
    title.replace('_', " ")
}

/// The key articles and redirects are found under.
pub fn title_key(title: &str) -> String {
    title.to_lowercase()
}

/// Compress an article body for storage.
pub fn compress_body(html: &str) -> Result<Vec<u8>> {
    Compression::Zstd.compress_with(html.as_bytes(), Level::Balanced)
}

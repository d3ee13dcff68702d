//! Entry classification.
//!
//! Every entry gets exactly one [`Disposition`]. The rules are applied in
//! order and the first match wins:
//!
//! 1. paths under an internal prefix are [`Special`](Disposition::Special);
//! 2. redirects are [`Redirect`](Disposition::Redirect);
//! 3. paths under the article prefix are articles;
//! 4. any other `namespace/name` path that does not look like a static asset
//!    is an article too, which catches archives using a different layout;
//! 5. recognised media, document and archive files are
//!    [`Binary`](Disposition::Binary);
//! 6. everything else is [`Other`](Disposition::Other).
//!
//! Rule 4 is a heuristic: an extension-less asset outside the known asset
//! directories is taken for an article and only dropped later if its body is
//! too short.

use zimdb_archive::Entry;

/// Lowercase extensions of files that are never stored as text.
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "tif", "tiff", "avif",
    // audio and video
    "mp3", "ogg", "oga", "opus", "wav", "flac", "mid", "midi", "mp4", "m4a", "webm", "ogv", "avi", "mkv", "mov",
    // documents
    "pdf", "djvu", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods",
    // archives and executables
    "zip", "gz", "bz2", "xz", "zst", "tar", "7z", "rar", "exe", "dll", "so", "bin",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
];

/// Path fragments of directories that only hold static assets.
const ASSET_FRAGMENTS: &[&str] = &["_assets_/", "_res_/", "_mw_/", "/static/", "/assets/", "/images/", "/media/", "/thumb/"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    Special,
    Redirect,
    Article,
    Binary,
    Other,
}

#[derive(Clone, Debug)]
pub struct Classifier {
    article_prefix: String,
    internal_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(article_prefix: impl Into<String>, internal_prefixes: Vec<String>) -> Self {
        Self { article_prefix: article_prefix.into(), internal_prefixes }
    }

    pub fn article_prefix(&self) -> &str {
        &self.article_prefix
    }

    pub fn classify(&self, entry: &Entry) -> Disposition {
        let path = entry.path.as_str();
        if self.internal_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Disposition::Special;
        }
        if entry.is_redirect() {
            return Disposition::Redirect;
        }
        if path.starts_with(self.article_prefix.as_str()) {
            return Disposition::Article;
        }
        let binary = is_binary(path);
        if entry.namespace().is_some() && path.len() > 2 && !binary {
            return Disposition::Article;
        }
        if binary { Disposition::Binary } else { Disposition::Other }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("A/", ["-", "M/", "X/", "W/"].map(String::from).to_vec())
    }
}

fn is_binary(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let by_extension = name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    by_extension || ASSET_FRAGMENTS.iter().any(|fragment| path.contains(fragment))
}

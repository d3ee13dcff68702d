use crate::consts::{HREF_REGEX, IMG_SRC_REGEX, LINK_TAG_REGEX, STYLESHEET_REL_REGEX};
use crate::profile::MAX_INLINE_BYTES;
use crate::resolve::{fetch, is_external};
use crate::{AssetPolicy, ImageFormat, Profile, Recompressor};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Captures;
use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use zimdb_archive::ArchiveHandle;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-document accounting of what the rewriter did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Distinct image references replaced by `data:` references.
    pub inlined: u64,
    /// Of those, how many carry recompressed bytes.
    pub recompressed: u64,
    /// Found, but left alone for being over the ceiling.
    pub oversize: u64,
    /// Not found in the archive.
    pub unresolved: u64,
    /// Recompression calls that failed, timed out or came back too large.
    pub recompress_failed: u64,
    pub stylesheets: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl AddAssign for RewriteReport {
    fn add_assign(&mut self, other: Self) {
        self.inlined += other.inlined;
        self.recompressed += other.recompressed;
        self.oversize += other.oversize;
        self.unresolved += other.unresolved;
        self.recompress_failed += other.recompress_failed;
        self.stylesheets += other.stylesheets;
        self.bytes_before += other.bytes_before;
        self.bytes_after += other.bytes_after;
    }
}

#[derive(Clone, Debug)]
pub struct Rewritten {
    pub html: String,
    pub report: RewriteReport,
}

/// Makes archived HTML self-contained by inlining the assets it references.
///
/// Configuration is fixed at construction; a rewriter is shared by every
/// entry of a run.
#[derive(Clone)]
pub struct Rewriter {
    policy: AssetPolicy,
    max_inline_bytes: usize,
    timeout: Duration,
    inline_stylesheets: bool,
    recompressor: Option<Arc<dyn Recompressor>>,
}

impl Rewriter {
    pub fn new(policy: AssetPolicy) -> Self {
        Self {
            policy,
            max_inline_bytes: MAX_INLINE_BYTES,
            timeout: DEFAULT_TIMEOUT,
            inline_stylesheets: false,
            recompressor: None,
        }
    }

    pub fn with_max_inline_bytes(mut self, bytes: usize) -> Self {
        self.max_inline_bytes = bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stylesheets(mut self, enabled: bool) -> Self {
        self.inline_stylesheets = enabled;
        self
    }

    pub fn with_recompressor(mut self, recompressor: Arc<dyn Recompressor>) -> Self {
        self.recompressor = Some(recompressor);
        self
    }

    pub fn policy(&self) -> AssetPolicy {
        self.policy
    }

    /// `true` when [`rewrite`](Self::rewrite) would return its input unchanged.
    pub fn is_noop(&self) -> bool {
        self.policy == AssetPolicy::Disabled && !self.inline_stylesheets
    }

    /// Rewrite `html`, the body of the entry at `article_path`.
    ///
    /// Never fails: references that cannot be resolved, are too large, or
    /// fail to recompress stay as they were and are counted in the report.
    #[instrument(level = "debug", skip(self, archive, html), fields(html_size = html.len()))]
    pub async fn rewrite(&self, archive: &ArchiveHandle, article_path: &str, html: &str) -> Rewritten {
        let mut report = RewriteReport { bytes_before: html.len() as u64, ..Default::default() };
        let mut html = html.to_string();
        if self.policy != AssetPolicy::Disabled {
            html = self.inline_images(archive, article_path, &html, &mut report).await;
        }
        if self.inline_stylesheets {
            html = self.inline_stylesheets(archive, article_path, &html, &mut report).await;
        }
        report.bytes_after = html.len() as u64;
        Rewritten { html, report }
    }

    async fn inline_images(
        &self,
        archive: &ArchiveHandle,
        article_path: &str,
        html: &str,
        report: &mut RewriteReport,
    ) -> String {
        // Collected up front so no regex iterator is held across an await.
        let references: Vec<&str> = IMG_SRC_REGEX.captures_iter(html).map(|captures| quoted_value(&captures)).collect();
        let mut replacements: HashMap<String, Option<String>> = HashMap::new();
        for reference in references {
            if is_external(reference) || replacements.contains_key(reference) {
                continue;
            }
            let replacement = match fetch(archive, article_path, reference).await {
                Some((path, bytes)) => self.encode_image(&path, bytes, report).await,
                None => {
                    tracing::debug!(reference, "Image not found in archive");
                    report.unresolved += 1;
                    None
                },
            };
            replacements.insert(reference.to_string(), replacement);
        }

        IMG_SRC_REGEX
            .replace_all(html, |captures: &Captures| match replacements.get(quoted_value(captures)) {
                Some(Some(data)) => format!("{}\"{data}\"", &captures[1]),
                _ => captures[0].to_string(),
            })
            .into_owned()
    }

    /// Decide what, if anything, replaces one image.
    async fn encode_image(&self, path: &str, bytes: Vec<u8>, report: &mut RewriteReport) -> Option<String> {
        let format = ImageFormat::from_path(path);
        let bytes = match self.policy {
            AssetPolicy::Disabled => return None,
            AssetPolicy::Recompress(profile) if bytes.len() > profile.target_bytes() => {
                match self.recompress(&bytes, format, profile).await {
                    Some(smaller) => {
                        report.recompressed += 1;
                        smaller
                    },
                    None => {
                        report.recompress_failed += 1;
                        bytes
                    },
                }
            },
            AssetPolicy::Inline | AssetPolicy::Recompress(_) => bytes,
        };
        // The ceiling applies to the base64 payload.
        let encoded = base64::encoded_len(bytes.len(), true);
        if encoded.is_none_or(|encoded| encoded > self.max_inline_bytes) {
            tracing::debug!(path, size = bytes.len(), ceiling = self.max_inline_bytes, "Image too large to inline");
            report.oversize += 1;
            return None;
        }
        report.inlined += 1;
        Some(format!("data:{};base64,{}", format.mime(), STANDARD.encode(&bytes)))
    }

    /// Recompressed bytes, if they came back in time and within the target.
    async fn recompress(&self, bytes: &[u8], format: ImageFormat, profile: Profile) -> Option<Vec<u8>> {
        let recompressor = self.recompressor.as_ref()?;
        match tokio::time::timeout(self.timeout, recompressor.recompress(bytes, format, profile)).await {
            Ok(Ok(smaller)) if smaller.len() <= profile.target_bytes() => Some(smaller),
            Ok(Ok(larger)) => {
                tracing::debug!(size = larger.len(), target = profile.target_bytes(), "Recompressed image still too large");
                None
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Image recompression failed");
                None
            },
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Image recompression timed out");
                None
            },
        }
    }

    async fn inline_stylesheets(
        &self,
        archive: &ArchiveHandle,
        article_path: &str,
        html: &str,
        report: &mut RewriteReport,
    ) -> String {
        let references: Vec<&str> = LINK_TAG_REGEX.find_iter(html).filter_map(|tag| stylesheet_href(tag.as_str())).collect();
        let mut replacements: HashMap<String, Option<String>> = HashMap::new();
        for reference in references {
            if is_external(reference) || replacements.contains_key(reference) {
                continue;
            }
            let css = match fetch(archive, article_path, reference).await {
                Some((_, bytes)) if bytes.len() <= self.max_inline_bytes => {
                    report.stylesheets += 1;
                    Some(format!("<style>{}</style>", String::from_utf8_lossy(&bytes)))
                },
                Some(_) => {
                    report.oversize += 1;
                    None
                },
                None => {
                    report.unresolved += 1;
                    None
                },
            };
            replacements.insert(reference.to_string(), css);
        }

        LINK_TAG_REGEX
            .replace_all(html, |captures: &Captures| {
                let tag = &captures[0];
                match stylesheet_href(tag).and_then(|href| replacements.get(href)) {
                    Some(Some(style)) => style.clone(),
                    _ => tag.to_string(),
                }
            })
            .into_owned()
    }
}

fn quoted_value<'h>(captures: &Captures<'h>) -> &'h str {
    captures.get(2).or_else(|| captures.get(3)).map_or("", |m| m.as_str())
}

fn stylesheet_href(tag: &str) -> Option<&str> {
    if !STYLESHEET_REL_REGEX.is_match(tag) {
        return None;
    }
    let captures = HREF_REGEX.captures(tag)?;
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

//! Mapping HTML references onto archive paths.

use crate::consts::EXTERNAL_REGEX;
use percent_encoding::percent_decode_str;
use zimdb_archive::ArchiveHandle;

/// References that point outside the archive or are already self-contained.
pub(crate) fn is_external(reference: &str) -> bool {
    EXTERNAL_REGEX.is_match(reference.trim())
}

/// Archive paths to try for `reference`, most likely first.
///
/// The query and fragment are dropped, as are `.` and `..` segments: archive
/// HTML climbs out of its namespace (`../I/Dog.png`) to reach assets stored
/// in another one. Segments are percent-decoded, archive paths are not
/// escaped. The bare result is tried first, then the same path under
/// the referencing article's namespace.
pub(crate) fn candidates(article_path: &str, reference: &str) -> Vec<String> {
    let reference = reference.trim();
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let resolved = reference[..end]
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if resolved.is_empty() {
        return Vec::new();
    }
    match article_path.split_once('/') {
        Some((namespace, _)) if resolved.split_once('/').is_none_or(|(first, _)| first != namespace) => {
            let nested = format!("{namespace}/{resolved}");
            vec![resolved, nested]
        },
        _ => vec![resolved],
    }
}

/// Look a reference up and fetch its bytes, returning the path it was found at.
pub(crate) async fn fetch(archive: &ArchiveHandle, article_path: &str, reference: &str) -> Option<(String, Vec<u8>)> {
    let paths = candidates(article_path, reference);
    if paths.is_empty() {
        return None;
    }
    let archive = ArchiveHandle::clone(archive);
    let lookup = tokio::task::spawn_blocking(move || {
        paths.into_iter().find_map(|path| {
            let entry = archive.entry_by_path(&path).ok()?;
            // Assets behind a redirect are rare, but do occur for renamed files.
            let entry = archive.resolve_redirect(&entry, zimdb_archive::MAX_REDIRECT_HOPS).ok()?;
            let bytes = archive.content(entry.index).ok()?;
            Some((entry.path, bytes))
        })
    });
    match lookup.await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(error = %err, reference, "Asset lookup task failed");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A/Dog", "../I/m/Dog.png", &["I/m/Dog.png", "A/I/m/Dog.png"])]
    #[case("A/Dog", "./Dog_files/x.png?width=200#top", &["Dog_files/x.png", "A/Dog_files/x.png"])]
    #[case("C/Dog", "_assets_/x.png", &["_assets_/x.png", "C/_assets_/x.png"])]
    #[case("C/Dog", "/C/_assets_/x.png", &["C/_assets_/x.png"])]
    #[case("Dog", "x.png", &["x.png"])]
    #[case("A/Dog", "../I/m/Caf%C3%A9%2C_wolf.jpg", &["I/m/Café,_wolf.jpg", "A/I/m/Café,_wolf.jpg"])]
    #[case("A/Dog", "100%25_pure.png", &["100%_pure.png", "A/100%_pure.png"])]
    #[case("A/Dog", "../..", &[])]
    #[case("A/Dog", "#top", &[])]
    fn builds_candidate_paths(#[case] article: &str, #[case] reference: &str, #[case] expected: &[&str]) {
        assert_eq!(candidates(article, reference), expected);
    }

    #[rstest]
    #[case("https://upload.wikimedia.org/x.png", true)]
    #[case("//upload.wikimedia.org/x.png", true)]
    #[case("data:image/png;base64,AAAA", true)]
    #[case("HTTP://example.com", true)]
    #[case("../I/m/Dog.png", false)]
    #[case("Dog.png", false)]
    fn detects_external_references(#[case] reference: &str, #[case] expected: bool) {
        assert_eq!(is_external(reference), expected);
    }
}

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;

/// Read a title list: one title per line, blank lines and `#` comments skipped.
pub async fn read_titles(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::Titles(path.to_path_buf()))?;
    Ok(parse_titles(&contents))
}

pub fn parse_titles(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_blanks_and_comments() {
        let titles = parse_titles("# cities\nNew York City\n\n  Boston  \r\n#Paris\n");
        assert_eq!(titles, ["New York City", "Boston"]);
    }

    #[tokio::test]
    async fn reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Dog\nCat").unwrap();
        assert_eq!(read_titles(file.path()).await.unwrap(), ["Dog", "Cat"]);
    }

    #[tokio::test]
    async fn missing_files_are_errors() {
        let err = read_titles(Path::new("/nonexistent/titles.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Titles(_)));
    }
}

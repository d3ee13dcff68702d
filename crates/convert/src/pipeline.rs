//! Sequential conversion of archive entries into a [`Writer`].

use crate::Options;
use crate::articles::{ArticleFilter, compress_body, display_title, title_key};
use crate::classify::{Classifier, Disposition};
use crate::error::{ErrorKind, Result};
use crate::stats::{Outcome, Stats};
use exn::ResultExt;
use std::ops::Range;
use std::sync::Arc;
use tracing::instrument;
use zimdb_archive::{Archive, ArchiveHandle, Entry, MAX_REDIRECT_HOPS};
use zimdb_assets::Rewriter;
use zimdb_store::Writer;

/// Converts entries of one archive, one at a time.
///
/// Archive reads run on the blocking pool. Entry-level failures are counted
/// as [`Outcome::Failed`] and skipped; only database failures that are not
/// local to one row end a run.
pub struct Converter {
    archive: ArchiveHandle,
    classifier: Classifier,
    filter: ArticleFilter,
    rewriter: Arc<Rewriter>,
}

impl Converter {
    pub fn new(archive: ArchiveHandle, options: &Options, rewriter: Arc<Rewriter>) -> Self {
        Self {
            archive,
            classifier: Classifier::new(options.article_prefix.clone(), options.internal_prefixes.clone()),
            filter: ArticleFilter {
                min_title_length: options.min_title_length,
                min_content_length: options.min_content_length,
            },
            rewriter,
        }
    }

    /// Convert every entry whose id falls in `range`, clamped to the archive.
    #[instrument(level = "debug", skip(self, writer), fields(start = range.start, end = range.end))]
    pub async fn convert_range(&self, writer: &mut Writer, range: Range<u32>) -> Result<Stats> {
        let end = range.end.min(self.archive.entry_count());
        let mut stats = Stats::default();
        for id in range.start..end {
            let outcome = match self.read(move |archive| archive.entry_by_id(id)).await {
                Ok(entry) => self.process(writer, entry, &mut stats).await?,
                Err(err) => {
                    tracing::warn!(id, error = ?err, "Skipping unreadable entry");
                    Outcome::Failed
                },
            };
            stats.record(outcome);
            if writer.tick().await.or_raise(|| ErrorKind::Store)? {
                tracing::info!(id, end, processed = stats.entries, "Committed checkpoint");
            }
        }
        Ok(stats)
    }

    /// Convert the articles named in `titles`, in order.
    ///
    /// Titles are looked up under the article prefix with spaces replaced by
    /// underscores. Titles that do not exist count as errors.
    #[instrument(level = "debug", skip_all, fields(titles = titles.len()))]
    pub async fn convert_titles(&self, writer: &mut Writer, titles: &[String]) -> Result<Stats> {
        let mut stats = Stats::default();
        for title in titles {
            let path = format!("{}{}", self.classifier.article_prefix(), title.replace(' ', "_"));
            let lookup = path.clone();
            let outcome = match self.read(move |archive| archive.entry_by_path(&lookup)).await {
                Ok(entry) => self.process(writer, entry, &mut stats).await?,
                Err(err) => {
                    tracing::warn!(path, error = ?err, "Skipping title missing from the archive");
                    Outcome::Failed
                },
            };
            stats.record(outcome);
            if writer.tick().await.or_raise(|| ErrorKind::Store)? {
                tracing::info!(processed = stats.entries, total = titles.len(), "Committed checkpoint");
            }
        }
        Ok(stats)
    }

    async fn process(&self, writer: &mut Writer, entry: Entry, stats: &mut Stats) -> Result<Outcome> {
        match self.classifier.classify(&entry) {
            Disposition::Special => Ok(Outcome::Special),
            Disposition::Binary => Ok(Outcome::Binary),
            Disposition::Other => Ok(Outcome::Other),
            Disposition::Redirect => self.redirect(writer, entry).await,
            Disposition::Article => self.article(writer, entry, stats).await,
        }
    }

    /// Point the redirect's title at the entry at the end of its chain.
    async fn redirect(&self, writer: &mut Writer, entry: Entry) -> Result<Outcome> {
        let id = entry.index;
        let key = title_key(&entry.title);
        let target = match self.read(move |archive| archive.resolve_redirect(&entry, MAX_REDIRECT_HOPS)).await {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(id, error = ?err, "Skipping unresolvable redirect");
                return Ok(Outcome::Failed);
            },
        };
        match writer.assign_title(target.index, &key).await {
            Ok(_) => Ok(Outcome::Redirect),
            Err(err) => skip_row(id, err),
        }
    }

    async fn article(&self, writer: &mut Writer, entry: Entry, stats: &mut Stats) -> Result<Outcome> {
        let id = entry.index;
        if !self.filter.accepts_title(&entry.title) {
            return Ok(Outcome::Filtered);
        }
        let bytes = match self.read(move |archive| archive.content(id)).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(id, error = ?err, "Skipping article with unreadable content");
                return Ok(Outcome::Failed);
            },
        };
        let html = match String::from_utf8(bytes) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(id, error = %err, "Skipping article that is not UTF-8");
                return Ok(Outcome::Failed);
            },
        };
        if !self.filter.accepts_body(&html) {
            return Ok(Outcome::Filtered);
        }

        let html = if self.rewriter.is_noop() {
            html
        } else {
            let rewritten = self.rewriter.rewrite(&self.archive, &entry.path, &html).await;
            stats.assets += rewritten.report;
            rewritten.html
        };
        let compressed = match compress_body(&html) {
            Ok(compressed) => compressed,
            Err(err) => {
                tracing::warn!(id, error = ?err, "Skipping article that failed to compress");
                return Ok(Outcome::Failed);
            },
        };

        // A rejected article must not leave a title pointing at it.
        if let Err(err) = writer.insert_article(id, &display_title(&entry.title), &compressed).await {
            return skip_row(id, err);
        }
        if let Err(err) = writer.assign_title(id, &title_key(&entry.title)).await {
            return skip_row(id, err);
        }
        stats.body_bytes += html.len() as u64;
        stats.stored_bytes += compressed.len() as u64;
        Ok(Outcome::Article)
    }

    /// Run a blocking archive call off the async workers.
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Archive) -> zimdb_archive::error::Result<T> + Send + 'static,
    {
        let archive = ArchiveHandle::clone(&self.archive);
        tokio::task::spawn_blocking(move || f(archive.as_ref()))
            .await
            .or_raise(|| ErrorKind::Entry)?
            .or_raise(|| ErrorKind::Entry)
    }
}

/// Count a row-level database failure against the entry; anything else is fatal.
fn skip_row(id: u32, err: zimdb_store::error::Error) -> Result<Outcome> {
    if err.is_recoverable() {
        tracing::warn!(id, error = ?err, "Skipping entry rejected by the database");
        return Ok(Outcome::Failed);
    }
    Err(err).or_raise(|| ErrorKind::Store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zimdb_archive::MockArchive;
    use zimdb_assets::AssetPolicy;
    use zimdb_store::{Database, Schema};

    fn png() -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.resize(10 * 1024, 0);
        bytes
    }

    fn body(len: usize) -> String {
        format!("<p>{}</p>", "x".repeat(len.saturating_sub(7)))
    }

    fn converter(archive: MockArchive, rewriter: Rewriter) -> Converter {
        Converter::new(Arc::new(archive), &Options::default(), Arc::new(rewriter))
    }

    async fn run(converter: &Converter, db: &Database) -> Stats {
        let mut writer = Writer::new(db, 2);
        let stats = converter.convert_range(&mut writer, 0..u32::MAX).await.unwrap();
        writer.finish().await.unwrap();
        stats
    }

    fn dog_archive() -> MockArchive {
        let canine = format!("<p>Canine</p><img src=\"../I/m/Canine.png\">{}", body(480));
        MockArchive::default()
            .with_redirect("A/Dog", "Dog", 2)
            .with_content("A/Cat", "Cat", body(50))
            .with_content("A/Canine", "Canine", canine)
            .with_content("I/m/Canine.png", "Canine.png", png())
    }

    #[tokio::test]
    async fn converts_articles_and_redirects() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let converter = converter(dog_archive(), Rewriter::new(AssetPolicy::Inline));
        // The image is only reachable through the article; its own entry is left out.
        let mut writer = Writer::new(&db, 2);
        let stats = converter.convert_range(&mut writer, 0..3).await.unwrap();
        writer.finish().await.unwrap();

        assert_eq!(stats.entries, 3);
        assert_eq!((stats.articles, stats.redirects, stats.filtered, stats.binary), (1, 1, 1, 0));
        assert_eq!(stats.outcomes(), stats.entries);
        assert_eq!(stats.assets.inlined, 1);

        let article = db.article(2).await.unwrap().unwrap();
        assert_eq!(article.title, "Canine");
        let html = String::from_utf8(article.body().unwrap()).unwrap();
        assert!(html.contains("src=\"data:image/png;base64,"));
        assert!(db.article(1).await.unwrap().is_none(), "short bodies are filtered");
        assert_eq!(db.title_id("dog").await.unwrap(), Some(2));
        assert_eq!(db.title_id("canine").await.unwrap(), Some(2));
        assert_eq!(db.title_id("cat").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rerunning_is_idempotent() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let converter = converter(dog_archive(), Rewriter::new(AssetPolicy::Disabled));
        run(&converter, &db).await;
        let titles = db.titles().await.unwrap();
        let articles = db.article_titles().await.unwrap();

        run(&converter, &db).await;
        assert_eq!(db.titles().await.unwrap(), titles);
        assert_eq!(db.article_titles().await.unwrap(), articles);
    }

    #[tokio::test]
    async fn later_entries_win_shared_titles() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let archive = MockArchive::default()
            .with_content("A/Mercury", "Mercury", body(200))
            .with_content("A/Mercury_(planet)", "Mercury_(planet)", body(200))
            .with_redirect("A/MERCURY", "MERCURY", 1);
        let stats = run(&converter(archive, Rewriter::new(AssetPolicy::Disabled)), &db).await;

        assert_eq!(stats.articles, 2);
        assert_eq!(db.title_id("mercury").await.unwrap(), Some(1));
        assert_eq!(db.article(1).await.unwrap().unwrap().title, "Mercury (planet)");
    }

    #[tokio::test]
    async fn rejected_articles_leave_no_title() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        sqlx::query(
            "CREATE TABLE rejections (reason TEXT NOT NULL);
             CREATE TRIGGER reject_canine BEFORE INSERT ON articles WHEN NEW.title = 'Canine'
             BEGIN INSERT INTO rejections VALUES (NULL); END;",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let stats = run(&converter(dog_archive(), Rewriter::new(AssetPolicy::Disabled)), &db).await;

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.articles, 0);
        assert_eq!(db.article_count().await.unwrap(), 0);
        assert_eq!(db.title_id("canine").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_entries_are_counted_not_fatal() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let archive = MockArchive::default()
            .with_unreadable("A/Broken")
            .with_redirect("A/Loop", "Loop", 1)
            .with_content("A/Binary", "Binary", vec![0xff; 200])
            .with_content("A/Fine", "Fine", body(200));
        let stats = run(&converter(archive, Rewriter::new(AssetPolicy::Disabled)), &db).await;

        assert_eq!(stats.errors, 3);
        assert_eq!(stats.articles, 1);
        assert_eq!(stats.outcomes(), 4);
        assert_eq!(db.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn every_entry_gets_one_outcome() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let archive = MockArchive::default()
            .with_content("-/style.css", "", "body {}")
            .with_content("M/Title", "", "Wiki")
            .with_content("A/X", "X", body(200))
            .with_content("A/Short", "Short", "<p/>")
            .with_content("I/logo.svg", "", "<svg/>")
            .with_content("README", "", "readme")
            .with_redirect("A/Ex", "Ex", 2);
        let stats = run(&converter(archive, Rewriter::new(AssetPolicy::Disabled)), &db).await;

        assert_eq!(stats.entries, 7);
        assert_eq!(stats.special, 2);
        assert_eq!(stats.filtered, 2, "one for the title, one for the body");
        assert_eq!((stats.binary, stats.other, stats.redirects, stats.articles), (1, 1, 1, 0));
        assert_eq!(stats.outcomes(), stats.entries);
    }

    #[tokio::test]
    async fn ranges_are_clamped_and_partial() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let converter = converter(dog_archive(), Rewriter::new(AssetPolicy::Disabled));
        let mut writer = Writer::new(&db, 10);
        let stats = converter.convert_range(&mut writer, 2..100).await.unwrap();
        writer.finish().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(db.title_id("dog").await.unwrap(), None);
    }

    #[tokio::test]
    async fn converts_a_title_list() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let archive = MockArchive::default()
            .with_content("A/New_York_City", "New_York_City", body(200))
            .with_content("A/Boston", "Boston", body(200))
            .with_redirect("A/NYC", "NYC", 0);
        let converter = converter(archive, Rewriter::new(AssetPolicy::Disabled));
        let titles = ["New York City", "NYC", "Atlantis"].map(String::from);

        let mut writer = Writer::new(&db, 10);
        let stats = converter.convert_titles(&mut writer, &titles).await.unwrap();
        writer.finish().await.unwrap();

        assert_eq!((stats.entries, stats.articles, stats.redirects, stats.errors), (3, 1, 1, 1));
        assert_eq!(db.article(0).await.unwrap().unwrap().title, "New York City");
        assert_eq!(db.title_id("nyc").await.unwrap(), Some(0));
        assert!(db.article(1).await.unwrap().is_none(), "titles not listed are skipped");
    }
}

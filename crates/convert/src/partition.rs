//! Parallel conversion.
//!
//! The id space is cut into fixed-size ranges. Each range is converted by its
//! own task, with its own archive handle, into its own shard database next to
//! the output. Finished shards are merged into the output one at a time, in
//! completion order, and deleted.

use crate::error::{ErrorKind, Result};
use crate::{Converter, Options, Stats};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinError};
use tracing::Instrument;
use zimdb_archive::{ArchiveHandle, ArchiveOpener};
use zimdb_assets::Rewriter;
use zimdb_store::{Database, MergeReport, Schema, Writer};

/// Progress events emitted by [`convert_sharded`].
///
/// Events follow a strict ordering:
/// 1. [`Planned`](Self::Planned): exactly once.
/// 2. [`ShardMerged`](Self::ShardMerged): once per shard, in merge order.
/// 3. [`Complete`](Self::Complete): exactly once, with the summed counters.
///
/// An error terminates the stream early, in which case [`Complete`](Self::Complete)
/// is never emitted and unfinished shard tasks are aborted.
#[derive(Debug)]
pub enum ConvertEvent {
    /// The archive holds `entries` entries, split into `shards` ranges.
    Planned { entries: u32, shards: usize },
    ShardMerged { range: Range<u32>, stats: Stats, merged: MergeReport },
    Complete(Stats),
}

/// Consecutive half-open ranges of at most `batch_size` ids covering `0..entries`.
pub fn plan(entries: u32, batch_size: u32) -> Vec<Range<u32>> {
    let batch_size = batch_size.max(1);
    (0..entries).step_by(batch_size as usize).map(|start| start..start.saturating_add(batch_size).min(entries)).collect()
}

/// Where the shard starting at `start` is written: `<output>.shard-<start>`.
pub fn shard_path(output: &Path, start: u32) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(format!(".shard-{start}"));
    PathBuf::from(name)
}

/// Convert the whole archive with up to `options.workers` shards in flight.
///
/// Shard files are placed next to `output_path`, which is also where `output`
/// lives. For a title contested between shards, the shard merged first keeps
/// it.
pub fn convert_sharded<'a>(
    opener: Arc<dyn ArchiveOpener>,
    output: &'a Database,
    output_path: &'a Path,
    options: &'a Options,
    rewriter: Arc<Rewriter>,
) -> impl Stream<Item = Result<ConvertEvent>> + 'a {
    stream!({
        let archive = match open(Arc::clone(&opener)).await {
            Ok(archive) => archive,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let entries = archive.entry_count();
        drop(archive);
        let mut pending = plan(entries, options.batch_size);
        yield Ok(ConvertEvent::Planned { entries, shards: pending.len() });

        let mut running = FuturesUnordered::new();
        let mut tasks = Tasks::default();
        for range in pending.drain(..options.workers.max(1).min(pending.len())) {
            let path = shard_path(output_path, range.start);
            running.push(tasks.spawn(Arc::clone(&opener), path, range, options, Arc::clone(&rewriter)));
        }

        let mut total = Stats::default();
        while let Some((range, joined)) = running.next().await {
            let stats = match joined {
                Ok(Ok(stats)) => stats,
                Ok(Err(e)) => {
                    yield Err(e).or_raise(|| ErrorKind::Shard(range.start));
                    return;
                },
                Err(e) => {
                    yield Err(e).or_raise(|| ErrorKind::Shard(range.start));
                    return;
                },
            };
            let path = shard_path(output_path, range.start);
            let merged = match merge(output, &path).await {
                Ok(merged) => merged,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            total += stats;
            yield Ok(ConvertEvent::ShardMerged { range, stats, merged });

            // Pop-n-push, but FIFO instead of LIFO.
            if !pending.is_empty() {
                let range = pending.remove(0);
                let path = shard_path(output_path, range.start);
                running.push(tasks.spawn(Arc::clone(&opener), path, range, options, Arc::clone(&rewriter)));
            }
        }

        yield Ok(ConvertEvent::Complete(total));
    })
}

/// Aborts every shard task still running when dropped.
#[derive(Default)]
struct Tasks(Vec<AbortHandle>);

impl Tasks {
    fn spawn(
        &mut self,
        opener: Arc<dyn ArchiveOpener>,
        path: PathBuf,
        range: Range<u32>,
        options: &Options,
        rewriter: Arc<Rewriter>,
    ) -> impl Future<Output = (Range<u32>, std::result::Result<Result<Stats>, JoinError>)> + use<> {
        let span = tracing::info_span!("shard", start = range.start, end = range.end);
        let task = tokio::spawn(convert_shard(opener, path, range.clone(), options.clone(), rewriter).instrument(span));
        self.0.push(task.abort_handle());
        async move { (range, task.await) }
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.0.iter().for_each(AbortHandle::abort);
    }
}

async fn open(opener: Arc<dyn ArchiveOpener>) -> Result<ArchiveHandle> {
    tokio::task::spawn_blocking(move || opener.open())
        .await
        .or_raise(|| ErrorKind::Archive)?
        .or_raise(|| ErrorKind::Archive)
}

async fn convert_shard(
    opener: Arc<dyn ArchiveOpener>,
    path: PathBuf,
    range: Range<u32>,
    options: Options,
    rewriter: Arc<Rewriter>,
) -> Result<Stats> {
    let archive = open(opener).await?;
    // Leftovers of an interrupted run would otherwise be appended to.
    remove_file(&path).await?;
    let db = Database::connect(&path, Schema::Articles).await.or_raise(|| ErrorKind::Store)?;
    let mut writer = Writer::new(&db, options.commit_interval);
    let stats = Converter::new(archive, &options, rewriter).convert_range(&mut writer, range).await?;
    writer.finish().await.or_raise(|| ErrorKind::Store)?;
    db.close().await;
    tracing::debug!(entries = stats.entries, articles = stats.articles, "Shard converted");
    Ok(stats)
}

async fn merge(output: &Database, path: &Path) -> Result<MergeReport> {
    let merged = output.merge_shard(path).await.or_raise(|| ErrorKind::Store)?;
    remove_file(path).await?;
    Ok(merged)
}

async fn remove_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).or_raise(|| ErrorKind::Store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;
    use zimdb_archive::MockArchive;
    use zimdb_assets::AssetPolicy;

    #[rstest]
    #[case(0, 5, &[])]
    #[case(3, 5, &[0..3])]
    #[case(10, 5, &[0..5, 5..10])]
    #[case(11, 5, &[0..5, 5..10, 10..11])]
    #[case(2, 0, &[0..1, 1..2])]
    fn plans_ranges(#[case] entries: u32, #[case] batch_size: u32, #[case] expected: &[Range<u32>]) {
        assert_eq!(plan(entries, batch_size), expected);
    }

    #[test]
    fn shard_paths_extend_the_output_name() {
        assert_eq!(shard_path(Path::new("/tmp/out.db"), 5000), Path::new("/tmp/out.db.shard-5000"));
    }

    fn body(name: &str) -> String {
        format!("<p>{name}</p>{}", "x".repeat(200))
    }

    fn archive() -> MockArchive {
        MockArchive::default()
            .with_content("A/Dog", "Dog", body("dog"))
            .with_content("A/Cat", "Cat", body("cat"))
            .with_content("-/style.css", "", "p {}")
            .with_redirect("A/Kitty", "Kitty", 1)
            .with_content("I/m/Cat.png", "", b"\x89PNG".to_vec())
            .with_unreadable("A/Broken")
            .with_content("A/Ox", "Ox", body("ox"))
    }

    async fn run(dir: &TempDir, workers: usize, batch_size: u32) -> (Database, Vec<ConvertEvent>) {
        let shared: ArchiveHandle = Arc::new(archive());
        let opener: Arc<dyn ArchiveOpener> =
            Arc::new(move || -> zimdb_archive::error::Result<ArchiveHandle> { Ok(Arc::clone(&shared)) });
        let path = dir.path().join("out.db");
        let output = Database::connect(&path, Schema::Articles).await.unwrap();
        let options = Options { workers, batch_size, ..Options::default() };
        let rewriter = Arc::new(Rewriter::new(AssetPolicy::Disabled));
        let events: Vec<_> = convert_sharded(opener, &output, &path, &options, rewriter)
            .map(|event| event.unwrap())
            .collect()
            .await;
        (output, events)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shards_merge_into_the_output() {
        let dir = TempDir::new().unwrap();
        let (output, events) = run(&dir, 2, 3).await;

        assert!(matches!(events.first(), Some(ConvertEvent::Planned { entries: 7, shards: 3 })));
        let merged = events.iter().filter(|event| matches!(event, ConvertEvent::ShardMerged { .. })).count();
        assert_eq!(merged, 3);
        let Some(ConvertEvent::Complete(stats)) = events.last() else { panic!("stream did not complete") };
        assert_eq!(stats.entries, 7);
        assert_eq!((stats.articles, stats.redirects, stats.special, stats.binary, stats.errors), (3, 1, 1, 1, 1));
        assert_eq!(stats.outcomes(), stats.entries);

        assert_eq!(output.article_count().await.unwrap(), 3);
        assert_eq!(output.title_id("kitty").await.unwrap(), Some(1));
        assert_eq!(output.title_id("ox").await.unwrap(), Some(6));
        for start in [0, 3, 6] {
            assert!(!shard_path(&dir.path().join("out.db"), start).exists(), "shard {start} was not deleted");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batch_size_does_not_change_the_output() {
        let small = TempDir::new().unwrap();
        let (sharded, _) = run(&small, 3, 2).await;
        let large = TempDir::new().unwrap();
        let (single, _) = run(&large, 1, 100).await;

        assert_eq!(sharded.titles().await.unwrap(), single.titles().await.unwrap());
        assert_eq!(sharded.article_titles().await.unwrap(), single.article_titles().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unopenable_archives_end_the_stream() {
        let dir = TempDir::new().unwrap();
        let opener: Arc<dyn ArchiveOpener> = Arc::new(|| -> zimdb_archive::error::Result<ArchiveHandle> {
            exn::bail!(zimdb_archive::error::ErrorKind::InvalidArchive("bad magic number"))
        });
        let path = dir.path().join("out.db");
        let output = Database::connect(&path, Schema::Articles).await.unwrap();
        let options = Options::default();
        let rewriter = Arc::new(Rewriter::new(AssetPolicy::Disabled));
        let events: Vec<_> = convert_sharded(opener, &output, &path, &options, rewriter).collect().await;

        assert_eq!(events.len(), 1);
        let Err(err) = &events[0] else { panic!("expected an error") };
        assert!(matches!(&**err, ErrorKind::Archive));
    }
}

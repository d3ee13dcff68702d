use crate::error::{ErrorKind, Result};
use crate::line::{Parsed, parse_line};
use crate::source::Source;
use exn::ResultExt;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::instrument;
use zimdb_store::{Database, Writer};

/// Lines handed from the reader thread to the writer at once.
const BATCH_LINES: usize = 1024;
/// Batches buffered between the reader and the writer.
const CHANNEL_DEPTH: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Lines whose monthly total is lower are dropped.
    pub min_monthly_views: i64,
    pub domains: HashSet<String>,
    /// Input lines between commits.
    pub commit_interval: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { min_monthly_views: 500, domains: HashSet::from(["en.wikipedia".to_string()]), commit_interval: 10_000 }
    }
}

/// What happened to the lines of one import. Every line lands in exactly
/// one counter besides `lines`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub lines: u64,
    pub accepted: u64,
    pub below_threshold: u64,
    pub filtered_domain: u64,
    pub null_id: u64,
    pub malformed: u64,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} accepted, {} below threshold, {} other domains, {} without id, {} malformed",
            self.lines, self.accepted, self.below_threshold, self.filtered_domain, self.null_id, self.malformed
        )
    }
}

/// Stream a dump into `db`, adding each accepted line's views to its page.
///
/// Decompression and line splitting run on a blocking thread; batches of raw
/// lines reach the database writer through a bounded channel, so a slow disk
/// holds the reader back instead of filling memory.
#[instrument(level = "info", skip_all, fields(source = %source))]
pub async fn import(source: Source, db: &Database, options: &ImportOptions) -> Result<Summary> {
    let (tx, mut rx) = mpsc::channel::<Vec<Vec<u8>>>(CHANNEL_DEPTH);
    let reader = tokio::task::spawn_blocking(move || read_batches(&source, &tx));

    let mut writer = Writer::new(db, options.commit_interval);
    let mut summary = Summary::default();
    while let Some(batch) = rx.recv().await {
        for raw in batch {
            summary.lines += 1;
            let parsed = match std::str::from_utf8(&raw) {
                Ok(text) => parse_line(text),
                Err(_) => Parsed::Malformed,
            };
            match parsed {
                Parsed::Malformed => summary.malformed += 1,
                Parsed::NullId => summary.null_id += 1,
                Parsed::Line(line) if line.views < options.min_monthly_views => summary.below_threshold += 1,
                Parsed::Line(line) if !options.domains.contains(line.domain) => summary.filtered_domain += 1,
                Parsed::Line(line) => {
                    let key = line.key();
                    writer.add_pageviews(&key, line.page_id, line.domain, line.views).await.or_raise(|| ErrorKind::Store)?;
                    writer.set_pageview_title(&key, line.title).await.or_raise(|| ErrorKind::Store)?;
                    summary.accepted += 1;
                },
            }
            if writer.tick().await.or_raise(|| ErrorKind::Store)? {
                tracing::info!(lines = summary.lines, accepted = summary.accepted, "Committed checkpoint");
            }
        }
    }

    // The channel closes when the reader stops, successfully or not.
    reader.await.or_raise(|| ErrorKind::Read)??;
    writer.finish().await.or_raise(|| ErrorKind::Store)?;
    tracing::info!(%summary, "Page views imported");
    Ok(summary)
}

fn read_batches(source: &Source, tx: &mpsc::Sender<Vec<Vec<u8>>>) -> Result<()> {
    let mut input = source.open()?;
    let mut batch = Vec::with_capacity(BATCH_LINES);
    loop {
        let mut line = Vec::new();
        if input.read_until(b'\n', &mut line).or_raise(|| ErrorKind::Read)? == 0 {
            break;
        }
        batch.push(line);
        if batch.len() == BATCH_LINES && tx.blocking_send(std::mem::take(&mut batch)).is_err() {
            // The writer gave up; its error is the one worth reporting.
            return Ok(());
        }
    }
    if !batch.is_empty() {
        let _ = tx.blocking_send(batch);
    }
    Ok(())
}

//! Transactional writer with a fixed commit cadence.
//!
//! A [`Writer`] keeps one transaction open and commits it every
//! `commit_interval` processed items, which bounds both memory and how much
//! work a crash can lose. Rows written after the last commit are rolled back
//! if the writer is dropped without [`Writer::finish`].

use crate::Database;
use crate::error::{ErrorKind, Result, classify};
use exn::ResultExt;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

pub struct Writer {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    commit_interval: usize,
    pending: usize,
    commits: usize,
}

impl Writer {
    pub fn new(db: &Database, commit_interval: usize) -> Self {
        Self { pool: db.pool().clone(), tx: None, commit_interval: commit_interval.max(1), pending: 0, commits: 0 }
    }

    async fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await.or_raise(|| ErrorKind::Database)?);
        }
        self.tx.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Database))
    }

    /// Point `title_lower_case` at `id`, replacing whichever id owned it before.
    ///
    /// Returns the id now owning the title, which is always `id`.
    pub async fn assign_title(&mut self, id: u32, title_lower_case: &str) -> Result<u32> {
        let tx = self.tx().await?;
        let owner: i64 = sqlx::query_scalar(include_str!("../queries/assign_title.sql"))
            .bind(i64::from(id))
            .bind(title_lower_case)
            .fetch_one(&mut **tx)
            .await
            .map_err(classify)?;
        u32::try_from(owner).or_raise(|| ErrorKind::InvalidData("id"))
    }

    /// Store an article body, replacing any row with the same id or title.
    pub async fn insert_article(&mut self, id: u32, title: &str, body_zstd: &[u8]) -> Result<()> {
        let tx = self.tx().await?;
        sqlx::query(include_str!("../queries/insert_article.sql"))
            .bind(i64::from(id))
            .bind(title)
            .bind(body_zstd)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Add `views` to the running total for `wiki_domain_id`.
    pub async fn add_pageviews(&mut self, wiki_domain_id: &str, wiki_id: i64, domain: &str, views: i64) -> Result<()> {
        let tx = self.tx().await?;
        sqlx::query(include_str!("../queries/add_pageviews.sql"))
            .bind(wiki_domain_id)
            .bind(wiki_id)
            .bind(domain)
            .bind(views)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    pub async fn set_pageview_title(&mut self, wiki_domain_id: &str, title: &str) -> Result<()> {
        let tx = self.tx().await?;
        sqlx::query(include_str!("../queries/set_pageview_title.sql"))
            .bind(wiki_domain_id)
            .bind(title)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(())
    }

    /// Count one processed item, committing when the interval is reached.
    ///
    /// Returns `true` if this call committed.
    pub async fn tick(&mut self) -> Result<bool> {
        self.pending += 1;
        if self.pending < self.commit_interval {
            return Ok(false);
        }
        self.commit().await?;
        Ok(true)
    }

    /// Commit whatever has been written so far.
    #[instrument(level = "debug", skip(self), fields(pending = self.pending))]
    pub async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.or_raise(|| ErrorKind::Database)?;
            self.commits += 1;
            tracing::debug!(commits = self.commits, "Committed checkpoint");
        }
        self.pending = 0;
        Ok(())
    }

    /// Commit the tail and release the connection.
    pub async fn finish(mut self) -> Result<usize> {
        self.commit().await?;
        Ok(self.commits)
    }
}

//! Folding shard databases into the final output.

use crate::Database;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use tracing::instrument;

/// Rows copied from one shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub articles: u64,
    pub titles: u64,
}

impl Database {
    /// Copy every row of the shard at `shard` into this database.
    ///
    /// Rows whose key already exists are ignored, so for a contested title
    /// the shard merged first keeps it. The copy runs in one transaction; the
    /// shard file is left in place for the caller to delete.
    #[instrument(level = "info", skip(self), fields(shard = %shard.display()))]
    pub async fn merge_shard(&self, shard: &Path) -> Result<MergeReport> {
        let location = shard.to_str().ok_or_raise(|| ErrorKind::InvalidData("shard path"))?;
        let mut conn = self.pool().acquire().await.or_raise(|| ErrorKind::Database)?;

        sqlx::query("ATTACH DATABASE ?1 AS shard")
            .bind(location)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Merge(shard.to_path_buf()))?;
        let copied = copy_rows(&mut conn).await;
        // Detach even when the copy failed, so the pooled connection can attach the next shard.
        let detached = sqlx::query("DETACH DATABASE shard").execute(&mut *conn).await;

        let report = copied.or_raise(|| ErrorKind::Merge(shard.to_path_buf()))?;
        detached.or_raise(|| ErrorKind::Merge(shard.to_path_buf()))?;
        tracing::info!(articles = report.articles, titles = report.titles, "Merged shard");
        Ok(report)
    }
}

async fn copy_rows(conn: &mut SqliteConnection) -> sqlx::Result<MergeReport> {
    let mut tx = conn.begin().await?;
    let articles = sqlx::query(include_str!("../queries/merge_articles.sql")).execute(&mut *tx).await?;
    let titles = sqlx::query(include_str!("../queries/merge_titles.sql")).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(MergeReport { articles: articles.rows_affected(), titles: titles.rows_affected() })
}

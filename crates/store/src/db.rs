//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

// One writer at a time; the second connection serves reads and merges.
const MAX_CONNECTIONS: u32 = 2;

/// Which set of tables a database holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schema {
    /// `articles` and `title_2_id`, as read by offline reader applications.
    Articles,
    /// `pageviews` and `title_2_wiki_domain_id`.
    Pageviews,
}

impl Schema {
    fn ddl(self) -> &'static str {
        match self {
            Schema::Articles => include_str!("../schema/articles.sql"),
            Schema::Pageviews => include_str!("../schema/pageviews.sql"),
        }
    }
}

/// Connection pool onto one output database file.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: u32, schema: Schema, path: Option<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Applies the query-based PRAGMAs to every pooled connection, not
            // just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, path };
        db.apply_schema(schema).await?;
        Ok(db)
    }

    /// Open (creating if missing) the database at `path`.
    pub async fn connect(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, MAX_CONNECTIONS, schema, Some(path.to_path_buf())).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// In-memory databases are destroyed when the connection closes, and are
    /// limited to a single connection so every query sees the same data.
    pub async fn connect_in_memory(schema: Schema) -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        Self::new(options, 1, schema, None).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Readers copy the output onto devices as a single file, so no
            // `-wal`/`-shm` side files.
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -16384;
                PRAGMA temp_store = MEMORY;
                PRAGMA analysis_limit = 1000;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn apply_schema(&self, schema: Schema) -> Result<()> {
        sqlx::query(schema.ddl()).execute(&self.pool).await.or_raise(|| ErrorKind::Schema)?;
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The file backing this database; `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the pool, waiting for outstanding connections to be returned.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn tables(db: &Database) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .unwrap()
    }

    #[rstest]
    #[case(Schema::Articles, &["articles", "title_2_id"])]
    #[case(Schema::Pageviews, &["pageviews", "title_2_wiki_domain_id"])]
    #[tokio::test]
    async fn creates_only_the_requested_tables(#[case] schema: Schema, #[case] expected: &[&str]) {
        let db = Database::connect_in_memory(schema).await.unwrap();
        assert_eq!(tables(&db).await, expected);
        db.close().await;
    }

    #[tokio::test]
    async fn reopening_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikipedia.sqlite");

        let db = Database::connect(&path, Schema::Articles).await.unwrap();
        sqlx::query("INSERT INTO title_2_id (id, title_lower_case) VALUES (1, 'dog')")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;

        let db = Database::connect(&path, Schema::Articles).await.unwrap();
        assert_eq!(db.path(), Some(path.as_path()));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM title_2_id").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn journal_is_not_left_beside_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(dir.path().join("out.sqlite"), Schema::Articles).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode, "delete");
        db.close().await;
    }
}

//! Read-back queries over a finished database.

use crate::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::FromRow;
use zimdb_compress::Compression;

#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[sqlx(rename = "page_content_zstd")]
    pub body_zstd: Vec<u8>,
}

impl Article {
    /// Decompress the stored body.
    pub fn body(&self) -> Result<Vec<u8>> {
        Compression::Zstd.decompress(&self.body_zstd).or_raise(|| ErrorKind::InvalidData("page_content_zstd"))
    }
}

impl Database {
    pub async fn article(&self, id: u32) -> Result<Option<Article>> {
        sqlx::query_as("SELECT id, title, page_content_zstd FROM articles WHERE id = ?1")
            .bind(i64::from(id))
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// The id a lowercase title currently resolves to.
    pub async fn title_id(&self, title_lower_case: &str) -> Result<Option<u32>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM title_2_id WHERE title_lower_case = ?1")
            .bind(title_lower_case)
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        id.map(|id| u32::try_from(id).or_raise(|| ErrorKind::InvalidData("id"))).transpose()
    }

    /// Every `(title_lower_case, id)` pair, ordered by title.
    pub async fn titles(&self) -> Result<Vec<(String, i64)>> {
        sqlx::query_as("SELECT title_lower_case, id FROM title_2_id ORDER BY title_lower_case")
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Every `(id, title)` pair in the article table, ordered by id.
    pub async fn article_titles(&self) -> Result<Vec<(i64, String)>> {
        sqlx::query_as("SELECT id, title FROM articles ORDER BY id")
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn article_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM articles").await
    }

    pub async fn title_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM title_2_id").await
    }

    pub async fn pageviews(&self, wiki_domain_id: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT view_count FROM pageviews WHERE wiki_domain_id = ?1")
            .bind(wiki_domain_id)
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn pageview_title_key(&self, title: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT wiki_domain_id FROM title_2_wiki_domain_id WHERE title = ?1")
            .bind(title)
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn pageview_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM pageviews").await
    }

    async fn count(&self, sql: &'static str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(self.pool()).await.or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Schema, Writer};

    #[tokio::test]
    async fn bodies_decompress() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        let mut writer = Writer::new(&db, 10);
        let body = Compression::Zstd.compress(b"<p>Canine</p>").unwrap();
        writer.insert_article(2, "Canine", &body).await.unwrap();
        writer.finish().await.unwrap();

        let article = db.article(2).await.unwrap().unwrap();
        assert_eq!(article.body().unwrap(), b"<p>Canine</p>");
        assert_eq!(db.article_titles().await.unwrap(), [(2, "Canine".to_string())]);
    }

    #[tokio::test]
    async fn empty_database_reads_as_empty() {
        let db = Database::connect_in_memory(Schema::Articles).await.unwrap();
        assert_eq!(db.article(1).await.unwrap(), None);
        assert_eq!(db.title_id("dog").await.unwrap(), None);
        assert!(db.titles().await.unwrap().is_empty());
        assert_eq!(db.article_count().await.unwrap(), 0);
    }
}

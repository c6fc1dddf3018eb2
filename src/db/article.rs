use super::DBClient;
use crate::models::{Article, ArticleStatus, ArticleTag};

/// Filters shared by the public article listing and its count query.
#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

/// Listing row with the author's nickname joined in.
#[derive(Debug, sqlx::FromRow)]
pub struct ArticleListRow {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_nickname: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

const ARTICLE_COLUMNS: &str =
    "id, title, content, author_id, status, category, is_featured, created_at, updated_at";

/// Article database operations.
pub trait ArticleExt {
    /// Insert an article and its tags in one transaction. `content` must
    /// already be sanitized.
    async fn save_article(
        &self,
        author_id: i32,
        title: &str,
        content: &str,
        category: Option<&str>,
        is_featured: bool,
        tags: &[String],
    ) -> Result<Article, sqlx::Error>;

    async fn get_article(&self, article_id: i32) -> Result<Option<Article>, sqlx::Error>;

    async fn get_article_tags(&self, article_id: i32) -> Result<Vec<ArticleTag>, sqlx::Error>;

    /// Tags for a batch of articles, for assembling list responses.
    async fn get_tags_for_articles(
        &self,
        article_ids: &[i32],
    ) -> Result<Vec<ArticleTag>, sqlx::Error>;

    /// Published articles only, newest first.
    async fn list_published_articles(
        &self,
        filter: &ArticleFilter,
        page: i32,
        limit: i32,
    ) -> Result<Vec<ArticleListRow>, sqlx::Error>;

    async fn count_published_articles(&self, filter: &ArticleFilter)
    -> Result<i64, sqlx::Error>;

    /// Partial update; `tags = Some(..)` replaces the whole tag set.
    async fn update_article(
        &self,
        article_id: i32,
        title: Option<&str>,
        content: Option<&str>,
        category: Option<&str>,
        status: Option<ArticleStatus>,
        is_featured: Option<bool>,
        tags: Option<&[String]>,
    ) -> Result<Article, sqlx::Error>;

    /// Status-only change; soft delete goes through here.
    async fn set_article_status(
        &self,
        article_id: i32,
        status: ArticleStatus,
    ) -> Result<Article, sqlx::Error>;

    /// All articles regardless of status, for the admin console.
    async fn list_articles_admin(
        &self,
        page: i32,
        limit: i32,
    ) -> Result<Vec<crate::dtos::AdminArticleListItemDto>, sqlx::Error>;

    async fn count_articles_admin(&self) -> Result<i64, sqlx::Error>;
}

/// Append the filter's WHERE fragments and collect bind values in order.
/// Placeholders start after the ones the caller already used.
fn push_filter_clauses(
    filter: &ArticleFilter,
    clauses: &mut Vec<String>,
    binds: &mut Vec<String>,
    next_placeholder: &mut usize,
) {
    if filter.featured == Some(true) {
        clauses.push("a.is_featured = TRUE".to_string());
    }
    if let Some(search) = filter.search.as_deref() {
        clauses.push(format!(
            "(a.title ILIKE ${0} OR a.content ILIKE ${0})",
            next_placeholder
        ));
        binds.push(format!("%{}%", search));
        *next_placeholder += 1;
    }
    if let Some(category) = filter.category.as_deref() {
        clauses.push(format!("a.category = ${}", next_placeholder));
        binds.push(category.to_string());
        *next_placeholder += 1;
    }
    if let Some(tag) = filter.tag.as_deref() {
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM article_tags t WHERE t.article_id = a.id AND t.tag_name = ${})",
            next_placeholder
        ));
        binds.push(tag.to_string());
        *next_placeholder += 1;
    }
}

impl ArticleExt for DBClient {
    async fn save_article(
        &self,
        author_id: i32,
        title: &str,
        content: &str,
        category: Option<&str>,
        is_featured: bool,
        tags: &[String],
    ) -> Result<Article, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article = sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles (title, content, author_id, category, is_featured, status) \
             VALUES ($1, $2, $3, $4, $5, 'published') \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(author_id)
        .bind(category)
        .bind(is_featured)
        .fetch_one(&mut *tx)
        .await?;

        for tag in tags {
            sqlx::query("INSERT INTO article_tags (article_id, tag_name) VALUES ($1, $2)")
                .bind(article.id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(article)
    }

    async fn get_article(&self, article_id: i32) -> Result<Option<Article>, sqlx::Error> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    async fn get_article_tags(&self, article_id: i32) -> Result<Vec<ArticleTag>, sqlx::Error> {
        let tags = sqlx::query_as::<_, ArticleTag>(
            "SELECT id, article_id, tag_name FROM article_tags WHERE article_id = $1 ORDER BY id",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn get_tags_for_articles(
        &self,
        article_ids: &[i32],
    ) -> Result<Vec<ArticleTag>, sqlx::Error> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tags = sqlx::query_as::<_, ArticleTag>(
            "SELECT id, article_id, tag_name FROM article_tags \
             WHERE article_id = ANY($1) ORDER BY article_id, id",
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn list_published_articles(
        &self,
        filter: &ArticleFilter,
        page: i32,
        limit: i32,
    ) -> Result<Vec<ArticleListRow>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let mut clauses = vec!["a.status = 'published'".to_string()];
        let mut binds: Vec<String> = Vec::new();
        let mut next_placeholder = 3; // $1, $2 are LIMIT and OFFSET
        push_filter_clauses(filter, &mut clauses, &mut binds, &mut next_placeholder);

        let sql = format!(
            "SELECT a.id, a.title, a.content, u.nickname AS author_nickname, a.created_at \
             FROM articles a JOIN users u ON u.id = a.author_id \
             WHERE {} \
             ORDER BY a.created_at DESC LIMIT $1 OFFSET $2",
            clauses.join(" AND ")
        );

        let mut query = sqlx::query_as::<_, ArticleListRow>(&sql)
            .bind(limit as i64)
            .bind(offset as i64);
        for value in &binds {
            query = query.bind(value);
        }

        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows)
    }

    async fn count_published_articles(
        &self,
        filter: &ArticleFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut clauses = vec!["a.status = 'published'".to_string()];
        let mut binds: Vec<String> = Vec::new();
        let mut next_placeholder = 1;
        push_filter_clauses(filter, &mut clauses, &mut binds, &mut next_placeholder);

        let sql = format!(
            "SELECT COUNT(*) FROM articles a WHERE {}",
            clauses.join(" AND ")
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &binds {
            query = query.bind(value);
        }

        let count = query.fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn update_article(
        &self,
        article_id: i32,
        title: Option<&str>,
        content: Option<&str>,
        category: Option<&str>,
        status: Option<ArticleStatus>,
        is_featured: Option<bool>,
        tags: Option<&[String]>,
    ) -> Result<Article, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET \
             title = COALESCE($2, title), \
             content = COALESCE($3, content), \
             category = COALESCE($4, category), \
             status = COALESCE($5, status), \
             is_featured = COALESCE($6, is_featured), \
             updated_at = Now() \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article_id)
        .bind(title)
        .bind(content)
        .bind(category)
        .bind(status)
        .bind(is_featured)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(tags) = tags {
            sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
                .bind(article_id)
                .execute(&mut *tx)
                .await?;
            for tag in tags {
                sqlx::query("INSERT INTO article_tags (article_id, tag_name) VALUES ($1, $2)")
                    .bind(article_id)
                    .bind(tag)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(article)
    }

    async fn set_article_status(
        &self,
        article_id: i32,
        status: ArticleStatus,
    ) -> Result<Article, sqlx::Error> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET status = $2, updated_at = Now() WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(article)
    }

    async fn list_articles_admin(
        &self,
        page: i32,
        limit: i32,
    ) -> Result<Vec<crate::dtos::AdminArticleListItemDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let rows = sqlx::query_as::<_, crate::dtos::AdminArticleListItemDto>(
            "SELECT a.id, a.title, u.nickname AS author_nickname, a.status, a.created_at \
             FROM articles a JOIN users u ON u.id = a.author_id \
             ORDER BY a.created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_articles_admin(&self) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

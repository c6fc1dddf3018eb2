use super::DBClient;
use crate::models::CardReview;
use chrono::{DateTime, Utc};

pub const MAX_REVIEWS_PER_CARD: i64 = 5;

/// Review sort orders; defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSort {
    TimeDesc,
    TimeAsc,
    ScoreDesc,
    ScoreAsc,
}

impl ReviewSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("time_asc") => ReviewSort::TimeAsc,
            Some("score_desc") => ReviewSort::ScoreDesc,
            Some("score_asc") => ReviewSort::ScoreAsc,
            _ => ReviewSort::TimeDesc,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            ReviewSort::TimeDesc => "r.created_at DESC",
            ReviewSort::TimeAsc => "r.created_at ASC",
            ReviewSort::ScoreDesc => "r.score DESC, r.created_at DESC",
            ReviewSort::ScoreAsc => "r.score ASC, r.created_at DESC",
        }
    }
}

/// Filters for the public review listing of one card.
#[derive(Debug, Default, Clone)]
pub struct ReviewFilter {
    pub min_score: Option<f64>,
    pub latest_version_only: bool,
}

/// Listing row with reviewer identity joined in. `is_expert` marks reviewers
/// at elite member rank or above.
#[derive(Debug, sqlx::FromRow)]
pub struct ReviewRow {
    pub review_id: i32,
    pub reviewer_id: i32,
    pub reviewer_nickname: String,
    pub is_expert: bool,
    pub score: f64,
    pub content: String,
    pub game_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

const REVIEW_COLUMNS: &str = "id, card_id, reviewer_id, score, content, game_version, created_at";

/// Card review database operations.
pub trait ReviewExt {
    async fn get_review_by_reviewer(
        &self,
        card_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<CardReview>, sqlx::Error>;

    /// Insert a review only while the card still has a free slot; None means
    /// all slots were taken.
    async fn insert_review_if_slot_free(
        &self,
        card_id: i32,
        reviewer_id: i32,
        score: f64,
        content: &str,
        game_version: Option<&str>,
    ) -> Result<Option<CardReview>, sqlx::Error>;

    /// Overwrite an existing review; refreshes its timestamp.
    async fn update_review(
        &self,
        review_id: i32,
        score: f64,
        content: &str,
        game_version: Option<&str>,
    ) -> Result<CardReview, sqlx::Error>;

    async fn delete_review(&self, card_id: i32, reviewer_id: i32) -> Result<u64, sqlx::Error>;

    async fn list_reviews(
        &self,
        card_id: i32,
        filter: &ReviewFilter,
        sort: ReviewSort,
        page: i32,
        limit: i32,
    ) -> Result<Vec<ReviewRow>, sqlx::Error>;

    async fn count_reviews_filtered(
        &self,
        card_id: i32,
        filter: &ReviewFilter,
    ) -> Result<i64, sqlx::Error>;

    /// Mean score over ALL of a card's reviews, one decimal place. Listing
    /// filters never affect this number.
    async fn average_score(&self, card_id: i32) -> Result<Option<f64>, sqlx::Error>;
}

fn filter_sql(filter: &ReviewFilter, next_placeholder: usize) -> (String, bool) {
    let mut sql = String::new();
    let mut binds_min_score = false;

    if filter.min_score.is_some() {
        sql.push_str(&format!(" AND r.score >= ${}", next_placeholder));
        binds_min_score = true;
    }
    if filter.latest_version_only {
        // Latest = the highest game_version among this card's own reviews,
        // not the cards.version column (which may lag or be NULL).
        sql.push_str(
            " AND r.game_version = \
             (SELECT MAX(game_version) FROM card_reviews WHERE card_id = r.card_id)",
        );
    }

    (sql, binds_min_score)
}

impl ReviewExt for DBClient {
    async fn get_review_by_reviewer(
        &self,
        card_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<CardReview>, sqlx::Error> {
        let review = sqlx::query_as::<_, CardReview>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM card_reviews WHERE card_id = $1 AND reviewer_id = $2"
        ))
        .bind(card_id)
        .bind(reviewer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn insert_review_if_slot_free(
        &self,
        card_id: i32,
        reviewer_id: i32,
        score: f64,
        content: &str,
        game_version: Option<&str>,
    ) -> Result<Option<CardReview>, sqlx::Error> {
        // The slot check and the insert run as one statement, so concurrent
        // writers cannot both squeeze past the count.
        let review = sqlx::query_as::<_, CardReview>(&format!(
            "INSERT INTO card_reviews (card_id, reviewer_id, score, content, game_version) \
             SELECT $1, $2, $3, $4, $5 \
             WHERE (SELECT COUNT(*) FROM card_reviews WHERE card_id = $1) < $6 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(card_id)
        .bind(reviewer_id)
        .bind(score)
        .bind(content)
        .bind(game_version)
        .bind(MAX_REVIEWS_PER_CARD)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i32,
        score: f64,
        content: &str,
        game_version: Option<&str>,
    ) -> Result<CardReview, sqlx::Error> {
        let review = sqlx::query_as::<_, CardReview>(&format!(
            "UPDATE card_reviews \
             SET score = $2, content = $3, game_version = $4, created_at = Now() \
             WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review_id)
        .bind(score)
        .bind(content)
        .bind(game_version)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn delete_review(&self, card_id: i32, reviewer_id: i32) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM card_reviews WHERE card_id = $1 AND reviewer_id = $2")
                .bind(card_id)
                .bind(reviewer_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn list_reviews(
        &self,
        card_id: i32,
        filter: &ReviewFilter,
        sort: ReviewSort,
        page: i32,
        limit: i32,
    ) -> Result<Vec<ReviewRow>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let (extra_where, binds_min_score) = filter_sql(filter, 4);

        let sql = format!(
            "SELECT r.id AS review_id, r.reviewer_id, u.nickname AS reviewer_nickname, \
                    (u.role IN ('elite_member', 'admin')) AS is_expert, \
                    r.score, r.content, r.game_version, r.created_at \
             FROM card_reviews r JOIN users u ON u.id = r.reviewer_id \
             WHERE r.card_id = $1{extra_where} \
             ORDER BY {order_by} \
             LIMIT $2 OFFSET $3",
            order_by = sort.order_by(),
        );

        let mut query = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(card_id)
            .bind(limit as i64)
            .bind(offset as i64);
        if binds_min_score {
            query = query.bind(filter.min_score);
        }

        let reviews = query.fetch_all(&self.pool).await?;

        Ok(reviews)
    }

    async fn count_reviews_filtered(
        &self,
        card_id: i32,
        filter: &ReviewFilter,
    ) -> Result<i64, sqlx::Error> {
        let (extra_where, binds_min_score) = filter_sql(filter, 2);

        let sql =
            format!("SELECT COUNT(*) FROM card_reviews r WHERE r.card_id = $1{extra_where}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(card_id);
        if binds_min_score {
            query = query.bind(filter.min_score);
        }

        let count = query.fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn average_score(&self, card_id: i32) -> Result<Option<f64>, sqlx::Error> {
        let average = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT ROUND(AVG(score)::numeric, 1)::float8 FROM card_reviews WHERE card_id = $1",
        )
        .bind(card_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_sort_parsing_defaults_to_newest_first() {
        assert_eq!(ReviewSort::parse(None), ReviewSort::TimeDesc);
        assert_eq!(ReviewSort::parse(Some("nonsense")), ReviewSort::TimeDesc);
        assert_eq!(ReviewSort::parse(Some("score_desc")), ReviewSort::ScoreDesc);
        assert_eq!(ReviewSort::parse(Some("time_asc")), ReviewSort::TimeAsc);
    }

    #[test]
    fn score_sorts_break_ties_by_recency() {
        assert!(ReviewSort::ScoreDesc.order_by().contains("r.created_at DESC"));
        assert!(ReviewSort::ScoreAsc.order_by().contains("r.created_at DESC"));
    }

    #[test]
    fn latest_version_filter_uses_the_newest_reviewed_version() {
        let filter = ReviewFilter {
            min_score: None,
            latest_version_only: true,
        };
        let (sql, binds_min_score) = filter_sql(&filter, 4);
        assert!(sql.contains("MAX(game_version) FROM card_reviews"));
        assert!(!sql.contains("FROM cards"));
        assert!(!binds_min_score);
    }
}

use super::DBClient;
use crate::dtos::CardListItemDto;
use crate::models::Card;

/// Equality filters for the card catalog.
#[derive(Debug, Default, Clone)]
pub struct CardFilter {
    pub expansion: Option<String>,
    pub card_class: Option<String>,
    pub rarity: Option<String>,
}

/// Sort keys the catalog accepts. A closed enum, so the ORDER BY assembled
/// below can never receive client text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSort {
    ManaCost,
    CardClass,
    ArenaScore,
    AverageScore,
}

impl CardSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("card_class") => CardSort::CardClass,
            Some("arena_score") => CardSort::ArenaScore,
            Some("average_score") => CardSort::AverageScore,
            _ => CardSort::ManaCost,
        }
    }

    fn column(self) -> &'static str {
        match self {
            CardSort::ManaCost => "c.mana_cost",
            CardSort::CardClass => "c.card_class",
            CardSort::ArenaScore => "c.arena_score",
            CardSort::AverageScore => "average_score",
        }
    }
}

/// Card catalog database operations.
pub trait CardExt {
    async fn get_card(&self, card_id: i32) -> Result<Option<Card>, sqlx::Error>;

    /// Catalog page with each card enriched by its review aggregate and the
    /// highest-influence reviewer's blurb.
    async fn list_cards(
        &self,
        filter: &CardFilter,
        sort: CardSort,
        descending: bool,
        page: i32,
        limit: i32,
    ) -> Result<Vec<CardListItemDto>, sqlx::Error>;

    /// One card with the same enrichment the listing applies.
    async fn get_card_enriched(
        &self,
        card_id: i32,
    ) -> Result<Option<CardListItemDto>, sqlx::Error>;

    async fn count_cards(&self, filter: &CardFilter) -> Result<i64, sqlx::Error>;

    /// Distinct values backing the catalog's filter dropdowns.
    async fn distinct_card_values(&self, column: CardColumn) -> Result<Vec<String>, sqlx::Error>;
}

/// Columns exposed through [`CardExt::distinct_card_values`].
#[derive(Debug, Clone, Copy)]
pub enum CardColumn {
    Expansion,
    CardClass,
    Rarity,
}

impl CardColumn {
    fn name(self) -> &'static str {
        match self {
            CardColumn::Expansion => "expansion",
            CardColumn::CardClass => "card_class",
            CardColumn::Rarity => "rarity",
        }
    }
}

fn push_card_filters(
    filter: &CardFilter,
    clauses: &mut Vec<String>,
    binds: &mut Vec<String>,
    next_placeholder: &mut usize,
) {
    for (column, value) in [
        ("c.expansion", filter.expansion.as_deref()),
        ("c.card_class", filter.card_class.as_deref()),
        ("c.rarity", filter.rarity.as_deref()),
    ] {
        if let Some(value) = value {
            clauses.push(format!("{} = ${}", column, next_placeholder));
            binds.push(value.to_string());
            *next_placeholder += 1;
        }
    }
}

impl CardExt for DBClient {
    async fn get_card(&self, card_id: i32) -> Result<Option<Card>, sqlx::Error> {
        let card = sqlx::query_as::<_, Card>(
            "SELECT id, card_id, name, expansion, mana_cost, card_class, rarity, version, \
             pic, description, arena_score, arena_win_rates, short_review, reviewer_id \
             FROM cards WHERE id = $1",
        )
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn list_cards(
        &self,
        filter: &CardFilter,
        sort: CardSort,
        descending: bool,
        page: i32,
        limit: i32,
    ) -> Result<Vec<CardListItemDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        let mut next_placeholder = 3; // $1, $2 are LIMIT and OFFSET
        push_card_filters(filter, &mut clauses, &mut binds, &mut next_placeholder);

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let direction = if descending { "DESC" } else { "ASC" };

        // Scores are nullable for unreviewed cards; they always sink to the
        // end of the listing regardless of direction.
        let sql = format!(
            "SELECT c.id, c.card_id, c.name, c.expansion, c.mana_cost, c.card_class, \
                    c.rarity, c.version, c.pic, c.description, c.arena_score, \
                    c.arena_win_rates, \
                    COALESCE(best.content, c.short_review) AS short_review, \
                    best.nickname AS reviewer_nickname, \
                    agg.average_score \
             FROM cards c \
             LEFT JOIN LATERAL ( \
                 SELECT r.content, u.nickname \
                 FROM card_reviews r \
                 JOIN users u ON u.id = r.reviewer_id \
                 LEFT JOIN user_profiles p ON p.user_id = r.reviewer_id \
                 WHERE r.card_id = c.id \
                 ORDER BY p.influence DESC NULLS LAST, r.created_at DESC \
                 LIMIT 1 \
             ) best ON TRUE \
             LEFT JOIN LATERAL ( \
                 SELECT ROUND(AVG(r.score)::numeric, 1)::float8 AS average_score \
                 FROM card_reviews r WHERE r.card_id = c.id \
             ) agg ON TRUE \
             {where_sql} \
             ORDER BY {sort_column} {direction} NULLS LAST, c.id ASC \
             LIMIT $1 OFFSET $2",
            sort_column = sort.column(),
        );

        let mut query = sqlx::query_as::<_, CardListItemDto>(&sql)
            .bind(limit as i64)
            .bind(offset as i64);
        for value in &binds {
            query = query.bind(value);
        }

        let cards = query.fetch_all(&self.pool).await?;

        Ok(cards)
    }

    async fn get_card_enriched(
        &self,
        card_id: i32,
    ) -> Result<Option<CardListItemDto>, sqlx::Error> {
        let card = sqlx::query_as::<_, CardListItemDto>(
            "SELECT c.id, c.card_id, c.name, c.expansion, c.mana_cost, c.card_class, \
                    c.rarity, c.version, c.pic, c.description, c.arena_score, \
                    c.arena_win_rates, \
                    COALESCE(best.content, c.short_review) AS short_review, \
                    best.nickname AS reviewer_nickname, \
                    agg.average_score \
             FROM cards c \
             LEFT JOIN LATERAL ( \
                 SELECT r.content, u.nickname \
                 FROM card_reviews r \
                 JOIN users u ON u.id = r.reviewer_id \
                 LEFT JOIN user_profiles p ON p.user_id = r.reviewer_id \
                 WHERE r.card_id = c.id \
                 ORDER BY p.influence DESC NULLS LAST, r.created_at DESC \
                 LIMIT 1 \
             ) best ON TRUE \
             LEFT JOIN LATERAL ( \
                 SELECT ROUND(AVG(r.score)::numeric, 1)::float8 AS average_score \
                 FROM card_reviews r WHERE r.card_id = c.id \
             ) agg ON TRUE \
             WHERE c.id = $1",
        )
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn count_cards(&self, filter: &CardFilter) -> Result<i64, sqlx::Error> {
        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        let mut next_placeholder = 1;
        push_card_filters(filter, &mut clauses, &mut binds, &mut next_placeholder);

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!("SELECT COUNT(*) FROM cards c {where_sql}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &binds {
            query = query.bind(value);
        }

        let count = query.fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn distinct_card_values(
        &self,
        column: CardColumn,
    ) -> Result<Vec<String>, sqlx::Error> {
        let sql = format!(
            "SELECT DISTINCT {0} FROM cards WHERE {0} IS NOT NULL ORDER BY {0}",
            column.name()
        );

        let values = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parsing_defaults_to_mana_cost() {
        assert_eq!(CardSort::parse(None), CardSort::ManaCost);
        assert_eq!(CardSort::parse(Some("bogus")), CardSort::ManaCost);
        assert_eq!(CardSort::parse(Some("arena_score")), CardSort::ArenaScore);
        assert_eq!(
            CardSort::parse(Some("average_score")),
            CardSort::AverageScore
        );
    }

    #[test]
    fn sort_columns_come_from_a_fixed_table() {
        for sort in [
            CardSort::ManaCost,
            CardSort::CardClass,
            CardSort::ArenaScore,
            CardSort::AverageScore,
        ] {
            let column = sort.column();
            assert!(column.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_'));
        }
    }
}

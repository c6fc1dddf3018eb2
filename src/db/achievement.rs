use super::DBClient;
use crate::dtos::AchievementDto;
use crate::models::{Achievement, AchievementStatus};
use chrono::{DateTime, Utc};

/// Filters for achievement listings. `include_hidden` lets the admin console
/// see every status, soft-deleted rows included, so they can be restored.
#[derive(Debug, Default, Clone)]
pub struct AchievementFilter {
    pub member_id: Option<i32>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub include_hidden: bool,
}

const ACHIEVEMENT_COLUMNS: &str = "id, member_id, title, description, season_or_version, \
    rank_or_result, achieved_at, status, is_pinned";

const ACHIEVEMENT_DTO_SELECT: &str = "SELECT a.id, a.member_id, u.nickname AS member_nickname, \
    a.title, a.description, a.season_or_version, a.rank_or_result, a.achieved_at, \
    a.status, a.is_pinned \
    FROM achievements a JOIN users u ON u.id = a.member_id";

/// Public listings only show active rows; the admin console sees every
/// status so a soft-deleted achievement stays reachable for restore.
fn status_clause(include_hidden: bool) -> Option<&'static str> {
    if include_hidden {
        None
    } else {
        Some("a.status = 'active'")
    }
}

/// Achievement database operations.
pub trait AchievementExt {
    async fn get_achievement(
        &self,
        achievement_id: i32,
    ) -> Result<Option<Achievement>, sqlx::Error>;

    /// Pinned achievements first, then most recent results.
    async fn list_achievements(
        &self,
        filter: &AchievementFilter,
    ) -> Result<Vec<AchievementDto>, sqlx::Error>;

    /// The homepage highlight reel: pinned entries first, most recent
    /// results after, capped.
    async fn list_featured_achievements(
        &self,
        limit: i64,
    ) -> Result<Vec<AchievementDto>, sqlx::Error>;

    async fn save_achievement(
        &self,
        member_id: i32,
        title: &str,
        description: Option<&str>,
        season_or_version: Option<&str>,
        rank_or_result: Option<&str>,
        achieved_at: Option<DateTime<Utc>>,
    ) -> Result<AchievementDto, sqlx::Error>;

    async fn update_achievement(
        &self,
        achievement_id: i32,
        title: Option<&str>,
        description: Option<&str>,
        season_or_version: Option<&str>,
        rank_or_result: Option<&str>,
        achieved_at: Option<DateTime<Utc>>,
        status: Option<AchievementStatus>,
        is_pinned: Option<bool>,
    ) -> Result<AchievementDto, sqlx::Error>;
}

impl AchievementExt for DBClient {
    async fn get_achievement(
        &self,
        achievement_id: i32,
    ) -> Result<Option<Achievement>, sqlx::Error> {
        let achievement = sqlx::query_as::<_, Achievement>(&format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = $1"
        ))
        .bind(achievement_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    async fn list_achievements(
        &self,
        filter: &AchievementFilter,
    ) -> Result<Vec<AchievementDto>, sqlx::Error> {
        let mut clauses: Vec<String> = status_clause(filter.include_hidden)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut next_placeholder = 1;

        if filter.member_id.is_some() {
            clauses.push(format!("a.member_id = ${}", next_placeholder));
            next_placeholder += 1;
        }
        if filter.from_date.is_some() {
            clauses.push(format!("a.achieved_at >= ${}", next_placeholder));
            next_placeholder += 1;
        }
        if filter.to_date.is_some() {
            clauses.push(format!("a.achieved_at <= ${}", next_placeholder));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "{ACHIEVEMENT_DTO_SELECT}{where_sql} \
             ORDER BY a.is_pinned DESC, a.achieved_at DESC NULLS LAST, a.id DESC"
        );

        let mut query = sqlx::query_as::<_, AchievementDto>(&sql);
        if let Some(member_id) = filter.member_id {
            query = query.bind(member_id);
        }
        if let Some(from_date) = filter.from_date {
            query = query.bind(from_date);
        }
        if let Some(to_date) = filter.to_date {
            query = query.bind(to_date);
        }

        let achievements = query.fetch_all(&self.pool).await?;

        Ok(achievements)
    }

    async fn list_featured_achievements(
        &self,
        limit: i64,
    ) -> Result<Vec<AchievementDto>, sqlx::Error> {
        let achievements = sqlx::query_as::<_, AchievementDto>(&format!(
            "{ACHIEVEMENT_DTO_SELECT} WHERE a.status = 'active' \
             ORDER BY a.is_pinned DESC, a.achieved_at DESC NULLS LAST, a.id DESC \
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn save_achievement(
        &self,
        member_id: i32,
        title: &str,
        description: Option<&str>,
        season_or_version: Option<&str>,
        rank_or_result: Option<&str>,
        achieved_at: Option<DateTime<Utc>>,
    ) -> Result<AchievementDto, sqlx::Error> {
        let achievement = sqlx::query_as::<_, AchievementDto>(
            "WITH inserted AS ( \
                 INSERT INTO achievements \
                     (member_id, title, description, season_or_version, rank_or_result, \
                      achieved_at, status, is_pinned) \
                 VALUES ($1, $2, $3, $4, $5, $6, 'active', FALSE) \
                 RETURNING * \
             ) \
             SELECT i.id, i.member_id, u.nickname AS member_nickname, i.title, \
                    i.description, i.season_or_version, i.rank_or_result, i.achieved_at, \
                    i.status, i.is_pinned \
             FROM inserted i JOIN users u ON u.id = i.member_id",
        )
        .bind(member_id)
        .bind(title)
        .bind(description)
        .bind(season_or_version)
        .bind(rank_or_result)
        .bind(achieved_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(achievement)
    }

    async fn update_achievement(
        &self,
        achievement_id: i32,
        title: Option<&str>,
        description: Option<&str>,
        season_or_version: Option<&str>,
        rank_or_result: Option<&str>,
        achieved_at: Option<DateTime<Utc>>,
        status: Option<AchievementStatus>,
        is_pinned: Option<bool>,
    ) -> Result<AchievementDto, sqlx::Error> {
        let achievement = sqlx::query_as::<_, AchievementDto>(
            "WITH updated AS ( \
                 UPDATE achievements SET \
                     title = COALESCE($2, title), \
                     description = COALESCE($3, description), \
                     season_or_version = COALESCE($4, season_or_version), \
                     rank_or_result = COALESCE($5, rank_or_result), \
                     achieved_at = COALESCE($6, achieved_at), \
                     status = COALESCE($7, status), \
                     is_pinned = COALESCE($8, is_pinned) \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT d.id, d.member_id, u.nickname AS member_nickname, d.title, \
                    d.description, d.season_or_version, d.rank_or_result, d.achieved_at, \
                    d.status, d.is_pinned \
             FROM updated d JOIN users u ON u.id = d.member_id",
        )
        .bind(achievement_id)
        .bind(title)
        .bind(description)
        .bind(season_or_version)
        .bind(rank_or_result)
        .bind(achieved_at)
        .bind(status)
        .bind(is_pinned)
        .fetch_one(&self.pool)
        .await?;

        Ok(achievement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_listing_only_sees_active_rows() {
        assert_eq!(status_clause(false), Some("a.status = 'active'"));
    }

    #[test]
    fn admin_listing_keeps_soft_deleted_rows_reachable() {
        assert_eq!(status_clause(true), None);
    }
}

use super::DBClient;
use crate::models::HomepageConfig;

const HOMEPAGE_COLUMNS: &str =
    "id, team_logo_url, banner_images, featured_achievements, featured_members";

/// Homepage configuration; a singleton row created lazily on first write.
pub trait HomepageExt {
    async fn get_homepage_config(&self) -> Result<Option<HomepageConfig>, sqlx::Error>;

    /// Partial update of the singleton row, creating it if missing.
    async fn upsert_homepage_config(
        &self,
        team_logo_url: Option<&str>,
        banner_images: Option<&serde_json::Value>,
        featured_achievements: Option<&serde_json::Value>,
        featured_members: Option<&serde_json::Value>,
    ) -> Result<HomepageConfig, sqlx::Error>;
}

impl HomepageExt for DBClient {
    async fn get_homepage_config(&self) -> Result<Option<HomepageConfig>, sqlx::Error> {
        let config = sqlx::query_as::<_, HomepageConfig>(&format!(
            "SELECT {HOMEPAGE_COLUMNS} FROM homepage_config ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn upsert_homepage_config(
        &self,
        team_logo_url: Option<&str>,
        banner_images: Option<&serde_json::Value>,
        featured_achievements: Option<&serde_json::Value>,
        featured_members: Option<&serde_json::Value>,
    ) -> Result<HomepageConfig, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing_id = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM homepage_config ORDER BY id LIMIT 1 FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing_id {
            Some(id) => id,
            None => {
                sqlx::query_scalar::<_, i32>(
                    "INSERT INTO homepage_config DEFAULT VALUES RETURNING id",
                )
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let config = sqlx::query_as::<_, HomepageConfig>(&format!(
            "UPDATE homepage_config SET \
             team_logo_url = COALESCE($2, team_logo_url), \
             banner_images = COALESCE($3, banner_images), \
             featured_achievements = COALESCE($4, featured_achievements), \
             featured_members = COALESCE($5, featured_members) \
             WHERE id = $1 \
             RETURNING {HOMEPAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(team_logo_url)
        .bind(banner_images)
        .bind(featured_achievements)
        .bind(featured_members)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(config)
    }
}

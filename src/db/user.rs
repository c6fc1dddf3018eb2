use super::DBClient;
use crate::dtos::{ProfileDto, UpdateProfileDto};
use crate::models::{EmailVerificationCode, User, UserProfile, UserRole};
use chrono::{DateTime, Utc};

/// User and registration database operations.
pub trait UserExt {
    /// Get single user by ID, username, or email. Returns None if not found.
    async fn get_user(
        &self,
        user_id: Option<i32>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Look up a user where the identifier may be either username or email.
    async fn get_user_by_identifier(&self, identifier: &str)
    -> Result<Option<User>, sqlx::Error>;

    /// Check whether the username or email is already registered.
    async fn username_or_email_exists(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error>;

    /// Get paginated list of all users, newest first.
    async fn get_users(&self, page: i32, limit: i32) -> Result<Vec<User>, sqlx::Error>;

    /// Get total count of all users.
    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    /// Create the user, their empty profile, and consume the verification
    /// code, all in one transaction.
    async fn register_user(
        &self,
        username: &str,
        nickname: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        verification_code_id: i32,
    ) -> Result<User, sqlx::Error>;

    /// Update a user's role.
    async fn update_user_role(&self, user_id: i32, role: UserRole) -> Result<User, sqlx::Error>;

    /// Issue a fresh verification code; any earlier unused codes for the same
    /// email are invalidated in the same transaction.
    async fn save_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerificationCode, sqlx::Error>;

    /// Find an unexpired, unused code matching (email, code).
    async fn find_valid_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<EmailVerificationCode>, sqlx::Error>;

    /// Get a user's profile row.
    async fn get_profile(&self, user_id: i32) -> Result<Option<UserProfile>, sqlx::Error>;

    /// Joined profile view for one user.
    async fn get_profile_dto(&self, user_id: i32) -> Result<Option<ProfileDto>, sqlx::Error>;

    /// Roster of everyone at member rank or above, strongest influence first.
    async fn list_member_profiles(&self) -> Result<Vec<ProfileDto>, sqlx::Error>;

    /// Member's own profile edit. The nickname lives on the users row, the
    /// rest on the profile; both change in one transaction.
    async fn update_profile(
        &self,
        user_id: i32,
        update: &UpdateProfileDto,
    ) -> Result<ProfileDto, sqlx::Error>;

    /// Admin-only fields: influence and current season rank.
    async fn admin_update_profile(
        &self,
        user_id: i32,
        influence: Option<i32>,
        current_season_rank: Option<i32>,
    ) -> Result<ProfileDto, sqlx::Error>;
}

const USER_COLUMNS: &str =
    "id, username, password_hash, nickname, email, role, created_at, updated_at";

const PROFILE_DTO_SELECT: &str = "SELECT p.user_id, u.nickname, u.role, p.avatar_url, p.age, \
    p.gender, p.strength_score, p.bio, p.avg_arena_wins, p.arena_best_rank, p.other_tags, \
    p.influence, p.current_season_rank \
    FROM user_profiles p JOIN users u ON u.id = p.user_id";

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<i32>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn get_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn username_or_email_exists(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_users(&self, page: i32, limit: i32) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn register_user(
        &self,
        username: &str,
        nickname: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
        verification_code_id: i32,
    ) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, nickname, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(nickname)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE email_verification_codes SET used = TRUE WHERE id = $1")
            .bind(verification_code_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn update_user_role(&self, user_id: i32, role: UserRole) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1, updated_at = Now() WHERE id = $2 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(role)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn save_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerificationCode, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // only one live code per email at any time
        sqlx::query("UPDATE email_verification_codes SET used = TRUE WHERE email = $1 AND used = FALSE")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, EmailVerificationCode>(
            "INSERT INTO email_verification_codes (email, code, expires_at) \
             VALUES ($1, $2, $3) \
             RETURNING id, email, code, created_at, expires_at, used",
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn find_valid_verification_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<EmailVerificationCode>, sqlx::Error> {
        let record = sqlx::query_as::<_, EmailVerificationCode>(
            "SELECT id, email, code, created_at, expires_at, used \
             FROM email_verification_codes \
             WHERE email = $1 AND code = $2 AND used = FALSE AND expires_at > Now()",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_profile(&self, user_id: i32) -> Result<Option<UserProfile>, sqlx::Error> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT id, user_id, avatar_url, age, gender, strength_score, bio, \
             avg_arena_wins, arena_best_rank, other_tags, influence, current_season_rank \
             FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_profile_dto(&self, user_id: i32) -> Result<Option<ProfileDto>, sqlx::Error> {
        let profile = sqlx::query_as::<_, ProfileDto>(&format!(
            "{PROFILE_DTO_SELECT} WHERE p.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn list_member_profiles(&self) -> Result<Vec<ProfileDto>, sqlx::Error> {
        let profiles = sqlx::query_as::<_, ProfileDto>(&format!(
            "{PROFILE_DTO_SELECT} \
             WHERE u.role IN ('member', 'elite_member', 'admin') \
             ORDER BY p.influence DESC NULLS LAST, u.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn update_profile(
        &self,
        user_id: i32,
        update: &UpdateProfileDto,
    ) -> Result<ProfileDto, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if let Some(nickname) = update.nickname.as_deref() {
            sqlx::query("UPDATE users SET nickname = $1, updated_at = Now() WHERE id = $2")
                .bind(nickname)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "UPDATE user_profiles SET \
             avatar_url = COALESCE($2, avatar_url), \
             age = COALESCE($3, age), \
             gender = COALESCE($4, gender), \
             strength_score = COALESCE($5, strength_score), \
             bio = COALESCE($6, bio), \
             avg_arena_wins = COALESCE($7, avg_arena_wins), \
             arena_best_rank = COALESCE($8, arena_best_rank), \
             other_tags = COALESCE($9, other_tags) \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(update.avatar_url.as_deref())
        .bind(update.age)
        .bind(update.gender.as_deref())
        .bind(update.strength_score.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.avg_arena_wins)
        .bind(update.arena_best_rank.as_deref())
        .bind(update.other_tags.as_deref())
        .execute(&mut *tx)
        .await?;

        let profile = sqlx::query_as::<_, ProfileDto>(&format!(
            "{PROFILE_DTO_SELECT} WHERE p.user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(profile)
    }

    async fn admin_update_profile(
        &self,
        user_id: i32,
        influence: Option<i32>,
        current_season_rank: Option<i32>,
    ) -> Result<ProfileDto, sqlx::Error> {
        sqlx::query(
            "UPDATE user_profiles SET \
             influence = COALESCE($2, influence), \
             current_season_rank = COALESCE($3, current_season_rank) \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(influence)
        .bind(current_season_rank)
        .execute(&self.pool)
        .await?;

        let profile = sqlx::query_as::<_, ProfileDto>(&format!(
            "{PROFILE_DTO_SELECT} WHERE p.user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}

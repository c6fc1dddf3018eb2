use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// Member role ladder used for role-based access control.
///
/// Stored in the database as the PostgreSQL ENUM "user_role". The variants
/// form a total order (visitor < user < member < elite_member < admin) but the
/// comparison always goes through [`UserRole::rank`] rather than declaration
/// order, so reordering variants can never silently change authorization.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Visitor,
    User,
    Member,
    EliteMember,
    Admin,
}

impl UserRole {
    /// Explicit total-order mapping for privilege comparison.
    pub fn rank(&self) -> u8 {
        match self {
            UserRole::Visitor => 0,
            UserRole::User => 1,
            UserRole::Member => 2,
            UserRole::EliteMember => 3,
            UserRole::Admin => 4,
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Visitor => "visitor",
            UserRole::User => "user",
            UserRole::Member => "member",
            UserRole::EliteMember => "elite_member",
            UserRole::Admin => "admin",
        }
    }
}

/// User row; `password_hash` is the server-side argon2 hash of the
/// client-submitted digest, never a plaintext password.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One-to-one extension of a user; created empty at registration.
/// `influence` and `current_season_rank` are admin-maintained.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct UserProfile {
    pub id: i32,
    pub user_id: i32,
    pub avatar_url: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub strength_score: Option<String>,
    pub bio: Option<String>,
    pub avg_arena_wins: Option<f64>,
    pub arena_best_rank: Option<String>,
    pub other_tags: Option<String>,
    pub influence: Option<i32>,
    pub current_season_rank: Option<i32>,
}

/// Article lifecycle. Deletion is a status change, never a row removal:
/// deleted articles stay queryable for admins but drop out of public listings.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "article_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
    Deleted,
}

impl ArticleStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Article {
    pub id: i32,
    pub title: String,
    /// Sanitized HTML; cleaned with ammonia before it ever reaches this row.
    pub content: String,
    pub author_id: i32,
    pub status: ArticleStatus,
    pub category: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ArticleTag {
    pub id: i32,
    pub article_id: i32,
    pub tag_name: String,
}

/// Comment in a self-referential tree: `parent_id = None` marks a top-level
/// comment. Only top-level comments may carry the pin flag.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i32,
    pub article_id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub is_pinned: bool,
    pub pinned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Card {
    pub id: i32,
    pub card_id: Option<i32>,
    pub name: String,
    pub expansion: String,
    pub mana_cost: i32,
    pub card_class: String,
    pub rarity: String,
    pub version: Option<String>,
    pub pic: Option<String>,
    pub description: Option<String>,
    pub arena_score: Option<i32>,
    pub arena_win_rates: serde_json::Value,
    /// Static editorial one-liner, the fallback when nobody has reviewed yet.
    pub short_review: Option<String>,
    pub reviewer_id: Option<i32>,
}

/// Crowd-sourced card review; at most one per (card, reviewer) and at most
/// five per card. `created_at` doubles as the last-updated instant on upsert.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct CardReview {
    pub id: i32,
    pub card_id: i32,
    pub reviewer_id: i32,
    pub score: f64,
    pub content: String,
    pub game_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "achievement_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    Active,
    Archived,
    Deleted,
}

impl AchievementStatus {
    pub fn to_str(&self) -> &str {
        match self {
            AchievementStatus::Active => "active",
            AchievementStatus::Archived => "archived",
            AchievementStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Achievement {
    pub id: i32,
    pub member_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub season_or_version: Option<String>,
    pub rank_or_result: Option<String>,
    pub achieved_at: Option<DateTime<Utc>>,
    pub status: AchievementStatus,
    pub is_pinned: bool,
}

/// Singleton homepage configuration. The JSON columns have accumulated both
/// array and object shapes over time, so readers normalize them to lists.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct HomepageConfig {
    pub id: i32,
    pub team_logo_url: Option<String>,
    pub banner_images: Option<serde_json::Value>,
    pub featured_achievements: Option<serde_json::Value>,
    pub featured_members: Option<serde_json::Value>,
}

/// Short-lived one-time registration code; superseded codes for the same
/// email are marked used when a new one is issued.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct EmailVerificationCode {
    pub id: i32,
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_is_total_and_strict() {
        let ladder = [
            UserRole::Visitor,
            UserRole::User,
            UserRole::Member,
            UserRole::EliteMember,
            UserRole::Admin,
        ];
        for pair in ladder.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert_eq!(UserRole::Visitor.rank(), 0);
        assert_eq!(UserRole::Admin.rank(), 4);
    }

    #[test]
    fn role_serializes_as_snake_case() {
        let json = serde_json::to_string(&UserRole::EliteMember).unwrap();
        assert_eq!(json, "\"elite_member\"");
        let back: UserRole = serde_json::from_str("\"elite_member\"").unwrap();
        assert_eq!(back, UserRole::EliteMember);
    }

    #[test]
    fn statuses_roundtrip_their_wire_names() {
        assert_eq!(ArticleStatus::Published.to_str(), "published");
        let status: ArticleStatus = serde_json::from_str("\"deleted\"").unwrap();
        assert_eq!(status, ArticleStatus::Deleted);
        let status: AchievementStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(status, AchievementStatus::Archived);
    }
}

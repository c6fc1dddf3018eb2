use crate::models::{AchievementStatus, ArticleStatus, User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// Request/response types exchanged with clients, kept separate from the
// database models so handlers control exactly what gets exposed.

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SendVerificationCodeDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,
}

/// Registration request. `password_digest` is the client-side one-way hash
/// of the password; the server never sees the plaintext.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, max = 50, message = "Nickname is required"))]
    pub nickname: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password digest is required"))]
    pub password_digest: String,

    #[validate(length(min = 1, message = "Verification code is required"))]
    pub verification_code: String,

    /// Optional membership-code digest deciding the initial role.
    pub membership_code_digest: Option<String>,
}

/// Login accepts either username or email as the identifier.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Username or email is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password digest is required"))]
    pub password_digest: String,
}

/// Lets the client look up the username behind an email before computing
/// its prefixed credential digest.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResolveUsernameDto {
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub nickname: String,
}

/// Client-safe user projection; never carries the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: i32,
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id,
            username: user.username.to_owned(),
            nickname: user.nickname.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveUsernameResponseDto {
    pub status: String,
    pub username: String,
}

/// Generic success envelope.
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: i32,
    pub limit: i32,
    pub total: i32,
    pub total_pages: i32,
}

impl PaginationDto {
    pub fn new(page: i32, limit: i32, total: i64) -> Self {
        let total_pages = (total as f64 / limit as f64).ceil() as i32;
        PaginationDto {
            page,
            limit,
            total: total as i32,
            total_pages,
        }
    }
}

/// Generic page/limit query used by the admin listings.
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i32>,
}

// ============================================================================
// Article DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ArticlesPagedQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i32>,

    pub featured: Option<bool>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateArticleDto {
    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required."))]
    pub content: String,

    pub category: Option<String>,
    pub is_featured: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateArticleDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub content: Option<String>,

    pub category: Option<String>,
    pub status: Option<ArticleStatus>,
    pub is_featured: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleTagDto {
    pub id: i32,
    pub tag_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleDto {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: i32,
    pub author_nickname: String,
    pub status: ArticleStatus,
    pub category: Option<String>,
    pub is_featured: bool,
    pub tags: Vec<ArticleTagDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection: excerpt instead of the full body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListItemDto {
    pub id: i32,
    pub title: String,
    pub excerpt: String,
    pub author_nickname: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponseDto {
    pub status: String,
    pub data: Vec<ArticleListItemDto>,
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleArticleResponseDto {
    pub status: String,
    pub data: ArticleDto,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct InputCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Content must be between 1 and 1000 characters"
    ))]
    pub content: String,

    /// Reply target; None for a top-level comment.
    pub parent_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Content must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PinCommentDto {
    pub pinned: bool,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentDto {
    pub id: i32,
    pub article_id: i32,
    pub user_id: i32,
    pub user_nickname: String,
    pub parent_id: Option<i32>,
    pub content: String,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponseDto {
    pub status: String,
    pub data: Vec<CommentDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleCommentResponseDto {
    pub status: String,
    pub data: CommentDto,
}

// ============================================================================
// Card DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CardsQueryDto {
    pub expansion: Option<String>,
    pub card_class: Option<String>,
    pub rarity: Option<String>,

    #[validate(custom(function = "validate_card_sort"))]
    pub sort: Option<String>,

    #[validate(custom(function = "validate_order"))]
    pub order: Option<String>,

    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i32>,
}

fn validate_card_sort(sort: &str) -> Result<(), validator::ValidationError> {
    match sort {
        "mana_cost" | "card_class" | "arena_score" | "average_score" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_sort")),
    }
}

fn validate_order(order: &str) -> Result<(), validator::ValidationError> {
    match order {
        "asc" | "desc" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_order")),
    }
}

/// Card enriched for listings: `average_score` over all its reviews and
/// `short_review`/`reviewer_nickname` taken from the highest-influence
/// reviewer's review, falling back to the card's static blurb.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardListItemDto {
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
    pub short_review: Option<String>,
    pub reviewer_nickname: Option<String>,
    pub average_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CardListResponseDto {
    pub status: String,
    pub data: Vec<CardListItemDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct SingleCardResponseDto {
    pub status: String,
    pub data: CardListItemDto,
}

#[derive(Debug, Serialize)]
pub struct StringListResponseDto {
    pub status: String,
    pub data: Vec<String>,
}

// ============================================================================
// Card review DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpsertReviewDto {
    #[validate(range(min = 0.0, max = 10.0, message = "Score must be between 0 and 10"))]
    pub score: f64,

    #[validate(custom(function = "validate_review_content"))]
    pub content: String,

    pub game_version: Option<String>,
}

// The 200-character cap applies to the trimmed text; surrounding
// whitespace is stripped before storage and must not count.
fn validate_review_content(content: &str) -> Result<(), validator::ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return Err(validator::ValidationError::new("invalid_content"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewsQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<i32>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i32>,

    #[validate(custom(function = "validate_review_sort"))]
    pub sort: Option<String>,

    #[validate(range(min = 0.0, max = 10.0))]
    pub min_score: Option<f64>,

    pub latest_version_only: Option<bool>,
}

fn validate_review_sort(sort: &str) -> Result<(), validator::ValidationError> {
    match sort {
        "time_desc" | "time_asc" | "score_desc" | "score_asc" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_sort")),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MyReviewDto {
    pub review_id: i32,
    pub score: f64,
    pub content: String,
    pub game_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewerDto {
    pub id: i32,
    pub name: String,
    pub is_expert: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewItemDto {
    pub review_id: i32,
    pub reviewer: ReviewerDto,
    pub score: f64,
    pub content: String,
    pub game_version: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewCardInfoDto {
    pub id: i32,
    pub name: String,
    pub image_url: Option<String>,
    /// Mean of ALL reviews for this card, one decimal; independent of any
    /// listing filters.
    pub average_score: Option<f64>,
    pub card_class: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponseDto {
    pub status: String,
    pub card_info: ReviewCardInfoDto,
    pub reviews: Vec<ReviewItemDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct SingleReviewResponseDto {
    pub status: String,
    pub data: MyReviewDto,
}

#[derive(Debug, Serialize)]
pub struct MaybeReviewResponseDto {
    pub status: String,
    pub data: Option<MyReviewDto>,
}

// ============================================================================
// Member & profile DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileDto {
    pub user_id: i32,
    pub nickname: String,
    pub role: UserRole,
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

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 50))]
    pub nickname: Option<String>,

    pub avatar_url: Option<String>,

    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,

    pub gender: Option<String>,
    pub strength_score: Option<String>,
    pub bio: Option<String>,
    pub avg_arena_wins: Option<f64>,
    pub arena_best_rank: Option<String>,
    pub other_tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponseDto {
    pub status: String,
    pub data: ProfileDto,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponseDto {
    pub status: String,
    pub data: Vec<ProfileDto>,
}

#[derive(Debug, Serialize)]
pub struct MemberDetailResponseDto {
    pub status: String,
    pub user: FilterUserDto,
    pub profile: Option<ProfileDto>,
}

// ============================================================================
// Achievement DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AchievementsQueryDto {
    pub member_id: Option<i32>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementDto {
    pub id: i32,
    pub member_id: i32,
    pub member_nickname: String,
    pub title: String,
    pub description: Option<String>,
    pub season_or_version: Option<String>,
    pub rank_or_result: Option<String>,
    pub achieved_at: Option<DateTime<Utc>>,
    pub status: AchievementStatus,
    pub is_pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct AchievementListResponseDto {
    pub status: String,
    pub data: Vec<AchievementDto>,
}

#[derive(Debug, Serialize)]
pub struct SingleAchievementResponseDto {
    pub status: String,
    pub data: AchievementDto,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAchievementDto {
    pub member_id: i32,

    #[validate(length(min = 1, max = 255, message = "Title is required."))]
    pub title: String,

    pub description: Option<String>,
    pub season_or_version: Option<String>,
    pub rank_or_result: Option<String>,
    pub achieved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateAchievementDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub season_or_version: Option<String>,
    pub rank_or_result: Option<String>,
    pub achieved_at: Option<DateTime<Utc>>,
    pub status: Option<AchievementStatus>,
    pub is_pinned: Option<bool>,
}

// ============================================================================
// Admin DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdateDto {
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct AdminProfileUpdateDto {
    pub influence: Option<i32>,
    pub current_season_rank: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminArticleListItemDto {
    pub id: i32,
    pub title: String,
    pub author_nickname: String,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminArticleListResponseDto {
    pub status: String,
    pub data: Vec<AdminArticleListItemDto>,
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct AdminUpdateArticleDto {
    pub status: Option<ArticleStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

// ============================================================================
// Homepage DTOs
// ============================================================================

/// Outgoing homepage config with the JSON columns normalized to lists.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomepageConfigDto {
    pub id: i32,
    pub team_logo_url: Option<String>,
    pub banner_images: Vec<serde_json::Value>,
    pub featured_achievements: Vec<serde_json::Value>,
    pub featured_members: Vec<serde_json::Value>,
}

impl HomepageConfigDto {
    pub fn from_model(config: &crate::models::HomepageConfig) -> Self {
        HomepageConfigDto {
            id: config.id,
            team_logo_url: config.team_logo_url.clone(),
            banner_images: normalize_json_list(config.banner_images.as_ref()),
            featured_achievements: normalize_json_list(config.featured_achievements.as_ref()),
            featured_members: normalize_json_list(config.featured_members.as_ref()),
        }
    }
}

/// Older rows stored these columns as objects keyed by position, newer ones
/// as arrays. Either way the API returns a plain list.
pub fn normalize_json_list(value: Option<&serde_json::Value>) -> Vec<serde_json::Value> {
    match value {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(serde_json::Value::Object(map)) => map.values().cloned().collect(),
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateHomepageDto {
    pub team_logo_url: Option<String>,
    pub banner_images: Option<serde_json::Value>,
    pub featured_achievements: Option<serde_json::Value>,
    pub featured_members: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct HomepageResponseDto {
    pub status: String,
    pub data: HomepageConfigDto,
}

// ============================================================================
// Upload DTOs
// ============================================================================

#[derive(Serialize)]
pub struct UploadResponseDto {
    pub status: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_lists_normalize_from_any_stored_shape() {
        assert_eq!(
            normalize_json_list(Some(&json!(["a", "b"]))),
            vec![json!("a"), json!("b")]
        );

        let from_object = normalize_json_list(Some(&json!({"0": "a", "1": "b"})));
        assert_eq!(from_object.len(), 2);
        assert!(from_object.contains(&json!("a")));

        assert!(normalize_json_list(None).is_empty());
        assert!(normalize_json_list(Some(&serde_json::Value::Null)).is_empty());
        assert_eq!(normalize_json_list(Some(&json!("solo"))), vec![json!("solo")]);
    }

    #[test]
    fn review_sort_keys_are_a_closed_set() {
        assert!(validate_review_sort("time_desc").is_ok());
        assert!(validate_review_sort("score_asc").is_ok());
        assert!(validate_review_sort("created_at").is_err());
        assert!(validate_review_sort("score; DROP TABLE cards").is_err());
    }

    #[test]
    fn card_sort_keys_are_a_closed_set() {
        assert!(validate_card_sort("mana_cost").is_ok());
        assert!(validate_card_sort("average_score").is_ok());
        assert!(validate_card_sort("name").is_err());
        assert!(validate_order("asc").is_ok());
        assert!(validate_order("sideways").is_err());
    }

    #[test]
    fn upsert_review_bounds_are_enforced() {
        let ok = UpsertReviewDto {
            score: 10.0,
            content: "solid arena pick".to_string(),
            game_version: None,
        };
        assert!(ok.validate().is_ok());

        let high = UpsertReviewDto {
            score: 10.5,
            content: "x".to_string(),
            game_version: None,
        };
        assert!(high.validate().is_err());

        let long = UpsertReviewDto {
            score: 5.0,
            content: "x".repeat(201),
            game_version: None,
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn review_content_cap_ignores_surrounding_whitespace() {
        let padded = UpsertReviewDto {
            score: 5.0,
            content: format!("  {}  \n", "x".repeat(200)),
            game_version: None,
        };
        assert!(padded.validate().is_ok());

        let blank = UpsertReviewDto {
            score: 5.0,
            content: "   \n ".to_string(),
            game_version: None,
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn filter_user_omits_the_password_hash() {
        let user = crate::models::User {
            id: 7,
            username: "fan".to_string(),
            password_hash: "$argon2id$...".to_string(),
            nickname: "Fan".to_string(),
            email: "fan@team.example".to_string(),
            role: UserRole::Member,
            created_at: None,
            updated_at: None,
        };
        let filtered = FilterUserDto::filter_user(&user);
        let json = serde_json::to_string(&filtered).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(filtered.role, "member");
    }
}

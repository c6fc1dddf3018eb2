use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use validator::Validate;

use crate::AppState;
use crate::db::achievement::AchievementFilter;
use crate::db::{AchievementExt, ArticleExt, HomepageExt, UserExt};
use crate::dtos::{
    AchievementListResponseDto, AdminArticleListResponseDto, AdminProfileUpdateDto,
    AdminUpdateArticleDto, CreateAchievementDto, FilterUserDto, HomepageConfigDto,
    HomepageResponseDto, PaginationDto, ProfileResponseDto, RequestQueryDto, Response,
    RoleUpdateDto, SingleAchievementResponseDto, UpdateAchievementDto, UserListResponseDto,
    UserResponseDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::JWTAuthMiddleware;
use crate::models::AchievementStatus;

use tracing::instrument;

/// Admin console routes. The auth and admin-role gates are layered on in
/// routes.rs, so every handler here can assume an admin caller.
pub fn admin_handler() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users))
        .route("/users/{user_id}/role", put(update_user_role))
        .route("/users/{user_id}/profile", put(update_user_profile))
        .route("/articles", get(get_all_articles))
        .route("/articles/{article_id}", put(update_article_moderation))
        .route("/achievements", get(get_all_achievements).post(create_achievement))
        .route(
            "/achievements/{achievement_id}",
            put(update_achievement).delete(delete_achievement),
        )
        .route("/homepage", get(get_homepage).put(update_homepage))
}

#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, counting users: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: total,
    }))
}

/// Change a user's role. Admins cannot change their own role, so the site
/// can never lock out its last admin by accident.
#[instrument(skip(app_state, body), fields(admin_id = %auth_user.user.id))]
pub async fn update_user_role(
    Path(user_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    if user_id == auth_user.user.id {
        return Err(HttpError::bad_request("You cannot change your own role"));
    }

    app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let user = app_state
        .db_client
        .update_user_role(user_id, body.role)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating role: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, role = %user.role.to_str(), "Role updated");

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_user(&user),
    }))
}

/// Set the admin-maintained profile fields: influence and season rank.
#[instrument(skip(app_state, body))]
pub async fn update_user_profile(
    Path(user_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<AdminProfileUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_profile(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Profile not found"))?;

    let profile = app_state
        .db_client
        .admin_update_profile(user_id, body.influence, body.current_season_rank)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ProfileResponseDto {
        status: "success".to_string(),
        data: profile,
    }))
}

/// Every article regardless of status, for moderation.
#[instrument(skip(app_state))]
pub async fn get_all_articles(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let articles = app_state
        .db_client
        .list_articles_admin(page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.count_articles_admin().await.map_err(|e| {
        tracing::error!("DB error, counting articles: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(AdminArticleListResponseDto {
        status: "success".to_string(),
        data: articles,
        pagination: Some(PaginationDto::new(page, limit, total)),
    }))
}

/// Moderation knobs: publish state and the featured flag. This can also
/// restore a soft-deleted article.
#[instrument(skip(app_state, body))]
pub async fn update_article_moderation(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<AdminUpdateArticleDto>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    app_state
        .db_client
        .update_article(article_id, None, None, None, body.status, body.is_featured, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, moderating article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(Response {
        status: "success",
        message: "Article updated.".to_string(),
    }))
}

/// Every status included, soft-deleted entries too, so they can be restored.
#[instrument(skip(app_state))]
pub async fn get_all_achievements(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = AchievementFilter {
        include_hidden: true,
        ..Default::default()
    };

    let achievements = app_state
        .db_client
        .list_achievements(&filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing achievements: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(AchievementListResponseDto {
        status: "success".to_string(),
        data: achievements,
    }))
}

#[instrument(skip(app_state, body))]
pub async fn create_achievement(
    State(app_state): State<AppState>,
    Json(body): Json<CreateAchievementDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .get_user(Some(body.member_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting member: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Member not found"))?;

    let achievement = app_state
        .db_client
        .save_achievement(
            body.member_id,
            &body.title,
            body.description.as_deref(),
            body.season_or_version.as_deref(),
            body.rank_or_result.as_deref(),
            body.achieved_at,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving achievement: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(achievement_id = %achievement.id, "Achievement created");

    Ok((
        StatusCode::CREATED,
        Json(SingleAchievementResponseDto {
            status: "success".to_string(),
            data: achievement,
        }),
    ))
}

#[instrument(skip(app_state, body))]
pub async fn update_achievement(
    Path(achievement_id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateAchievementDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .get_achievement(achievement_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting achievement: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Achievement not found"))?;

    let achievement = app_state
        .db_client
        .update_achievement(
            achievement_id,
            body.title.as_deref(),
            body.description.as_deref(),
            body.season_or_version.as_deref(),
            body.rank_or_result.as_deref(),
            body.achieved_at,
            body.status,
            body.is_pinned,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating achievement: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(SingleAchievementResponseDto {
        status: "success".to_string(),
        data: achievement,
    }))
}

/// Soft delete: flips the status, the row stays.
#[instrument(skip(app_state))]
pub async fn delete_achievement(
    Path(achievement_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_achievement(achievement_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting achievement: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Achievement not found"))?;

    app_state
        .db_client
        .update_achievement(
            achievement_id,
            None,
            None,
            None,
            None,
            None,
            Some(AchievementStatus::Deleted),
            Some(false),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting achievement: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(achievement_id = %achievement_id, "Achievement soft-deleted");

    Ok(Json(Response {
        status: "success",
        message: "Achievement deleted.".to_string(),
    }))
}

/// Console view of the homepage singleton. Creates the row with defaults
/// on first read, so the edit form always has an id to write back to.
#[instrument(skip(app_state))]
pub async fn get_homepage(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let config = app_state
        .db_client
        .upsert_homepage_config(None, None, None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, loading homepage config: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(HomepageResponseDto {
        status: "success".to_string(),
        data: HomepageConfigDto::from_model(&config),
    }))
}

#[instrument(skip(app_state, body))]
pub async fn update_homepage(
    State(app_state): State<AppState>,
    Json(body): Json<crate::dtos::UpdateHomepageDto>,
) -> Result<impl IntoResponse, HttpError> {
    let config = app_state
        .db_client
        .upsert_homepage_config(
            body.team_logo_url.as_deref(),
            body.banner_images.as_ref(),
            body.featured_achievements.as_ref(),
            body.featured_members.as_ref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating homepage config: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!("Homepage config updated");

    Ok(Json(HomepageResponseDto {
        status: "success".to_string(),
        data: HomepageConfigDto::from_model(&config),
    }))
}

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::AppState;
use crate::db::AchievementExt;
use crate::db::achievement::AchievementFilter;
use crate::dtos::{AchievementListResponseDto, AchievementsQueryDto};
use crate::error::{ErrorMessage, HttpError};

use tracing::instrument;

/// How many entries the homepage highlight strip shows.
const FEATURED_LIMIT: i64 = 6;

pub fn achievement_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_achievements))
        .route("/featured", get(get_featured_achievements))
}

/// Public honor roll: active achievements only, pinned entries first.
#[instrument(skip(app_state))]
pub async fn get_achievements(
    Query(params): Query<AchievementsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = AchievementFilter {
        member_id: params.member_id,
        from_date: params.from_date,
        to_date: params.to_date,
        include_hidden: false,
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

/// Homepage highlight reel: pinned achievements first, then the most
/// recent results, capped at a handful of entries.
#[instrument(skip(app_state))]
pub async fn get_featured_achievements(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let achievements = app_state
        .db_client
        .list_featured_achievements(FEATURED_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing featured achievements: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(AchievementListResponseDto {
        status: "success".to_string(),
        data: achievements,
    }))
}

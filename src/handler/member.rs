use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::UserExt;
use crate::dtos::{
    FilterUserDto, MemberDetailResponseDto, ProfileListResponseDto, ProfileResponseDto,
    UpdateProfileDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};

use tracing::instrument;

pub fn member_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_members))
        .route(
            "/me",
            get(get_my_profile)
                .put(update_my_profile)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
        .route("/{user_id}", get(get_member))
}

/// Public roster: everyone at member rank or above, highest influence first.
#[instrument(skip(app_state))]
pub async fn get_members(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let profiles = app_state
        .db_client
        .list_member_profiles()
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing members: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ProfileListResponseDto {
        status: "success".to_string(),
        data: profiles,
    }))
}

#[instrument(skip(app_state))]
pub async fn get_member(
    Path(user_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Member not found"))?;

    let profile = app_state
        .db_client
        .get_profile_dto(user_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(MemberDetailResponseDto {
        status: "success".to_string(),
        user: FilterUserDto::filter_user(&user),
        profile,
    }))
}

#[instrument(skip(app_state), fields(user_id = %auth_user.user.id))]
pub async fn get_my_profile(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let profile = app_state
        .db_client
        .get_profile_dto(auth_user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Profile not found"))?;

    Ok(Json(ProfileResponseDto {
        status: "success".to_string(),
        data: profile,
    }))
}

/// Self-service profile edit. Influence and season rank are admin-only and
/// cannot be touched here.
#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn update_my_profile(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let profile = app_state
        .db_client
        .update_profile(auth_user.user.id, &body)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating profile: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!("Profile updated");

    Ok(Json(ProfileResponseDto {
        status: "success".to_string(),
        data: profile,
    }))
}

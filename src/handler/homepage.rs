use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::AppState;
use crate::db::HomepageExt;
use crate::dtos::{HomepageConfigDto, HomepageResponseDto};
use crate::error::{ErrorMessage, HttpError};

use tracing::instrument;

pub fn homepage_handler() -> Router<AppState> {
    Router::new().route("/", get(get_homepage))
}

/// Public homepage configuration. Before an admin ever saves one, clients
/// get an empty default rather than a 404.
#[instrument(skip(app_state))]
pub async fn get_homepage(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let config = app_state
        .db_client
        .get_homepage_config()
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting homepage config: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let data = match config {
        Some(config) => HomepageConfigDto::from_model(&config),
        None => HomepageConfigDto {
            id: 0,
            team_logo_url: None,
            banner_images: Vec::new(),
            featured_achievements: Vec::new(),
            featured_members: Vec::new(),
        },
    };

    Ok(Json(HomepageResponseDto {
        status: "success".to_string(),
        data,
    }))
}

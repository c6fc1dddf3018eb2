use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use crate::AppState;
use crate::db::CardExt;
use crate::db::card::{CardColumn, CardFilter, CardSort};
use crate::dtos::{
    CardListResponseDto, CardsQueryDto, PaginationDto, SingleCardResponseDto,
    StringListResponseDto,
};
use crate::error::{ErrorMessage, HttpError};

use tracing::instrument;

pub fn card_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cards))
        .route("/expansions", get(get_expansions))
        .route("/classes", get(get_classes))
        .route("/rarities", get(get_rarities))
        .route("/{card_id}", get(get_card))
}

#[instrument(skip(app_state))]
pub async fn get_cards(
    Query(params): Query<CardsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);
    let sort = CardSort::parse(params.sort.as_deref());
    let descending = matches!(params.order.as_deref(), Some("desc"));

    let filter = CardFilter {
        expansion: params.expansion,
        card_class: params.card_class,
        rarity: params.rarity,
    };

    let cards = app_state
        .db_client
        .list_cards(&filter, sort, descending, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing cards: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state.db_client.count_cards(&filter).await.map_err(|e| {
        tracing::error!("DB error, counting cards: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(CardListResponseDto {
        status: "success".to_string(),
        data: cards,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_card(
    Path(card_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let card = app_state
        .db_client
        .get_card_enriched(card_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting card: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Card not found"))?;

    Ok(Json(SingleCardResponseDto {
        status: "success".to_string(),
        data: card,
    }))
}

#[instrument(skip(app_state))]
pub async fn get_expansions(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    distinct_values(&app_state, CardColumn::Expansion).await
}

#[instrument(skip(app_state))]
pub async fn get_classes(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    distinct_values(&app_state, CardColumn::CardClass).await
}

#[instrument(skip(app_state))]
pub async fn get_rarities(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    distinct_values(&app_state, CardColumn::Rarity).await
}

async fn distinct_values(
    app_state: &AppState,
    column: CardColumn,
) -> Result<Json<StringListResponseDto>, HttpError> {
    let values = app_state
        .db_client
        .distinct_card_values(column)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing distinct card values: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(StringListResponseDto {
        status: "success".to_string(),
        data: values,
    }))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::review::{ReviewFilter, ReviewSort};
use crate::db::{CardExt, ReviewExt};
use crate::dtos::{
    MaybeReviewResponseDto, MyReviewDto, PaginationDto, Response, ReviewCardInfoDto,
    ReviewItemDto, ReviewListResponseDto, ReviewerDto, ReviewsQueryDto, SingleReviewResponseDto,
    UpsertReviewDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::{CardReview, UserRole};

use tracing::instrument;

/// Review routes, nested at /v1/cards. Listing is public; the upsert and
/// the caller's-own-review routes are member and above.
pub fn review_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{card_id}/reviews", get(get_reviews))
        .route(
            "/{card_id}/reviews",
            axum::routing::post(upsert_review)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::Member)
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{card_id}/reviews/me",
            get(get_my_review)
                .delete(delete_my_review)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::Member)
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn my_review_dto(review: CardReview) -> MyReviewDto {
    MyReviewDto {
        review_id: review.id,
        score: review.score,
        content: review.content,
        game_version: review.game_version,
        created_at: review.created_at,
    }
}

/// Public review listing for one card. `card_info.average_score` covers all
/// reviews; the filters below only narrow the list itself.
#[instrument(skip(app_state))]
pub async fn get_reviews(
    Path(card_id): Path<i32>,
    Query(params): Query<ReviewsQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let card = app_state
        .db_client
        .get_card(card_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting card: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Card not found"))?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let sort = ReviewSort::parse(params.sort.as_deref());
    let filter = ReviewFilter {
        min_score: params.min_score,
        latest_version_only: params.latest_version_only.unwrap_or(false),
    };

    let rows = app_state
        .db_client
        .list_reviews(card_id, &filter, sort, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .count_reviews_filtered(card_id, &filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let average_score = app_state
        .db_client
        .average_score(card_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, averaging reviews: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let reviews = rows
        .into_iter()
        .map(|row| ReviewItemDto {
            review_id: row.review_id,
            reviewer: ReviewerDto {
                id: row.reviewer_id,
                name: row.reviewer_nickname,
                is_expert: row.is_expert,
            },
            score: row.score,
            content: row.content,
            game_version: row.game_version,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ReviewListResponseDto {
        status: "success".to_string(),
        card_info: ReviewCardInfoDto {
            id: card.id,
            name: card.name,
            image_url: card.pic,
            average_score,
            card_class: card.card_class,
        },
        reviews,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

#[instrument(skip(app_state), fields(user_id = %auth_user.user.id))]
pub async fn get_my_review(
    Path(card_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let review = app_state
        .db_client
        .get_review_by_reviewer(card_id, auth_user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(MaybeReviewResponseDto {
        status: "success".to_string(),
        data: review.map(my_review_dto),
    }))
}

/// Create or overwrite the caller's review. A card holds at most five
/// reviews; overwriting an existing one never consumes a slot.
#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn upsert_review(
    Path(card_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpsertReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let content = body.content.trim();
    if content.is_empty() {
        return Err(HttpError::bad_request("Content must not be blank"));
    }

    app_state
        .db_client
        .get_card(card_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting card: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Card not found"))?;

    let existing = app_state
        .db_client
        .get_review_by_reviewer(card_id, auth_user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if let Some(existing) = existing {
        let review = app_state
            .db_client
            .update_review(existing.id, body.score, content, body.game_version.as_deref())
            .await
            .map_err(|e| {
                tracing::error!("DB error, updating review: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

        tracing::info!(review_id = %review.id, "Review updated");

        return Ok((
            StatusCode::OK,
            Json(SingleReviewResponseDto {
                status: "success".to_string(),
                data: my_review_dto(review),
            }),
        ));
    }

    let review = app_state
        .db_client
        .insert_review_if_slot_free(
            card_id,
            auth_user.user.id,
            body.score,
            content,
            body.game_version.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, inserting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| {
            HttpError::conflict(ErrorMessage::ReviewSlotsExhausted.to_string())
        })?;

    tracing::info!(review_id = %review.id, "Review created");

    Ok((
        StatusCode::CREATED,
        Json(SingleReviewResponseDto {
            status: "success".to_string(),
            data: my_review_dto(review),
        }),
    ))
}

#[instrument(skip(app_state), fields(user_id = %auth_user.user.id))]
pub async fn delete_my_review(
    Path(card_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .delete_review(card_id, auth_user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting review: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if deleted == 0 {
        return Err(HttpError::not_found("Review not found"));
    }

    Ok(Json(Response {
        status: "success",
        message: "Review deleted.".to_string(),
    }))
}

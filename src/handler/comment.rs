use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::{ArticleExt, CommentExt};
use crate::dtos::{
    CommentListResponseDto, InputCommentDto, PinCommentDto, ReplyCommentDto, Response,
    SingleCommentResponseDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::models::{Article, ArticleStatus, Comment, UserRole};

use tracing::instrument;

/// Routes nested under /articles/{article_id}/comments.
pub fn article_comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_comments))
        .route(
            "/",
            post(create_comment).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Top-level comment routes for reply, delete, and pin.
pub fn comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/{comment_id}",
            delete(delete_comment)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{comment_id}/reply",
            post(reply_comment)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{comment_id}/pin",
            post(pin_comment).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

#[instrument(skip(app_state))]
pub async fn get_comments(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let comments = app_state
        .db_client
        .get_comments(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing comments: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(CommentListResponseDto {
        status: "success".to_string(),
        data: comments,
    }))
}

#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn create_comment(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<InputCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let article = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    if article.status != ArticleStatus::Published {
        return Err(HttpError::not_found("Article not found"));
    }

    // a reply must point at a comment under the same article
    if let Some(parent_id) = body.parent_id {
        let parent = app_state
            .db_client
            .get_comment(parent_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, getting parent comment: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?
            .ok_or_else(|| HttpError::not_found("Parent comment not found"))?;

        if parent.article_id != article_id {
            return Err(HttpError::bad_request(
                "Parent comment belongs to a different article",
            ));
        }
    }

    let comment = app_state
        .db_client
        .save_comment(article_id, auth_user.user.id, body.parent_id, &body.content)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id = %comment.id, "Comment created");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SingleCommentResponseDto {
            status: "success".to_string(),
            data: comment,
        }),
    ))
}

/// Reply to an existing comment. The reply lands on the same article as its
/// parent.
#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn reply_comment(
    Path(comment_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<ReplyCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (parent, article) = load_comment_and_article(&app_state, comment_id).await?;

    if article.status != ArticleStatus::Published {
        return Err(HttpError::not_found("Article not found"));
    }

    let comment = app_state
        .db_client
        .save_comment(
            parent.article_id,
            auth_user.user.id,
            Some(parent.id),
            &body.content,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving reply: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id = %comment.id, parent_id = %parent.id, "Reply created");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SingleCommentResponseDto {
            status: "success".to_string(),
            data: comment,
        }),
    ))
}

/// Remove a comment with all of its replies. Allowed for the comment's
/// author, the article's author, or an admin.
#[instrument(skip(app_state), fields(user_id = %auth_user.user.id))]
pub async fn delete_comment(
    Path(comment_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let (comment, article) = load_comment_and_article(&app_state, comment_id).await?;

    let allowed = comment.user_id == auth_user.user.id
        || article.author_id == auth_user.user.id
        || auth_user.user.role == UserRole::Admin;
    if !allowed {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let deleted = app_state
        .db_client
        .delete_comment_subtree(comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting comment subtree: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id = %comment_id, deleted = %deleted, "Comment subtree deleted");

    Ok(Json(Response {
        status: "success",
        message: format!("Deleted {} comment(s).", deleted),
    }))
}

/// Pin or unpin a top-level comment. Only the article's author or an admin
/// may pin, and replies cannot be pinned.
#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn pin_comment(
    Path(comment_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<PinCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let (comment, article) = load_comment_and_article(&app_state, comment_id).await?;

    if article.author_id != auth_user.user.id && auth_user.user.role != UserRole::Admin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    if comment.parent_id.is_some() {
        return Err(HttpError::bad_request("Only top-level comments can be pinned"));
    }

    let comment = app_state
        .db_client
        .set_comment_pin(comment_id, body.pinned)
        .await
        .map_err(|e| {
            tracing::error!("DB error, pinning comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(comment_id = %comment.id, pinned = %comment.is_pinned, "Comment pin changed");

    Ok(Json(Response {
        status: "success",
        message: if comment.is_pinned {
            "Comment pinned.".to_string()
        } else {
            "Comment unpinned.".to_string()
        },
    }))
}

async fn load_comment_and_article(
    app_state: &AppState,
    comment_id: i32,
) -> Result<(Comment, Article), HttpError> {
    let comment = app_state
        .db_client
        .get_comment(comment_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comment: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Comment not found"))?;

    let article = app_state
        .db_client
        .get_article(comment.article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    Ok((comment, article))
}

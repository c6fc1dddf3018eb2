use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::article::ArticleFilter;
use crate::db::{ArticleExt, UserExt};
use crate::dtos::{
    ArticleDto, ArticleListItemDto, ArticleListResponseDto, ArticleTagDto, ArticlesPagedQueryDto,
    CreateArticleDto, PaginationDto, Response, SingleArticleResponseDto, UpdateArticleDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::handler::comment::article_comment_handler;
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::{ArticleStatus, UserRole};

use tracing::instrument;

const EXCERPT_CHARS: usize = 200;
const MAX_TAGS: usize = 10;

pub fn article_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_articles))
        .route(
            "/",
            post(create_article)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::EliteMember)
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{article_id}", get(get_article))
        .route(
            "/{article_id}",
            put(edit_article)
                .delete(delete_article)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/{article_id}/comments", article_comment_handler(app_state))
}

/// Trim, drop empties, dedupe preserving first occurrence, cap the count.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.iter().any(|t| t == trimmed) {
            continue;
        }
        seen.push(trimmed.to_string());
        if seen.len() == MAX_TAGS {
            break;
        }
    }
    seen
}

/// Plain-text preview of sanitized article HTML for list views.
fn make_excerpt(content: &str) -> String {
    // strip tags crudely; the content is already sanitized so there is no
    // attribute soup to trip over
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.chars().take(EXCERPT_CHARS).collect()
}

#[instrument(skip(app_state))]
pub async fn get_articles(
    Query(params): Query<ArticlesPagedQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let filter = ArticleFilter {
        featured: params.featured,
        search: params.search,
        category: params.category,
        tag: params.tag,
    };

    let rows = app_state
        .db_client
        .list_published_articles(&filter, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total = app_state
        .db_client
        .count_published_articles(&filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let article_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let tags = app_state
        .db_client
        .get_tags_for_articles(&article_ids)
        .await
        .map_err(|e| {
            tracing::error!("DB error, loading tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let data = rows
        .into_iter()
        .map(|row| {
            let row_tags = tags
                .iter()
                .filter(|t| t.article_id == row.id)
                .map(|t| t.tag_name.clone())
                .collect();
            ArticleListItemDto {
                id: row.id,
                title: row.title,
                excerpt: make_excerpt(&row.content),
                author_nickname: row.author_nickname,
                tags: row_tags,
                created_at: row.created_at,
            }
        })
        .collect();

    Ok(Json(ArticleListResponseDto {
        status: "success".to_string(),
        data,
        pagination: Some(PaginationDto::new(page, limit, total)),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_article(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let article = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    // drafts and soft-deleted articles do not exist as far as the public
    // endpoint is concerned
    if article.status != ArticleStatus::Published {
        return Err(HttpError::not_found("Article not found"));
    }

    let dto = assemble_article_dto(&app_state, article).await?;

    Ok(Json(SingleArticleResponseDto {
        status: "success".to_string(),
        data: dto,
    }))
}

#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn create_article(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateArticleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let content = crate::utils::sanitize::sanitize_html(&body.content);
    let tags = normalize_tags(body.tags.as_deref().unwrap_or(&[]));

    let article = app_state
        .db_client
        .save_article(
            auth_user.user.id,
            &body.title,
            &content,
            body.category.as_deref(),
            body.is_featured.unwrap_or(false),
            &tags,
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(article_id = %article.id, "Article created");

    let dto = assemble_article_dto(&app_state, article).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SingleArticleResponseDto {
            status: "success".to_string(),
            data: dto,
        }),
    ))
}

#[instrument(skip(app_state, body), fields(user_id = %auth_user.user.id))]
pub async fn edit_article(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateArticleDto>,
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

    require_author_or_admin(&auth_user, article.author_id)?;

    let content = body
        .content
        .as_deref()
        .map(crate::utils::sanitize::sanitize_html);
    let tags = body.tags.as_deref().map(normalize_tags);

    let article = app_state
        .db_client
        .update_article(
            article_id,
            body.title.as_deref(),
            content.as_deref(),
            body.category.as_deref(),
            body.status,
            body.is_featured,
            tags.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let dto = assemble_article_dto(&app_state, article).await?;

    Ok(Json(SingleArticleResponseDto {
        status: "success".to_string(),
        data: dto,
    }))
}

/// Soft delete; the row stays for the admin console.
#[instrument(skip(app_state), fields(user_id = %auth_user.user.id))]
pub async fn delete_article(
    Path(article_id): Path<i32>,
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let article = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found("Article not found"))?;

    require_author_or_admin(&auth_user, article.author_id)?;

    app_state
        .db_client
        .set_article_status(article_id, ArticleStatus::Deleted)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(article_id = %article_id, "Article soft-deleted");

    Ok(Json(Response {
        status: "success",
        message: "Article deleted.".to_string(),
    }))
}

fn require_author_or_admin(
    auth_user: &JWTAuthMiddleware,
    author_id: i32,
) -> Result<(), HttpError> {
    if auth_user.user.id != author_id && auth_user.user.role != UserRole::Admin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }
    Ok(())
}

async fn assemble_article_dto(
    app_state: &AppState,
    article: crate::models::Article,
) -> Result<ArticleDto, HttpError> {
    let author = app_state
        .db_client
        .get_user(Some(article.author_id), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting author: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let tags = app_state
        .db_client
        .get_article_tags(article.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, loading tags: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(ArticleDto {
        id: article.id,
        title: article.title,
        content: article.content,
        author_id: article.author_id,
        author_nickname: author.map(|u| u.nickname).unwrap_or_default(),
        status: article.status,
        category: article.category,
        is_featured: article.is_featured,
        tags: tags
            .into_iter()
            .map(|t| ArticleTagDto {
                id: t.id,
                tag_name: t.tag_name,
            })
            .collect(),
        created_at: article.created_at,
        updated_at: article.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_deduped_and_capped() {
        let raw = vec![
            " arena ".to_string(),
            "arena".to_string(),
            "".to_string(),
            "  ".to_string(),
            "meta".to_string(),
        ];
        assert_eq!(normalize_tags(&raw), vec!["arena", "meta"]);

        let many: Vec<String> = (0..20).map(|i| format!("tag{i}")).collect();
        assert_eq!(normalize_tags(&many).len(), MAX_TAGS);
    }

    #[test]
    fn excerpt_strips_markup_and_truncates() {
        let html = "<p>Hello <strong>world</strong></p>";
        assert_eq!(make_excerpt(html), "Hello world");

        let long = format!("<p>{}</p>", "x".repeat(500));
        assert_eq!(make_excerpt(&long).chars().count(), EXCERPT_CHARS);
    }
}

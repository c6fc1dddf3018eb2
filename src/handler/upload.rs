use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router, middleware};
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::db::UserExt;
use crate::dtos::{UpdateProfileDto, UploadResponseDto};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;

use tracing::instrument;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "webp", "gif"];

pub fn upload_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/avatar",
            post(upload_avatar)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth))
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route(
            "/image",
            post(upload_image)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::EliteMember)
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth))
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route(
            "/file",
            post(upload_file)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, UserRole::EliteMember)
                }))
                .route_layer(middleware::from_fn_with_state(app_state, auth))
                .layer(DefaultBodyLimit::max(MAX_FILE_BYTES)),
        )
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn image_extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn file_extension_for(content_type: &str) -> Option<&'static str> {
    image_extension_for(content_type).or(match content_type {
        "application/pdf" => Some("pdf"),
        "application/zip" => Some("zip"),
        "text/plain" => Some("txt"),
        _ => None,
    })
}

async fn read_upload_field(
    multipart: &mut Multipart,
    extension_for: fn(&str) -> Option<&'static str>,
) -> Result<(Vec<u8>, &'static str), HttpError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart error: {}", e);
        HttpError::bad_request("Invalid multipart body")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = extension_for(&content_type)
            .ok_or_else(|| HttpError::bad_request("Unsupported file type"))?;

        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Multipart read error: {}", e);
            HttpError::bad_request("Could not read uploaded file")
        })?;

        if data.is_empty() {
            return Err(HttpError::bad_request("Uploaded file is empty"));
        }

        return Ok((data.to_vec(), extension));
    }

    Err(HttpError::bad_request("Missing 'file' field"))
}

async fn write_upload(dir: &str, filename: &str, data: &[u8]) -> Result<(), HttpError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        tracing::error!("Failed to create upload dir: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    tokio::fs::write(format!("{dir}/{filename}"), data)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write upload: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })
}

/// A new avatar in a different format would leave the old file behind under
/// the same digest. Removing the leftovers is best effort only.
async fn remove_stale_avatars(dir: &str, digest: &str, keep_extension: &str) {
    for extension in IMAGE_EXTENSIONS {
        if *extension == keep_extension {
            continue;
        }
        let path = format!("{dir}/{digest}.{extension}");
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path, "Removed stale avatar"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path, "Could not remove stale avatar: {}", e),
        }
    }
}

/// Avatar upload. The filename is the SHA-256 of the user's email, so a
/// re-upload overwrites the previous avatar instead of piling up files.
#[instrument(skip(app_state, multipart), fields(user_id = %auth_user.user.id))]
pub async fn upload_avatar(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<JWTAuthMiddleware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (data, extension) = read_upload_field(&mut multipart, image_extension_for).await?;

    let digest = hex_digest(auth_user.user.email.as_bytes());
    let filename = format!("{digest}.{extension}");

    let dir = format!("{}/avatars", app_state.env.upload_dir);
    write_upload(&dir, &filename, &data).await?;
    remove_stale_avatars(&dir, &digest, extension).await;

    let url = format!("/{dir}/{filename}");

    let update = UpdateProfileDto {
        avatar_url: Some(url.clone()),
        ..Default::default()
    };
    app_state
        .db_client
        .update_profile(auth_user.user.id, &update)
        .await
        .map_err(|e| {
            tracing::error!("DB error, saving avatar url: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(url = %url, "Avatar uploaded");

    Ok(Json(UploadResponseDto {
        status: "success".to_string(),
        url,
        filename: None,
    }))
}

/// General image upload for article content; random name per file.
#[instrument(skip(app_state, multipart))]
pub async fn upload_image(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (data, extension) = read_upload_field(&mut multipart, image_extension_for).await?;

    let filename = format!("{}.{extension}", uuid::Uuid::new_v4().simple());

    let dir = format!("{}/images", app_state.env.upload_dir);
    write_upload(&dir, &filename, &data).await?;

    let url = format!("/{dir}/{filename}");

    tracing::info!(url = %url, "Image uploaded");

    Ok(Json(UploadResponseDto {
        status: "success".to_string(),
        url,
        filename: Some(filename),
    }))
}

/// Attachment upload for article content, decklists and the like. Wider
/// type whitelist and a bigger body limit than the image routes.
#[instrument(skip(app_state, multipart))]
pub async fn upload_file(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (data, extension) = read_upload_field(&mut multipart, file_extension_for).await?;

    let filename = format!("{}.{extension}", uuid::Uuid::new_v4().simple());

    let dir = format!("{}/files", app_state.env.upload_dir);
    write_upload(&dir, &filename, &data).await?;

    let url = format!("/{dir}/{filename}");

    tracing::info!(url = %url, "File uploaded");

    Ok(Json(UploadResponseDto {
        status: "success".to_string(),
        url,
        filename: Some(filename),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_image_types_are_accepted() {
        assert_eq!(image_extension_for("image/png"), Some("png"));
        assert_eq!(image_extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension_for("application/pdf"), None);
        assert_eq!(image_extension_for("text/html"), None);
    }

    #[test]
    fn file_whitelist_extends_the_image_one() {
        assert_eq!(file_extension_for("image/png"), Some("png"));
        assert_eq!(file_extension_for("application/pdf"), Some("pdf"));
        assert_eq!(file_extension_for("application/zip"), Some("zip"));
        assert_eq!(file_extension_for("text/plain"), Some("txt"));
        assert_eq!(file_extension_for("text/html"), None);
        assert_eq!(file_extension_for("application/x-msdownload"), None);
    }

    #[test]
    fn avatar_filename_is_stable_per_email() {
        let a = hex_digest(b"fan@team.example");
        let b = hex_digest(b"fan@team.example");
        let c = hex_digest(b"other@team.example");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}

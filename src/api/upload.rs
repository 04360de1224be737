//! Upload API endpoints
//!
//! Destination photos and landing page images. Files land in the upload
//! directory under a UUID name and are served from `/uploads/*`.
//!
//! - POST /api/v1/upload/image - Single file, field `file`
//! - POST /api/v1/upload/images - Several files, fields `files` or `file`

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::config::UploadConfig;

/// Response for successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Response for multiple uploads
#[derive(Debug, Serialize)]
pub struct MultiUploadResponse {
    pub files: Vec<UploadResponse>,
    pub failed: Vec<String>,
}

/// Build the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .route("/images", post(upload_images))
}

/// POST /api/v1/upload/image
async fn upload_image(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = &state.upload_config;
    ensure_upload_dir(&config.path).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        check_type(config, &content_type).map_err(ApiError::validation_error)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
        check_size(config, data.len()).map_err(ApiError::validation_error)?;

        let uploaded = store(config, &data, content_type)
            .await
            .map_err(|e| ApiError::internal(e.into()))?;
        tracing::info!("{} uploaded {}", user.username, uploaded.filename);
        return Ok(Json(uploaded));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// POST /api/v1/upload/images
///
/// Bad files are reported in `failed` without aborting the rest.
async fn upload_images(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<MultiUploadResponse>, ApiError> {
    let config = &state.upload_config;
    ensure_upload_dir(&config.path).await?;

    let mut files = Vec::new();
    let mut failed = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if !matches!(field.name(), Some("files") | Some("file")) {
            continue;
        }

        let filename = field.file_name().unwrap_or("unknown").to_string();
        if files.len() >= config.max_files {
            failed.push(format!("{}: at most {} files per request", filename, config.max_files));
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if let Err(reason) = check_type(config, &content_type) {
            failed.push(format!("{}: {}", filename, reason));
            continue;
        }

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                failed.push(format!("{}: {}", filename, e));
                continue;
            }
        };
        if let Err(reason) = check_size(config, data.len()) {
            failed.push(format!("{}: {}", filename, reason));
            continue;
        }

        match store(config, &data, content_type).await {
            Ok(uploaded) => files.push(uploaded),
            Err(e) => {
                tracing::error!("Failed to save upload {}: {}", filename, e);
                failed.push(format!("{}: could not be saved", filename));
            }
        }
    }

    Ok(Json(MultiUploadResponse { files, failed }))
}

fn check_type(config: &UploadConfig, content_type: &str) -> Result<(), String> {
    if config.is_type_allowed(content_type) {
        Ok(())
    } else {
        Err(format!(
            "Invalid file type: {}. Allowed types: {}",
            content_type,
            config.allowed_types.join(", ")
        ))
    }
}

fn check_size(config: &UploadConfig, len: usize) -> Result<(), String> {
    if len == 0 {
        return Err("File is empty".to_string());
    }
    if len as u64 > config.max_file_size {
        return Err(format!(
            "File too large. Maximum size: {} MB",
            config.max_file_size / 1024 / 1024
        ));
    }
    Ok(())
}

/// Write the file under a fresh UUID name
async fn store(
    config: &UploadConfig,
    data: &[u8],
    content_type: String,
) -> std::io::Result<UploadResponse> {
    let filename = format!("{}.{}", Uuid::new_v4(), config.get_extension(&content_type));
    fs::write(config.path.join(&filename), data).await?;

    Ok(UploadResponse {
        url: format!("/uploads/{}", filename),
        filename,
        size: data.len() as u64,
        content_type,
    })
}

async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("Failed to create upload dir: {}", e)))
}

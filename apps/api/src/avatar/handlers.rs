//! Axum route handlers for the Avatar API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::avatar::service::{remove_avatar, store_avatar, AvatarUpload};
use crate::errors::AppError;
use crate::media::{OutputFormat, SizeName, VariantDescriptor};
use crate::state::AppState;

/// Multipart field carrying the image file.
pub const AVATAR_FIELD: &str = "avatar";
/// Public URL prefix of the avatars directory (see `routes::build_router`).
pub const AVATARS_URL_PREFIX: &str = "/uploads/avatars";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AvatarVariantResponse {
    pub filename: String,
    pub url: String,
    pub size: SizeName,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct AvatarUploadResponse {
    pub base_id: String,
    pub variants: Vec<AvatarVariantResponse>,
}

impl From<VariantDescriptor> for AvatarVariantResponse {
    fn from(v: VariantDescriptor) -> Self {
        Self {
            url: format!("{AVATARS_URL_PREFIX}/{}", v.filename),
            filename: v.filename,
            size: v.size,
            format: v.format,
            width: v.width,
            height: v.height,
            bytes: v.bytes,
        }
    }
}

impl From<AvatarUpload> for AvatarUploadResponse {
    fn from(upload: AvatarUpload) -> Self {
        Self {
            base_id: upload.base_id,
            variants: upload.variants.into_iter().map(Into::into).collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/avatars
///
/// Accepts a multipart body with an `avatar` file field and returns every
/// rendered variant. Other fields are ignored.
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AvatarUploadResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or(AVATAR_FIELD).to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read avatar upload: {e}")))?;

        let upload = store_avatar(
            state.images.as_ref(),
            &state.config,
            &data,
            &file_name,
            content_type.as_deref(),
        )
        .await?;

        return Ok((StatusCode::CREATED, Json(upload.into())));
    }

    Err(AppError::Validation(format!(
        "Missing '{AVATAR_FIELD}' file field"
    )))
}

/// DELETE /api/v1/avatars/:filename
///
/// Removes the whole variant family of `filename`. Succeeds even when
/// nothing matched.
pub async fn handle_delete_avatar(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<StatusCode, AppError> {
    remove_avatar(state.images.as_ref(), &state.config, &filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

use anyhow::anyhow;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::media::naming::{family_prefix, parse_variant_filename};
use crate::media::{ImageProcessor, MediaError, PipelineOptions, VariantDescriptor};

pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A stored avatar: one variant family under the avatars directory.
#[derive(Debug, Clone, Serialize)]
pub struct AvatarUpload {
    pub base_id: String,
    pub variants: Vec<VariantDescriptor>,
}

pub fn avatar_options(config: &Config) -> PipelineOptions {
    PipelineOptions {
        generate_sizes: config.avatar_generate_sizes,
        convert_to_webp: config.avatar_convert_to_webp,
        compress: true,
        ..PipelineOptions::new(config.avatars_dir())
    }
}

/// Cheap checks before any bytes reach the decoder.
/// A missing content type is allowed; the pipeline sniffs the format anyway.
pub fn validate_upload(
    len: usize,
    content_type: Option<&str>,
    limit: usize,
) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("Avatar file is empty".to_string()));
    }
    if len > limit {
        return Err(AppError::PayloadTooLarge { size: len, limit });
    }
    if let Some(content_type) = content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(AppError::UnsupportedMediaType(format!(
                "{essence} is not an accepted avatar type"
            )));
        }
    }
    Ok(())
}

/// Runs the pipeline on an uploaded avatar.
///
/// Either the whole family is stored or nothing is: if a variant fails after
/// siblings were written, those siblings are deleted before the error returns.
pub async fn store_avatar(
    images: &dyn ImageProcessor,
    config: &Config,
    bytes: &[u8],
    file_name: &str,
    content_type: Option<&str>,
) -> Result<AvatarUpload, AppError> {
    validate_upload(bytes.len(), content_type, config.max_avatar_bytes)?;

    let options = avatar_options(config);
    match images.process_buffer(bytes, file_name, &options).await {
        Ok(variants) => {
            let base_id = variants
                .first()
                .and_then(|v| family_prefix(&v.filename))
                .ok_or_else(|| anyhow!("Image pipeline returned no variants"))?;
            info!("Stored avatar {base_id} ({} variants)", variants.len());
            Ok(AvatarUpload { base_id, variants })
        }
        Err(MediaError::Partial { written, source }) => {
            if let Some(first) = written.first() {
                let removed = images.cleanup(&first.filename, &options.output_dir).await;
                warn!(
                    "Rolled back {removed} partially written variant(s) of {}",
                    first.filename
                );
            }
            Err(AppError::Media(*source))
        }
        Err(e) => Err(e.into()),
    }
}

/// Removes every variant of the avatar family `filename` belongs to.
///
/// Only names the pipeline itself produces are accepted, so a short or
/// hand-picked name can never widen the prefix match to other families.
pub async fn remove_avatar(
    images: &dyn ImageProcessor,
    config: &Config,
    filename: &str,
) -> Result<usize, AppError> {
    let Some(variant) = parse_variant_filename(filename) else {
        return Err(AppError::Validation(format!(
            "Invalid avatar filename: {filename:?}"
        )));
    };
    let removed = images.cleanup(filename, &config.avatars_dir()).await;
    info!("Removed {removed} avatar file(s) for {}", variant.base);
    Ok(removed)
}

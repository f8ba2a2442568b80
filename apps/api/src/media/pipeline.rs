//! Pipeline Orchestrator: one source image in, one family of variant files out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::media::cleanup::cleanup_variants;
use crate::media::error::MediaError;
use crate::media::naming::{generate_base_id, variant_filename};
use crate::media::profiles::{OutputFormat, SizeName, SIZE_PROFILES};
use crate::media::renderer::{decode_source, render_variant, EncodeSettings, SourceImage};
use crate::media::VariantDescriptor;

const TEMP_PREFIX: &str = "temp-";

/// Per-call options. `output_dir` is the only required field.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// Also render thumbnail, medium and large.
    pub generate_sizes: bool,
    /// Add WebP to the formats rendered for every size.
    pub convert_to_webp: bool,
    pub compress: bool,
}

impl PipelineOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            generate_sizes: false,
            convert_to_webp: false,
            compress: true,
        }
    }
}

/// Image processing backend carried in `AppState` as `Arc<dyn ImageProcessor>`.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn process_file(
        &self,
        source_path: &Path,
        name_hint: &str,
        options: &PipelineOptions,
    ) -> Result<Vec<VariantDescriptor>, MediaError>;

    async fn process_buffer(
        &self,
        bytes: &[u8],
        logical_name: &str,
        options: &PipelineOptions,
    ) -> Result<Vec<VariantDescriptor>, MediaError>;

    /// Best-effort removal of every file in `name_or_path`'s family. Never fails.
    async fn cleanup(&self, name_or_path: &str, dir: &Path) -> usize;
}

/// Filesystem-backed pipeline built on the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantPipeline;

#[async_trait]
impl ImageProcessor for VariantPipeline {
    async fn process_file(
        &self,
        source_path: &Path,
        name_hint: &str,
        options: &PipelineOptions,
    ) -> Result<Vec<VariantDescriptor>, MediaError> {
        process_file(source_path, name_hint, options).await
    }

    async fn process_buffer(
        &self,
        bytes: &[u8],
        logical_name: &str,
        options: &PipelineOptions,
    ) -> Result<Vec<VariantDescriptor>, MediaError> {
        process_buffer(bytes, logical_name, options).await
    }

    async fn cleanup(&self, name_or_path: &str, dir: &Path) -> usize {
        cleanup_variants(name_or_path, dir).await
    }
}

/// Creates `dir` and any missing parents. Succeeds if it already exists.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), MediaError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MediaError::io(dir, e))
}

/// Requested WebP first, then the source-format fallback. The fallback is
/// never WebP, so every family carries one broadly compatible format.
pub fn plan_formats(
    source_format: ImageFormat,
    has_alpha: bool,
    convert_to_webp: bool,
) -> Vec<OutputFormat> {
    let mut formats = Vec::with_capacity(2);
    if convert_to_webp {
        formats.push(OutputFormat::WebP);
    }
    formats.push(OutputFormat::from_source(source_format, has_alpha));
    formats
}

/// `original` first, then the resized profiles smallest to largest.
pub fn plan_sizes(generate_sizes: bool) -> Vec<SizeName> {
    let mut sizes = vec![SizeName::Original];
    if generate_sizes {
        sizes.extend(SIZE_PROFILES.iter().map(|p| p.name));
    }
    sizes
}

/// Renders the full variant set for the image at `source_path`.
///
/// Returns descriptors ordered by size then format. Consumers should read each
/// descriptor's `size` and `format` rather than rely on position.
pub async fn process_file(
    source_path: &Path,
    name_hint: &str,
    options: &PipelineOptions,
) -> Result<Vec<VariantDescriptor>, MediaError> {
    ensure_output_dir(&options.output_dir).await?;

    let bytes = tokio::fs::read(source_path)
        .await
        .map_err(|e| MediaError::io(source_path, e))?;
    let source = tokio::task::spawn_blocking(move || decode_source(&bytes)).await??;

    render_family(&source, name_hint, options).await
}

/// Stages `bytes` to a `temp-*` file in the output directory, runs
/// [`process_file`] on it and removes the temp file whatever the outcome.
pub async fn process_buffer(
    bytes: &[u8],
    logical_name: &str,
    options: &PipelineOptions,
) -> Result<Vec<VariantDescriptor>, MediaError> {
    ensure_output_dir(&options.output_dir).await?;

    // NamedTempFile deletes itself on drop, including on early return and panic
    let staged = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(&options.output_dir)
        .map_err(|e| MediaError::io(&options.output_dir, e))?;
    let staged_path = staged.path().to_path_buf();

    let result = match tokio::fs::write(&staged_path, bytes).await {
        Ok(()) => process_file(&staged_path, logical_name, options).await,
        Err(e) => Err(MediaError::io(&staged_path, e)),
    };

    if let Err(e) = staged.close() {
        warn!("Failed to remove staged upload {}: {e}", staged_path.display());
    }

    result
}

async fn render_family(
    source: &SourceImage,
    name_hint: &str,
    options: &PipelineOptions,
) -> Result<Vec<VariantDescriptor>, MediaError> {
    // Generated once, before any render, so every sibling shares it
    let base = generate_base_id(name_hint);
    render_family_with_base(source, &base, options).await
}

/// Renders every planned size and format under `base`.
///
/// Stops at the first failing variant. If siblings were already written the
/// error is wrapped in [`MediaError::Partial`] listing them.
pub(crate) async fn render_family_with_base(
    source: &SourceImage,
    base: &str,
    options: &PipelineOptions,
) -> Result<Vec<VariantDescriptor>, MediaError> {
    let formats = plan_formats(source.format, source.has_alpha, options.convert_to_webp);
    let sizes = plan_sizes(options.generate_sizes);
    let settings = EncodeSettings {
        compress: options.compress,
    };

    debug!(
        "Rendering {base}: source {:?} {}x{} ({} bytes, orientation {:?}, alpha {}), sizes {:?}, formats {:?}",
        source.format,
        source.width,
        source.height,
        source.byte_len,
        source.orientation,
        source.has_alpha,
        sizes,
        formats
    );

    let mut written: Vec<VariantDescriptor> = Vec::with_capacity(sizes.len() * formats.len());

    for &size in &sizes {
        for &format in &formats {
            let path = options
                .output_dir
                .join(variant_filename(base, size, format));

            match render_variant(source, size, format, settings, &path).await {
                Ok(descriptor) => written.push(descriptor),
                Err(e) if written.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        "Variant {size}/{format} of {base} failed after {} were written",
                        written.len()
                    );
                    return Err(MediaError::Partial {
                        written,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    info!(
        "Generated {} variant(s) for {base} in {}",
        written.len(),
        options.output_dir.display()
    );

    Ok(written)
}

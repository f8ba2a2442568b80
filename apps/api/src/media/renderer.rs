//! Variant Renderer: decode once, then cover-fit and encode one variant at a time.
//!
//! Decoding and encoding are CPU-bound and run on tokio's blocking pool.
//! File writes go through `tokio::fs`.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use tracing::debug;

use crate::media::error::MediaError;
use crate::media::geometry::cover_plan;
use crate::media::profiles::{OutputFormat, SizeName, QUALITY};
use crate::media::VariantDescriptor;

/// A decoded source image. Lives for one pipeline invocation only.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Pixel data with EXIF orientation already applied.
    pub image: Arc<DynamicImage>,
    pub format: ImageFormat,
    /// Display-correct dimensions (post-orientation).
    pub width: u32,
    pub height: u32,
    /// Orientation tag found in the source, before normalization.
    pub orientation: Orientation,
    pub has_alpha: bool,
    pub byte_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    /// Use the quality table. When false, favor speed and fidelity over size.
    pub compress: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self { compress: true }
    }
}

#[derive(Debug)]
pub struct EncodedVariant {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Decodes `bytes`, sniffing the format from content, and bakes the EXIF
/// orientation into the pixels so no consumer has to read EXIF again.
pub fn decode_source(bytes: &[u8]) -> Result<SourceImage, MediaError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::Decode(image::ImageError::IoError(e)))?;
    let format = reader.format().ok_or(MediaError::UnknownFormat)?;

    let mut decoder = reader.into_decoder().map_err(MediaError::Decode)?;
    let orientation = decoder.orientation().map_err(MediaError::Decode)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(MediaError::Decode)?;
    image.apply_orientation(orientation);

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(MediaError::EmptyImage);
    }

    Ok(SourceImage {
        has_alpha: image.color().has_alpha(),
        image: Arc::new(image),
        format,
        width,
        height,
        orientation,
        byte_len: bytes.len(),
    })
}

/// Cover-fits `image` into `target` (if any) and encodes it as `format`.
pub fn encode_variant(
    image: &DynamicImage,
    target: Option<(u32, u32)>,
    format: OutputFormat,
    settings: EncodeSettings,
) -> Result<EncodedVariant, MediaError> {
    let frame = match target {
        Some((width, height)) => fit_cover(image, width, height),
        None => Cow::Borrowed(image),
    };

    let bytes = encode_frame(&frame, format, settings)
        .map_err(|reason| MediaError::Encode { format, reason })?;

    Ok(EncodedVariant {
        bytes,
        width: frame.width(),
        height: frame.height(),
        format,
    })
}

fn fit_cover(image: &DynamicImage, box_w: u32, box_h: u32) -> Cow<'_, DynamicImage> {
    let plan = cover_plan(image.width(), image.height(), box_w, box_h);
    if plan.is_noop(image.width(), image.height()) {
        return Cow::Borrowed(image);
    }

    let cropped = match plan.scaled {
        Some((w, h)) => image
            .resize_exact(w, h, FilterType::Lanczos3)
            .crop_imm(plan.crop_x, plan.crop_y, plan.width, plan.height),
        None => image.crop_imm(plan.crop_x, plan.crop_y, plan.width, plan.height),
    };
    Cow::Owned(cropped)
}

fn encode_frame(
    frame: &DynamicImage,
    format: OutputFormat,
    settings: EncodeSettings,
) -> Result<Vec<u8>, String> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(frame, settings),
        OutputFormat::Png => encode_png(frame, settings).map_err(|e| e.to_string()),
        OutputFormat::WebP => encode_webp(frame, settings),
    }
}

/// Progressive JPEG at `QUALITY.jpeg`.
fn encode_jpeg(frame: &DynamicImage, settings: EncodeSettings) -> Result<Vec<u8>, String> {
    let quality = if settings.compress { QUALITY.jpeg } else { 100 };
    // JPEG has no alpha channel
    let rgb = frame.to_rgb8();
    let too_large = || format!("{}x{} exceeds the JPEG size limit", rgb.width(), rgb.height());
    let width = u16::try_from(rgb.width()).map_err(|_| too_large())?;
    let height = u16::try_from(rgb.height()).map_err(|_| too_large())?;

    let mut buf = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buf, quality);
    encoder.set_progressive(true);
    encoder
        .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| e.to_string())?;
    Ok(buf)
}

fn png_compression(quality: u8) -> CompressionType {
    match quality {
        90.. => CompressionType::Best,
        50..=89 => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

/// Lossless PNG; the quality level only picks the compression effort.
fn encode_png(frame: &DynamicImage, settings: EncodeSettings) -> Result<Vec<u8>, image::ImageError> {
    let compression = if settings.compress {
        png_compression(QUALITY.png)
    } else {
        CompressionType::Default
    };

    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
    match frame {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(frame.to_rgba16()).write_with_encoder(encoder)?
        }
        _ => frame.write_with_encoder(encoder)?,
    }
    Ok(buf)
}

/// Lossy WebP at `QUALITY.webp`; lossless when compression is off.
fn encode_webp(frame: &DynamicImage, settings: EncodeSettings) -> Result<Vec<u8>, String> {
    let lossless = !settings.compress;
    let quality = if settings.compress {
        f32::from(QUALITY.webp)
    } else {
        100.0
    };

    let encoded = if frame.color().has_alpha() {
        let rgba = frame.to_rgba8();
        let result = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(lossless, quality);
        result
    } else {
        let rgb = frame.to_rgb8();
        let result = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(lossless, quality);
        result
    };

    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| format!("libwebp error: {e:?}"))
}

/// Renders one (size, format) variant of `source` to `output_path`.
///
/// The returned descriptor is authoritative: dimensions are post-resize and
/// `bytes` is the on-disk size, either of which may differ from the request.
pub async fn render_variant(
    source: &SourceImage,
    size: SizeName,
    format: OutputFormat,
    settings: EncodeSettings,
    output_path: &Path,
) -> Result<VariantDescriptor, MediaError> {
    let image = Arc::clone(&source.image);
    let target = size.dimensions();

    let encoded =
        tokio::task::spawn_blocking(move || encode_variant(&image, target, format, settings))
            .await??;

    tokio::fs::write(output_path, &encoded.bytes)
        .await
        .map_err(|e| MediaError::io(output_path, e))?;
    let bytes = tokio::fs::metadata(output_path)
        .await
        .map_err(|e| MediaError::io(output_path, e))?
        .len();

    let filename = output_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    debug!(
        "Rendered {filename}: {size} {format} {}x{} ({bytes} bytes)",
        encoded.width, encoded.height
    );

    Ok(VariantDescriptor {
        filename,
        path: output_path.to_path_buf(),
        size,
        format: encoded.format,
        width: encoded.width,
        height: encoded.height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_support::{jpeg_bytes, png_bytes, rgba_png_bytes, with_exif_orientation};

    #[test]
    fn test_decode_reads_format_and_dimensions() {
        let source = decode_source(&png_bytes(40, 30)).unwrap();
        assert_eq!(source.format, ImageFormat::Png);
        assert_eq!((source.width, source.height), (40, 30));
        assert!(!source.has_alpha);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_source(b"definitely not an image").unwrap_err();
        assert!(matches!(
            err,
            MediaError::UnknownFormat | MediaError::Decode(_)
        ));
    }

    #[test]
    fn test_decode_applies_exif_rotation() {
        // Stored 200x100, tagged "rotate 90 CW" -> displayed 100x200
        let rotated = with_exif_orientation(&jpeg_bytes(200, 100), 6);
        let source = decode_source(&rotated).unwrap();
        assert_eq!(source.orientation, Orientation::Rotate90);
        assert_eq!((source.width, source.height), (100, 200));
    }

    #[test]
    fn test_original_is_passthrough() {
        let source = decode_source(&png_bytes(64, 48)).unwrap();
        let out = encode_variant(&source.image, None, OutputFormat::Png, EncodeSettings::default())
            .unwrap();
        assert_eq!((out.width, out.height), (64, 48));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_cover_resize_to_exact_box() {
        let source = decode_source(&png_bytes(600, 300)).unwrap();
        let out = encode_variant(
            &source.image,
            SizeName::Thumbnail.dimensions(),
            OutputFormat::Jpeg,
            EncodeSettings::default(),
        )
        .unwrap();
        assert_eq!((out.width, out.height), (150, 150));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_no_upscale() {
        let source = decode_source(&png_bytes(50, 50)).unwrap();
        let out = encode_variant(
            &source.image,
            SizeName::Large.dimensions(),
            OutputFormat::WebP,
            EncodeSettings::default(),
        )
        .unwrap();
        assert!(out.width <= 50 && out.height <= 50);
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_jpeg_is_progressive() {
        let source = decode_source(&png_bytes(64, 64)).unwrap();
        let out = encode_variant(&source.image, None, OutputFormat::Jpeg, EncodeSettings::default())
            .unwrap();
        // SOF2 marks a progressive frame
        assert!(out.bytes.windows(2).any(|m| m == [0xFF, 0xC2]));
        assert!(decode_source(&out.bytes).is_ok());
    }

    #[test]
    fn test_webp_is_lossy_when_compressing() {
        let source = decode_source(&png_bytes(64, 64)).unwrap();

        let lossy = encode_variant(&source.image, None, OutputFormat::WebP, EncodeSettings::default())
            .unwrap();
        assert_eq!(&lossy.bytes[12..16], b"VP8 ");

        let lossless = encode_variant(
            &source.image,
            None,
            OutputFormat::WebP,
            EncodeSettings { compress: false },
        )
        .unwrap();
        assert_eq!(&lossless.bytes[12..16], b"VP8L");
    }

    #[test]
    fn test_png_quality_selects_best_compression() {
        assert!(matches!(png_compression(QUALITY.png), CompressionType::Best));
        assert!(matches!(png_compression(60), CompressionType::Default));
    }

    #[test]
    fn test_jpeg_from_alpha_source() {
        let source = decode_source(&rgba_png_bytes(32, 32)).unwrap();
        assert!(source.has_alpha);
        let out = encode_variant(&source.image, None, OutputFormat::Jpeg, EncodeSettings::default());
        assert!(out.is_ok());
    }

    #[tokio::test]
    async fn test_render_variant_reports_on_disk_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = decode_source(&png_bytes(300, 300)).unwrap();
        let path = dir.path().join("x-1-ab-thumbnail.png");

        let descriptor = render_variant(
            &source,
            SizeName::Thumbnail,
            OutputFormat::Png,
            EncodeSettings::default(),
            &path,
        )
        .await
        .unwrap();

        assert_eq!(descriptor.filename, "x-1-ab-thumbnail.png");
        assert_eq!(descriptor.size, SizeName::Thumbnail);
        assert_eq!((descriptor.width, descriptor.height), (150, 150));
        assert_eq!(descriptor.bytes, std::fs::metadata(&path).unwrap().len());
    }
}

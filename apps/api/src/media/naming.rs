//! Naming convention linking every variant of one logical image.
//!
//! ```text
//! base      = {sanitizedSourceName}-{timestampMillis}-{randomHex16}
//! original  = {base}.{ext}
//! sized     = {base}-{sizeName}.{ext}
//! ```
//!
//! There is no index of variant families. Rendering and cleanup only agree
//! through this format, so both sides go through the helpers below.

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::media::profiles::{OutputFormat, SizeName, SIZE_PROFILES};

const MAX_HINT_LEN: usize = 32;
const RANDOM_HEX_LEN: usize = 16;
const FALLBACK_HINT: &str = "image";

/// Reduces a caller-supplied name to `[a-z0-9_]`, never containing `-`.
pub fn sanitize_name_hint(hint: &str) -> String {
    let stem = Path::new(hint)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(hint);

    let mapped: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    let trimmed: String = mapped
        .trim_matches('_')
        .chars()
        .take(MAX_HINT_LEN)
        .collect();
    let trimmed = trimmed.trim_end_matches('_');

    if trimmed.is_empty() {
        FALLBACK_HINT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Generates the base identifier shared by all variants of one pipeline call.
pub fn generate_base_id(hint: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        sanitize_name_hint(hint),
        Utc::now().timestamp_millis(),
        &random[..RANDOM_HEX_LEN]
    )
}

pub fn variant_filename(base: &str, size: SizeName, format: OutputFormat) -> String {
    match size.suffix() {
        Some(suffix) => format!("{base}-{suffix}.{}", format.extension()),
        None => format!("{base}.{}", format.extension()),
    }
}

/// Recovers the base identifier from any family member's filename or path.
pub fn family_prefix(name_or_path: &str) -> Option<String> {
    let file_name = Path::new(name_or_path).file_name()?.to_str()?;
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };

    let base = SIZE_PROFILES
        .iter()
        .find_map(|p| stem.strip_suffix(&format!("-{}", p.name.as_str())))
        .unwrap_or(stem);

    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// A filename the pipeline could have produced, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantName {
    pub base: String,
    pub size: SizeName,
    pub format: OutputFormat,
}

/// Parses `{hint}-{millis}-{hex16}[-{size}].{ext}`. Anything else is `None`,
/// including staged `temp-*` uploads.
pub fn parse_variant_filename(name: &str) -> Option<VariantName> {
    let (stem, ext) = name.rsplit_once('.')?;
    let format = match ext {
        "webp" => OutputFormat::WebP,
        "jpg" => OutputFormat::Jpeg,
        "png" => OutputFormat::Png,
        _ => return None,
    };

    let (base, size) = SIZE_PROFILES
        .iter()
        .find_map(|p| {
            stem.strip_suffix(&format!("-{}", p.name.as_str()))
                .map(|base| (base, p.name))
        })
        .unwrap_or((stem, SizeName::Original));

    let mut parts = base.split('-');
    let (hint, millis, random) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let hint_ok = !hint.is_empty()
        && hint.len() <= MAX_HINT_LEN
        && hint
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    let millis_ok = !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit());
    let random_ok = random.len() == RANDOM_HEX_LEN
        && random
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

    if hint_ok && millis_ok && random_ok {
        Some(VariantName {
            base: base.to_string(),
            size,
            format,
        })
    } else {
        None
    }
}

/// True if `entry_name` is `{base}` followed by `.` or `-`.
pub fn belongs_to_family(entry_name: &str, base: &str) -> bool {
    match entry_name.strip_prefix(base) {
        Some(rest) => rest.starts_with('.') || rest.starts_with('-'),
        None => false,
    }
}

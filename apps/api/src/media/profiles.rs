//! Fixed size and quality tables shared by the renderer and the orchestrator.
//!
//! These are process-wide constants. Callers pick which profiles to render via
//! `PipelineOptions`, but cannot change the dimensions or quality levels.

use std::fmt;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Named size of a rendered variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeName {
    Original,
    Thumbnail,
    Medium,
    Large,
}

impl SizeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeName::Original => "original",
            SizeName::Thumbnail => "thumbnail",
            SizeName::Medium => "medium",
            SizeName::Large => "large",
        }
    }

    /// Target box for this size. `None` means "keep source resolution".
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        SIZE_PROFILES
            .iter()
            .find(|p| p.name == *self)
            .map(|p| (p.width, p.height))
    }

    /// Filename suffix placed before the extension. The original has none.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            SizeName::Original => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for SizeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeProfile {
    pub name: SizeName,
    pub width: u32,
    pub height: u32,
}

/// Resized profiles, smallest first. `original` is implicit.
pub const SIZE_PROFILES: [SizeProfile; 3] = [
    SizeProfile {
        name: SizeName::Thumbnail,
        width: 150,
        height: 150,
    },
    SizeProfile {
        name: SizeName::Medium,
        width: 500,
        height: 500,
    },
    SizeProfile {
        name: SizeName::Large,
        width: 1200,
        height: 1200,
    },
];

/// Encoded output format of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    WebP,
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Broadly compatible fallback for a decoded source format.
    /// JPEG and PNG keep their format. Any other source, WebP included, becomes
    /// PNG when it carries alpha and JPEG when it does not.
    pub fn from_source(format: ImageFormat, has_alpha: bool) -> Self {
        match format {
            ImageFormat::Jpeg => OutputFormat::Jpeg,
            ImageFormat::Png => OutputFormat::Png,
            _ if has_alpha => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTable {
    pub webp: u8,
    pub jpeg: u8,
    pub png: u8,
}

pub const QUALITY: QualityTable = QualityTable {
    webp: 85,
    jpeg: 90,
    png: 90,
};

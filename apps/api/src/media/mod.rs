// Image variant pipeline: decode once, fan out into (size x format) variant
// files sharing one base identifier, and clean them up by that prefix.

pub mod cleanup;
pub mod error;
pub mod geometry;
pub mod naming;
pub mod pipeline;
pub mod profiles;
pub mod renderer;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use error::MediaError;
pub use pipeline::{ImageProcessor, PipelineOptions, VariantPipeline};
pub use profiles::{OutputFormat, SizeName};

/// One rendered variant. Owned by the filesystem once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    pub filename: String,
    pub path: PathBuf,
    pub size: SizeName,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// On-disk size after compression.
    pub bytes: u64,
}

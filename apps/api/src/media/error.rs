use std::path::PathBuf;

use thiserror::Error;

use crate::media::profiles::OutputFormat;
use crate::media::VariantDescriptor;

/// Errors raised by the image variant pipeline.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Failed to encode {format} variant: {reason}")]
    Encode { format: OutputFormat, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A variant failed after earlier siblings were already written to disk.
    #[error("{source} ({} variant(s) already written)", written.len())]
    Partial {
        written: Vec<VariantDescriptor>,
        #[source]
        source: Box<MediaError>,
    },
}

impl MediaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MediaError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the uploaded bytes are at fault rather than the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            MediaError::Decode(_)
            | MediaError::UnknownFormat
            | MediaError::EmptyImage
            | MediaError::Encode { .. } => true,
            MediaError::Io { .. } | MediaError::Task(_) => false,
            MediaError::Partial { source, .. } => source.is_client_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(MediaError::UnknownFormat.is_client_error());
        assert!(!MediaError::io("/tmp/x", std::io::Error::other("disk full")).is_client_error());

        let partial = MediaError::Partial {
            written: Vec::new(),
            source: Box::new(MediaError::EmptyImage),
        };
        assert!(partial.is_client_error());
    }
}

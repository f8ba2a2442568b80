use std::sync::Arc;

use crate::config::Config;
use crate::media::ImageProcessor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable image backend. Default: VariantPipeline (filesystem + `image` crate).
    pub images: Arc<dyn ImageProcessor>,
}

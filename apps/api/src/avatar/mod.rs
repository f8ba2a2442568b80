// Avatar uploads: validation and rollback around the image variant pipeline.
// Variants are written under `{UPLOADS_DIR}/avatars` and served from `/uploads/avatars`.

pub mod handlers;
pub mod service;

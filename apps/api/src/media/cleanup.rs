use std::path::Path;

use tracing::{debug, warn};

use crate::media::naming::{belongs_to_family, family_prefix};

/// Deletes every file in `dir` that belongs to the same variant family as
/// `name_or_path`. Returns how many files were removed.
///
/// Best-effort: a missing directory is a no-op and per-file failures are
/// logged and skipped.
pub async fn cleanup_variants(name_or_path: &str, dir: &Path) -> usize {
    let Some(base) = family_prefix(name_or_path) else {
        debug!("No family prefix in {name_or_path:?}, nothing to clean up");
        return 0;
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping cleanup of {base}: cannot read {}: {e}", dir.display());
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped listing {} during cleanup: {e}", dir.display());
                break;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !belongs_to_family(name, &base) {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to delete variant {name}: {e}"),
        }
    }

    debug!("Removed {removed} file(s) for {base} from {}", dir.display());
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[tokio::test]
    async fn test_removes_whole_family_only() {
        let dir = tempfile::tempdir().unwrap();
        let base = "avatar-1700000000000-0123456789abcdef";
        touch(dir.path(), &format!("{base}.jpg"));
        touch(dir.path(), &format!("{base}-thumbnail.jpg"));
        touch(dir.path(), &format!("{base}-medium.webp"));
        touch(dir.path(), "avatar-1700000000001-fedcba9876543210.jpg");
        touch(dir.path(), "notes.txt");

        let removed = cleanup_variants(&format!("{base}.jpg"), dir.path()).await;

        assert_eq!(removed, 3);
        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "avatar-1700000000001-fedcba9876543210.jpg".to_string(),
                "notes.txt".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_cleanup_from_sized_member() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a-1-ff.png");
        touch(dir.path(), "a-1-ff-large.png");

        let removed = cleanup_variants("a-1-ff-large.png", dir.path()).await;

        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let removed = cleanup_variants("a-1-ff.png", &dir.path().join("gone")).await;
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_prefix_boundary_respected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a-1-ff.png");
        touch(dir.path(), "a-1-ffee.png");

        cleanup_variants("a-1-ff.png", dir.path()).await;

        assert!(dir.path().join("a-1-ffee.png").exists());
        assert!(!dir.path().join("a-1-ff.png").exists());
    }
}

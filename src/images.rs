//! Wardrobe photo housekeeping
//!
//! The store only records relative photo paths. Removing the file when an
//! item is deleted, and spotting files nothing points to anymore, happens
//! here on the caller's side.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::state::data::WardrobeItem;

/// Photo extensions written by the capture screen
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

/// Resolve a stored relative path against the image directory
pub fn resolve(image_dir: &Path, image_path: &str) -> PathBuf {
    image_dir.join(image_path)
}

/// Delete the photo behind an item. A file that is already gone is fine.
/// Returns whether a file was removed.
pub fn remove_image(image_dir: &Path, image_path: &str) -> Result<bool> {
    let path = resolve(image_dir, image_path);
    match std::fs::remove_file(&path) {
        Ok(()) => {
            tracing::debug!("Removed photo {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Items whose photo no longer exists on disk
pub fn missing(image_dir: &Path, items: &[WardrobeItem]) -> Vec<i64> {
    let ids: Vec<i64> = items
        .iter()
        .filter(|item| !resolve(image_dir, &item.image_path).exists())
        .map(|item| item.id)
        .collect();

    if !ids.is_empty() {
        tracing::warn!("⚠️  {} wardrobe items have no photo on disk", ids.len());
    }
    ids
}

/// Photo files under `image_dir` that no wardrobe item refers to
pub fn orphans(image_dir: &Path, items: &[WardrobeItem]) -> Vec<PathBuf> {
    let referenced: HashSet<PathBuf> = items
        .iter()
        .map(|item| resolve(image_dir, &item.image_path))
        .collect();

    WalkDir::new(image_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .filter(|path| !referenced.contains(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: i64, image_path: &str) -> WardrobeItem {
        WardrobeItem {
            id,
            color: "blue".into(),
            kind: "shirt".into(),
            image_path: image_path.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_remove_image_tolerates_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"jpeg").unwrap();

        assert!(remove_image(dir.path(), "a.jpg").unwrap());
        assert!(!dir.path().join("a.jpg").exists());
        assert!(!remove_image(dir.path(), "a.jpg").unwrap());
    }

    #[test]
    fn test_missing_and_orphans() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("2024")).unwrap();
        std::fs::write(dir.path().join("kept.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("2024").join("stray.PNG"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let items = vec![item(1, "kept.jpg"), item(2, "gone.jpg")];

        assert_eq!(missing(dir.path(), &items), vec![2]);
        assert_eq!(
            orphans(dir.path(), &items),
            vec![dir.path().join("2024").join("stray.PNG")]
        );
    }
}

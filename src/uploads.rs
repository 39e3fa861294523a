use crate::errors::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Prefix under which stored assets are served back to clients. Stripping it
/// from a reference yields the file name inside the uploads directory, so the
/// mapping is invertible without ambiguity.
pub const REFERENCE_PREFIX: &str = "/uploads/";

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid filename filter regex"));
static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid dot-run regex"));

/// Owns the directory of uploaded image files and the `/uploads/<file>`
/// reference scheme items use to point at them. Stores never overwrite an
/// existing file; removals of already-missing files are a no-op.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|error| AppError::Io(format!("create {}: {}", self.dir.display(), error)))?;
        Ok(())
    }

    /// Writes `bytes` under a fresh collision-free name and returns the
    /// reference clients use to fetch the file. The name combines a random
    /// token with the sanitized client filename; `create_new` turns the
    /// residual collision case into a local error instead of a silent
    /// overwrite.
    pub async fn store(&self, bytes: &[u8], suggested_name: &str) -> AppResult<String> {
        let file_name = format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            sanitize_file_name(suggested_name)
        );
        let path = self.dir.join(&file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|error| AppError::Io(format!("create {}: {}", path.display(), error)))?;
        file.write_all(bytes)
            .await
            .map_err(|error| AppError::Io(format!("write {}: {}", path.display(), error)))?;
        file.flush()
            .await
            .map_err(|error| AppError::Io(format!("flush {}: {}", path.display(), error)))?;

        Ok(format!("{}{}", REFERENCE_PREFIX, file_name))
    }

    /// Deletes the referenced file. A reference whose file is already gone is
    /// not an error, so the call is safe to repeat.
    pub async fn remove(&self, asset_ref: &str) -> AppResult<()> {
        let path = self.resolve(asset_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Io(format!("remove {}: {}", path.display(), error))),
        }
    }

    /// Maps a `/uploads/<file>` reference back to its storage path. Rejects
    /// references that lack the prefix or try to traverse out of the uploads
    /// directory.
    pub fn resolve(&self, asset_ref: &str) -> AppResult<PathBuf> {
        let file_name = asset_ref.strip_prefix(REFERENCE_PREFIX).ok_or_else(|| {
            AppError::Io(format!("unrecognized asset reference '{}'", asset_ref))
        })?;
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(AppError::Io(format!("unsafe asset reference '{}'", asset_ref)));
        }
        Ok(self.dir.join(file_name))
    }
}

// Dot runs are collapsed so a sanitized name can never trip the ".."
// traversal guard in `resolve`.
fn sanitize_file_name(input: &str) -> String {
    let cleaned = UNSAFE_NAME_CHARS.replace_all(input, "_");
    let cleaned = DOT_RUNS.replace_all(&cleaned, ".");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, UploadStore) {
        let root = tempfile::tempdir().expect("temp uploads root");
        let store = UploadStore::new(root.path().join("uploads"));
        (root, store)
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_prefixed_reference() {
        let (_root, store) = temp_store();
        store.ensure_dir().await.expect("uploads dir");

        let asset_ref = store.store(b"png bytes", "photo.png").await.expect("store");
        assert!(asset_ref.starts_with(REFERENCE_PREFIX));
        assert!(asset_ref.ends_with("photo.png"));

        let path = store.resolve(&asset_ref).expect("resolve");
        assert_eq!(std::fs::read(path).expect("read stored file"), b"png bytes");
    }

    #[tokio::test]
    async fn stored_names_are_unique_for_identical_uploads() {
        let (_root, store) = temp_store();
        store.ensure_dir().await.expect("uploads dir");

        let first = store.store(b"same", "dup.png").await.expect("first store");
        let second = store.store(b"same", "dup.png").await.expect("second store");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_root, store) = temp_store();
        store.ensure_dir().await.expect("uploads dir");

        let asset_ref = store.store(b"bytes", "gone.png").await.expect("store");
        store.remove(&asset_ref).await.expect("first remove");
        assert!(!store.resolve(&asset_ref).expect("resolve").exists());
        store.remove(&asset_ref).await.expect("second remove is a no-op");
    }

    #[tokio::test]
    async fn resolve_rejects_traversal_and_foreign_references() {
        let (_root, store) = temp_store();
        assert!(store.resolve("/uploads/../../etc/passwd").is_err());
        assert!(store.resolve("/uploads/a/b.png").is_err());
        assert!(store.resolve("/elsewhere/b.png").is_err());
        assert!(store.resolve("/uploads/").is_err());
    }

    #[tokio::test]
    async fn hostile_filenames_are_sanitized() {
        let (_root, store) = temp_store();
        store.ensure_dir().await.expect("uploads dir");

        let asset_ref = store
            .store(b"x", "../../etc/pass wd?.png")
            .await
            .expect("store");
        let path = store.resolve(&asset_ref).expect("resolve");
        assert!(path.starts_with(store.dir()));
        assert!(path.exists());
    }
}

//! Asset storage for downloaded artwork.
//!
//! Writes are all-or-nothing: the filesystem backend streams into a
//! hidden `.partial` file and renames it into place, so a reader never
//! observes a truncated asset.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use dex_common::StoreError;

/// Keyed binary asset storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Check whether an asset is already stored under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Store `data` under `key`. Either the full payload becomes visible or nothing does.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Remove every stored asset, returning how many were deleted.
    async fn clear(&self) -> Result<usize, StoreError>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

/// Reject keys that could escape the store root.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Assets stored as flat files in a local directory.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    /// Open the store, creating the directory (recursively) if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk path for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{}.partial", key))
    }

    async fn write_temp(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    #[instrument(skip(self, data), fields(root = %self.root.display(), key = %key, size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let final_path = self.path_for(key)?;
        let temp_path = self.temp_path_for(key);

        if let Err(e) = Self::write_temp(&temp_path, &data).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            warn!(error = %e, "Failed to move asset into place");
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        debug!("Stored asset");
        Ok(())
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("public").join("pokemon");

        let store = FsAssetStore::open(&root).await.unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_put_then_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::open(dir.path()).await.unwrap();

        assert!(!store.exists("1.png").await.unwrap());
        store.put("1.png", Bytes::from_static(b"\x89PNG")).await.unwrap();
        assert!(store.exists("1.png").await.unwrap());

        let written = std::fs::read(dir.path().join("1.png")).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_put_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::open(dir.path()).await.unwrap();

        store.put("7.png", Bytes::from_static(b"squirtle")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["7.png".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::open(dir.path()).await.unwrap();

        for key in ["", "../1.png", "a/b.png", ".hidden"] {
            let err = store.put(key, Bytes::from_static(b"x")).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[tokio::test]
    async fn test_clear_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::open(dir.path()).await.unwrap();
        store.put("1.png", Bytes::from_static(b"a")).await.unwrap();
        store.put("2.png", Bytes::from_static(b"b")).await.unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(!store.exists("1.png").await.unwrap());
        assert!(dir.path().join("nested").is_dir());
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, trace};

use super::{validate_key, Storage, StorageError, StorageResult};

/// File-based storage: one file per key under a base directory
///
/// Writes go through a temporary file in the target directory followed by a
/// rename, so a crash never leaves a half-written state file behind.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage rooted at `base_path`
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn get_path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.base_path.clone(), |path, part| path.join(part))
    }

    fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    async fn collect_keys(&self, dir: PathBuf, out: &mut Vec<String>) -> StorageResult<()> {
        let mut pending = vec![dir];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_path) {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    out.push(key);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.get_path(key);
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::atomic_write(&path, &data))
            .await
            .map_err(|e| StorageError::IoError(std::io::Error::other(e)))??;
        debug!("Stored data at key: {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        match fs::read(self.get_path(key)).await {
            Ok(data) => {
                trace!("Retrieved {} bytes for key: {}", data.len(), key);
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match fs::remove_file(self.get_path(key)).await {
            Ok(()) => {
                debug!("Deleted key: {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(fs::metadata(self.get_path(key)).await.is_ok())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(self.base_path.clone(), &mut keys).await?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStorage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_storage_roundtrip_and_list() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();

        storage.put("assembly/state", b"{}").await.unwrap();
        storage.put("proposals/p-2", b"2").await.unwrap();
        storage.put("proposals/p-1", b"1").await.unwrap();

        assert_eq!(storage.get("assembly/state").await.unwrap(), b"{}");
        assert!(dir.path().join("assembly").join("state").exists());
        assert_eq!(
            storage.list("proposals/").await.unwrap(),
            vec!["proposals/p-1".to_string(), "proposals/p-2".to_string()]
        );

        storage.delete("proposals/p-1").await.unwrap();
        storage.delete("proposals/p-1").await.unwrap();
        assert!(!storage.exists("proposals/p-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = FileStorage::new(dir.path()).await.unwrap();
            storage.put_json("access/delegate", &"did:icn:alice").await.unwrap();
        }
        let reopened = FileStorage::new(dir.path()).await.unwrap();
        let delegate: String = reopened.get_json("access/delegate").await.unwrap();
        assert_eq!(delegate, "did:icn:alice");
        assert!(matches!(
            reopened.get("access/nobody").await,
            Err(StorageError::KeyNotFound(_))
        ));
    }
}

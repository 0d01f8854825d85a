//! Filesystem blob store (secondary/driven adapter)
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: content is streamed into a hidden temporary sibling
//!   (`.{name}.tmp-{uuid}`), flushed to disk, then renamed onto the final
//!   name. A crash or I/O error never exposes a partial blob, and the
//!   temporary file is removed on failure.
//! - **Lazy namespaces**: the owner directory is created by the first save
//!   and removed by a batch delete that leaves it empty.
//! - **Not found is data**: `get` answers `None` and `delete` succeeds when
//!   the blob is absent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use filevault_core::domain::newtypes::{OwnerId, StoredName};
use filevault_core::ports::{BlobReader, IBlobStore};

use crate::StoreError;

/// Blob store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`; nothing is touched on disk yet
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if missing and checks that it is a directory
    pub async fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        let meta = fs::metadata(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))?;
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every blob of `owner`
    pub fn namespace(&self, owner: &OwnerId) -> PathBuf {
        self.root.join(owner.to_string())
    }

    /// Final location of a blob
    pub fn blob_path(&self, owner: &OwnerId, name: &StoredName) -> PathBuf {
        self.namespace(owner).join(name.as_str())
    }

    fn temp_path(&self, owner: &OwnerId, name: &StoredName) -> PathBuf {
        self.namespace(owner)
            .join(format!(".{}.tmp-{}", name, Uuid::new_v4().simple()))
    }

    /// Streams `content` into `tmp` and syncs it to disk
    async fn write_temp(
        tmp: &Path,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64, StoreError> {
        let mut file = File::create(tmp)
            .await
            .map_err(|e| StoreError::io(tmp, e))?;
        let written = tokio::io::copy(content, &mut file)
            .await
            .map_err(|e| StoreError::io(tmp, e))?;
        file.flush().await.map_err(|e| StoreError::io(tmp, e))?;
        file.sync_all().await.map_err(|e| StoreError::io(tmp, e))?;
        Ok(written)
    }

    async fn remove_blob(&self, owner: &OwnerId, name: &StoredName) -> Result<(), StoreError> {
        let path = self.blob_path(owner, name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Removes the owner directory when nothing is left in it
    async fn remove_namespace_if_empty(&self, owner: &OwnerId) {
        let dir = self.namespace(owner);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot inspect owner namespace");
                return;
            }
        };

        match entries.next_entry().await {
            Ok(None) => match fs::remove_dir(&dir).await {
                Ok(()) => debug!(path = %dir.display(), "Removed empty owner namespace"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to remove owner namespace")
                }
            },
            Ok(Some(_)) => {}
            Err(e) => warn!(path = %dir.display(), error = %e, "Cannot inspect owner namespace"),
        }
    }
}

#[async_trait::async_trait]
impl IBlobStore for FsBlobStore {
    #[instrument(skip(self, content), fields(owner = %owner, blob = %name))]
    async fn save(
        &self,
        owner: &OwnerId,
        name: &StoredName,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> anyhow::Result<u64> {
        let dir = self.namespace(owner);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let tmp = self.temp_path(owner, name);
        let target = self.blob_path(owner, name);

        let written = match Self::write_temp(&tmp, content).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                return Err(e.into());
            }
        };

        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&target, e).into());
        }

        debug!(bytes = written, "Blob written");
        Ok(written)
    }

    async fn get(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<Option<BlobReader>> {
        let path = self.blob_path(owner, name);
        match File::open(&path).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e).into()),
        }
    }

    async fn exists(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<bool> {
        let path = self.blob_path(owner, name);
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e).into()),
        }
    }

    async fn delete(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<()> {
        self.remove_blob(owner, name).await?;
        Ok(())
    }

    #[instrument(skip(self, names), fields(owner = %owner, count = names.len()))]
    async fn delete_many(
        &self,
        owner: &OwnerId,
        names: &[StoredName],
    ) -> anyhow::Result<Vec<StoredName>> {
        let mut failed = Vec::new();
        for name in names {
            if let Err(e) = self.remove_blob(owner, name).await {
                warn!(blob = %name, error = %e, "Failed to delete blob");
                failed.push(name.clone());
            }
        }

        self.remove_namespace_if_empty(owner).await;
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    use super::*;
    use filevault_core::domain::newtypes::FileId;

    fn setup() -> (TempDir, FsBlobStore) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        (dir, store)
    }

    fn name(ext: &str) -> StoredName {
        StoredName::for_file(&FileId::new(), &format!("file{ext}"))
    }

    async fn read_all(store: &FsBlobStore, owner: &OwnerId, name: &StoredName) -> Vec<u8> {
        let mut reader = store.get(owner, name).await.unwrap().unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let blob = name(".txt");

        let written = store.save(&owner, &blob, &mut &b"hello"[..]).await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(read_all(&store, &owner, &blob).await, b"hello");
        assert!(store.blob_path(&owner, &blob).starts_with(store.namespace(&owner)));
    }

    #[tokio::test]
    async fn test_save_overwrites_existing() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let blob = name(".md");

        store.save(&owner, &blob, &mut &b"first"[..]).await.unwrap();
        store.save(&owner, &blob, &mut &b"second"[..]).await.unwrap();

        assert_eq!(read_all(&store, &owner, &blob).await, b"second");
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        store.save(&owner, &name(".txt"), &mut &b"x"[..]).await.unwrap();

        let mut entries = fs::read_dir(store.namespace(&owner)).await.unwrap();
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().starts_with('.'));
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_failed_read_leaves_nothing_behind() {
        struct Broken;
        impl AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(ErrorKind::Other, "boom")))
            }
        }

        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let blob = name(".txt");

        assert!(store.save(&owner, &blob, &mut Broken).await.is_err());
        assert!(!store.exists(&owner, &blob).await.unwrap());

        let mut entries = fs::read_dir(store.namespace(&owner)).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_dir, store) = setup();
        assert!(store
            .get(&OwnerId::new(), &name(".txt"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_dir, store) = setup();
        store.delete(&OwnerId::new(), &name(".txt")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_blob_but_keeps_namespace() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let blob = name(".txt");
        store.save(&owner, &blob, &mut &b"x"[..]).await.unwrap();

        store.delete(&owner, &blob).await.unwrap();

        assert!(!store.exists(&owner, &blob).await.unwrap());
        assert!(store.namespace(&owner).is_dir());
    }

    #[tokio::test]
    async fn test_delete_many_removes_empty_namespace() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let a = name(".txt");
        let b = name("");
        store.save(&owner, &a, &mut &b"a"[..]).await.unwrap();
        store.save(&owner, &b, &mut &b"b"[..]).await.unwrap();

        let failed = store
            .delete_many(&owner, &[a, b, name(".gone")])
            .await
            .unwrap();

        assert!(failed.is_empty());
        assert!(!store.namespace(&owner).exists());
    }

    #[tokio::test]
    async fn test_delete_many_keeps_namespace_with_survivors() {
        let (_dir, store) = setup();
        let owner = OwnerId::new();
        let doomed = name(".txt");
        let survivor = name(".txt");
        store.save(&owner, &doomed, &mut &b"a"[..]).await.unwrap();
        store.save(&owner, &survivor, &mut &b"b"[..]).await.unwrap();

        store.delete_many(&owner, &[doomed]).await.unwrap();

        assert!(store.exists(&owner, &survivor).await.unwrap());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let (_dir, store) = setup();
        let alice = OwnerId::new();
        let bob = OwnerId::new();
        let blob = name(".txt");
        store.save(&alice, &blob, &mut &b"alice"[..]).await.unwrap();

        assert!(store.get(&bob, &blob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_root_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let store = FsBlobStore::new(&file);
        assert!(store.ensure_root().await.is_err());
    }
}

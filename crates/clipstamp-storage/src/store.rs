//! Local filesystem store.
//!
//! Uploads (chunk-assembled inputs) and public outputs live in separate
//! roots. Object names are flat filenames; anything path-like is rejected
//! before touching the filesystem.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::range::{parse_range, ByteRange};

/// Byte-addressable store backed by two local directories.
#[derive(Debug, Clone)]
pub struct LocalStore {
    upload_dir: PathBuf,
    public_dir: PathBuf,
}

impl LocalStore {
    /// Open the store, creating both roots if missing.
    pub async fn init(
        upload_dir: impl AsRef<Path>,
        public_dir: impl AsRef<Path>,
    ) -> StorageResult<Self> {
        let upload_dir = upload_dir.as_ref().to_path_buf();
        let public_dir = public_dir.as_ref().to_path_buf();

        fs::create_dir_all(&upload_dir).await?;
        fs::create_dir_all(&public_dir).await?;

        Ok(Self {
            upload_dir,
            public_dir,
        })
    }

    /// Absolute path of an assembled (or in-progress) upload.
    pub fn upload_path(&self, name: &str) -> StorageResult<PathBuf> {
        Ok(self.upload_dir.join(validate_name(name)?))
    }

    /// Absolute path of a public output artifact.
    pub fn public_path(&self, name: &str) -> StorageResult<PathBuf> {
        Ok(self.public_dir.join(validate_name(name)?))
    }

    /// Append one upload chunk.
    ///
    /// Chunk index 0 deletes any existing target first, so a restarted
    /// upload never keeps a stale tail. All other indices append in arrival
    /// order; the protocol trusts the client to submit chunks in index
    /// order. Returns the target's byte length after the append.
    pub async fn append_chunk(
        &self,
        filename: &str,
        chunk_index: u64,
        bytes: &[u8],
    ) -> StorageResult<u64> {
        let path = self.upload_path(filename)?;

        if chunk_index == 0 {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(filename, "Restarted upload, discarded previous target"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from(e)),
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                StorageError::append_failed(format!("{}: {}", path.display(), e))
            })?;

        file.write_all(bytes).await?;
        file.flush().await?;

        let len = file.metadata().await?.len();
        debug!(filename, chunk_index, len, "Appended upload chunk");
        Ok(len)
    }

    /// Check whether an assembled upload exists.
    pub async fn upload_exists(&self, name: &str) -> bool {
        match self.upload_path(name) {
            Ok(path) => fs::metadata(path).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Delete an upload. Missing files are not an error; a render may be
    /// retried against uploads that were already cleaned up.
    pub async fn delete_upload(&self, name: &str) -> StorageResult<()> {
        let path = self.upload_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(name, error = %e, "Failed to delete upload");
                Err(StorageError::from(e))
            }
        }
    }

    /// Byte size of a public output artifact.
    pub async fn output_size(&self, name: &str) -> StorageResult<u64> {
        let path = self.public_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(name))
            }
            Err(e) => Err(StorageError::from(e)),
        }
    }

    /// Read a public output artifact, optionally restricted to an HTTP
    /// `Range` header value.
    ///
    /// Returns the bytes, the object's total size, and the resolved range
    /// when one was requested.
    pub async fn read_output_range(
        &self,
        name: &str,
        range_header: Option<&str>,
    ) -> StorageResult<(Vec<u8>, u64, Option<ByteRange>)> {
        let path = self.public_path(name)?;

        let mut file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(name));
            }
            Err(e) => return Err(StorageError::from(e)),
        };

        let size = file.metadata().await?.len();

        match range_header {
            Some(header) => {
                let range = parse_range(header, size)?;
                file.seek(SeekFrom::Start(range.start)).await?;
                let mut buf = vec![0u8; range.len() as usize];
                file.read_exact(&mut buf).await?;
                Ok((buf, size, Some(range)))
            }
            None => {
                let mut buf = Vec::with_capacity(size as usize);
                file.read_to_end(&mut buf).await?;
                Ok((buf, size, None))
            }
        }
    }
}

/// Reject path traversal in client-supplied object names.
fn validate_name(name: &str) -> StorageResult<&str> {
    if name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::invalid_name(name));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::init(dir.path().join("uploads"), dir.path().join("public"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_append_chunks_in_order() {
        let (_dir, store) = test_store().await;

        store.append_chunk("f.bin", 0, b"AA").await.unwrap();
        store.append_chunk("f.bin", 1, b"BB").await.unwrap();
        let len = store.append_chunk("f.bin", 2, b"CC").await.unwrap();
        assert_eq!(len, 6);

        let path = store.upload_path("f.bin").unwrap();
        assert_eq!(fs::read(path).await.unwrap(), b"AABBCC");
    }

    #[tokio::test]
    async fn test_chunk_zero_resets_target() {
        let (_dir, store) = test_store().await;

        store.append_chunk("f.bin", 0, b"old0").await.unwrap();
        store.append_chunk("f.bin", 1, b"old1").await.unwrap();
        store.append_chunk("f.bin", 2, b"old2").await.unwrap();

        // Restarted upload for the same filename discards the old tail
        store.append_chunk("f.bin", 0, b"new0").await.unwrap();
        store.append_chunk("f.bin", 1, b"new1").await.unwrap();

        let path = store.upload_path("f.bin").unwrap();
        assert_eq!(fs::read(path).await.unwrap(), b"new0new1");
    }

    #[tokio::test]
    async fn test_upload_exists_and_delete() {
        let (_dir, store) = test_store().await;

        assert!(!store.upload_exists("f.bin").await);
        store.append_chunk("f.bin", 0, b"x").await.unwrap();
        assert!(store.upload_exists("f.bin").await);

        store.delete_upload("f.bin").await.unwrap();
        assert!(!store.upload_exists("f.bin").await);

        // Deleting a missing upload is not an error
        store.delete_upload("f.bin").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_output_range() {
        let (_dir, store) = test_store().await;
        let path = store.public_path("out.mp4").unwrap();
        fs::write(&path, b"0123456789").await.unwrap();

        assert_eq!(store.output_size("out.mp4").await.unwrap(), 10);

        let (bytes, size, range) = store.read_output_range("out.mp4", None).await.unwrap();
        assert_eq!(bytes, b"0123456789");
        assert_eq!(size, 10);
        assert!(range.is_none());

        let (bytes, size, range) = store
            .read_output_range("out.mp4", Some("bytes=2-5"))
            .await
            .unwrap();
        assert_eq!(bytes, b"2345");
        assert_eq!(size, 10);
        assert_eq!(range.unwrap(), ByteRange { start: 2, end: 5 });
    }

    #[tokio::test]
    async fn test_missing_output_is_not_found() {
        let (_dir, store) = test_store().await;
        assert!(matches!(
            store.output_size("nope.mp4").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.read_output_range("nope.mp4", None).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let (_dir, store) = test_store().await;
        for bad in ["../evil", "a/b", "a\\b", ""] {
            assert!(matches!(
                store.append_chunk(bad, 0, b"x").await,
                Err(StorageError::InvalidName(_))
            ));
        }
    }
}

//! Content hashing
//!
//! SHA-256 over the full byte content, rendered as 64 lowercase hex
//! characters. The same digest is computed by the server when storing a
//! blob and by the sync client when scanning a folder, so the two can be
//! compared directly.
//!
//! Readers are consumed incrementally in fixed-size chunks. Nothing here
//! seeks: a caller that needs the bytes again must re-open or re-slice them.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::newtypes::ContentHash;

/// Read buffer size for streaming digests
const CHUNK_SIZE: usize = 64 * 1024;

/// Incremental SHA-256 hasher that also counts bytes
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    digest: Sha256,
    len: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds more bytes into the digest
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
        self.len += data.len() as u64;
    }

    /// Bytes consumed so far
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finishes the digest
    pub fn finalize(self) -> ContentHash {
        ContentHash::from_digest_hex(format!("{:x}", self.digest.finalize()))
    }
}

/// Hashes an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Hashes everything readable from `reader`
///
/// Returns the digest together with the number of bytes read.
///
/// # Errors
/// Propagates read errors from the underlying reader
pub async fn hash_reader<R>(reader: &mut R) -> std::io::Result<(ContentHash, u64)>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let len = hasher.len();
    Ok((hasher.finalize(), len))
}

/// Hashes the file at `path`
///
/// # Errors
/// Returns error if the file cannot be opened or read
pub async fn hash_file(path: &Path) -> std::io::Result<(ContentHash, u64)> {
    let mut file = tokio::fs::File::open(path).await?;
    hash_reader(&mut file).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_known_digests() {
        assert_eq!(hash_bytes(b"").as_str(), EMPTY_SHA256);
        assert_eq!(hash_bytes(b"hello").as_str(), HELLO_SHA256);
    }

    #[test]
    fn test_deterministic() {
        let data = b"the same bytes twice";
        assert_eq!(hash_bytes(data), hash_bytes(data));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.len(), 5);
        assert_eq!(hasher.finalize().as_str(), HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_hash_reader_spans_chunks() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let mut reader: &[u8] = &data;
        let (hash, len) = hash_reader(&mut reader).await.unwrap();
        assert_eq!(len, data.len() as u64);
        assert_eq!(hash, hash_bytes(&data));
    }

    #[tokio::test]
    async fn test_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let (hash, len) = hash_file(&path).await.unwrap();
        assert_eq!(hash.as_str(), HELLO_SHA256);
        assert_eq!(len, 5);
    }

    #[tokio::test]
    async fn test_hash_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hash_file(&dir.path().join("nope")).await.is_err());
    }
}

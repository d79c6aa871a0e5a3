//! The photo blob store (§3 "Photo record", §4.9, §6.3): binary payloads
//! are stored flat on disk as `<PhotoUID><dot-extension>` under a
//! configured root, which is auto-created on first use. Row metadata
//! itself is not this crate's concern — only the base64 <-> file
//! round-trip and the extension bookkeeping that keeps at most one file
//! per `PhotoUID` on disk.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhotoStoreError {
    #[error("photo storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid base64 payload")]
    Base64(#[from] base64::DecodeError),
}

const DEFAULT_EXTENSION: &str = ".jpg";

/// Normalizes a file extension: ensures exactly one leading dot, falls
/// back to [`DEFAULT_EXTENSION`] when `raw` is empty or absent.
fn normalize_extension(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_EXTENSION.to_string(),
        Some(ext) if ext.starts_with('.') => ext.to_string(),
        Some(ext) => format!(".{ext}"),
    }
}

#[derive(Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_root(&self) -> Result<(), PhotoStoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, photo_uid: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{photo_uid}{extension}"))
    }

    /// Finds the file (if any) already on disk for `photo_uid`, regardless
    /// of extension, by prefix search over the storage root.
    async fn find_existing(&self, photo_uid: &str) -> Result<Option<PathBuf>, PhotoStoreError> {
        self.ensure_root().await?;
        let prefix = format!("{photo_uid}.");
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    return Ok(Some(entry.path()));
                }
            }
        }
        Ok(None)
    }

    /// Writes the decoded binary payload for `photo_uid`, deleting any
    /// other `<PhotoUID>.*` file with a different extension first. When
    /// `extension` is absent and no file currently exists, defaults to
    /// `.jpg`; when absent and a file exists, keeps that file's extension.
    pub async fn write(
        &self,
        photo_uid: &str,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<String, PhotoStoreError> {
        self.ensure_root().await?;
        let existing = self.find_existing(photo_uid).await?;
        let extension = match extension {
            Some(ext) => normalize_extension(Some(ext)),
            None => existing
                .as_ref()
                .and_then(|p| p.extension().and_then(|e| e.to_str()))
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        };
        let target = self.path_for(photo_uid, &extension);
        if let Some(existing) = existing {
            if existing != target {
                let _ = tokio::fs::remove_file(&existing).await;
            }
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(extension)
    }

    /// Best-effort delete of every `<PhotoUID>.*` file. Missing files are
    /// idempotent success (§7: "photo file missing on delete" is treated
    /// as success), not an error.
    pub async fn delete(&self, photo_uid: &str) -> Result<(), PhotoStoreError> {
        self.ensure_root().await?;
        let prefix = format!("{photo_uid}.");
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                        tracing::warn!(photo_uid, error = %err, "failed to remove photo file");
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads the binary payload and extension for `photo_uid`, if a file
    /// exists on disk.
    pub async fn read(&self, photo_uid: &str) -> Result<Option<(Vec<u8>, String)>, PhotoStoreError> {
        let Some(path) = self.find_existing(photo_uid).await? else {
            return Ok(None);
        };
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let bytes = tokio::fs::read(&path).await?;
        Ok(Some((bytes, extension)))
    }

    pub fn decode_base64(data: &str) -> Result<Vec<u8>, PhotoStoreError> {
        Ok(BASE64.decode(data)?)
    }

    pub fn encode_base64(data: &[u8]) -> String {
        BASE64.encode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> PhotoStore {
        let dir = std::env::temp_dir().join(format!("bss-photo-store-test-{}", uuid_like()));
        PhotoStore::new(dir)
    }

    fn uuid_like() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        format!("{:x}", SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos())
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = temp_store().await;
        let ext = store.write("P_1", b"hello", Some(".jpg")).await.unwrap();
        assert_eq!(ext, ".jpg");
        let (bytes, ext) = store.read("P_1").await.unwrap().unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(ext, ".jpg");
    }

    #[tokio::test]
    async fn write_replaces_prior_extension() {
        let store = temp_store().await;
        store.write("P_1", b"one", Some(".jpg")).await.unwrap();
        store.write("P_1", b"two", Some(".png")).await.unwrap();
        assert!(!store.path_for("P_1", ".jpg").exists());
        let (bytes, ext) = store.read("P_1").await.unwrap().unwrap();
        assert_eq!(bytes, b"two");
        assert_eq!(ext, ".png");
    }

    #[tokio::test]
    async fn defaults_to_jpg_when_extension_absent_and_no_prior_file() {
        let store = temp_store().await;
        let ext = store.write("P_1", b"data", None).await.unwrap();
        assert_eq!(ext, ".jpg");
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_file() {
        let store = temp_store().await;
        store.delete("P_missing").await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_the_file() {
        let store = temp_store().await;
        store.write("P_1", b"data", Some(".jpg")).await.unwrap();
        store.delete("P_1").await.unwrap();
        assert!(store.read("P_1").await.unwrap().is_none());
    }

    #[test]
    fn base64_round_trips() {
        let encoded = PhotoStore::encode_base64(b"hello");
        assert_eq!(encoded, "aGVsbG8=");
        assert_eq!(PhotoStore::decode_base64(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn normalizes_extensions() {
        assert_eq!(normalize_extension(Some("jpg")), ".jpg");
        assert_eq!(normalize_extension(Some(".png")), ".png");
        assert_eq!(normalize_extension(None), ".jpg");
        assert_eq!(normalize_extension(Some("")), ".jpg");
    }
}

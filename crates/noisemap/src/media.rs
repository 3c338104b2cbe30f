//! Media storage collaborator.
//!
//! Reports never carry media bytes, only a stable reference produced by a
//! [`MediaStore`]. The bundled [`LocalMediaStore`] writes uploads into a
//! directory that the HTTP server exposes read-only.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Error, Result};

/// Longest original-name fragment kept in a stored file name.
const MAX_NAME_LEN: usize = 64;

/// One uploaded media part.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// File name as sent by the client, if any.
    pub file_name: Option<String>,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaUpload {
    /// Whether the upload carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Stores media bytes and hands back a stable reference.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist one upload and return its reference (URL or path).
    async fn put(&self, upload: MediaUpload) -> Result<String>;
}

/// [`MediaStore`] writing to a local directory.
///
/// Files land in `<directory>/<folder>/<millis>-<hash>-<name>` and are
/// referenced as `<public_base_url>/<folder>/<millis>-<hash>-<name>`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    directory: PathBuf,
    folder: String,
    public_base_url: String,
}

impl LocalMediaStore {
    /// Create a store rooted at `directory`.
    #[must_use]
    pub fn new(
        directory: impl Into<PathBuf>,
        folder: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            folder: folder.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration, resolving the default directory.
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            config.resolved_directory(),
            config.folder.clone(),
            config.public_base_url.clone(),
        )
    }

    /// Root directory that is served at the public base URL.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn stored_name(upload: &MediaUpload) -> String {
        let hash = blake3::hash(&upload.bytes).to_hex();
        let name = upload
            .file_name
            .as_deref()
            .map(sanitize_file_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "upload".to_string());
        format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &hash.as_str()[..16],
            name
        )
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, upload: MediaUpload) -> Result<String> {
        let folder = self.directory.join(&self.folder);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: folder.clone(),
                source,
            })?;

        let name = Self::stored_name(&upload);
        let path = folder.join(&name);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| Error::media_store(format!("writing {}: {e}", path.display())))?;

        debug!(
            "Stored {} bytes of {} at {}",
            upload.bytes.len(),
            upload.content_type.as_deref().unwrap_or("unknown content"),
            path.display()
        );
        info!("Stored media {}", name);
        Ok(format!("{}/{}/{}", self.public_base_url, self.folder, name))
    }
}

/// Reduce a client file name to a safe, short single path component.
fn sanitize_file_name(raw: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9._-]+").expect("Invalid regex pattern")
    });

    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned = unsafe_chars.replace_all(base, "_");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    // Keep the tail so the extension survives truncation
    let skip = trimmed.chars().count().saturating_sub(MAX_NAME_LEN);
    trimmed.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalMediaStore {
        let dir = std::env::temp_dir().join(format!("noisemap_media_{}", uuid::Uuid::new_v4()));
        LocalMediaStore::new(dir, "noise_reports", "/media/")
    }

    fn upload(name: Option<&str>, bytes: &[u8]) -> MediaUpload {
        MediaUpload {
            file_name: name.map(str::to_string),
            content_type: Some("audio/mp4".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("clip.m4a"), "clip.m4a");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\rec 01.mp3"), "rec_01.mp3");
        assert_eq!(sanitize_file_name("..."), "");
    }

    #[test]
    fn test_sanitize_keeps_extension_of_long_names() {
        let long = format!("{}.webm", "a".repeat(200));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_NAME_LEN);
        assert!(cleaned.ends_with(".webm"));
    }

    #[test]
    fn test_upload_debug_hides_bytes() {
        let debug_str = format!("{:?}", upload(Some("a.m4a"), &[1, 2, 3]));
        assert!(debug_str.contains("len: 3"));
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_reference() {
        let store = temp_store();
        let reference = store
            .put(upload(Some("night party.m4a"), b"RIFF....data"))
            .await
            .unwrap();

        assert!(reference.starts_with("/media/noise_reports/"));
        assert!(reference.ends_with("-night_party.m4a"));

        let name = reference.rsplit('/').next().unwrap();
        let written = std::fs::read(store.directory().join("noise_reports").join(name)).unwrap();
        assert_eq!(written, b"RIFF....data");

        let _ = std::fs::remove_dir_all(store.directory());
    }

    #[tokio::test]
    async fn test_put_without_name() {
        let store = temp_store();
        let reference = store.put(upload(None, b"abc")).await.unwrap();
        assert!(reference.ends_with("-upload"));

        let _ = std::fs::remove_dir_all(store.directory());
    }
}

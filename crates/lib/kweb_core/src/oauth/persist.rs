//! On-disk persistence of the token record across restarts.
//!
//! The record is stored as JSON with an RFC 3339 `expires_at`, never a
//! relative "seconds remaining".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::models::TokenRecord;

/// Token file errors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Token file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// JSON file holding a single [`TokenRecord`].
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<TokenRecord>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), "loaded token record");
        Ok(Some(record))
    }

    /// Write the record via a sibling temp file and rename, so a crash never
    /// leaves a truncated file behind.
    pub async fn save(&self, record: &TokenRecord) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "saved token record");
        Ok(())
    }

    /// Delete the stored record. A missing file is not an error.
    pub async fn remove(&self) -> Result<(), PersistError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;

    fn record() -> TokenRecord {
        TokenRecord {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: DateTime::parse_from_rfc3339("2026-10-16T12:30:00.123456Z")
                .unwrap()
                .with_timezone(&Utc),
            token_type: "Bearer".into(),
            scope: Some("product.compact".into()),
        }
    }

    #[tokio::test]
    async fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("nested").join("token.json"));

        file.save(&record()).await.unwrap();
        let loaded = file.load().await.unwrap().unwrap();
        assert_eq!(loaded, record());
        assert!(!file.tmp_path().exists());
    }

    #[tokio::test]
    async fn reloaded_expiry_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        let original = record();
        file.save(&original).await.unwrap();

        // Reload "later": the deadline must not move with the clock.
        let loaded = file.load().await.unwrap().unwrap();
        assert_eq!(loaded.expires_at, original.expires_at);

        let before = original.expires_at - Duration::minutes(10);
        let after = original.expires_at + Duration::minutes(10);
        assert!(!loaded.is_expired_at(before, Duration::seconds(30)));
        assert!(loaded.is_expired_at(after, Duration::seconds(30)));
    }

    #[tokio::test]
    async fn corrupt_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = TokenFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PersistError::Format(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        file.save(&record()).await.unwrap();
        file.remove().await.unwrap();
        assert!(!file.path().exists());
        file.remove().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = TokenFile::new(dir.path().join("token.json"));
        file.save(&record()).await.unwrap();
        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

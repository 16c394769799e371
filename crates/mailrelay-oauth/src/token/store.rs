//! On-disk token cache.

use super::Token;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// JSON token cache at a fixed path.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash never leaves a truncated cache behind. On Unix the file is
/// readable by the owner only.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached token.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is absent, unreadable or not a token.
    pub async fn load(&self) -> Result<Token> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        let token = serde_json::from_str(&json)?;
        debug!(path = %self.path.display(), "Loaded cached token");
        Ok(token)
    }

    /// Writes `token`, replacing any previous cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_vec_pretty(token)?;
        let tmp = self.tmp_path();

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

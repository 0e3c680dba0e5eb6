//! Token persistence across console restarts

use super::error::TokenStoreError;
use super::AuthToken;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed store for the login token
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/krushinova/rover_token`
    pub fn default_path() -> Result<PathBuf, TokenStoreError> {
        dirs::data_dir()
            .map(|dir| dir.join("krushinova").join("rover_token"))
            .ok_or(TokenStoreError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token, if any
    pub async fn load(&self) -> Result<Option<AuthToken>, TokenStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(AuthToken::new(token)))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Like [`load`](Self::load), but an unreadable file counts as no token
    pub async fn load_or_warn(&self) -> Option<AuthToken> {
        match self.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring stored token: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, token: &AuthToken) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        tokio::fs::write(&self.path, token.as_str())
            .await
            .map_err(|e| self.io_error(e))?;
        debug!("Stored token at {}", self.path.display());
        Ok(())
    }

    /// Forget the stored token. Missing files are not an error.
    pub async fn clear(&self) -> Result<(), TokenStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

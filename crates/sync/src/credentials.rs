//! Saved sign-in between runs.
//!
//! The file holds the signed-in user's id and refresh token as JSON and is
//! created readable by its owner only. A missing or unreadable file simply
//! means there is nothing to restore.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use viva_mais_core::VisitorId;

use crate::backend::StoredCredential;

/// Errors that can occur when reading or writing the credential file.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid credential file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    uid: VisitorId,
    #[serde(default)]
    anonymous: bool,
    refresh_token: String,
}

/// File-backed store for one [`StoredCredential`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved credential, if there is a readable one.
    pub async fn load(&self) -> Option<StoredCredential> {
        match self.read().await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable credential file");
                None
            }
        }
    }

    async fn read(&self) -> Result<Option<StoredCredential>, CredentialError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CredentialFile = serde_json::from_str(&text)?;
        Ok(Some(StoredCredential {
            uid: file.uid,
            anonymous: file.anonymous,
            refresh_token: SecretString::from(file.refresh_token),
        }))
    }

    /// Replace the saved credential.
    ///
    /// # Errors
    ///
    /// Returns error if the file or its directory cannot be written.
    pub async fn save(&self, credential: &StoredCredential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&CredentialFile {
            uid: credential.uid.clone(),
            anonymous: credential.anonymous,
            refresh_token: credential.refresh_token.expose_secret().to_string(),
        })?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await?;
        file.write_all(&json).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), "Saved sign-in");
        Ok(())
    }

    /// Forget the saved credential. A missing file is fine.
    pub async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed saved sign-in"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not remove credential file");
            }
        }
    }
}

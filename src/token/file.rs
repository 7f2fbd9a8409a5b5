//! File Token Store
//!
//! Keeps the current token as a single JSON file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::error::{OAuth2Error, StorageError};
use crate::telemetry::{logger_or_default, LogContext, Logger};
use crate::token::storage::not_found;
use crate::token::TokenStore;
use crate::types::Token;

/// Token store backed by one file, overwritten on every save.
///
/// On unix the file is owner read/write only.
pub struct FileTokenStore {
    path: PathBuf,
    logger: Arc<dyn Logger>,
}

impl FileTokenStore {
    /// Create a store for `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_logger(path, None)
    }

    /// Create a store with an explicit logger.
    pub fn with_logger(path: impl Into<PathBuf>, logger: Option<Arc<dyn Logger>>) -> Self {
        Self {
            path: path.into(),
            logger: logger_or_default(logger),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn context(&self, operation: &str) -> LogContext {
        LogContext::new()
            .store("file")
            .operation(operation)
            .resource(self.path.display().to_string())
    }

    fn transport_error(&self, action: &str, err: std::io::Error) -> OAuth2Error {
        OAuth2Error::Storage(StorageError::Transport {
            message: format!("failed to {} {}: {}", action, self.path.display(), err),
        })
    }

    async fn write_private(&self, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Token, OAuth2Error> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(not_found(self.path.display().to_string()))
            }
            Err(err) => return Err(self.transport_error("read", err)),
        };

        serde_json::from_slice(&content).map_err(|e| {
            OAuth2Error::Storage(StorageError::Deserialization {
                message: format!("{}: {}", self.path.display(), e),
            })
        })
    }

    async fn save(&self, token: &Token) -> Result<(), OAuth2Error> {
        let data = serde_json::to_vec(token).map_err(|e| {
            OAuth2Error::Storage(StorageError::Serialization {
                message: e.to_string(),
            })
        })?;

        self.write_private(&data)
            .await
            .map_err(|e| self.transport_error("write", e))?;

        self.logger.debug("saved token", &self.context("save"));
        Ok(())
    }
}

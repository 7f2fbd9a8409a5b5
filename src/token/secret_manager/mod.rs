//! Secret Manager Token Store
//!
//! Keeps the token as versions of one Secret Manager secret. Each save adds
//! a version and destroys the one before it, so at most two versions hold a
//! payload at any time and normally just one.

pub mod rest;
pub mod service;

pub use rest::SecretManagerRestClient;
pub use service::{
    InMemorySecretVersionService, Replication, Secret, SecretOperation, SecretVersion,
    SecretVersionService,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::AuthorizedClient;
use crate::core::{create_transport, ReqwestHttpTransport};
use crate::error::{OAuth2Error, ProtocolError, StorageError};
use crate::telemetry::{logger_or_default, LogContext, Logger};
use crate::token::{TokenSource, TokenStore};
use crate::types::{SecretStoreConfig, Token};

/// Version store over the production REST client.
pub type RestSecretVersionStore =
    GcpSecretVersionStore<SecretManagerRestClient<AuthorizedClient<ReqwestHttpTransport>>>;

/// Token store backed by versions of a Secret Manager secret.
pub struct GcpSecretVersionStore<S: SecretVersionService> {
    service: S,
    config: SecretStoreConfig,
    logger: Arc<dyn Logger>,
}

impl<S: SecretVersionService> GcpSecretVersionStore<S> {
    /// Create the store, provisioning the secret if it does not exist yet.
    ///
    /// A concurrent creator winning the race is not an error. Any other
    /// failure to look up or create the secret is returned as
    /// [`StorageError::Provisioning`].
    pub async fn new(
        service: S,
        config: SecretStoreConfig,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Self, OAuth2Error> {
        let store = Self {
            service,
            config,
            logger: logger_or_default(logger),
        };
        store.ensure_secret_exists().await?;
        Ok(store)
    }

    /// Configuration the store was created with.
    pub fn config(&self) -> &SecretStoreConfig {
        &self.config
    }

    fn context(&self, operation: &str, resource: impl Into<String>) -> LogContext {
        LogContext::new()
            .store("secret_manager")
            .operation(operation)
            .resource(resource)
    }

    fn provisioning_error(&self, error: OAuth2Error) -> OAuth2Error {
        OAuth2Error::Storage(StorageError::Provisioning {
            resource: self.config.secret_name(),
            message: error.to_string(),
        })
    }

    async fn ensure_secret_exists(&self) -> Result<(), OAuth2Error> {
        let name = self.config.secret_name();
        match self.service.get_secret(&name).await {
            Ok(secret) => {
                self.logger.debug(
                    "secret exists",
                    &self
                        .context("ensure_secret", &name)
                        .extra("create_time", secret.create_time.unwrap_or_default()),
                );
                return Ok(());
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(self.provisioning_error(e)),
        }

        match self
            .service
            .create_secret(
                &self.config.project_name(),
                &self.config.secret_id,
                Replication::Automatic,
            )
            .await
        {
            Ok(secret) => {
                self.logger.debug(
                    "created secret",
                    &self.context("ensure_secret", secret.name),
                );
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                self.logger.debug(
                    "secret created concurrently",
                    &self.context("ensure_secret", &name),
                );
                Ok(())
            }
            Err(e) => Err(self.provisioning_error(e)),
        }
    }
}

impl RestSecretVersionStore {
    /// Connect to Secret Manager over HTTPS, authenticating each request with
    /// a token from `credentials`.
    pub async fn connect(
        config: SecretStoreConfig,
        credentials: Arc<dyn TokenSource>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Self, OAuth2Error> {
        let transport = Arc::new(create_transport(Some(config.timeout))?);
        let client = AuthorizedClient::new(credentials, transport);
        let service = SecretManagerRestClient::new(&config, Arc::new(client));
        Self::new(service, config, logger).await
    }
}

fn version_number(version_name: &str) -> Result<u64, OAuth2Error> {
    version_name
        .rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| {
            OAuth2Error::Protocol(ProtocolError::InvalidResponse {
                message: format!("unexpected secret version name: {}", version_name),
            })
        })
}

#[async_trait]
impl<S: SecretVersionService> TokenStore for GcpSecretVersionStore<S> {
    async fn get(&self) -> Result<Token, OAuth2Error> {
        let name = self.config.version_name("latest");
        let payload = self.service.access_secret_version(&name).await?;

        serde_json::from_slice(&payload).map_err(|e| {
            OAuth2Error::Storage(StorageError::Deserialization {
                message: format!("{}: {}", name, e),
            })
        })
    }

    async fn save(&self, token: &Token) -> Result<(), OAuth2Error> {
        let payload = serde_json::to_vec(token).map_err(|e| {
            OAuth2Error::Storage(StorageError::Serialization {
                message: e.to_string(),
            })
        })?;

        let version = self
            .service
            .add_secret_version(&self.config.secret_name(), &payload)
            .await?;
        let number = version_number(&version.name)?;

        if number > 1 {
            let previous = self.config.version_name(&(number - 1).to_string());
            // The new version is already live; only the cleanup failed.
            self.service
                .destroy_secret_version(&previous)
                .await
                .map_err(|e| {
                    OAuth2Error::Storage(StorageError::Transport {
                        message: format!(
                            "saved {} but failed to destroy {}: {}",
                            version.name, previous, e
                        ),
                    })
                })?;
        }

        self.logger
            .debug("added secret version", &self.context("save", &version.name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::secret_store_config;
    use crate::telemetry::{InMemoryLogger, LogLevel};
    use chrono::{Duration, Utc};

    const SECRET: &str = "projects/p/secrets/s";

    fn create_config() -> SecretStoreConfig {
        secret_store_config()
            .project_id("p")
            .secret_id("s")
            .build()
            .unwrap()
    }

    fn create_token(n: u32) -> Token {
        Token::new(format!("access-{}", n))
            .with_refresh_token(format!("refresh-{}", n))
            .with_expiry(Utc::now() + Duration::hours(1))
    }

    async fn create_store(
        service: &Arc<InMemorySecretVersionService>,
    ) -> GcpSecretVersionStore<Arc<InMemorySecretVersionService>> {
        GcpSecretVersionStore::new(service.clone(), create_config(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_construction_creates_secret_once() {
        let service = Arc::new(InMemorySecretVersionService::new());

        create_store(&service).await;
        create_store(&service).await;

        assert_eq!(service.call_count(SecretOperation::GetSecret), 2);
        assert_eq!(service.call_count(SecretOperation::CreateSecret), 1);
    }

    #[tokio::test]
    async fn test_created_secret_is_logged_at_debug() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let logger = Arc::new(InMemoryLogger::new());

        GcpSecretVersionStore::new(
            service.clone(),
            create_config(),
            Some(logger.clone() as Arc<dyn Logger>),
        )
        .await
        .unwrap();

        let entries = logger.get_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Debug);
        assert_eq!(entries[0].message, "created secret");
    }

    #[tokio::test]
    async fn test_existing_secret_is_logged_with_create_time() {
        let service = Arc::new(InMemorySecretVersionService::new());
        service.insert_secret(SECRET);
        let logger = Arc::new(InMemoryLogger::new());

        GcpSecretVersionStore::new(
            service.clone(),
            create_config(),
            Some(logger.clone() as Arc<dyn Logger>),
        )
        .await
        .unwrap();

        assert_eq!(service.call_count(SecretOperation::CreateSecret), 0);
        let entries = logger.get_entries_by_level(LogLevel::Debug);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].context.extra.contains_key("create_time"));
    }

    #[tokio::test]
    async fn test_create_race_is_treated_as_found() {
        let service = Arc::new(InMemorySecretVersionService::new());
        // Someone else creates the secret between our lookup and our create.
        service.insert_secret(SECRET);
        service.fail_next(
            SecretOperation::GetSecret,
            OAuth2Error::Storage(StorageError::NotFound {
                resource: SECRET.to_string(),
            }),
        );

        let store = GcpSecretVersionStore::new(service.clone(), create_config(), None).await;

        assert!(store.is_ok());
        assert_eq!(service.call_count(SecretOperation::CreateSecret), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_fatal() {
        let service = Arc::new(InMemorySecretVersionService::new());
        service.fail_next(
            SecretOperation::GetSecret,
            OAuth2Error::Storage(StorageError::Transport {
                message: "permission denied".to_string(),
            }),
        );

        let result = GcpSecretVersionStore::new(service.clone(), create_config(), None).await;

        assert!(matches!(
            result,
            Err(OAuth2Error::Storage(StorageError::Provisioning { .. }))
        ));
        assert_eq!(service.call_count(SecretOperation::CreateSecret), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let service = Arc::new(InMemorySecretVersionService::new());
        service.fail_next(
            SecretOperation::CreateSecret,
            OAuth2Error::Storage(StorageError::Transport {
                message: "quota exceeded".to_string(),
            }),
        );

        let result = GcpSecretVersionStore::new(service.clone(), create_config(), None).await;

        match result {
            Err(OAuth2Error::Storage(StorageError::Provisioning { resource, message })) => {
                assert_eq!(resource, SECRET);
                assert!(message.contains("quota exceeded"));
            }
            _ => panic!("expected provisioning error"),
        }
    }

    #[tokio::test]
    async fn test_get_before_any_save_is_not_found() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let store = create_store(&service).await;

        assert!(store.get().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_saves_destroy_previous_version() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let store = create_store(&service).await;

        let third = create_token(3);

        store.save(&create_token(1)).await.unwrap();
        assert!(service.destroyed_versions().is_empty());
        store.save(&create_token(2)).await.unwrap();
        store.save(&third).await.unwrap();

        assert_eq!(
            service.destroyed_versions(),
            vec![
                "projects/p/secrets/s/versions/1".to_string(),
                "projects/p/secrets/s/versions/2".to_string(),
            ]
        );
        assert_eq!(
            service.enabled_versions(SECRET),
            vec!["projects/p/secrets/s/versions/3".to_string()]
        );
        assert_eq!(store.get().await.unwrap(), third);
    }

    #[tokio::test]
    async fn test_destroy_failure_keeps_new_version() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let store = create_store(&service).await;
        let first = create_token(1);
        let second = create_token(2);

        store.save(&first).await.unwrap();
        service.fail_next(
            SecretOperation::DestroyVersion,
            OAuth2Error::Storage(StorageError::Transport {
                message: "unavailable".to_string(),
            }),
        );
        let error = store.save(&second).await.unwrap_err();

        assert!(error.to_string().contains("versions/1"));
        assert_eq!(store.get().await.unwrap(), second);
        assert_eq!(service.enabled_versions(SECRET).len(), 2);
    }

    #[tokio::test]
    async fn test_destroy_failure_is_not_logged_as_saved() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let logger = Arc::new(InMemoryLogger::new());
        let store = GcpSecretVersionStore::new(
            service.clone(),
            create_config(),
            Some(logger.clone() as Arc<dyn Logger>),
        )
        .await
        .unwrap();

        store.save(&create_token(1)).await.unwrap();
        logger.clear();
        service.fail_next(
            SecretOperation::DestroyVersion,
            OAuth2Error::Storage(StorageError::Transport {
                message: "unavailable".to_string(),
            }),
        );

        assert!(store.save(&create_token(2)).await.is_err());
        assert!(logger.get_entries().is_empty());
        assert_eq!(service.enabled_versions(SECRET).len(), 2);
    }

    #[tokio::test]
    async fn test_add_failure_leaves_previous_token() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let store = create_store(&service).await;
        let first = create_token(1);

        store.save(&first).await.unwrap();
        service.fail_next(
            SecretOperation::AddVersion,
            OAuth2Error::Storage(StorageError::Transport {
                message: "unavailable".to_string(),
            }),
        );

        assert!(store.save(&create_token(2)).await.is_err());
        assert_eq!(store.get().await.unwrap(), first);
        assert_eq!(service.call_count(SecretOperation::DestroyVersion), 0);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_deserialization_error() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let store = create_store(&service).await;
        service
            .add_secret_version(SECRET, b"not a token")
            .await
            .unwrap();

        assert!(matches!(
            store.get().await,
            Err(OAuth2Error::Storage(StorageError::Deserialization { .. }))
        ));
    }

    #[tokio::test]
    async fn test_save_logs_version_name() {
        let service = Arc::new(InMemorySecretVersionService::new());
        let logger = Arc::new(InMemoryLogger::new());
        let store = GcpSecretVersionStore::new(
            service.clone(),
            create_config(),
            Some(logger.clone() as Arc<dyn Logger>),
        )
        .await
        .unwrap();
        logger.clear();

        store.save(&create_token(1)).await.unwrap();

        let entries = logger.get_entries_by_level(LogLevel::Debug);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].context.resource.as_deref(),
            Some("projects/p/secrets/s/versions/1")
        );
    }

    #[test]
    fn test_version_number() {
        assert_eq!(version_number("projects/1/secrets/s/versions/12").unwrap(), 12);
        assert!(version_number("projects/1/secrets/s/versions/latest").is_err());
    }
}

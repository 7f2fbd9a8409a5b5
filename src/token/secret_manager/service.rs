//! Secret Version Service
//!
//! The subset of the Secret Manager API the version store needs, and an
//! in-memory implementation of it.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{OAuth2Error, StorageError};
use crate::token::storage::not_found;

/// A secret container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Secret {
    /// Full resource name, `projects/{p}/secrets/{s}`.
    pub name: String,
    /// Creation timestamp as reported by the service.
    pub create_time: Option<String>,
}

/// One immutable version of a secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretVersion {
    /// Full resource name, `projects/{p}/secrets/{s}/versions/{n}`.
    pub name: String,
}

/// Replication policy used when creating a secret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Replication {
    /// Let the service choose where to replicate.
    #[default]
    Automatic,
}

/// Remote secret-version operations.
///
/// A missing resource is reported as [`StorageError::NotFound`] and a
/// conflicting create as [`StorageError::AlreadyExists`].
#[async_trait]
pub trait SecretVersionService: Send + Sync {
    /// Look up a secret container by resource name.
    async fn get_secret(&self, name: &str) -> Result<Secret, OAuth2Error>;

    /// Create `secret_id` under `project` (a `projects/{p}` resource name).
    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        replication: Replication,
    ) -> Result<Secret, OAuth2Error>;

    /// Add a new version holding `payload`.
    async fn add_secret_version(
        &self,
        secret_name: &str,
        payload: &[u8],
    ) -> Result<SecretVersion, OAuth2Error>;

    /// Irreversibly destroy a version's payload.
    async fn destroy_secret_version(&self, version_name: &str) -> Result<(), OAuth2Error>;

    /// Read a version's payload. `latest` resolves to the newest enabled version.
    async fn access_secret_version(&self, version_name: &str) -> Result<Vec<u8>, OAuth2Error>;
}

#[async_trait]
impl<S: SecretVersionService + ?Sized> SecretVersionService for Arc<S> {
    async fn get_secret(&self, name: &str) -> Result<Secret, OAuth2Error> {
        (**self).get_secret(name).await
    }

    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        replication: Replication,
    ) -> Result<Secret, OAuth2Error> {
        (**self).create_secret(project, secret_id, replication).await
    }

    async fn add_secret_version(
        &self,
        secret_name: &str,
        payload: &[u8],
    ) -> Result<SecretVersion, OAuth2Error> {
        (**self).add_secret_version(secret_name, payload).await
    }

    async fn destroy_secret_version(&self, version_name: &str) -> Result<(), OAuth2Error> {
        (**self).destroy_secret_version(version_name).await
    }

    async fn access_secret_version(&self, version_name: &str) -> Result<Vec<u8>, OAuth2Error> {
        (**self).access_secret_version(version_name).await
    }
}

/// Operations of [`SecretVersionService`], for call counting and failure
/// injection in [`InMemorySecretVersionService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretOperation {
    GetSecret,
    CreateSecret,
    AddVersion,
    DestroyVersion,
    AccessVersion,
}

struct StoredSecret {
    create_time: String,
    // Index i holds version i + 1; `None` once destroyed.
    versions: Vec<Option<Vec<u8>>>,
}

#[derive(Default)]
struct ServiceState {
    secrets: BTreeMap<String, StoredSecret>,
    calls: HashMap<SecretOperation, usize>,
    failures: HashMap<SecretOperation, VecDeque<OAuth2Error>>,
    destroyed: Vec<String>,
}

/// In-memory secret service with real version numbering.
///
/// Versions are numbered from 1 per secret, `latest` is the highest version
/// not yet destroyed, and destroyed versions can no longer be accessed.
#[derive(Default)]
pub struct InMemorySecretVersionService {
    state: Mutex<ServiceState>,
}

impl InMemorySecretVersionService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a secret directly, bypassing call counting.
    pub fn insert_secret(&self, name: impl Into<String>) -> &Self {
        self.lock().secrets.insert(
            name.into(),
            StoredSecret {
                create_time: chrono::Utc::now().to_rfc3339(),
                versions: Vec::new(),
            },
        );
        self
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, operation: SecretOperation, error: OAuth2Error) -> &Self {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
        self
    }

    /// Number of calls made to `operation`, including failed ones.
    pub fn call_count(&self, operation: SecretOperation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Names of destroyed versions, in destruction order.
    pub fn destroyed_versions(&self) -> Vec<String> {
        self.lock().destroyed.clone()
    }

    /// Names of versions still holding a payload, oldest first.
    pub fn enabled_versions(&self, secret_name: &str) -> Vec<String> {
        self.lock()
            .secrets
            .get(secret_name)
            .map(|secret| {
                secret
                    .versions
                    .iter()
                    .enumerate()
                    .filter(|(_, payload)| payload.is_some())
                    .map(|(i, _)| format!("{}/versions/{}", secret_name, i + 1))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, operation: SecretOperation) -> Result<MutexGuard<'_, ServiceState>, OAuth2Error> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(error) = state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(state)
    }
}

fn split_version_name(version_name: &str) -> Result<(&str, &str), OAuth2Error> {
    version_name
        .rsplit_once("/versions/")
        .ok_or_else(|| not_found(version_name))
}

fn stored_index(version: &str, secret: &StoredSecret) -> Option<usize> {
    if version == "latest" {
        return secret.versions.iter().rposition(Option::is_some);
    }
    version
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1 && *n <= secret.versions.len())
        .map(|n| n - 1)
}

#[async_trait]
impl SecretVersionService for InMemorySecretVersionService {
    async fn get_secret(&self, name: &str) -> Result<Secret, OAuth2Error> {
        let state = self.begin(SecretOperation::GetSecret)?;
        state
            .secrets
            .get(name)
            .map(|secret| Secret {
                name: name.to_string(),
                create_time: Some(secret.create_time.clone()),
            })
            .ok_or_else(|| not_found(name))
    }

    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        _replication: Replication,
    ) -> Result<Secret, OAuth2Error> {
        let mut state = self.begin(SecretOperation::CreateSecret)?;
        let name = format!("{}/secrets/{}", project, secret_id);
        if state.secrets.contains_key(&name) {
            return Err(OAuth2Error::Storage(StorageError::AlreadyExists {
                resource: name,
            }));
        }

        let create_time = chrono::Utc::now().to_rfc3339();
        state.secrets.insert(
            name.clone(),
            StoredSecret {
                create_time: create_time.clone(),
                versions: Vec::new(),
            },
        );
        Ok(Secret {
            name,
            create_time: Some(create_time),
        })
    }

    async fn add_secret_version(
        &self,
        secret_name: &str,
        payload: &[u8],
    ) -> Result<SecretVersion, OAuth2Error> {
        let mut state = self.begin(SecretOperation::AddVersion)?;
        let secret = state
            .secrets
            .get_mut(secret_name)
            .ok_or_else(|| not_found(secret_name))?;

        secret.versions.push(Some(payload.to_vec()));
        Ok(SecretVersion {
            name: format!("{}/versions/{}", secret_name, secret.versions.len()),
        })
    }

    async fn destroy_secret_version(&self, version_name: &str) -> Result<(), OAuth2Error> {
        let mut state = self.begin(SecretOperation::DestroyVersion)?;
        let (secret_name, version) = split_version_name(version_name)?;
        let secret = state
            .secrets
            .get_mut(secret_name)
            .ok_or_else(|| not_found(version_name))?;
        let index = stored_index(version, secret).ok_or_else(|| not_found(version_name))?;

        secret.versions[index] = None;
        state.destroyed.push(version_name.to_string());
        Ok(())
    }

    async fn access_secret_version(&self, version_name: &str) -> Result<Vec<u8>, OAuth2Error> {
        let state = self.begin(SecretOperation::AccessVersion)?;
        let (secret_name, version) = split_version_name(version_name)?;
        let secret = state
            .secrets
            .get(secret_name)
            .ok_or_else(|| not_found(version_name))?;
        let index = stored_index(version, secret).ok_or_else(|| not_found(version_name))?;

        secret.versions[index].clone().ok_or_else(|| {
            OAuth2Error::Storage(StorageError::Transport {
                message: format!("{} is destroyed", version_name),
            })
        })
    }
}

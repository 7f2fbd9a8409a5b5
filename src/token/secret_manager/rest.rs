//! Secret Manager REST Client
//!
//! [`SecretVersionService`] over the Secret Manager v1 REST API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::form_urlencoded;

use super::service::{Replication, Secret, SecretVersion, SecretVersionService};
use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{OAuth2Error, ProtocolError, StorageError};
use crate::types::SecretStoreConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretResource {
    name: String,
    #[serde(default)]
    create_time: Option<String>,
}

#[derive(Deserialize)]
struct VersionResource {
    name: String,
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Secret Manager client speaking JSON over an [`HttpTransport`].
///
/// The transport is responsible for authentication; pass an
/// [`AuthorizedClient`](crate::client::AuthorizedClient) in production.
pub struct SecretManagerRestClient<T: HttpTransport> {
    endpoint: String,
    timeout: Duration,
    transport: Arc<T>,
}

impl<T: HttpTransport> SecretManagerRestClient<T> {
    /// Create a client for the endpoint and timeout in `config`.
    pub fn new(config: &SecretStoreConfig, transport: Arc<T>) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            transport,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.endpoint, resource)
    }

    async fn call(
        &self,
        method: HttpMethod,
        url: String,
        resource: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, OAuth2Error> {
        let mut request = HttpRequest::new(method, url)
            .header("accept", "application/json")
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json_body(&body);
        }

        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(map_error_response(resource, &response))
        }
    }
}

fn map_error_response(resource: &str, response: &HttpResponse) -> OAuth2Error {
    let resource = resource.to_string();
    match response.status {
        404 => OAuth2Error::Storage(StorageError::NotFound { resource }),
        409 => OAuth2Error::Storage(StorageError::AlreadyExists { resource }),
        status => {
            let detail = match serde_json::from_str::<GoogleErrorBody>(&response.body) {
                Ok(body) => match body.error.status {
                    Some(code) => format!("{}: {}", code, body.error.message),
                    None => body.error.message,
                },
                Err(_) => response.status_text.clone(),
            };
            OAuth2Error::Storage(StorageError::Transport {
                message: format!("{} (HTTP {}): {}", resource, status, detail),
            })
        }
    }
}

fn parse_json<'a, R: Deserialize<'a>>(body: &'a str) -> Result<R, OAuth2Error> {
    serde_json::from_str(body).map_err(|e| {
        OAuth2Error::Protocol(ProtocolError::InvalidJson {
            message: e.to_string(),
        })
    })
}

#[async_trait]
impl<T: HttpTransport> SecretVersionService for SecretManagerRestClient<T> {
    async fn get_secret(&self, name: &str) -> Result<Secret, OAuth2Error> {
        let response = self.call(HttpMethod::Get, self.url(name), name, None).await?;
        let secret: SecretResource = parse_json(&response.body)?;
        Ok(Secret {
            name: secret.name,
            create_time: secret.create_time,
        })
    }

    async fn create_secret(
        &self,
        project: &str,
        secret_id: &str,
        replication: Replication,
    ) -> Result<Secret, OAuth2Error> {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("secretId", secret_id)
            .finish();
        let url = format!("{}?{}", self.url(&format!("{}/secrets", project)), query);
        let body = match replication {
            Replication::Automatic => serde_json::json!({"replication": {"automatic": {}}}),
        };

        let resource = format!("{}/secrets/{}", project, secret_id);
        let response = self
            .call(HttpMethod::Post, url, &resource, Some(body))
            .await?;
        let secret: SecretResource = parse_json(&response.body)?;
        Ok(Secret {
            name: secret.name,
            create_time: secret.create_time,
        })
    }

    async fn add_secret_version(
        &self,
        secret_name: &str,
        payload: &[u8],
    ) -> Result<SecretVersion, OAuth2Error> {
        let url = format!("{}:addVersion", self.url(secret_name));
        let body = serde_json::json!({"payload": {"data": STANDARD.encode(payload)}});

        let response = self
            .call(HttpMethod::Post, url, secret_name, Some(body))
            .await?;
        let version: VersionResource = parse_json(&response.body)?;
        Ok(SecretVersion { name: version.name })
    }

    async fn destroy_secret_version(&self, version_name: &str) -> Result<(), OAuth2Error> {
        let url = format!("{}:destroy", self.url(version_name));
        self.call(
            HttpMethod::Post,
            url,
            version_name,
            Some(serde_json::json!({})),
        )
        .await?;
        Ok(())
    }

    async fn access_secret_version(&self, version_name: &str) -> Result<Vec<u8>, OAuth2Error> {
        let url = format!("{}:access", self.url(version_name));
        let response = self.call(HttpMethod::Get, url, version_name, None).await?;

        let access: AccessResponse = parse_json(&response.body)?;
        let data = access.payload.map(|p| p.data).unwrap_or_default();
        STANDARD.decode(data.as_bytes()).map_err(|e| {
            OAuth2Error::Protocol(ProtocolError::InvalidResponse {
                message: format!("payload of {} is not base64: {}", version_name, e),
            })
        })
    }
}

/// Kubernetes API client
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::credentials::ClusterCredentials;
use super::models::{CreatedObject, Pod, PodList, ResourceAck, Status};
use super::{GatewayError, ResourceGateway, ResourceKind};

/// Core-v1 API client for a single cluster
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    base_url: String,
}

impl KubeClient {
    /// Create a new client from resolved cluster credentials
    pub fn new(credentials: &ClusterCredentials) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = &credentials.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Invalid API token format")?,
            );
        }
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30));
        if credentials.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: credentials.server.trim_end_matches('/').to_string(),
        })
    }

    /// Collection URL for a namespaced core-v1 resource
    fn collection_url(&self, namespace: &str, plural: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/{}",
            self.base_url, namespace, plural
        )
    }

    fn plural_for(kind: ResourceKind) -> Result<&'static str, GatewayError> {
        kind.plural().ok_or_else(|| GatewayError::Rejected {
            status: 422,
            reason: format!("{} is not a managed resource kind", kind),
        })
    }

    /// Decode a response, mapping non-2xx onto the gateway error taxonomy
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Response(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<Status>(&error_text)
            .ok()
            .and_then(|s| s.message)
            .unwrap_or(error_text);
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }
}

#[async_trait]
impl ResourceGateway for KubeClient {
    async fn create(
        &self,
        namespace: &str,
        kind: ResourceKind,
        manifest: &serde_json::Value,
    ) -> Result<ResourceAck, GatewayError> {
        let url = self.collection_url(namespace, Self::plural_for(kind)?);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(manifest).send().await?;
        let object: CreatedObject = Self::handle_response(response).await?;

        Ok(ResourceAck {
            kind,
            name: object.metadata.name,
            uid: object.metadata.uid,
        })
    }

    async fn delete(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/{}",
            self.collection_url(namespace, Self::plural_for(kind)?),
            name
        );
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if status.is_success() {
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<Status>(&error_text)
            .ok()
            .and_then(|s| s.message)
            .unwrap_or(error_text);
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }

    async fn read_pod(&self, namespace: &str, name: &str) -> Result<Pod, GatewayError> {
        let url = format!("{}/{}", self.collection_url(namespace, "pods"), name);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, GatewayError> {
        let url = self.collection_url(namespace, "pods");
        debug!("GET {} labelSelector={}", url, label_selector);

        let response = self
            .client
            .get(&url)
            .query(&[("labelSelector", label_selector)])
            .send()
            .await?;
        let list: PodList = Self::handle_response(response).await?;
        Ok(list.items)
    }
}

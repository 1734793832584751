/// Kubernetes resource gateway
pub mod client;
pub mod credentials;
pub mod models;

pub use client::KubeClient;
pub use credentials::{ClusterCredentials, CredentialProvider};

use async_trait::async_trait;
use thiserror::Error;

use models::{Pod, ResourceAck};

/// Kubernetes object categories this tool manages. Anything else found in
/// a template is carried through as `Other` and never submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Service,
    Secret,
    Other,
}

impl ResourceKind {
    /// Map a manifest's `kind` field onto a resource kind
    pub fn from_kind_field(kind: &str) -> Self {
        match kind {
            "Pod" => ResourceKind::Pod,
            "Service" => ResourceKind::Service,
            "Secret" => ResourceKind::Secret,
            _ => ResourceKind::Other,
        }
    }

    /// API path segment for the managed kinds
    pub fn plural(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Pod => Some("pods"),
            ResourceKind::Service => Some("services"),
            ResourceKind::Secret => Some("secrets"),
            ResourceKind::Other => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Pod => write!(f, "Pod"),
            ResourceKind::Service => write!(f, "Service"),
            ResourceKind::Secret => write!(f, "Secret"),
            ResourceKind::Other => write!(f, "Other"),
        }
    }
}

/// Failures reported by the resource gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The named resource does not exist. Expected on idempotent deletes
    /// and absent sessions; never a warning.
    #[error("resource not found")]
    NotFound,

    /// The API refused the request (naming conflict, validation, ...)
    #[error("api rejected request ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// Network-level failure talking to the API
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a body we could not decode
    #[error("failed to decode api response: {0}")]
    Response(String),
}

/// The cluster API surface the orchestrator and inspector depend on.
/// Kept as a trait so tests can script per-call failures.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// Create a single named resource of the given kind
    async fn create(
        &self,
        namespace: &str,
        kind: ResourceKind,
        manifest: &serde_json::Value,
    ) -> Result<ResourceAck, GatewayError>;

    /// Delete a single named resource of the given kind
    async fn delete(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), GatewayError>;

    /// Read a single pod by name
    async fn read_pod(&self, namespace: &str, name: &str) -> Result<Pod, GatewayError>;

    /// List pods matching a label selector
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, GatewayError>;
}

#[async_trait]
impl<G: ResourceGateway> ResourceGateway for std::sync::Arc<G> {
    async fn create(
        &self,
        namespace: &str,
        kind: ResourceKind,
        manifest: &serde_json::Value,
    ) -> Result<ResourceAck, GatewayError> {
        (**self).create(namespace, kind, manifest).await
    }

    async fn delete(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), GatewayError> {
        (**self).delete(namespace, kind, name).await
    }

    async fn read_pod(&self, namespace: &str, name: &str) -> Result<Pod, GatewayError> {
        (**self).read_pod(namespace, name).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Pod>, GatewayError> {
        (**self).list_pods(namespace, label_selector).await
    }
}

/// In-memory gateway used by orchestrator and inspector tests.
///
/// Behaves like a tiny cluster: created resources exist until deleted,
/// deleting an absent resource is not-found, and created pods become
/// visible to read_pod/list_pods with a synthetic Running phase. Failures
/// can be scripted per create position or per delete kind.
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::k8s::models::{Pod, PodStatus, ResourceAck};
use crate::k8s::{GatewayError, ResourceGateway, ResourceKind};

#[derive(Default)]
struct GatewayState {
    creates: Vec<(ResourceKind, String)>,
    deletes: Vec<(ResourceKind, String)>,
    existing: HashSet<(ResourceKind, String)>,
    pods: Vec<Pod>,
}

pub struct FakeGateway {
    state: Mutex<GatewayState>,
    fail_create_at: Option<usize>,
    fail_delete_kinds: Vec<ResourceKind>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            fail_create_at: None,
            fail_delete_kinds: Vec::new(),
        }
    }

    /// Reject the nth create call (1-based) with a conflict
    pub fn failing_create_at(mut self, n: usize) -> Self {
        self.fail_create_at = Some(n);
        self
    }

    /// Reject every delete of the given kind
    pub fn failing_delete(mut self, kind: ResourceKind) -> Self {
        self.fail_delete_kinds.push(kind);
        self
    }

    /// Seed a pre-existing resource
    pub fn with_existing(self, kind: ResourceKind, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .existing
            .insert((kind, name.to_string()));
        self
    }

    /// Seed a pod visible to read_pod/list_pods
    pub fn with_pod(self, pod: Pod) -> Self {
        self.state.lock().unwrap().pods.push(pod);
        self
    }

    pub fn creates(&self) -> Vec<(ResourceKind, String)> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn deletes(&self) -> Vec<(ResourceKind, String)> {
        self.state.lock().unwrap().deletes.clone()
    }
}

fn manifest_name(manifest: &serde_json::Value) -> String {
    manifest
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ResourceGateway for FakeGateway {
    async fn create(
        &self,
        _namespace: &str,
        kind: ResourceKind,
        manifest: &serde_json::Value,
    ) -> Result<ResourceAck, GatewayError> {
        let name = manifest_name(manifest);
        let mut state = self.state.lock().unwrap();
        state.creates.push((kind, name.clone()));

        if self.fail_create_at == Some(state.creates.len()) {
            return Err(GatewayError::Rejected {
                status: 409,
                reason: format!("{} \"{}\" already exists", kind, name),
            });
        }

        state.existing.insert((kind, name.clone()));

        // A created pod shows up in subsequent reads/listings, the way a
        // scheduled pod would on a real cluster
        if kind == ResourceKind::Pod {
            if let Ok(mut pod) = serde_json::from_value::<Pod>(manifest.clone()) {
                pod.status = Some(PodStatus {
                    phase: Some("Running".to_string()),
                    container_statuses: None,
                });
                state.pods.push(pod);
            }
        }

        Ok(ResourceAck {
            kind,
            name,
            uid: Some("00000000-0000-0000-0000-000000000000".to_string()),
        })
    }

    async fn delete(
        &self,
        _namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push((kind, name.to_string()));

        if self.fail_delete_kinds.contains(&kind) {
            return Err(GatewayError::Rejected {
                status: 500,
                reason: "scripted deletion failure".to_string(),
            });
        }

        if state.existing.remove(&(kind, name.to_string())) {
            if kind == ResourceKind::Pod {
                state.pods.retain(|pod| pod.metadata.name != name);
            }
            Ok(())
        } else {
            Err(GatewayError::NotFound)
        }
    }

    async fn read_pod(&self, _namespace: &str, name: &str) -> Result<Pod, GatewayError> {
        self.state
            .lock()
            .unwrap()
            .pods
            .iter()
            .find(|pod| pod.metadata.name == name)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<Pod>, GatewayError> {
        Ok(self.state.lock().unwrap().pods.clone())
    }
}

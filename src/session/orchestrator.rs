/// Session orchestrator: transactional creation and deletion
use base64::Engine;
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::config::SessionRequest;
use crate::error::{Error, Result};
use crate::k8s::models::ResourceAck;
use crate::k8s::{GatewayError, ResourceGateway, ResourceKind};
use crate::session::naming::CanonicalNames;
use crate::template::{self, RenderedResource};

/// Everything created for one session, keyed by kind. On success this is
/// the exact set returned to the caller; on failure it is what rollback
/// has to undo.
#[derive(Debug, Default)]
pub struct CreatedSet {
    pub pod: Option<ResourceAck>,
    pub service: Option<ResourceAck>,
    pub secret: Option<ResourceAck>,
}

impl CreatedSet {
    fn record(&mut self, ack: ResourceAck) {
        match ack.kind {
            ResourceKind::Pod => self.pod = Some(ack),
            ResourceKind::Service => self.service = Some(ack),
            ResourceKind::Secret => self.secret = Some(ack),
            ResourceKind::Other => {}
        }
    }

    /// Kinds present in the set
    pub fn kinds(&self) -> Vec<ResourceKind> {
        [
            self.pod.as_ref(),
            self.service.as_ref(),
            self.secret.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|ack| ack.kind)
        .collect()
    }
}

/// Result of a successful create call. The password is surfaced here once
/// and nowhere else; the orchestrator keeps no copy.
#[derive(Debug)]
pub struct CreatedSession {
    pub session_id: String,
    pub vscode_password: String,
    pub resources: CreatedSet,
}

/// Outcome of one resource deletion within a delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

/// Per-kind deletion results for one session
#[derive(Debug)]
pub struct DeletionReport {
    pub session_id: String,
    pub results: Vec<(ResourceKind, String, DeleteOutcome)>,
}

/// Session-level classification of a deletion report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDeletion {
    Deleted,
    PartiallyDeleted,
    NotFound,
}

impl DeletionReport {
    /// Classify the report: all-absent is "not found", any failure is
    /// "partially deleted", otherwise the session is gone.
    pub fn outcome(&self) -> SessionDeletion {
        if self
            .results
            .iter()
            .all(|(_, _, outcome)| *outcome == DeleteOutcome::NotFound)
        {
            return SessionDeletion::NotFound;
        }
        if self
            .results
            .iter()
            .any(|(_, _, outcome)| matches!(outcome, DeleteOutcome::Failed(_)))
        {
            return SessionDeletion::PartiallyDeleted;
        }
        SessionDeletion::Deleted
    }
}

/// Generate a URL-safe session password from 32 bytes of OS randomness
pub fn generate_password() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Drives template rendering and multi-resource submission for one
/// namespace. Stateless between calls; the cluster is the only source of
/// truth.
pub struct SessionOrchestrator<G> {
    gateway: G,
    namespace: String,
}

impl<G: ResourceGateway> SessionOrchestrator<G> {
    /// Create a new orchestrator for a namespace
    pub fn new(gateway: G, namespace: impl Into<String>) -> Self {
        Self {
            gateway,
            namespace: namespace.into(),
        }
    }

    /// Create all resources for a session from the given template.
    ///
    /// Resources are submitted in template document order. The first
    /// failed submission stops the sequence, rolls back everything created
    /// so far, and propagates; a partially-created set is never returned
    /// as success.
    pub async fn create(
        &self,
        template_text: &str,
        request: &SessionRequest,
    ) -> Result<CreatedSession> {
        let names = CanonicalNames::for_session(&request.session_id);

        let vscode_password = request
            .options
            .vscode_password
            .clone()
            .unwrap_or_else(generate_password);

        let variables = request.variables(&vscode_password);
        let resources = template::render(template_text, &variables)?;

        // Rendered names must agree with the naming scheme before anything
        // is submitted, otherwise later lookup and deletion would miss the
        // resources this call creates.
        for resource in &resources {
            if let (Some(expected), Some(actual)) =
                (names.name_for(resource.kind), resource.name.as_deref())
            {
                if actual != expected {
                    return Err(Error::Render(format!(
                        "{} document is named {} but the session naming scheme expects {}",
                        resource.kind, actual, expected
                    )));
                }
            }
        }

        let mut created = CreatedSet::default();
        for resource in resources {
            if resource.kind == ResourceKind::Other {
                debug!("Skipping unmanaged document in template");
                continue;
            }

            match self.submit(&resource).await {
                Ok(ack) => {
                    info!("Created {}: {}", ack.kind, ack.name);
                    created.record(ack);
                }
                Err(e) => {
                    warn!(
                        "Failed to create {} for session {}: {:#}",
                        resource.kind, request.session_id, e
                    );
                    self.rollback(&names).await;
                    return Err(e);
                }
            }
        }

        Ok(CreatedSession {
            session_id: request.session_id.clone(),
            vscode_password,
            resources: created,
        })
    }

    /// Submit one rendered resource
    async fn submit(&self, resource: &RenderedResource) -> Result<ResourceAck> {
        if resource.name.is_none() {
            return Err(Error::Schema {
                kind: resource.kind,
                detail: "metadata.name is missing".to_string(),
            });
        }

        let body = serde_json::to_value(&resource.manifest).map_err(|e| Error::Schema {
            kind: resource.kind,
            detail: e.to_string(),
        })?;

        let ack = self
            .gateway
            .create(&self.namespace, resource.kind, &body)
            .await?;
        Ok(ack)
    }

    /// Best-effort compensating deletion after a mid-sequence failure.
    ///
    /// All three canonical names are attempted regardless of individual
    /// results. Not-found means the resource was never created or is
    /// already gone; any other failure is logged and never masks the
    /// triggering error.
    async fn rollback(&self, names: &CanonicalNames) {
        warn!("Rolling back partially created session resources");

        for (kind, name) in [
            (ResourceKind::Pod, names.pod.as_str()),
            (ResourceKind::Service, names.service.as_str()),
            (ResourceKind::Secret, names.secret.as_str()),
        ] {
            match self.gateway.delete(&self.namespace, kind, name).await {
                Ok(()) => info!("Rolled back {}: {}", kind, name),
                Err(GatewayError::NotFound) => {}
                Err(e) => warn!("Failed to roll back {} {}: {:#}", kind, name, e),
            }
        }
    }

    /// Delete a session's resources independently of each other.
    ///
    /// Each kind's failure is collected into the report rather than
    /// aborting its siblings.
    pub async fn delete(&self, session_id: &str) -> DeletionReport {
        let names = CanonicalNames::for_session(session_id);

        let mut results = Vec::with_capacity(3);
        for (kind, name) in [
            (ResourceKind::Pod, names.pod.clone()),
            (ResourceKind::Service, names.service.clone()),
            (ResourceKind::Secret, names.secret.clone()),
        ] {
            let outcome = match self.gateway.delete(&self.namespace, kind, &name).await {
                Ok(()) => {
                    info!("Deleted {}: {}", kind, name);
                    DeleteOutcome::Deleted
                }
                Err(GatewayError::NotFound) => DeleteOutcome::NotFound,
                Err(e) => {
                    warn!("Failed to delete {} {}: {:#}", kind, name, e);
                    DeleteOutcome::Failed(format!("{:#}", e))
                }
            };
            results.push((kind, name, outcome));
        }

        DeletionReport {
            session_id: session_id.to_string(),
            results,
        }
    }
}

/// Session inspection: listing and status aggregation
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::k8s::models::{ContainerState, ContainerStatus, Pod};
use crate::k8s::{GatewayError, ResourceGateway};
use crate::session::naming::CanonicalNames;

/// Label carried by every lab-environment pod
pub const SESSION_LABEL_SELECTOR: &str = "app=lab-environment";

const SESSION_ID_LABEL: &str = "session-id";
const USER_ID_LABEL: &str = "user-id";
const UNKNOWN_LABEL: &str = "unknown";

/// Session lifecycle phase, mirroring the pod phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl SessionPhase {
    /// Map the pod's reported phase onto the session phase. Anything the
    /// cluster reports that we do not recognize degrades to Unknown.
    fn from_pod_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => SessionPhase::Pending,
            Some("Running") => SessionPhase::Running,
            Some("Succeeded") => SessionPhase::Succeeded,
            Some("Failed") => SessionPhase::Failed,
            _ => SessionPhase::Unknown,
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Pending => write!(f, "Pending"),
            SessionPhase::Running => write!(f, "Running"),
            SessionPhase::Succeeded => write!(f, "Succeeded"),
            SessionPhase::Failed => write!(f, "Failed"),
            SessionPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One row of the session listing
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub phase: SessionPhase,
    pub created_at: Option<DateTime<Utc>>,
}

/// Per-container health within a session
#[derive(Debug, Clone, Serialize)]
pub struct ContainerHealth {
    pub name: String,
    pub ready: bool,
    pub restart_count: u32,
    pub state: String,
}

/// Point-in-time snapshot of one session, rebuilt fresh on every query
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub user_id: String,
    pub phase: SessionPhase,
    pub created_at: Option<DateTime<Utc>>,
    pub containers: Vec<ContainerHealth>,
}

fn label_or_unknown(pod: &Pod, label: &str) -> String {
    pod.metadata
        .labels
        .get(label)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

fn describe_state(state: Option<&ContainerState>) -> String {
    let Some(state) = state else {
        return "unknown".to_string();
    };
    if state.running.is_some() {
        return "running".to_string();
    }
    if let Some(waiting) = &state.waiting {
        return match &waiting.reason {
            Some(reason) => format!("waiting ({})", reason),
            None => "waiting".to_string(),
        };
    }
    if let Some(terminated) = &state.terminated {
        return match &terminated.reason {
            Some(reason) => format!("terminated ({}, exit code {})", reason, terminated.exit_code),
            None => format!("terminated (exit code {})", terminated.exit_code),
        };
    }
    "unknown".to_string()
}

fn container_health(status: &ContainerStatus) -> ContainerHealth {
    ContainerHealth {
        name: status.name.clone(),
        ready: status.ready,
        restart_count: status.restart_count,
        state: describe_state(status.state.as_ref()),
    }
}

/// Read-only view over the sessions in one namespace
pub struct SessionInspector<G> {
    gateway: G,
    namespace: String,
}

impl<G: ResourceGateway> SessionInspector<G> {
    /// Create a new inspector for a namespace
    pub fn new(gateway: G, namespace: impl Into<String>) -> Self {
        Self {
            gateway,
            namespace: namespace.into(),
        }
    }

    /// List all active sessions. A namespace with no matching pods yields
    /// an empty list; a pod missing its session labels is reported with
    /// "unknown" rather than failing the listing.
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        let pods = self
            .gateway
            .list_pods(&self.namespace, SESSION_LABEL_SELECTOR)
            .await?;

        Ok(pods
            .iter()
            .map(|pod| SessionSummary {
                session_id: label_or_unknown(pod, SESSION_ID_LABEL),
                user_id: label_or_unknown(pod, USER_ID_LABEL),
                phase: SessionPhase::from_pod_phase(
                    pod.status.as_ref().and_then(|s| s.phase.as_deref()),
                ),
                created_at: pod.metadata.creation_timestamp,
            })
            .collect())
    }

    /// Detailed status for one session, looked up at its canonical pod
    /// name. Container statuses may be empty while the pod is still
    /// scheduling.
    pub async fn status(&self, session_id: &str) -> Result<SessionStatus> {
        let names = CanonicalNames::for_session(session_id);

        let pod = match self.gateway.read_pod(&self.namespace, &names.pod).await {
            Ok(pod) => pod,
            Err(GatewayError::NotFound) => {
                return Err(Error::SessionNotFound(session_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let containers = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(container_health).collect())
            .unwrap_or_default();

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            user_id: label_or_unknown(&pod, USER_ID_LABEL),
            phase: SessionPhase::from_pod_phase(
                pod.status.as_ref().and_then(|s| s.phase.as_deref()),
            ),
            created_at: pod.metadata.creation_timestamp,
            containers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SessionOptions, SessionRequest};
    use crate::k8s::models::{
        ContainerStateRunning, ContainerStateWaiting, ObjectMeta, PodStatus,
    };
    use crate::session::orchestrator::SessionOrchestrator;
    use crate::session::testing::FakeGateway;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn session_pod(session_id: &str, user_id: Option<&str>, phase: &str) -> Pod {
        let mut labels = HashMap::new();
        labels.insert("app".to_string(), "lab-environment".to_string());
        labels.insert(SESSION_ID_LABEL.to_string(), session_id.to_string());
        if let Some(user_id) = user_id {
            labels.insert(USER_ID_LABEL.to_string(), user_id.to_string());
        }

        Pod {
            metadata: ObjectMeta {
                name: format!("lab-session-{}", session_id),
                labels,
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                container_statuses: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_list_empty_namespace_is_not_an_error() {
        let inspector = SessionInspector::new(FakeGateway::new(), "default");
        let sessions = inspector.list().await.unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_list_extracts_session_labels() {
        let gateway = FakeGateway::new()
            .with_pod(session_pod("demo-1", Some("alice"), "Running"))
            .with_pod(session_pod("demo-2", Some("bob"), "Pending"));
        let inspector = SessionInspector::new(gateway, "default");

        let sessions = inspector.list().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "demo-1");
        assert_eq!(sessions[0].user_id, "alice");
        assert_eq!(sessions[0].phase, SessionPhase::Running);
        assert_eq!(sessions[1].phase, SessionPhase::Pending);
    }

    #[tokio::test]
    async fn test_list_defaults_missing_labels_to_unknown() {
        let mut pod = session_pod("x", None, "Running");
        pod.metadata.labels.remove(SESSION_ID_LABEL);

        let inspector = SessionInspector::new(FakeGateway::new().with_pod(pod), "default");
        let sessions = inspector.list().await.unwrap();
        assert_eq!(sessions[0].session_id, "unknown");
        assert_eq!(sessions[0].user_id, "unknown");
    }

    #[tokio::test]
    async fn test_status_maps_phase_and_containers() {
        let mut pod = session_pod("demo-1", Some("alice"), "Running");
        pod.status = Some(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![
                ContainerStatus {
                    name: "vm".to_string(),
                    ready: true,
                    restart_count: 0,
                    state: Some(ContainerState {
                        running: Some(ContainerStateRunning::default()),
                        ..Default::default()
                    }),
                },
                ContainerStatus {
                    name: "vscode".to_string(),
                    ready: false,
                    restart_count: 3,
                    state: Some(ContainerState {
                        waiting: Some(ContainerStateWaiting {
                            reason: Some("CrashLoopBackOff".to_string()),
                        }),
                        ..Default::default()
                    }),
                },
            ]),
        });

        let inspector = SessionInspector::new(FakeGateway::new().with_pod(pod), "default");
        let status = inspector.status("demo-1").await.unwrap();

        assert_eq!(status.session_id, "demo-1");
        assert_eq!(status.user_id, "alice");
        assert_eq!(status.phase, SessionPhase::Running);
        assert_eq!(status.containers.len(), 2);
        assert_eq!(status.containers[0].state, "running");
        assert!(status.containers[1].state.contains("CrashLoopBackOff"));
        assert_eq!(status.containers[1].restart_count, 3);
    }

    #[tokio::test]
    async fn test_status_with_no_container_statuses_yet() {
        let pod = session_pod("demo-1", Some("alice"), "Pending");
        let inspector = SessionInspector::new(FakeGateway::new().with_pod(pod), "default");

        let status = inspector.status("demo-1").await.unwrap();
        assert_eq!(status.phase, SessionPhase::Pending);
        assert!(status.containers.is_empty());
    }

    #[tokio::test]
    async fn test_status_missing_session() {
        let inspector = SessionInspector::new(FakeGateway::new(), "default");
        let result = inspector.status("absent").await;
        assert!(matches!(result, Err(Error::SessionNotFound(id)) if id == "absent"));
    }

    #[tokio::test]
    async fn test_created_session_round_trips_through_status() {
        let gateway = Arc::new(FakeGateway::new());
        let orchestrator = SessionOrchestrator::new(Arc::clone(&gateway), "default");
        let request = SessionRequest::new(
            "demo-1",
            "alice",
            "https://x/img.ext4",
            SessionOptions::default(),
        );
        let template = include_str!("../../templates/lab-session.yaml");
        orchestrator.create(template, &request).await.unwrap();

        let inspector = SessionInspector::new(gateway, "default");
        let status = inspector.status("demo-1").await.unwrap();
        assert_eq!(status.session_id, "demo-1");
        assert_eq!(status.user_id, "alice");
        assert_eq!(status.phase, SessionPhase::Running);

        let sessions = inspector.list().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "demo-1");
        assert_eq!(sessions[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_unrecognized_phase_degrades_to_unknown() {
        let pod = session_pod("demo-1", Some("alice"), "Evicted");
        let inspector = SessionInspector::new(FakeGateway::new().with_pod(pod), "default");

        let status = inspector.status("demo-1").await.unwrap();
        assert_eq!(status.phase, SessionPhase::Unknown);
    }
}

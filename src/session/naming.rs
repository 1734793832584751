/// Canonical resource naming
///
/// Both creation and later lookup/deletion derive names from the session id
/// alone, so nothing needs to be persisted between invocations. No
/// validation happens here; an id with characters Kubernetes rejects
/// surfaces as a gateway rejection when the name is first used.
use crate::k8s::ResourceKind;

/// The three resource names derived from a session id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNames {
    pub pod: String,
    pub service: String,
    pub secret: String,
}

impl CanonicalNames {
    /// Derive the canonical names for a session
    pub fn for_session(session_id: &str) -> Self {
        Self {
            pod: format!("lab-session-{}", session_id),
            service: format!("lab-service-{}", session_id),
            secret: format!("lab-session-{}-secrets", session_id),
        }
    }

    /// Canonical name for a managed resource kind
    pub fn name_for(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Pod => Some(&self.pod),
            ResourceKind::Service => Some(&self.service),
            ResourceKind::Secret => Some(&self.secret),
            ResourceKind::Other => None,
        }
    }
}

/// Error taxonomy for session provisioning
use thiserror::Error;

use crate::k8s::{GatewayError, ResourceKind};

/// Errors surfaced by the session orchestrator and inspector
#[derive(Debug, Error)]
pub enum Error {
    /// The rendered template was unparseable, or a rendered resource name
    /// disagreed with the canonical naming scheme. Nothing has been
    /// submitted to the cluster when this is returned.
    #[error("template rendering failed: {0}")]
    Render(String),

    /// A rendered document was malformed at the point it was needed.
    #[error("malformed {kind} document: {detail}")]
    Schema { kind: ResourceKind, detail: String },

    /// The cluster API refused a request. During creation this triggers
    /// rollback before it propagates.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// No session exists under the given identifier.
    #[error("session {0} not found")]
    SessionNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

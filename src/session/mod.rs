/// Session lifecycle management
pub mod inspector;
pub mod naming;
pub mod orchestrator;

pub use inspector::{SessionInspector, SessionPhase, SessionStatus, SessionSummary};
pub use naming::CanonicalNames;
pub use orchestrator::{
    CreatedSession, CreatedSet, DeleteOutcome, DeletionReport, SessionDeletion,
    SessionOrchestrator,
};

#[cfg(test)]
pub(crate) mod testing;

//! Backend commands queued from UI to backend worker.

use session_core::PendingCall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Execute(PendingCall),
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Execute(pending) => pending.operation.label(),
            Self::Shutdown => "shutdown",
        }
    }
}

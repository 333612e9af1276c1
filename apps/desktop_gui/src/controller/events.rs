//! Events flowing from the backend worker to the UI thread.

use shared::protocol::GatewayReply;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Worker lifecycle text for the status bar.
    WorkerStatus(String),
    Reply(GatewayReply),
    /// The worker could not start or stopped; no further replies will arrive.
    WorkerFailed(String),
}

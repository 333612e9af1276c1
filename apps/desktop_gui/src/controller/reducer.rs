//! Folds backend events into the session shown by the UI.

use session_core::{
    sequencer::{self, Resolution},
    SessionState,
};
use shared::error::GatewayError;

use crate::controller::events::UiEvent;

pub fn apply_ui_event(session: &mut SessionState, worker_status: &mut String, event: UiEvent) {
    match event {
        UiEvent::WorkerStatus(text) => *worker_status = text,
        UiEvent::Reply(reply) => {
            let ticket = reply.ticket.0;
            if sequencer::resolve(session, reply) == Resolution::Stale {
                tracing::debug!(ticket, "ignored reply for a call that is no longer in flight");
            }
        }
        UiEvent::WorkerFailed(reason) => {
            tracing::error!("backend worker failed: {reason}");
            sequencer::abandon(
                session,
                GatewayError::unavailable(format!("backend worker unavailable: {reason}")),
            );
            *worker_status = format!("Backend worker stopped: {reason}");
        }
    }
}

//! Turns UI triggers into queued backend commands.

use crossbeam_channel::{Sender, TrySendError};
use session_core::{
    sequencer::{self, Dispatch, Trigger},
    SessionState,
};
use shared::error::GatewayError;

use crate::backend_bridge::commands::BackendCommand;

/// Starts `trigger` on the session and queues the resulting call for the
/// worker. A call that cannot be queued is failed on the spot so the session
/// never waits on a reply that will not come.
pub fn dispatch_trigger(
    cmd_tx: &Sender<BackendCommand>,
    session: &mut SessionState,
    trigger: Trigger,
) -> Dispatch {
    let dispatch = sequencer::begin(session, trigger);
    let Dispatch::Started(pending) = &dispatch else {
        return dispatch;
    };

    let cmd = BackendCommand::Execute(pending.clone());
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(
            command = cmd_name,
            ticket = pending.ticket.0,
            "queued ui->backend command"
        ),
        Err(TrySendError::Full(_)) => {
            tracing::warn!(command = cmd_name, "backend command queue is full");
            sequencer::abandon(
                session,
                GatewayError::unavailable("backend command queue is full; please retry"),
            );
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::warn!(command = cmd_name, "backend command processor disconnected");
            sequencer::abandon(
                session,
                GatewayError::unavailable("backend command processor disconnected"),
            );
        }
    }
    dispatch
}

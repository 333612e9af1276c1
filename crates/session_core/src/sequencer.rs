//! Operation sequencing for a [`SessionState`].
//!
//! Every user action goes through the same shape: [`begin`] validates the
//! trigger and marks the session pending, [`execute`] performs the one backend
//! call, and [`resolve`] folds the reply back into the session. The three
//! steps are separate so a presentation layer can run the backend call on a
//! worker while the session stays on its own thread; [`Sequencer::trigger`]
//! chains them for callers that can simply await.

use std::path::PathBuf;

use shared::{
    domain::DatasetRef,
    error::GatewayError,
    protocol::{CallOutput, GatewayCall, GatewayReply},
};

use crate::{
    gateway::CommandGateway,
    session::{Operation, PendingCall, SessionState},
};

pub const OPEN_FILE_FIRST_TEXT: &str = "Please open a file first.";
pub const ENTER_URL_FIRST_TEXT: &str = "Please enter a URL first.";
pub const IGNITE_STATUS_TEXT: &str = "Asking the engine...";
pub const QUERY_STATUS_TEXT: &str = "Running query...";

/// Discrete user intents accepted by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Ignite,
    /// Picker result; `None` means the user cancelled.
    OpenFile(Option<PathBuf>),
    FetchRemote,
    RunQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A backend call was issued and must be executed, then resolved.
    Started(PendingCall),
    /// A precondition failed; the session shows the reason and no call was made.
    Declined(String),
    /// The file picker was dismissed; nothing changed.
    Cancelled,
    /// Another call is still outstanding; nothing changed.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// The reply does not belong to the in-flight call and was dropped.
    Stale,
}

pub fn begin(session: &mut SessionState, trigger: Trigger) -> Dispatch {
    if let Some(pending) = session.in_flight() {
        tracing::debug!(
            ?trigger,
            in_flight = pending.ticket.0,
            "trigger rejected while a backend call is pending"
        );
        return Dispatch::Rejected;
    }

    let (operation, call, status) = match trigger {
        Trigger::Ignite => (
            Operation::IgniteEngine,
            GatewayCall::ConnectivityCheck,
            IGNITE_STATUS_TEXT.to_string(),
        ),
        Trigger::OpenFile(None) => return Dispatch::Cancelled,
        Trigger::OpenFile(Some(path)) => {
            let status = format!("Loading {}...", path.display());
            (
                Operation::OpenLocalFile,
                GatewayCall::LoadTable { path },
                status,
            )
        }
        Trigger::FetchRemote => {
            let url = session.url_text().trim().to_string();
            if url.is_empty() {
                return decline(session, ENTER_URL_FIRST_TEXT);
            }
            let status = format!("Downloading {url}...");
            (Operation::FetchRemote, GatewayCall::FetchRemote { url }, status)
        }
        Trigger::RunQuery => {
            let Some(dataset) = session.dataset() else {
                return decline(session, OPEN_FILE_FIRST_TEXT);
            };
            let call = GatewayCall::QueryTable {
                path: dataset.locator().to_path_buf(),
                query: session.query_text().to_string(),
            };
            (Operation::RunQuery, call, QUERY_STATUS_TEXT.to_string())
        }
    };

    let pending = session.start_call(operation, call, status);
    tracing::debug!(
        operation = operation.label(),
        ticket = pending.ticket.0,
        call = pending.call.name(),
        "backend call started"
    );
    Dispatch::Started(pending)
}

fn decline(session: &mut SessionState, reason: &str) -> Dispatch {
    tracing::debug!(reason, "trigger declined");
    session.show_status(reason.to_string());
    Dispatch::Declined(reason.to_string())
}

/// Performs the backend call described by `pending`.
pub async fn execute<G>(gateway: &G, pending: PendingCall) -> GatewayReply
where
    G: CommandGateway + ?Sized,
{
    let ticket = pending.ticket;
    tracing::info!(
        ticket = ticket.0,
        operation = pending.operation.label(),
        call = pending.call.name(),
        "executing backend call"
    );
    let result = match pending.call {
        GatewayCall::ConnectivityCheck => Ok(CallOutput::Text(gateway.connectivity_check().await)),
        GatewayCall::LoadTable { path } => gateway.load_table(&path).await.map(CallOutput::Text),
        GatewayCall::QueryTable { path, query } => gateway
            .query_table(&path, &query)
            .await
            .map(CallOutput::Text),
        GatewayCall::FetchRemote { url } => gateway.fetch_remote(&url).await.map(CallOutput::Path),
    };
    if let Err(err) = &result {
        tracing::warn!(ticket = ticket.0, code = ?err.code, "backend call failed: {err}");
    }
    GatewayReply { ticket, result }
}

pub fn resolve(session: &mut SessionState, reply: GatewayReply) -> Resolution {
    let Some(pending) = session
        .in_flight()
        .filter(|pending| pending.ticket == reply.ticket)
        .cloned()
    else {
        tracing::debug!(ticket = reply.ticket.0, "dropping stale backend reply");
        return Resolution::Stale;
    };

    match reply.result {
        Ok(output) => {
            let (dataset, text) = match pending.call {
                GatewayCall::LoadTable { path } => {
                    let text = format!("File Selected: {}\nReady to Query.", path.display());
                    (Some(DatasetRef::new(path)), text)
                }
                GatewayCall::FetchRemote { .. } => {
                    let path = PathBuf::from(output_text(output));
                    let text = format!("Downloaded to {}\nReady to Query.", path.display());
                    (Some(DatasetRef::new(path)), text)
                }
                GatewayCall::ConnectivityCheck | GatewayCall::QueryTable { .. } => {
                    (None, output_text(output))
                }
            };
            session.finish_ok(dataset, text);
        }
        Err(err) => session.finish_err(error_text(&err)),
    }
    tracing::debug!(
        ticket = reply.ticket.0,
        operation = pending.operation.label(),
        phase = ?session.phase(),
        "backend reply applied"
    );
    Resolution::Applied
}

/// Fails the in-flight call, if any, without waiting for its reply.
pub fn abandon(session: &mut SessionState, error: GatewayError) -> Resolution {
    match session.in_flight().map(|pending| pending.ticket) {
        Some(ticket) => resolve(session, GatewayReply::err(ticket, error)),
        None => Resolution::Stale,
    }
}

pub fn error_text(error: &GatewayError) -> String {
    format!("Error: {error}")
}

fn output_text(output: CallOutput) -> String {
    match output {
        CallOutput::Text(text) => text,
        CallOutput::Path(path) => path.display().to_string(),
    }
}

/// Drives triggers end to end against one gateway.
pub struct Sequencer<G> {
    gateway: G,
}

impl<G: CommandGateway> Sequencer<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn trigger(&self, session: &mut SessionState, trigger: Trigger) -> Dispatch {
        let dispatch = begin(session, trigger);
        if let Dispatch::Started(pending) = &dispatch {
            let reply = execute(&self.gateway, pending.clone()).await;
            resolve(session, reply);
        }
        dispatch
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;

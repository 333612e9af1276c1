use shared::{
    domain::{DatasetRef, DEFAULT_QUERY},
    protocol::{CallTicket, GatewayCall},
};

pub const WAITING_TEXT: &str = "waiting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    IgniteEngine,
    OpenLocalFile,
    FetchRemote,
    RunQuery,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Self::IgniteEngine => "ignite_engine",
            Self::OpenLocalFile => "open_local_file",
            Self::FetchRemote => "fetch_remote",
            Self::RunQuery => "run_query",
        }
    }
}

/// A backend call issued for a session and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub ticket: CallTicket,
    pub operation: Operation,
    pub call: GatewayCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingResult(Operation),
    Ready,
    Error,
}

/// The single user-visible text surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    Waiting(String),
    InProgress(String),
    Success(String),
    Error(String),
}

impl SessionMessage {
    pub fn text(&self) -> &str {
        match self {
            Self::Waiting(text)
            | Self::InProgress(text)
            | Self::Success(text)
            | Self::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    dataset: Option<DatasetRef>,
    query_text: String,
    url_text: String,
    message: SessionMessage,
    phase: SessionPhase,
    in_flight: Option<PendingCall>,
    issued_calls: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_query_text(DEFAULT_QUERY)
    }

    pub fn with_query_text(query_text: impl Into<String>) -> Self {
        Self {
            dataset: None,
            query_text: query_text.into(),
            url_text: String::new(),
            message: SessionMessage::Waiting(WAITING_TEXT.to_string()),
            phase: SessionPhase::Idle,
            in_flight: None,
            issued_calls: 0,
        }
    }

    pub fn dataset(&self) -> Option<&DatasetRef> {
        self.dataset.as_ref()
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn url_text(&self) -> &str {
        &self.url_text
    }

    pub fn message(&self) -> &SessionMessage {
        &self.message
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, SessionPhase::AwaitingResult(_))
    }

    pub fn in_flight(&self) -> Option<&PendingCall> {
        self.in_flight.as_ref()
    }

    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.query_text = text.into();
    }

    pub fn set_url_text(&mut self, text: impl Into<String>) {
        self.url_text = text.into();
    }

    /// Direct handles for text widgets that edit in place.
    pub fn query_text_mut(&mut self) -> &mut String {
        &mut self.query_text
    }

    pub fn url_text_mut(&mut self) -> &mut String {
        &mut self.url_text
    }

    pub(crate) fn start_call(
        &mut self,
        operation: Operation,
        call: GatewayCall,
        status: String,
    ) -> PendingCall {
        self.issued_calls += 1;
        let pending = PendingCall {
            ticket: CallTicket(self.issued_calls),
            operation,
            call,
        };
        self.in_flight = Some(pending.clone());
        self.phase = SessionPhase::AwaitingResult(operation);
        self.message = SessionMessage::InProgress(status);
        pending
    }

    pub(crate) fn finish_ok(&mut self, dataset: Option<DatasetRef>, text: String) {
        if let Some(dataset) = dataset {
            self.dataset = Some(dataset);
        }
        self.in_flight = None;
        self.phase = if self.dataset.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        };
        self.message = SessionMessage::Success(text);
    }

    pub(crate) fn finish_err(&mut self, text: String) {
        self.in_flight = None;
        self.phase = SessionPhase::Error;
        self.message = SessionMessage::Error(text);
    }

    pub(crate) fn show_status(&mut self, text: String) {
        self.message = SessionMessage::Waiting(text);
    }
}

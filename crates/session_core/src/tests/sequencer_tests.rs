use super::*;

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::{error::ErrorCode, protocol::CallTicket};

use crate::session::{SessionMessage, SessionPhase};

const SAMPLE_TABLE: &str = "id | name\n---+------\n1  | alice\n2  | bob\n3  | carol\n4  | dave\n5  | erin\n(5 rows)";

struct ScriptedGateway {
    calls: Mutex<Vec<GatewayCall>>,
    ignite_text: String,
    load_result: Mutex<Result<String, GatewayError>>,
    query_result: Mutex<Result<String, GatewayError>>,
    fetch_result: Mutex<Result<PathBuf, GatewayError>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            ignite_text: "Query engine is running! (SQLite 3.45.0)".to_string(),
            load_result: Mutex::new(Ok("Loaded 120 rows".to_string())),
            query_result: Mutex::new(Ok(SAMPLE_TABLE.to_string())),
            fetch_result: Mutex::new(Ok(PathBuf::from("/tmp/d.csv"))),
        }
    }

    fn with_load_result(self, result: Result<String, GatewayError>) -> Self {
        *self.load_result.lock().expect("lock") = result;
        self
    }

    fn with_query_result(self, result: Result<String, GatewayError>) -> Self {
        *self.query_result.lock().expect("lock") = result;
        self
    }

    fn with_fetch_result(self, result: Result<PathBuf, GatewayError>) -> Self {
        *self.fetch_result.lock().expect("lock") = result;
        self
    }

    fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("lock").push(call);
    }
}

#[async_trait]
impl CommandGateway for ScriptedGateway {
    async fn connectivity_check(&self) -> String {
        self.record(GatewayCall::ConnectivityCheck);
        self.ignite_text.clone()
    }

    async fn load_table(&self, path: &Path) -> Result<String, GatewayError> {
        self.record(GatewayCall::LoadTable {
            path: path.to_path_buf(),
        });
        self.load_result.lock().expect("lock").clone()
    }

    async fn query_table(&self, path: &Path, query: &str) -> Result<String, GatewayError> {
        self.record(GatewayCall::QueryTable {
            path: path.to_path_buf(),
            query: query.to_string(),
        });
        self.query_result.lock().expect("lock").clone()
    }

    async fn fetch_remote(&self, url: &str) -> Result<PathBuf, GatewayError> {
        self.record(GatewayCall::FetchRemote {
            url: url.to_string(),
        });
        self.fetch_result.lock().expect("lock").clone()
    }
}

fn scripted_sequencer(
    gateway: ScriptedGateway,
) -> (Sequencer<Arc<ScriptedGateway>>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(gateway);
    (Sequencer::new(gateway.clone()), gateway)
}

fn open(path: &str) -> Trigger {
    Trigger::OpenFile(Some(PathBuf::from(path)))
}

#[tokio::test]
async fn open_then_query_shows_backend_table_verbatim() {
    let (sequencer, gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();

    let dispatch = sequencer
        .trigger(&mut session, open("/data/sample.csv"))
        .await;
    assert!(matches!(dispatch, Dispatch::Started(_)));
    assert_eq!(
        session.message().text(),
        "File Selected: /data/sample.csv\nReady to Query."
    );
    assert_eq!(
        session.dataset().map(|d| d.locator().to_path_buf()),
        Some(PathBuf::from("/data/sample.csv"))
    );
    assert_eq!(session.phase(), SessionPhase::Ready);

    session.set_query_text("SELECT * FROM data LIMIT 5");
    sequencer.trigger(&mut session, Trigger::RunQuery).await;
    assert_eq!(
        session.message(),
        &SessionMessage::Success(SAMPLE_TABLE.to_string())
    );
    assert_eq!(session.phase(), SessionPhase::Ready);

    assert_eq!(
        gateway.calls(),
        vec![
            GatewayCall::LoadTable {
                path: PathBuf::from("/data/sample.csv"),
            },
            GatewayCall::QueryTable {
                path: PathBuf::from("/data/sample.csv"),
                query: "SELECT * FROM data LIMIT 5".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn run_query_without_dataset_never_reaches_backend() {
    let (sequencer, gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();

    let dispatch = sequencer.trigger(&mut session, Trigger::RunQuery).await;

    assert_eq!(dispatch, Dispatch::Declined(OPEN_FILE_FIRST_TEXT.to_string()));
    assert_eq!(session.message().text(), OPEN_FILE_FIRST_TEXT);
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(gateway.calls().is_empty());
}

#[test]
fn second_trigger_while_pending_is_dropped() {
    let mut session = SessionState::new();
    session.set_url_text("https://example.com/d.csv");

    let Dispatch::Started(first) = begin(&mut session, Trigger::Ignite) else {
        panic!("ignite should start");
    };
    let in_progress = session.message().clone();
    assert_eq!(in_progress.text(), IGNITE_STATUS_TEXT);

    for trigger in [
        Trigger::RunQuery,
        Trigger::FetchRemote,
        Trigger::Ignite,
        open("/data/other.csv"),
    ] {
        assert_eq!(begin(&mut session, trigger), Dispatch::Rejected);
        assert_eq!(session.message(), &in_progress);
        assert_eq!(session.in_flight(), Some(&first));
    }

    let reply = GatewayReply::ok(first.ticket, CallOutput::Text("engine up".into()));
    assert_eq!(resolve(&mut session, reply), Resolution::Applied);
    assert!(!session.is_pending());
    assert!(matches!(
        begin(&mut session, Trigger::FetchRemote),
        Dispatch::Started(_)
    ));
}

#[tokio::test]
async fn only_started_triggers_reach_the_gateway() {
    let gateway = ScriptedGateway::new();
    let mut session = SessionState::new();
    session.set_url_text("https://example.com/d.csv");

    let mut started = Vec::new();
    for trigger in [Trigger::FetchRemote, Trigger::RunQuery, Trigger::FetchRemote] {
        if let Dispatch::Started(pending) = begin(&mut session, trigger) {
            started.push(pending);
        }
    }
    assert_eq!(started.len(), 1);

    for pending in started {
        let reply = execute(&gateway, pending).await;
        resolve(&mut session, reply);
    }
    assert_eq!(gateway.calls().len(), 1);
    assert_eq!(
        session.dataset().map(|d| d.to_string()),
        Some("/tmp/d.csv".to_string())
    );
}

#[tokio::test]
async fn reopening_replaces_the_dataset_wholesale() {
    let (sequencer, gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();

    sequencer.trigger(&mut session, open("/data/a.csv")).await;
    sequencer.trigger(&mut session, open("/data/b.csv")).await;
    sequencer.trigger(&mut session, Trigger::RunQuery).await;

    let query_paths: Vec<PathBuf> = gateway
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::QueryTable { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(query_paths, vec![PathBuf::from("/data/b.csv")]);
}

#[tokio::test]
async fn cancelled_picker_changes_nothing() {
    let (sequencer, gateway) = scripted_sequencer(
        ScriptedGateway::new().with_query_result(Err(GatewayError::new(
            ErrorCode::Query,
            "no such column: x",
        ))),
    );
    let mut session = SessionState::new();
    sequencer.trigger(&mut session, open("/data/a.csv")).await;
    session.set_query_text("SELECT x FROM data");
    sequencer.trigger(&mut session, Trigger::RunQuery).await;
    let calls_before = gateway.calls().len();

    let before = (
        session.dataset().cloned(),
        session.query_text().to_string(),
        session.message().clone(),
        session.phase(),
    );
    let dispatch = sequencer.trigger(&mut session, Trigger::OpenFile(None)).await;

    assert_eq!(dispatch, Dispatch::Cancelled);
    assert_eq!(
        (
            session.dataset().cloned(),
            session.query_text().to_string(),
            session.message().clone(),
            session.phase(),
        ),
        before
    );
    assert_eq!(gateway.calls().len(), calls_before);
}

#[tokio::test]
async fn query_failure_is_shown_and_keeps_dataset() {
    let (sequencer, _gateway) = scripted_sequencer(
        ScriptedGateway::new().with_query_result(Err(GatewayError::new(
            ErrorCode::Query,
            "syntax error near SELECT",
        ))),
    );
    let mut session = SessionState::new();
    sequencer.trigger(&mut session, open("/data/sample.csv")).await;
    let dataset = session.dataset().cloned();

    sequencer.trigger(&mut session, Trigger::RunQuery).await;

    assert_eq!(
        session.message(),
        &SessionMessage::Error("Error: syntax error near SELECT".to_string())
    );
    assert_eq!(session.dataset().cloned(), dataset);
    assert_eq!(session.phase(), SessionPhase::Error);

    // errors are not sticky
    let dispatch = sequencer.trigger(&mut session, Trigger::Ignite).await;
    assert!(matches!(dispatch, Dispatch::Started(_)));
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn fetch_materializes_remote_url_to_local_locator() {
    let (sequencer, gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();
    session.set_url_text("  https://example.com/d.csv ");

    sequencer.trigger(&mut session, Trigger::FetchRemote).await;

    assert_eq!(
        session.dataset().map(|d| d.locator().to_path_buf()),
        Some(PathBuf::from("/tmp/d.csv"))
    );
    assert!(session.message().text().contains("/tmp/d.csv"));
    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::FetchRemote {
            url: "https://example.com/d.csv".to_string(),
        }]
    );
}

#[tokio::test]
async fn fetch_requires_a_url() {
    let (sequencer, gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();
    session.set_url_text("   ");

    let dispatch = sequencer.trigger(&mut session, Trigger::FetchRemote).await;

    assert_eq!(dispatch, Dispatch::Declined(ENTER_URL_FIRST_TEXT.to_string()));
    assert_eq!(session.message().text(), ENTER_URL_FIRST_TEXT);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn fetch_failure_is_reported_not_dropped() {
    let (sequencer, _gateway) = scripted_sequencer(ScriptedGateway::new().with_fetch_result(Err(
        GatewayError::new(ErrorCode::Network, "download failed: connection refused"),
    )));
    let mut session = SessionState::new();
    sequencer.trigger(&mut session, open("/data/a.csv")).await;
    session.set_url_text("https://example.com/d.csv");

    sequencer.trigger(&mut session, Trigger::FetchRemote).await;

    assert_eq!(
        session.message().text(),
        "Error: download failed: connection refused"
    );
    assert_eq!(
        session.dataset().map(|d| d.to_string()),
        Some("/data/a.csv".to_string())
    );
}

#[tokio::test]
async fn failed_open_keeps_previous_dataset() {
    let gateway = ScriptedGateway::new();
    let mut session = SessionState::new();
    let Dispatch::Started(pending) = begin(&mut session, open("/data/a.csv")) else {
        panic!("open should start");
    };
    resolve(&mut session, execute(&gateway, pending).await);

    let gateway = gateway.with_load_result(Err(GatewayError::new(
        ErrorCode::NotFound,
        "file not found: /data/gone.csv",
    )));
    let Dispatch::Started(pending) = begin(&mut session, open("/data/gone.csv")) else {
        panic!("open should start");
    };
    resolve(&mut session, execute(&gateway, pending).await);

    assert_eq!(
        session.message().text(),
        "Error: file not found: /data/gone.csv"
    );
    assert_eq!(
        session.dataset().map(|d| d.to_string()),
        Some("/data/a.csv".to_string())
    );
}

#[tokio::test]
async fn ignite_shows_backend_text_and_stays_idle_without_dataset() {
    let (sequencer, _gateway) = scripted_sequencer(ScriptedGateway::new());
    let mut session = SessionState::new();

    sequencer.trigger(&mut session, Trigger::Ignite).await;

    assert_eq!(
        session.message().text(),
        "Query engine is running! (SQLite 3.45.0)"
    );
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[test]
fn replies_for_other_tickets_are_ignored() {
    let mut session = SessionState::new();
    let Dispatch::Started(pending) = begin(&mut session, Trigger::Ignite) else {
        panic!("ignite should start");
    };

    let stale = GatewayReply::ok(CallTicket(pending.ticket.0 + 41), CallOutput::Text("x".into()));
    assert_eq!(resolve(&mut session, stale), Resolution::Stale);
    assert!(session.is_pending());
    assert_eq!(session.message().text(), IGNITE_STATUS_TEXT);

    let reply = GatewayReply::ok(pending.ticket, CallOutput::Text("ok".into()));
    assert_eq!(resolve(&mut session, reply.clone()), Resolution::Applied);
    assert_eq!(resolve(&mut session, reply), Resolution::Stale);
}

#[test]
fn abandon_fails_the_in_flight_call() {
    let mut session = SessionState::new();
    assert_eq!(
        abandon(&mut session, GatewayError::unavailable("worker gone")),
        Resolution::Stale
    );

    begin(&mut session, Trigger::Ignite);
    assert_eq!(
        abandon(&mut session, GatewayError::unavailable("worker gone")),
        Resolution::Applied
    );
    assert_eq!(session.message().text(), "Error: worker gone");
    assert_eq!(session.phase(), SessionPhase::Error);
    assert!(session.message().is_error());
}

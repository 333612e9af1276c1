//! Line-oriented front end over a session.

use std::path::PathBuf;

use session_core::{CommandGateway, Dispatch, Sequencer, SessionState, Trigger};

pub const HELP_TEXT: &str = "\
Commands:
  :ignite         check that the query engine is running
  :open <path>    load a local data file as table `data`
  :fetch <url>    download a remote file and use it as the dataset
  :query          show the current query text
  :help           show this help
  :quit           exit
Any other line is run as a SQL query against `data`.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ignite,
    Open(PathBuf),
    Fetch(String),
    ShowQuery,
    Help,
    Quit,
    Run(String),
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(directive) = line.strip_prefix(':') else {
        return ShellCommand::Run(line.to_string());
    };

    let (name, arg) = match directive.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (directive, ""),
    };
    match (name, arg.is_empty()) {
        ("ignite", true) => ShellCommand::Ignite,
        ("open", false) => ShellCommand::Open(PathBuf::from(arg)),
        ("open", true) => ShellCommand::Invalid("usage: :open <path>".into()),
        ("fetch", false) => ShellCommand::Fetch(arg.to_string()),
        ("fetch", true) => ShellCommand::Invalid("usage: :fetch <url>".into()),
        ("query", true) => ShellCommand::ShowQuery,
        ("help", _) => ShellCommand::Help,
        ("quit" | "q" | "exit", true) => ShellCommand::Quit,
        _ => ShellCommand::Invalid(format!("unknown command ':{name}'; try :help")),
    }
}

pub enum Outcome {
    Print(String),
    Quit,
}

pub struct Shell<G> {
    sequencer: Sequencer<G>,
    session: SessionState,
}

impl<G: CommandGateway> Shell<G> {
    pub fn new(sequencer: Sequencer<G>, session: SessionState) -> Self {
        Self { sequencer, session }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub async fn handle(&mut self, command: ShellCommand) -> Outcome {
        let trigger = match command {
            ShellCommand::Ignite => Trigger::Ignite,
            ShellCommand::Open(path) => Trigger::OpenFile(Some(path)),
            ShellCommand::Fetch(url) => {
                self.session.set_url_text(url);
                Trigger::FetchRemote
            }
            ShellCommand::Run(query) => {
                self.session.set_query_text(query);
                Trigger::RunQuery
            }
            ShellCommand::ShowQuery => return Outcome::Print(self.session.query_text().to_string()),
            ShellCommand::Help => return Outcome::Print(HELP_TEXT.to_string()),
            ShellCommand::Quit => return Outcome::Quit,
            ShellCommand::Empty => return Outcome::Print(String::new()),
            ShellCommand::Invalid(reason) => return Outcome::Print(reason),
        };
        Outcome::Print(self.trigger(trigger).await)
    }

    /// Runs `trigger` to completion and returns the resulting message text.
    pub async fn trigger(&mut self, trigger: Trigger) -> String {
        match self.sequencer.trigger(&mut self.session, trigger).await {
            Dispatch::Started(_) | Dispatch::Declined(_) => {}
            Dispatch::Cancelled | Dispatch::Rejected => {
                tracing::debug!("trigger had no effect");
            }
        }
        self.session.message().text().to_string()
    }
}

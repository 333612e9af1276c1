mod shell;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use session_core::{
    config::{load_settings, prepare_download_dir},
    EngineGateway, Sequencer, SessionState, Trigger,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use shell::{parse_line, Outcome, Shell};

#[derive(Parser, Debug)]
#[command(name = "data_agent_cli", about = "Query local or remote data files with SQL")]
struct Args {
    /// Settings file; defaults to `data_agent.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Load this file before anything else runs.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Download this URL and use it as the dataset.
    #[arg(long)]
    url: Option<String>,
    /// Run this query and print the result.
    #[arg(long)]
    query: Option<String>,
    /// Check that the query engine is running.
    #[arg(long)]
    ignite: bool,
}

impl Args {
    /// One-shot actions in the order they run.
    fn one_shot_triggers(&self) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        if self.ignite {
            triggers.push(Trigger::Ignite);
        }
        if let Some(path) = &self.file {
            triggers.push(Trigger::OpenFile(Some(path.clone())));
        }
        if self.url.is_some() {
            triggers.push(Trigger::FetchRemote);
        }
        if self.query.is_some() {
            triggers.push(Trigger::RunQuery);
        }
        triggers
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref());
    prepare_download_dir(&settings)?;
    let gateway = EngineGateway::from_settings(&settings)
        .await
        .context("failed to start query engine")?;

    let mut session = SessionState::with_query_text(
        args.query
            .clone()
            .unwrap_or_else(|| settings.default_query.clone()),
    );
    if let Some(url) = &args.url {
        session.set_url_text(url.clone());
    }
    let mut shell = Shell::new(Sequencer::new(gateway), session);

    let triggers = args.one_shot_triggers();
    if !triggers.is_empty() {
        for trigger in triggers {
            println!("{}", shell.trigger(trigger).await);
        }
        return Ok(());
    }

    println!("{}", shell.session().message().text());
    println!("Type :help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match shell.handle(parse_line(&line)).await {
            Outcome::Print(text) if text.is_empty() => {}
            Outcome::Print(text) => println!("{text}"),
            Outcome::Quit => break,
        }
    }
    Ok(())
}

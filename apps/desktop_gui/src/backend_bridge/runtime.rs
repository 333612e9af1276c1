//! Backend worker: a dedicated thread hosting the tokio runtime and gateway.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use session_core::{config::Settings, sequencer, CommandGateway, EngineGateway};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::WorkerStatus(
            "Backend worker starting...".to_string(),
        ));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                let _ = ui_tx.send(UiEvent::WorkerFailed(format!(
                    "failed to build runtime: {err}"
                )));
                return;
            }
        };

        runtime.block_on(async move {
            let gateway = match EngineGateway::from_settings(&settings).await {
                Ok(gateway) => gateway,
                Err(err) => {
                    tracing::error!("failed to start query engine: {err:#}");
                    let _ = ui_tx.send(UiEvent::WorkerFailed(format!(
                        "failed to start query engine: {err:#}"
                    )));
                    return;
                }
            };
            let _ = ui_tx.try_send(UiEvent::WorkerStatus("Backend worker ready".to_string()));
            serve_commands(&gateway, &cmd_rx, &ui_tx).await;
        });
        tracing::info!("backend worker stopped");
    })
}

/// Executes commands in arrival order until shutdown or until either side
/// of the bridge goes away.
async fn serve_commands<G>(gateway: &G, cmd_rx: &Receiver<BackendCommand>, ui_tx: &Sender<UiEvent>)
where
    G: CommandGateway + ?Sized,
{
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::Execute(pending) => {
                let reply = sequencer::execute(gateway, pending).await;
                if ui_tx.send(UiEvent::Reply(reply)).is_err() {
                    tracing::debug!("ui event receiver dropped; stopping backend worker");
                    break;
                }
            }
            BackendCommand::Shutdown => break,
        }
    }
}

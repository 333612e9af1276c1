mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::{app::PersistedDesktopSettings, DesktopGuiApp, StartupConfig};

const APP_NAME: &str = "Data Agent Desktop";

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let startup = StartupConfig::parse();
    let settings = session_core::config::load_settings(startup.config.as_deref());
    tracing::info!(
        database_url = %settings.database_url,
        download_dir = %settings.download_dir.display(),
        "starting desktop gui"
    );

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let default_query = settings.default_query.clone();
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_NAME)
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| {
            let persisted = PersistedDesktopSettings::from_storage(cc.storage);
            let session = ui::app::initial_session(&startup, persisted, &default_query);
            Ok(Box::new(DesktopGuiApp::new(
                cmd_tx,
                ui_rx,
                session,
                startup.file.clone(),
            )))
        }),
    )
}

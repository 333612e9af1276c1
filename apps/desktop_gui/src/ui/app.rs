use std::path::PathBuf;

use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use session_core::{SessionPhase, SessionState, Trigger};
use shared::domain::SUPPORTED_EXTENSIONS;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent, orchestration::dispatch_trigger, reducer::apply_ui_event,
};

pub const SETTINGS_STORAGE_KEY: &str = "data_agent.settings";

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "data_agent_desktop", about = "Ask SQL questions about local or remote data files")]
pub struct StartupConfig {
    /// Open this file as soon as the window starts.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Pre-fill the URL field.
    #[arg(long)]
    pub url: Option<String>,
    /// Pre-fill the query editor.
    #[arg(long)]
    pub query: Option<String>,
    /// Settings file; defaults to `data_agent.toml` in the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Editor contents restored between launches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedDesktopSettings {
    pub query_text: Option<String>,
    pub url_text: Option<String>,
}

impl PersistedDesktopSettings {
    pub fn from_storage(storage: Option<&dyn eframe::Storage>) -> Option<Self> {
        storage
            .and_then(|storage| storage.get_string(SETTINGS_STORAGE_KEY))
            .and_then(|text| serde_json::from_str(&text).ok())
    }
}

/// Builds the starting session: explicit flags win over restored text,
/// restored text wins over configured defaults.
pub fn initial_session(
    startup: &StartupConfig,
    persisted: Option<PersistedDesktopSettings>,
    default_query: &str,
) -> SessionState {
    let persisted = persisted.unwrap_or_default();
    let query_text = startup
        .query
        .clone()
        .or(persisted.query_text)
        .unwrap_or_else(|| default_query.to_string());
    let mut session = SessionState::with_query_text(query_text);
    if let Some(url) = startup.url.clone().or(persisted.url_text) {
        session.set_url_text(url);
    }
    session
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    session: SessionState,
    worker_status: String,
}

impl DesktopGuiApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        session: SessionState,
        open_on_start: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            session,
            worker_status: "Backend worker starting...".to_string(),
        };
        if let Some(path) = open_on_start {
            app.trigger(Trigger::OpenFile(Some(path)));
        }
        app
    }

    fn trigger(&mut self, trigger: Trigger) {
        dispatch_trigger(&self.cmd_tx, &mut self.session, trigger);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            apply_ui_event(&mut self.session, &mut self.worker_status, event);
        }
    }

    fn pick_file() -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Data files", &SUPPORTED_EXTENSIONS[..])
            .pick_file()
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        let idle = !self.session.is_pending();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("Ignite Engine"))
                .clicked()
            {
                self.trigger(Trigger::Ignite);
            }
            if ui
                .add_enabled(idle, egui::Button::new("Open File…"))
                .clicked()
            {
                let picked = Self::pick_file();
                self.trigger(Trigger::OpenFile(picked));
            }
            ui.separator();
            let dataset = self
                .session
                .dataset()
                .map(|dataset| dataset.to_string())
                .unwrap_or_else(|| "No dataset selected".to_string());
            ui.label(egui::RichText::new(dataset).weak());
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("URL");
            let field_width = (ui.available_width() - 90.0).max(120.0);
            let response = ui.add(
                egui::TextEdit::singleline(self.session.url_text_mut())
                    .hint_text("https://example.com/data.csv")
                    .desired_width(field_width),
            );
            let submitted =
                response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(idle, egui::Button::new("Fetch URL"))
                .clicked();
            if clicked || (submitted && idle) {
                self.trigger(Trigger::FetchRemote);
            }
        });
    }

    fn show_query_editor(&mut self, ui: &mut egui::Ui) {
        let idle = !self.session.is_pending();
        ui.label(egui::RichText::new("Query").strong());
        ui.add(
            egui::TextEdit::multiline(self.session.query_text_mut())
                .code_editor()
                .desired_rows(6)
                .desired_width(f32::INFINITY),
        );
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("Run Query"))
                .clicked()
            {
                self.trigger(Trigger::RunQuery);
            }
            if let SessionPhase::AwaitingResult(operation) = self.session.phase() {
                ui.spinner();
                ui.label(egui::RichText::new(operation.label()).weak());
            }
        });
    }

    fn show_message_panel(&self, ui: &mut egui::Ui) {
        let message = self.session.message();
        let mut text = egui::RichText::new(message.text()).monospace();
        if message.is_error() {
            text = text.color(ui.visuals().error_fg_color);
        }
        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add(egui::Label::new(text).extend());
            });
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.show_toolbar(ui);
            ui.add_space(6.0);
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.worker_status).small());
            });
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_query_editor(ui);
            ui.separator();
            self.show_message_panel(ui);
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings {
            query_text: Some(self.session.query_text().to_string()),
            url_text: Some(self.session.url_text().to_string()),
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

impl Drop for DesktopGuiApp {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(BackendCommand::Shutdown);
    }
}

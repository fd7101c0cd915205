use std::sync::Arc;
use std::time::Instant;

use eframe::egui;
use log::{debug, error, warn};

use crate::config::ResolvedConfig;
use crate::data::model::StagedFile;
use crate::export::delimited::export_delimited;
use crate::export::snapshot::export_snapshot;
use crate::export::workbook::export_workbook;
use crate::export::{save_artifact, ExportArtifact, ExportError, MediaKind};
use crate::net::worker::RequestWorker;
use crate::net::{Completion, Dispatch};
use crate::state::{SessionController, SessionError};
use crate::status::{Section, StatusKind, StatusNotifier};
use crate::ui::{panels, results, SearchForm, UiAction};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SheetExplorerApp {
    session: SessionController,
    worker: RequestWorker,
    form: SearchForm,
    /// Last export outcome, shown in the top bar.
    export_notice: Option<String>,
    /// A PNG export is waiting for the viewport screenshot.
    snapshot_pending: bool,
    results_rect: Option<egui::Rect>,
}

impl SheetExplorerApp {
    pub fn new(config: &ResolvedConfig, worker: RequestWorker) -> Self {
        Self {
            session: SessionController::new(
                config.capabilities,
                StatusNotifier::new(config.status_clear_delay),
                config.default_layout,
            ),
            worker,
            form: SearchForm::new(config.exact_match),
            export_notice: None,
            snapshot_pending: false,
            results_rect: None,
        }
    }

    fn drain_completions(&mut self) {
        while let Some(completion) = self.worker.try_next() {
            self.apply_completion(completion);
        }
    }

    /// The search form only survives while the loaded sheet stays the same.
    fn apply_completion(&mut self, completion: Completion) {
        let before = self.session.sheet().map(|s| s.name.clone());
        if !self.session.complete(completion) {
            return;
        }
        if self.session.sheet().map(|s| s.name.as_str()) != before.as_deref() {
            self.form.reset_for_new_columns();
        }
    }

    fn apply(&mut self, ctx: &egui::Context, action: UiAction) {
        debug!("ui action {action:?}");
        match action {
            UiAction::PickFile => self.pick_file(),
            UiAction::Upload => {
                let issued = self.session.upload();
                self.issue(issued);
            }
            UiAction::SelectSheet(name) => {
                let issued = self.session.select_sheet(&name);
                self.issue(issued);
            }
            UiAction::Search { with_projection } => {
                let projection = Some(&self.form.projection).filter(|_| with_projection);
                let issued = self
                    .session
                    .search(&self.form.terms, projection, self.form.exact);
                self.issue(issued);
            }
            UiAction::Reset => {
                self.session.reset();
                self.form = SearchForm::new(self.form.exact);
                self.export_notice = None;
                self.snapshot_pending = false;
            }
            UiAction::SetLayout(layout) => self.session.set_layout(layout),
            UiAction::Export(media) => self.export(ctx, media),
        }
    }

    fn issue(&mut self, issued: Result<Dispatch, SessionError>) {
        match issued {
            Ok(dispatch) => self.worker.dispatch(dispatch),
            Err(SessionError::Busy(kind)) => debug!("{kind} request already in flight"),
            Err(err) => warn!("request not sent: {err}"),
        }
    }

    fn pick_file(&mut self) {
        let Some(path) = panels::pick_workbook() else {
            return;
        };
        match StagedFile::read(&path) {
            Ok(file) => self.session.stage_file(file),
            Err(e) => {
                error!("Failed to read file: {e:#}");
                self.session.status_mut().post(
                    Section::Upload,
                    StatusKind::Error,
                    format!("Error: {e:#}"),
                    false,
                    Instant::now(),
                );
            }
        }
    }

    // -- Export --

    fn export(&mut self, ctx: &egui::Context, media: MediaKind) {
        if !self.session.capabilities().export {
            return;
        }
        let Some(store) = self.session.results() else {
            return;
        };
        let artifact = match media {
            MediaKind::Csv => export_delimited(store),
            MediaKind::Xlsx => export_workbook(store),
            MediaKind::Png => {
                // The frame is captured after it is painted; see `take_snapshot`.
                self.snapshot_pending = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(Default::default()));
                return;
            }
        };
        self.finish_export(artifact);
    }

    fn take_snapshot(&mut self, ctx: &egui::Context) {
        if !self.snapshot_pending {
            return;
        }
        let image = ctx.input(|i| {
            i.raw.events.iter().find_map(|e| match e {
                egui::Event::Screenshot { image, .. } => Some(Arc::clone(image)),
                _ => None,
            })
        });
        let Some(image) = image else {
            return;
        };
        self.snapshot_pending = false;

        let (Some(rect), Some(store)) = (self.results_rect, self.session.results()) else {
            return;
        };
        let region = image.region(&rect, Some(ctx.pixels_per_point()));
        let artifact = export_snapshot(store, &region);
        self.finish_export(artifact);
    }

    fn finish_export(&mut self, artifact: Result<ExportArtifact, ExportError>) {
        let artifact = match artifact {
            Ok(artifact) => artifact,
            Err(e) => {
                error!("Export failed: {e}");
                self.export_notice = Some(format!("Export failed: {e}"));
                return;
            }
        };

        debug!(
            "{} ready ({}, {} bytes)",
            artifact.filename,
            artifact.media.mime(),
            artifact.bytes.len()
        );
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save export")
            .set_file_name(artifact.filename)
            .add_filter(artifact.media.filter_name(), &[artifact.media.extension()])
            .save_file()
        else {
            return;
        };

        match save_artifact(&artifact, &path) {
            Ok(()) => self.export_notice = Some(format!("Saved {}", path.display())),
            Err(e) => {
                error!("{e:#}");
                self.export_notice = Some(format!("Error: {e:#}"));
            }
        }
    }
}

impl eframe::App for SheetExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_completions();
        self.take_snapshot(ctx);

        let now = Instant::now();
        self.session.status_mut().tick(now);
        if let Some(deadline) = self.session.status().next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }

        let mut actions = Vec::new();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.session, self.export_notice.as_deref(), &mut actions);
        });

        // ---- Left side panel: upload / sheet / search ----
        egui::SidePanel::left("workflow_panel")
            .default_width(300.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.session, &mut self.form, &mut actions);
            });

        // ---- Central panel: results ----
        let central = egui::CentralPanel::default().show(ctx, |ui| {
            results::results_view(ui, &self.session);
        });
        self.results_rect = Some(central.response.rect);

        for action in actions {
            self.apply(ctx, action);
        }
    }
}

use eframe::egui::{self, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::results::{LayoutMode, ResultSetStore};
use crate::state::SessionController;

const ROW_HEIGHT: f32 = 20.0;

/// Render the central results area.
pub fn results_view(ui: &mut Ui, session: &SessionController) {
    let Some(store) = session.results() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new("Run a search to see matching rows.").weak());
        });
        return;
    };

    if store.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("No rows matched.");
        });
        return;
    }

    match store.layout() {
        LayoutMode::Tabular => table(ui, store),
        LayoutMode::PerRecord => cards(ui, store),
    }
}

fn table(ui: &mut Ui, store: &ResultSetStore) {
    let headers = store.headers();
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), headers.len())
        .header(ROW_HEIGHT, |mut header| {
            for name in headers {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, store.len(), |mut row| {
                let record = &store.rows()[row.index()];
                for cell in store.row_cells(record) {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell.to_string());
                    });
                }
            });
        });
}

/// One framed key/value grid per row.
fn cards(ui: &mut Ui, store: &ResultSetStore) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (i, record) in store.rows().iter().enumerate() {
                egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                    ui.set_width(ui.available_width());
                    ui.label(RichText::new(format!("Record {}", i + 1)).strong());
                    egui::Grid::new(("record", i))
                        .num_columns(2)
                        .striped(true)
                        .show(ui, |ui: &mut Ui| {
                            for (name, cell) in store.headers().iter().zip(store.row_cells(record)) {
                                ui.label(RichText::new(name).weak());
                                if cell.is_null() {
                                    ui.label(RichText::new("(blank)").weak().italics());
                                } else {
                                    ui.label(cell.to_string());
                                }
                                ui.end_row();
                            }
                        });
                });
                ui.add_space(6.0);
            }
        });
}

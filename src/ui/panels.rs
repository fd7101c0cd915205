use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use super::{SearchForm, UiAction};
use crate::data::filter::FilterTerm;
use crate::export::MediaKind;
use crate::net::RequestKind;
use crate::state::{Phase, SessionController};
use crate::status::{Section, StatusKind, StatusNotifier};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(
    ui: &mut Ui,
    session: &SessionController,
    export_notice: Option<&str>,
    actions: &mut Vec<UiAction>,
) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                actions.push(UiAction::PickFile);
                ui.close_menu();
            }
            if ui.button("Start over").clicked() {
                actions.push(UiAction::Reset);
                ui.close_menu();
            }
        });

        let results = session.results().filter(|r| !r.is_empty());
        let can_export = session.capabilities().export && results.is_some();
        ui.add_enabled_ui(can_export, |ui: &mut Ui| {
            ui.menu_button("Export", |ui: &mut Ui| {
                for (media, label) in [
                    (MediaKind::Csv, "CSV…"),
                    (MediaKind::Xlsx, "Excel workbook…"),
                    (MediaKind::Png, "PNG snapshot…"),
                ] {
                    if ui.button(label).clicked() {
                        actions.push(UiAction::Export(media));
                        ui.close_menu();
                    }
                }
            });
        });

        ui.separator();

        if session.capabilities().layout_toggle {
            let next = session.layout().toggled();
            if ui.button(format!("Show as {}", next.label())).clicked() {
                actions.push(UiAction::SetLayout(next));
            }
            ui.separator();
        }

        if let Some(store) = session.results() {
            ui.label(format!("{} rows, {} columns", store.len(), store.headers().len()));
        }

        if let Some(notice) = export_notice {
            ui.separator();
            ui.label(RichText::new(notice).italics());
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – workflow
// ---------------------------------------------------------------------------

/// Render the upload → sheet → search workflow.
pub fn side_panel(
    ui: &mut Ui,
    session: &SessionController,
    form: &mut SearchForm,
    actions: &mut Vec<UiAction>,
) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            upload_section(ui, session, actions);
            ui.separator();
            sheet_section(ui, session, form, actions);
            ui.separator();
            search_section(ui, session, form, actions);
        });
}

fn upload_section(ui: &mut Ui, session: &SessionController, actions: &mut Vec<UiAction>) {
    ui.heading("1. Upload");

    match session.staged_file() {
        Some(file) => {
            ui.label(format!("{} ({} KiB)", file.name, file.len().div_ceil(1024)));
        }
        None => {
            ui.label("No file chosen.");
        }
    }

    let busy = session.is_busy(RequestKind::Upload);
    ui.horizontal(|ui: &mut Ui| {
        if ui.add_enabled(!busy, egui::Button::new("Choose file…")).clicked() {
            actions.push(UiAction::PickFile);
        }
        let ready = session.staged_file().is_some() && !busy;
        if ui.add_enabled(ready, egui::Button::new("Upload")).clicked() {
            actions.push(UiAction::Upload);
        }
        if busy {
            ui.spinner();
        }
    });

    status_banner(ui, session.status(), Section::Upload);
}

fn sheet_section(
    ui: &mut Ui,
    session: &SessionController,
    form: &mut SearchForm,
    actions: &mut Vec<UiAction>,
) {
    ui.heading("2. Sheet");

    let sheets = session.sheets();
    if sheets.is_empty() {
        let hint = match session.phase() {
            Phase::Uploaded => "The workbook has no sheets.",
            _ => "Upload a workbook to list its sheets.",
        };
        ui.label(hint);
        status_banner(ui, session.status(), Section::Sheet);
        return;
    }

    if !sheets.contains(&form.sheet_choice) {
        form.sheet_choice = session
            .sheet()
            .map(|s| s.name.clone())
            .unwrap_or_default();
    }

    let busy = session.is_busy(RequestKind::Sheet);
    ui.horizontal(|ui: &mut Ui| {
        let selected_text = if form.sheet_choice.is_empty() {
            "Select a sheet"
        } else {
            form.sheet_choice.as_str()
        };
        egui::ComboBox::from_id_salt("sheet_choice")
            .selected_text(selected_text)
            .show_ui(ui, |ui: &mut Ui| {
                for name in sheets {
                    ui.selectable_value(&mut form.sheet_choice, name.clone(), name);
                }
            });

        let ready = !form.sheet_choice.is_empty() && !busy;
        if ui.add_enabled(ready, egui::Button::new("Load")).clicked() {
            actions.push(UiAction::SelectSheet(form.sheet_choice.clone()));
        }
        if busy {
            ui.spinner();
        }
    });

    if let Some(sheet) = session.sheet() {
        ui.label(format!("\"{}\": {} columns", sheet.name, sheet.columns.len()));
    }

    status_banner(ui, session.status(), Section::Sheet);
}

fn search_section(
    ui: &mut Ui,
    session: &SessionController,
    form: &mut SearchForm,
    actions: &mut Vec<UiAction>,
) {
    ui.heading("3. Search");

    let Some(sheet) = session.sheet() else {
        ui.label("Load a sheet to search it.");
        return;
    };
    let caps = *session.capabilities();

    // ---- Filter terms ----
    let mut remove = None;
    for (i, term) in form.terms.iter_mut().enumerate() {
        ui.horizontal(|ui: &mut Ui| {
            let field_text = if term.field.is_empty() {
                "Column"
            } else {
                term.field.as_str()
            };
            egui::ComboBox::from_id_salt(("term_field", i))
                .width(110.0)
                .selected_text(field_text)
                .show_ui(ui, |ui: &mut Ui| {
                    for column in &sheet.columns {
                        ui.selectable_value(&mut term.field, column.clone(), column);
                    }
                });
            ui.add(
                egui::TextEdit::singleline(&mut term.query)
                    .hint_text("contains…")
                    .desired_width(120.0),
            );
            if i > 0 && ui.small_button("✕").clicked() {
                remove = Some(i);
            }
        });
        if let Err(err) = term.validate() {
            ui.label(RichText::new(err.to_string()).small().color(Color32::RED));
        }
    }
    if let Some(i) = remove {
        form.terms.remove(i);
    }
    if caps.multi_field_search && ui.small_button("+ Add filter").clicked() {
        form.terms.push(FilterTerm::default());
    }

    ui.checkbox(&mut form.exact, "Exact match");

    // ---- Column projection ----
    if caps.column_projection {
        ui.checkbox(&mut form.choosing_columns, "Choose columns to show");
        if form.choosing_columns {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    form.projection = sheet.columns.iter().cloned().collect();
                }
                if ui.small_button("None").clicked() {
                    form.projection.clear();
                }
                ui.label(format!("{}/{}", form.projection.len(), sheet.columns.len()));
            });
            for column in &sheet.columns {
                let mut checked = form.projection.contains(column);
                if ui.checkbox(&mut checked, column).changed() {
                    form.projection.toggle(column);
                }
            }
        }
    }

    // ---- Actions ----
    let busy = session.is_busy(RequestKind::Search);
    ui.horizontal(|ui: &mut Ui| {
        if ui.add_enabled(!busy, egui::Button::new("Search")).clicked() {
            actions.push(UiAction::Search {
                with_projection: form.choosing_columns,
            });
        }
        if caps.column_projection
            && form.choosing_columns
            && ui.add_enabled(!busy, egui::Button::new("Search all columns")).clicked()
        {
            actions.push(UiAction::Search {
                with_projection: false,
            });
        }
        if busy {
            ui.spinner();
        }
    });

    status_banner(ui, session.status(), Section::Search);
}

// ---------------------------------------------------------------------------
// Status banners
// ---------------------------------------------------------------------------

fn status_banner(ui: &mut Ui, status: &StatusNotifier, section: Section) {
    let Some(message) = status.message(section) else {
        return;
    };
    let color = match message.kind {
        StatusKind::Success => Color32::from_rgb(46, 139, 87),
        StatusKind::Error => Color32::RED,
        StatusKind::Info => ui.visuals().weak_text_color(),
    };
    ui.label(RichText::new(&message.text).color(color));
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn pick_workbook() -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open spreadsheet")
        .add_filter("Excel workbooks", &["xlsx", "xls"])
        .pick_file()
}

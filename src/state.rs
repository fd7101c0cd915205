use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::time::Instant;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::Capabilities;
use crate::data::filter::{self, ColumnProjection, FilterError, FilterTerm};
use crate::data::model::{ResultRow, SheetMetadata, StagedFile};
use crate::data::results::{LayoutMode, ResultSetStore};
use crate::net::{
    Completion, Dispatch, RequestKind, ServiceCall, ServiceError, ServiceReply, SheetResponse,
    UploadResponse,
};
use crate::status::{Section, StatusKind, StatusNotifier};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Where the user is in the upload → sheet → search workflow.
///
/// Each variant carries exactly the data valid at that step, so there is no
/// way to hold results without a selected sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Staged,
    Uploaded {
        sheets: Vec<String>,
    },
    SheetSelected {
        sheets: Vec<String>,
        sheet: SheetMetadata,
    },
    ResultsReady {
        sheets: Vec<String>,
        sheet: SheetMetadata,
        results: ResultSetStore,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Staged,
    Uploaded,
    SheetSelected,
    ResultsReady,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::Staged => Phase::Staged,
            SessionState::Uploaded { .. } => Phase::Uploaded,
            SessionState::SheetSelected { .. } => Phase::SheetSelected,
            SessionState::ResultsReady { .. } => Phase::ResultsReady,
        }
    }

    pub fn sheets(&self) -> &[String] {
        match self {
            SessionState::Uploaded { sheets }
            | SessionState::SheetSelected { sheets, .. }
            | SessionState::ResultsReady { sheets, .. } => sheets,
            SessionState::Idle | SessionState::Staged => &[],
        }
    }

    pub fn sheet(&self) -> Option<&SheetMetadata> {
        match self {
            SessionState::SheetSelected { sheet, .. } | SessionState::ResultsReady { sheet, .. } => {
                Some(sheet)
            }
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&ResultSetStore> {
        match self {
            SessionState::ResultsReady { results, .. } => Some(results),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Requests the controller refuses to issue. None of these change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no file has been chosen for upload")]
    NoStagedFile,

    #[error("an {0} request is already in flight")]
    Busy(RequestKind),

    #[error("sheet {0:?} is not in the uploaded workbook")]
    UnknownSheet(String),

    #[error("no sheet has been loaded yet")]
    NoSheetSelected,

    #[error(transparent)]
    InvalidTerm(#[from] FilterError),
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Drives the workflow and owns every piece of session data.
///
/// Network calls are split in two: an operation such as [`upload`] validates,
/// marks its kind busy and returns a [`Dispatch`]; the caller runs it and
/// feeds the [`Completion`] back through [`complete`]. Each kind has its own
/// generation counter and only a completion stamped with the latest
/// generation is applied.
///
/// [`upload`]: SessionController::upload
/// [`complete`]: SessionController::complete
#[derive(Debug)]
pub struct SessionController {
    state: SessionState,
    staged: Option<StagedFile>,
    busy: BTreeSet<RequestKind>,
    generations: BTreeMap<RequestKind, u64>,
    status: StatusNotifier,
    capabilities: Capabilities,
    layout: LayoutMode,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(Capabilities::default(), StatusNotifier::default(), LayoutMode::default())
    }
}

impl SessionController {
    pub fn new(capabilities: Capabilities, status: StatusNotifier, layout: LayoutMode) -> Self {
        Self {
            state: SessionState::Idle,
            staged: None,
            busy: BTreeSet::new(),
            generations: RequestKind::ALL.iter().map(|k| (*k, 0)).collect(),
            status,
            capabilities,
            layout,
        }
    }

    // -- Accessors --

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn staged_file(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    pub fn sheets(&self) -> &[String] {
        self.state.sheets()
    }

    pub fn sheet(&self) -> Option<&SheetMetadata> {
        self.state.sheet()
    }

    pub fn results(&self) -> Option<&ResultSetStore> {
        self.state.results()
    }

    pub fn is_busy(&self, kind: RequestKind) -> bool {
        self.busy.contains(&kind)
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn status(&self) -> &StatusNotifier {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusNotifier {
        &mut self.status
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    /// Switch how results are presented. Ignored when the layout toggle is
    /// disabled.
    pub fn set_layout(&mut self, layout: LayoutMode) {
        if !self.capabilities.layout_toggle {
            return;
        }
        self.layout = layout;
        if let SessionState::ResultsReady { results, .. } = &mut self.state {
            results.set_layout(layout);
        }
    }

    // -- Operations --

    /// Remember the file to upload. Session data from an earlier upload stays
    /// until this one succeeds.
    pub fn stage_file(&mut self, file: StagedFile) {
        info!("staged {} ({} bytes)", file.name, file.len());
        self.staged = Some(file);
        if self.state == SessionState::Idle {
            self.state = SessionState::Staged;
        }
    }

    pub fn upload(&mut self) -> Result<Dispatch, SessionError> {
        let Some(file) = self.staged.clone() else {
            self.notify(Section::Upload, StatusKind::Error, "Choose a file first", false);
            return Err(SessionError::NoStagedFile);
        };
        let generation = self.begin(RequestKind::Upload)?;
        self.notify(
            Section::Upload,
            StatusKind::Info,
            format!("Uploading {}…", file.name),
            true,
        );
        Ok(Dispatch {
            generation,
            call: ServiceCall::Upload(file),
        })
    }

    pub fn select_sheet(&mut self, name: &str) -> Result<Dispatch, SessionError> {
        if !self.state.sheets().iter().any(|s| s == name) {
            self.notify(
                Section::Sheet,
                StatusKind::Error,
                format!("Sheet \"{name}\" is not in the uploaded file"),
                false,
            );
            return Err(SessionError::UnknownSheet(name.to_string()));
        }
        let generation = self.begin(RequestKind::Sheet)?;
        self.notify(
            Section::Sheet,
            StatusKind::Info,
            format!("Loading sheet \"{name}\"…"),
            true,
        );
        Ok(Dispatch {
            generation,
            call: ServiceCall::SelectSheet(name.to_string()),
        })
    }

    /// Build and issue a search. With no complete terms the request carries an
    /// empty filter, which the service treats as "all rows".
    ///
    /// Capability flags trim the request: only the first term is used without
    /// multi-field search, and the projection is dropped without column
    /// projection.
    pub fn search(
        &mut self,
        terms: &[FilterTerm],
        projection: Option<&ColumnProjection>,
        exact: bool,
    ) -> Result<Dispatch, SessionError> {
        if self.state.sheet().is_none() {
            return Err(SessionError::NoSheetSelected);
        }

        let mut complete: Vec<FilterTerm> = terms.iter().filter(|t| t.is_complete()).cloned().collect();
        if !self.capabilities.multi_field_search {
            complete.truncate(1);
        }
        if let Some(err) = complete.iter().find_map(|t| t.validate().err()) {
            self.notify(Section::Search, StatusKind::Error, err.to_string(), true);
            return Err(err.into());
        }
        let projection = projection.filter(|_| self.capabilities.column_projection);

        let generation = self.begin(RequestKind::Search)?;
        let request = filter::build(&complete, projection).with_exact(exact);
        debug!("search request {request:?}");
        self.notify(Section::Search, StatusKind::Info, "Searching…", true);
        Ok(Dispatch {
            generation,
            call: ServiceCall::Search(request),
        })
    }

    /// Back to `Idle`. Requests still in flight become stale.
    pub fn reset(&mut self) {
        info!("session reset");
        for kind in RequestKind::ALL {
            self.invalidate(kind);
        }
        self.state = SessionState::Idle;
        self.staged = None;
        self.status.clear_all();
    }

    /// Apply the result of a dispatched call. Returns `false` when the
    /// completion was stale and discarded.
    pub fn complete(&mut self, completion: Completion) -> bool {
        let Completion {
            kind,
            generation,
            outcome,
        } = completion;

        if self.generations.get(&kind).copied() != Some(generation) {
            debug!("discarding stale {kind} completion (generation {generation})");
            return false;
        }
        self.busy.remove(&kind);

        match outcome {
            Ok(ServiceReply::Uploaded(response)) => self.apply_upload(response),
            Ok(ServiceReply::SheetLoaded { name, response }) => self.apply_sheet(name, response),
            Ok(ServiceReply::Searched(rows)) => self.apply_search(rows),
            Err(err) => self.fail(kind, &err),
        }
        true
    }

    // -- Internals --

    fn begin(&mut self, kind: RequestKind) -> Result<u64, SessionError> {
        if !self.busy.insert(kind) {
            debug!("ignoring duplicate {kind} request");
            return Err(SessionError::Busy(kind));
        }
        let generation = self.generations.entry(kind).or_default();
        *generation += 1;
        Ok(*generation)
    }

    /// Make any in-flight request of `kind` stale and release its busy flag.
    fn invalidate(&mut self, kind: RequestKind) {
        *self.generations.entry(kind).or_default() += 1;
        self.busy.remove(&kind);
    }

    fn apply_upload(&mut self, response: UploadResponse) {
        self.invalidate(RequestKind::Sheet);
        self.invalidate(RequestKind::Search);

        info!("upload accepted, sheets: {:?}", response.sheets);
        let (kind, text) = if response.sheets.is_empty() {
            (StatusKind::Info, "File uploaded, but it has no sheets".to_string())
        } else {
            (
                StatusKind::Success,
                response
                    .message
                    .unwrap_or_else(|| "File uploaded successfully".to_string()),
            )
        };
        self.state = SessionState::Uploaded {
            sheets: response.sheets,
        };
        self.notify(Section::Upload, kind, text, false);
    }

    fn apply_sheet(&mut self, name: String, response: SheetResponse) {
        self.invalidate(RequestKind::Search);

        let sheets = match mem::take(&mut self.state) {
            SessionState::Uploaded { sheets }
            | SessionState::SheetSelected { sheets, .. }
            | SessionState::ResultsReady { sheets, .. } => sheets,
            other => {
                warn!("sheet reply arrived in {:?} state", other.phase());
                self.state = other;
                return;
            }
        };

        info!("sheet {name:?} loaded with {} columns", response.columns.len());
        let text = format!("Sheet \"{name}\" loaded ({} columns)", response.columns.len());
        self.state = SessionState::SheetSelected {
            sheets,
            sheet: SheetMetadata {
                name,
                columns: response.columns,
            },
        };
        self.notify(Section::Sheet, StatusKind::Success, text, false);
    }

    fn apply_search(&mut self, rows: Vec<ResultRow>) {
        let (sheets, sheet) = match mem::take(&mut self.state) {
            SessionState::SheetSelected { sheets, sheet }
            | SessionState::ResultsReady { sheets, sheet, .. } => (sheets, sheet),
            other => {
                warn!("search reply arrived in {:?} state", other.phase());
                self.state = other;
                return;
            }
        };

        let count = rows.len();
        info!("search returned {count} rows");
        let (kind, text) = match count {
            0 => (StatusKind::Info, "Found 0 results".to_string()),
            1 => (StatusKind::Success, "Found 1 result".to_string()),
            n => (StatusKind::Success, format!("Found {n} results")),
        };
        self.state = SessionState::ResultsReady {
            sheets,
            sheet,
            results: ResultSetStore::with_layout(rows, self.layout),
        };
        self.notify(Section::Search, kind, text, true);
    }

    fn fail(&mut self, kind: RequestKind, err: &ServiceError) {
        if err.is_network_failure() {
            warn!("{kind} request failed: {err}");
        } else {
            error!("{kind} response could not be read: {err}");
        }
        let (text, persistent) = match kind {
            RequestKind::Upload => (format!("Upload failed: {err}"), false),
            RequestKind::Sheet => (format!("Sheet selection failed: {err}"), false),
            RequestKind::Search => (format!("Search failed: {err}"), true),
        };
        self.notify(kind.section(), StatusKind::Error, text, persistent);
    }

    fn notify(&mut self, section: Section, kind: StatusKind, text: impl Into<String>, persistent: bool) {
        self.status.post(section, kind, text, persistent, Instant::now());
    }
}

//! Query service contract.
//!
//! ```text
//!   SessionController ──Dispatch──▶ RequestWorker ──▶ SheetService (HTTP)
//!          ▲                                              │
//!          └────────────── Completion ◀───────────────────┘
//! ```
//!
//! The controller never awaits. It hands out a [`Dispatch`] tagged with a
//! request generation, and later receives a [`Completion`] carrying the same
//! generation so stale answers can be recognised.

pub mod http;
pub mod worker;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::data::filter::SearchRequest;
use crate::data::model::{ResultRow, StagedFile};
use crate::status::Section;

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The service accepted the request but reported an `{"error": ...}` body.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Transport, status and rejection errors; everything except a body that
    /// did not decode.
    pub fn is_network_failure(&self) -> bool {
        !matches!(self, ServiceError::Malformed(_))
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// The remote backend: upload a workbook, pick a sheet, search its rows.
#[async_trait]
pub trait SheetService: Send + Sync {
    async fn upload(&self, file: &StagedFile) -> Result<UploadResponse, ServiceError>;

    async fn select_sheet(&self, name: &str) -> Result<SheetResponse, ServiceError>;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, ServiceError>;
}

// ---------------------------------------------------------------------------
// Requests and completions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestKind {
    Upload,
    Sheet,
    Search,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [RequestKind::Upload, RequestKind::Sheet, RequestKind::Search];

    pub fn section(self) -> Section {
        match self {
            RequestKind::Upload => Section::Upload,
            RequestKind::Sheet => Section::Sheet,
            RequestKind::Search => Section::Search,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.section().fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Upload(StagedFile),
    SelectSheet(String),
    Search(SearchRequest),
}

impl ServiceCall {
    pub fn kind(&self) -> RequestKind {
        match self {
            ServiceCall::Upload(_) => RequestKind::Upload,
            ServiceCall::SelectSheet(_) => RequestKind::Sheet,
            ServiceCall::Search(_) => RequestKind::Search,
        }
    }
}

/// A call the controller wants issued, stamped with its request generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub generation: u64,
    pub call: ServiceCall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    Uploaded(UploadResponse),
    SheetLoaded { name: String, response: SheetResponse },
    Searched(Vec<ResultRow>),
}

#[derive(Debug)]
pub struct Completion {
    pub kind: RequestKind,
    pub generation: u64,
    pub outcome: Result<ServiceReply, ServiceError>,
}

/// Run one dispatched call against `service`.
pub async fn execute(service: &dyn SheetService, dispatch: Dispatch) -> Completion {
    let kind = dispatch.call.kind();
    let outcome = match dispatch.call {
        ServiceCall::Upload(file) => service.upload(&file).await.map(ServiceReply::Uploaded),
        ServiceCall::SelectSheet(name) => service
            .select_sheet(&name)
            .await
            .map(|response| ServiceReply::SheetLoaded { name, response }),
        ServiceCall::Search(request) => service.search(&request).await.map(ServiceReply::Searched),
    };
    Completion {
        kind,
        generation: dispatch.generation,
        outcome,
    }
}

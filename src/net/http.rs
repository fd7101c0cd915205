use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::{ServiceError, SheetResponse, SheetService, UploadResponse};
use crate::data::filter::SearchRequest;
use crate::data::model::{ResultRow, StagedFile};

const UPLOAD_PATH: &str = "upload/";
const SELECT_SHEET_PATH: &str = "select-sheet/";
const SEARCH_PATH: &str = "search/";

/// [`SheetService`] over the backend's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSheetService {
    client: Client,
    base_url: String,
}

impl HttpSheetService {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl SheetService for HttpSheetService {
    async fn upload(&self, file: &StagedFile) -> Result<UploadResponse, ServiceError> {
        let part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
        let form = Form::new().part("file", part);
        let response = self
            .client
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    async fn select_sheet(&self, name: &str) -> Result<SheetResponse, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(SELECT_SHEET_PATH))
            .form(&[("sheet_name", name)])
            .send()
            .await?;
        decode(response).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(SEARCH_PATH))
            .query(request)
            .send()
            .await?;
        decode(response).await
    }
}

/// Decode a JSON body, surfacing `{"error": "..."}` payloads as failures.
///
/// The backend reports parse problems with a 200 status and an `error` key,
/// so the status code alone is not enough.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ServiceError::Status { status, body });
    }

    let value: JsonValue =
        serde_json::from_str(&body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    if let Some(message) = value.get("error").and_then(JsonValue::as_str) {
        return Err(ServiceError::Rejected(message.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ServiceError::Malformed(e.to_string()))
}

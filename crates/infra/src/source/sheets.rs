//! Google Sheets v4 source implementing the SourcePort.
//!
//! Fetches the configured range once per run and maps the header row onto
//! named cells. The adapter owns tabular quirks (ragged rows, fully empty
//! rows); the strict decode into candidates happens in the domain parser.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sheetsync_core::ports::SourcePort;
use sheetsync_domain::{RawRow, Result, SheetSyncError, SourceConfig};
use tracing::{debug, instrument};

use crate::auth::AccessTokenProvider;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Google Sheets source client.
pub struct SheetsSourceClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl SheetsSourceClient {
    /// Create a client for the configured sheet range.
    pub fn new(config: &SourceConfig, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            tokens,
        }
    }

    /// Point the client at a different API base (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, self.range
        )
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[async_trait]
impl SourcePort for SheetsSourceClient {
    #[instrument(skip(self), fields(spreadsheet_id = %self.spreadsheet_id))]
    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.values_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetSyncError::Source(format!("sheet request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(SheetSyncError::Source(format!(
                "sheet API error ({status}): {detail}"
            )));
        }

        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetSyncError::Source(format!("failed to parse sheet response: {e}")))?;

        let mut rows_iter = value_range.values.into_iter();
        let Some(headers) = rows_iter.next() else {
            debug!("sheet returned no rows");
            return Ok(Vec::new());
        };

        let rows: Vec<RawRow> = rows_iter
            .enumerate()
            .filter_map(|(i, cells)| {
                if cells.iter().all(|cell| cell.trim().is_empty()) {
                    return None;
                }
                let columns: BTreeMap<String, String> = headers
                    .iter()
                    .zip(cells)
                    .map(|(header, cell)| (header.clone(), cell))
                    .collect();
                // Data starts on sheet row 2, after the header
                Some(RawRow { row_number: i + 2, columns })
            })
            .collect();

        debug!(rows = rows.len(), "fetched sheet rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use sheetsync_domain::constants::{COL_EVENT_ID, COL_EVENT_NAME, COL_START};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::StaticTokenProvider;

    fn config() -> SourceConfig {
        SourceConfig { spreadsheet_id: "sheet-1".into(), range: "main_import!A:I".into() }
    }

    async fn client(server: &MockServer) -> SheetsSourceClient {
        SheetsSourceClient::new(&config(), Arc::new(StaticTokenProvider::new("tok")))
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn maps_headers_to_named_cells_in_sheet_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-1/values/main_import!A:I"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "main_import!A1:I3",
                "values": [
                    ["Event ID", "Event Name", "Start Date/Time"],
                    ["EVT-1", "Standup", "8/7/2025, 9:00:00 AM"],
                    ["EVT-2", "Planning"],
                ],
            })))
            .mount(&server)
            .await;

        let rows = client(&server).await.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].cell(COL_EVENT_ID), "EVT-1");
        assert_eq!(rows[0].cell(COL_START), "8/7/2025, 9:00:00 AM");
        // Ragged row: missing trailing cells are simply absent
        assert_eq!(rows[1].cell(COL_EVENT_NAME), "Planning");
        assert_eq!(rows[1].cell(COL_START), "");
    }

    #[tokio::test]
    async fn skips_fully_empty_rows_but_keeps_numbering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [
                    ["Event ID", "Event Name"],
                    ["", ""],
                    ["EVT-2", "Planning"],
                ],
            })))
            .mount(&server)
            .await;

        let rows = client(&server).await.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 3);
        assert_eq!(rows[0].cell(COL_EVENT_ID), "EVT-2");
    }

    #[tokio::test]
    async fn empty_sheet_yields_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let rows = client(&server).await.fetch_rows().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn api_failure_maps_to_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let err = client(&server).await.fetch_rows().await.unwrap_err();
        assert!(matches!(err, SheetSyncError::Source(_)));
        assert!(err.to_string().contains("backend exploded"));
    }
}

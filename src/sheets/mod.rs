//! Google Sheets backend for submissions.
//!
//! - `credentials`: service-account key parsing
//! - `auth`: access tokens through the JWT bearer grant
//! - `client`: Drive lookup and Sheets append calls

pub mod auth;
pub mod client;
pub mod credentials;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::session::SubmissionRecord;
use crate::sink::{RecordSink, SinkError};

pub use auth::TokenProvider;
pub use client::{SheetsClient, SpreadsheetFile};
pub use credentials::ServiceAccountKey;

/// Appends submissions to the first worksheet of one spreadsheet.
pub struct GoogleSheetSink {
    client: SheetsClient,
    spreadsheet_id: String,
    worksheet: String,
}

impl GoogleSheetSink {
    /// Authorizes the service account and resolves `sheet_name` to its first
    /// worksheet. Any failure here is a startup error.
    pub async fn open(key: ServiceAccountKey, sheet_name: &str) -> Result<Self> {
        let http = reqwest::Client::new();
        let tokens = TokenProvider::new(http.clone(), key)?;
        info!(service_account = %tokens.client_email(), "Using service account");

        Self::connect(SheetsClient::new(http, tokens), sheet_name).await
    }

    /// Resolves `sheet_name` through an already built client.
    pub async fn connect(client: SheetsClient, sheet_name: &str) -> Result<Self> {
        match client.list_spreadsheets().await {
            Ok(files) => {
                let titles: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
                debug!(?titles, "Spreadsheets visible to the service account");
            }
            Err(e) => warn!(error = %e, "Could not list spreadsheets"),
        }

        let file = client
            .find_spreadsheet(sheet_name)
            .await
            .with_context(|| format!("Failed to look up spreadsheet '{sheet_name}'"))?
            .ok_or_else(|| {
                anyhow!(
                    "Spreadsheet '{sheet_name}' not found or not shared with {}",
                    client.client_email()
                )
            })?;

        let worksheet = client
            .first_worksheet_title(&file.id)
            .await
            .with_context(|| format!("Failed to open spreadsheet '{sheet_name}'"))?;

        info!(sheet = %file.name, worksheet = %worksheet, "Connected to spreadsheet");

        Ok(Self {
            client,
            spreadsheet_id: file.id,
            worksheet,
        })
    }
}

#[async_trait]
impl RecordSink for GoogleSheetSink {
    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        self.client
            .append_row(&self.spreadsheet_id, &self.worksheet, record.to_row())
            .await
    }
}

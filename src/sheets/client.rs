//! Thin REST client for the Drive and Sheets endpoints the bot needs.

use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::json;

use super::auth::TokenProvider;
use crate::sink::SinkError;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// A spreadsheet file visible to the service account.
#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<SpreadsheetFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    drive_files_url: String,
    sheets_base_url: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, tokens: TokenProvider) -> Self {
        Self::with_base_urls(http, tokens, DRIVE_FILES_URL, SHEETS_BASE_URL)
    }

    /// Client talking to other Drive/Sheets hosts, e.g. a local stand-in.
    pub fn with_base_urls(
        http: reqwest::Client,
        tokens: TokenProvider,
        drive_files_url: impl Into<String>,
        sheets_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            drive_files_url: drive_files_url.into(),
            sheets_base_url: sheets_base_url.into(),
        }
    }

    pub fn client_email(&self) -> &str {
        self.tokens.client_email()
    }

    /// Every spreadsheet shared with the service account.
    pub async fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetFile>, SinkError> {
        let query = format!("mimeType='{SPREADSHEET_MIME_TYPE}' and trashed=false");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("fields", "nextPageToken,files(id,name)".to_string()),
                ("pageSize", "100".to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page: FileList = self.get_json(&self.drive_files_url, &params).await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    /// Looks up a spreadsheet by its exact title.
    pub async fn find_spreadsheet(&self, name: &str) -> Result<Option<SpreadsheetFile>, SinkError> {
        let query = format!(
            "name='{}' and mimeType='{SPREADSHEET_MIME_TYPE}' and trashed=false",
            escape_query_literal(name)
        );
        let params = [
            ("q", query),
            ("fields", "files(id,name)".to_string()),
            ("pageSize", "1".to_string()),
        ];

        let list: FileList = self.get_json(&self.drive_files_url, &params).await?;
        Ok(list.files.into_iter().next())
    }

    /// Title of the worksheet with the lowest index.
    pub async fn first_worksheet_title(&self, spreadsheet_id: &str) -> Result<String, SinkError> {
        let url = format!("{}/{spreadsheet_id}", self.sheets_base_url);
        let params = [("fields", "sheets.properties(title,index)".to_string())];

        let meta: SpreadsheetMeta = self.get_json(&url, &params).await?;
        meta.sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .min_by_key(|properties| properties.index)
            .map(|properties| properties.title)
            .ok_or_else(|| SinkError::MalformedResponse("spreadsheet has no worksheets".to_string()))
    }

    /// Appends `values` as one row after the last row of `worksheet`.
    pub async fn append_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        values: Vec<String>,
    ) -> Result<(), SinkError> {
        let url = append_url(&self.sheets_base_url, spreadsheet_id, worksheet)?;
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": [values],
            }))
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, SinkError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Turns a non-success response into `SinkError::Api` with the error body.
async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    Err(SinkError::Api {
        status: status.as_u16(),
        message,
    })
}

/// `.../spreadsheets/{id}/values/'{worksheet}'!A1:append`
fn append_url(base: &str, spreadsheet_id: &str, worksheet: &str) -> Result<Url, SinkError> {
    let mut url = Url::parse(base)
        .map_err(|e| SinkError::Request(format!("invalid base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SinkError::Request("base URL cannot have path segments".to_string()))?
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{}!A1:append", a1_sheet_name(worksheet)));
    Ok(url)
}

/// Quotes a worksheet title for A1 notation.
fn a1_sheet_name(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Escapes a string literal inside a Drive `q` expression.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

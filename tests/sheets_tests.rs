//! # Google Sheets backend tests
//!
//! The client, token cache and sink run against a local axum server that
//! stands in for the OAuth, Drive and Sheets endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::{Form, Path, Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use takings_bot::session::{Field, Session, SubmissionRecord};
use takings_bot::sheets::{GoogleSheetSink, ServiceAccountKey, SheetsClient, TokenProvider};
use takings_bot::sink::{RecordSink, SinkError};

const TEST_KEY: &str = include_str!("fixtures/service_account_key.pem");
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// One request received on the append endpoint
#[derive(Debug, Clone)]
struct AppendCall {
    spreadsheet_id: String,
    range: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Default)]
struct StubState {
    token_requests: AtomicUsize,
    appends: Mutex<Vec<AppendCall>>,
    spreadsheets: Vec<Value>,
    fail_listing: bool,
    append_failure: Option<(StatusCode, Value)>,
}

async fn token(State(stub): State<Arc<StubState>>, Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("grant_type").map(String::as_str) != Some(GRANT_TYPE) || !form.contains_key("assertion") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response();
    }
    stub.token_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({"access_token": "stub-token", "expires_in": 3600, "token_type": "Bearer"})).into_response()
}

async fn drive_files(
    State(stub): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let listing_all = params.get("pageSize").map(String::as_str) == Some("100");
    if stub.fail_listing && listing_all {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"message": "Drive listing disabled"}})),
        )
            .into_response();
    }
    Json(json!({"files": stub.spreadsheets})).into_response()
}

async fn spreadsheet_meta(Path(_id): Path<String>) -> Json<Value> {
    Json(json!({"sheets": [
        {"properties": {"title": "Archive", "index": 1}},
        {"properties": {"title": "Takings", "index": 0}}
    ]}))
}

async fn append(
    State(stub): State<Arc<StubState>>,
    Path((spreadsheet_id, range)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.appends.lock().unwrap().push(AppendCall {
        spreadsheet_id,
        range,
        query,
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });

    match &stub.append_failure {
        Some((status, body)) => (*status, Json(body.clone())).into_response(),
        None => Json(json!({"updates": {"updatedRows": 1}})).into_response(),
    }
}

/// Starts the stand-in server and returns its base URL
async fn spawn_stub(stub: Arc<StubState>) -> Result<String> {
    let app = Router::new()
        .route("/token", post(token))
        .route("/drive/files", get(drive_files))
        .route("/sheets/{id}", get(spreadsheet_meta))
        .route("/sheets/{id}/values/{range}", post(append))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{addr}"))
}

fn client_for(base: &str) -> Result<SheetsClient> {
    let key = ServiceAccountKey {
        client_email: "takings@test-project.iam.gserviceaccount.com".to_string(),
        private_key: TEST_KEY.to_string(),
        private_key_id: Some("test-key".to_string()),
        token_uri: format!("{base}/token"),
    };
    let http = reqwest::Client::new();
    let tokens = TokenProvider::new(http.clone(), key)?;
    Ok(SheetsClient::with_base_urls(
        http,
        tokens,
        format!("{base}/drive/files"),
        format!("{base}/sheets"),
    ))
}

fn takings_file() -> Value {
    json!({"id": "sheet-123", "name": "Daily Takings"})
}

fn sample_record() -> SubmissionRecord {
    let mut session = Session::default();
    for (field, value) in Field::ALL.iter().zip(["50", "20", "10", "5", "15"]) {
        session.set(*field, value);
    }
    let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(12, 30, 5)
        .unwrap();
    session.into_record(timestamp, "Sam Taylor").unwrap()
}

#[tokio::test]
async fn test_sink_appends_raw_row_to_first_worksheet() -> Result<()> {
    let stub = Arc::new(StubState {
        spreadsheets: vec![takings_file()],
        ..Default::default()
    });
    let base = spawn_stub(stub.clone()).await?;

    let sink = GoogleSheetSink::connect(client_for(&base)?, "Daily Takings").await?;
    sink.append(&sample_record()).await?;

    let appends = stub.appends.lock().unwrap().clone();
    assert_eq!(appends.len(), 1);
    let call = &appends[0];
    assert_eq!(call.spreadsheet_id, "sheet-123");
    assert_eq!(call.range, "'Takings'!A1:append");
    assert_eq!(call.query.as_deref(), Some("valueInputOption=RAW"));
    assert_eq!(call.authorization.as_deref(), Some("Bearer stub-token"));
    assert_eq!(
        call.body,
        json!({
            "majorDimension": "ROWS",
            "values": [["2024-03-09 12:30:05", "Sam Taylor", "50", "20", "10", "5", "15"]]
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_error_reply_maps_to_api_error() -> Result<()> {
    let stub = Arc::new(StubState {
        append_failure: Some((
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "Quota exceeded for quota metric 'Write requests'"}}),
        )),
        ..Default::default()
    });
    let base = spawn_stub(stub.clone()).await?;
    let client = client_for(&base)?;

    let err = client
        .append_row("sheet-123", "Takings", sample_record().to_row())
        .await
        .unwrap_err();

    match err {
        SinkError::Api { status, message } => {
            assert_eq!(status, 429);
            assert!(message.starts_with("Quota exceeded"));
        }
        other => panic!("Unexpected error: {other}"),
    }
    // One attempt only
    assert_eq!(stub.appends.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_access_token_is_reused_between_appends() -> Result<()> {
    let stub = Arc::new(StubState::default());
    let base = spawn_stub(stub.clone()).await?;
    let client = client_for(&base)?;

    client.append_row("sheet-123", "Takings", sample_record().to_row()).await?;
    client.append_row("sheet-123", "Takings", sample_record().to_row()).await?;

    assert_eq!(stub.appends.lock().unwrap().len(), 2);
    assert_eq!(stub.token_requests.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_connect_fails_when_spreadsheet_is_missing() -> Result<()> {
    let stub = Arc::new(StubState::default());
    let base = spawn_stub(stub).await?;

    let err = match GoogleSheetSink::connect(client_for(&base)?, "Daily Takings").await {
        Ok(_) => panic!("connect should fail without a matching spreadsheet"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("not found"));

    Ok(())
}

#[tokio::test]
async fn test_listing_failure_does_not_block_connect() -> Result<()> {
    let stub = Arc::new(StubState {
        spreadsheets: vec![takings_file()],
        fail_listing: true,
        ..Default::default()
    });
    let base = spawn_stub(stub.clone()).await?;

    let sink = GoogleSheetSink::connect(client_for(&base)?, "Daily Takings").await?;
    sink.append(&sample_record()).await?;

    assert_eq!(stub.appends.lock().unwrap().len(), 1);

    Ok(())
}

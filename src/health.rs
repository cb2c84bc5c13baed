//! Liveness endpoint so the hosting platform can see an open port.

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

/// `/`, `/health` and `/healthz`, all answering `200 OK`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(ok))
        .route("/health", get(ok))
        .route("/healthz", get(ok))
}

async fn ok() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Binds the listener on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Health check server listening");
    Ok(listener)
}

/// Serves the liveness routes in the background for the life of the process.
pub fn spawn(listener: TcpListener) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            error!(error = %e, "Health check server stopped");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_path(path: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_all_routes_answer_ok() {
        for path in ["/", "/health", "/healthz"] {
            let (status, body) = get_path(path).await;
            assert_eq!(status, StatusCode::OK, "path {path}");
            assert_eq!(body, "OK");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = get_path("/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = spawn(listener);

        let body = reqwest::get(format!("http://127.0.0.1:{port}/healthz"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");
        handle.abort();
    }
}

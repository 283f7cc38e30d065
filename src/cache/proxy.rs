//! Offline proxy: Axum server that routes every request through the worker.
//!
//! There are no routes of its own: a single fallback handler accepts any
//! method and path, so the page talks to the proxy exactly as it would to
//! the bot's web server. CORS enabled for local development.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::worker::OfflineCacheWorker;
use super::{CachedResponse, ProxyRequest, RequestKey};

/// Largest request body forwarded upstream (1 MB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

pub type ProxyState = Arc<OfflineCacheWorker>;

/// Build the Axum router with the intercepting fallback and middleware.
pub fn build_router(worker: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .fallback(intercept)
        .layer(cors)
        .with_state(worker)
}

/// Serve the proxy on `port` until `shutdown` resolves.
pub async fn serve<F>(worker: ProxyState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind offline proxy port {port}"))?;

    info!(port, "Offline proxy listening on http://localhost:{port}");

    axum::serve(listener, build_router(worker))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Offline proxy server error")
}

async fn intercept(State(worker): State<ProxyState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let body = match to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Rejecting unreadable request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = ProxyRequest {
        key: RequestKey {
            method: parts.method.as_str().to_string(),
            path_and_query,
        },
        headers,
        body,
    };

    match worker.handle_fetch(&request).await {
        Ok(cached) => to_response(cached),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

fn to_response(cached: CachedResponse) -> Response {
    let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in &cached.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

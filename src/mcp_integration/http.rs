//! Streamable HTTP front end: JSON-RPC over `POST /mcp`.

use super::core::FreshserviceMcpServer;
use super::protocol::{PARSE_ERROR, error_response};
use crate::upstream::Transport;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Routes: `POST /mcp` for JSON-RPC messages, `GET /health` for liveness.
pub fn router<T: Transport + 'static>(server: Arc<FreshserviceMcpServer<T>>) -> Router {
    Router::new()
        .route("/mcp", post(handle_rpc::<T>))
        .route("/health", get(health::<T>))
        .with_state(server)
}

async fn handle_rpc<T: Transport + 'static>(
    State(server): State<Arc<FreshserviceMcpServer<T>>>,
    body: Bytes,
) -> Response {
    let message = match serde_json::from_slice::<Value>(&body) {
        Ok(message) => message,
        Err(error) => {
            warn!("Rejecting unparseable request body: {}", error);
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {error}"),
                )),
            )
                .into_response();
        }
    };

    match server.handle_message(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health<T: Transport + 'static>(
    State(server): State<Arc<FreshserviceMcpServer<T>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "name": server.server_info.name,
        "version": server.server_info.version,
        "tools": server.dispatcher.list_operations().len()
    }))
}

/// Serve the router on `addr` until `shutdown` resolves.
pub async fn serve<T, F>(
    server: Arc<FreshserviceMcpServer<T>>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    T: Transport + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("MCP endpoint listening on http://{}/mcp", listener.local_addr()?);
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}

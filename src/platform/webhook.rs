//! HTTP transport: Telegram pushes updates to `POST /`, operators manage the
//! webhook registration with `GET /?info` and `GET /?setup=<url>`.
//!
//! GET and POST always answer 200 with a JSON body; failures are reported in
//! the body so Telegram never starts redelivering an update. Only unsupported
//! methods get a 405.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::bot::AppState;
use crate::platform::InboundUpdate;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(admin)
                .post(receive_update)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Serve the webhook endpoint until Ctrl-C.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Webhook server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down webhook server");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn admin(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if params.contains_key("info") {
        return Json(admin_result(state.telegram.webhook_info().await, "getWebhookInfo"));
    }

    if let Some(setup) = params.get("setup") {
        // `?setup=1&url=<hook>` is accepted alongside `?setup=<hook>`.
        let url = params
            .get("url")
            .filter(|url| !url.is_empty())
            .unwrap_or(setup);
        return Json(admin_result(state.telegram.set_webhook(url).await, "setWebhook"));
    }

    Json(json!({
        "status": "ok",
        "message": "Telegram Bot API is running. Use POST for webhook or GET with parameters for setup."
    }))
}

fn admin_result(result: Result<Value>, operation: &str) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{} failed: {:#}", operation, e);
            json!({ "error": format!("{:#}", e) })
        }
    }
}

async fn receive_update(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<Value> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Rejected unreadable update body: {}", e.body_text());
            return Json(json!({ "error": e.body_text() }));
        }
    };

    let update = match decode_update(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejected malformed update: {:#}", e);
            return Json(json!({ "error": format!("{:#}", e) }));
        }
    };

    match state.dispatcher.dispatch(&update).await {
        Ok(_) => Json(json!({ "status": "ok" })),
        Err(e) => {
            error!("Failed to handle update {:?}: {:#}", update.update_id, e);
            Json(json!({ "status": "error", "error": format!("{:#}", e) }))
        }
    }
}

/// Updates are JSON objects; arrays and scalars are rejected rather than
/// decoded field-by-position.
fn decode_update(body: &[u8]) -> Result<InboundUpdate> {
    let value: Value = serde_json::from_slice(body).context("Invalid JSON body")?;
    if !value.is_object() {
        anyhow::bail!("Update must be a JSON object");
    }
    serde_json::from_value(value).context("Invalid update")
}

async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

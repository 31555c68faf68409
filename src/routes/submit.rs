use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{metadata, parser, pipeline};

pub async fn submit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            tracing::debug!("Unreadable request body: {}", rejection.body_text());
            AppError::InvalidPayload
        }
    })?;

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    let payload = parser::parse_body(content_type, &body)?;

    let ip = metadata::client_ip(&headers, addr.ip(), &state.config.trusted_proxies);

    let result = pipeline::run(&state, payload, ip).await?;
    if result.notification_scheduled {
        tracing::debug!("Notification scheduled for submission at {}", result.record.received_at_iso());
    }

    Ok(Json(json!({ "ok": true })))
}

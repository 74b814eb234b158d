// src/handlers/webhook.rs

use crate::{
    errors::{AppError, AppResult},
    models::IuguWebhook,
    services::invoicing::InvoiceService,
    state::AppState,
};
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tracing::info;

const STATUS_CHANGED: &str = "invoice.status_changed";

fn token_matches(given: &str, expected: &str) -> bool {
    given.len() == expected.len() && bool::from(given.as_bytes().ct_eq(expected.as_bytes()))
}

/// Iugu invoice notifications. Only status changes are acted on.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/iugu",
    request_body(content = IuguWebhook, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Notification accepted"),
        (status = 401, description = "Webhook token mismatch"),
        (status = 404, description = "No invoice for this charge"),
    ),
    tag = "Webhooks"
)]
pub async fn iugu_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(body): Form<IuguWebhook>,
) -> AppResult<Json<Value>> {
    if let Some(expected) = state.config.iugu_webhook_token.as_deref() {
        let given = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !token_matches(given, expected) {
            return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
        }
    }

    if body.event != STATUS_CHANGED {
        info!(event = %body.event, "Iugu event ignored");
        return Ok(Json(json!({ "received": true, "applied": false })));
    }

    let (Some(gateway_id), Some(status)) = (body.data_id.as_deref(), body.data_status.as_deref())
    else {
        return Err(AppError::Validation(
            "data[id] and data[status] are required".to_string(),
        ));
    };

    let updated =
        InvoiceService::apply_gateway_status(state.repo.as_ref(), gateway_id, status).await?;

    Ok(Json(json!({
        "received": true,
        "applied": updated.is_some(),
    })))
}

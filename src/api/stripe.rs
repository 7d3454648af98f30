//! Payment provider routes: quote checkout and the webhook endpoint

use super::{AppState, Json};
use crate::{
    core::checkout::{self, QuoteRequest},
    errors::Result,
    payments::webhook::{self, Outcome, WebhookEvent},
};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/stripe/create-session
pub async fn create_session(
    State(state): State<AppState>,
    Json(quote): Json<QuoteRequest>,
) -> Result<Json<Value>> {
    let url = checkout::quote_checkout(
        &state.db,
        state.gateway.as_ref(),
        &state.config.store,
        &quote,
    )
    .await?;
    Ok(Json(json!({ "url": url })))
}

fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// POST /api/stripe/webhook
///
/// Answers 400 for unsigned or mis-signed deliveries and 500 when the event
/// could not be applied, so the provider redelivers it.
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Webhook delivered without a signature header");
        return reject(StatusCode::BAD_REQUEST, "Missing stripe-signature header");
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = webhook::verify_signature(
        &body,
        signature,
        &state.config.secrets.stripe_webhook_secret,
        now,
    ) {
        tracing::warn!("Webhook signature rejected: {e}");
        return reject(StatusCode::BAD_REQUEST, format!("Webhook Error: {e}"));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Webhook payload is not an event: {e}");
            return reject(StatusCode::BAD_REQUEST, format!("Webhook Error: {e}"));
        }
    };

    match webhook::process_event(&state.db, state.gateway.as_ref(), &event).await {
        Ok(Outcome::Processed | Outcome::Duplicate) => Json(json!({ "received": true })).into_response(),
        Err(e) => {
            tracing::error!(event_id = %event.id, event_type = %event.kind, "Webhook handler failed: {e}");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Webhook handler failed")
        }
    }
}

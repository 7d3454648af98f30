//! Payment provider webhooks - Signature verification and event dispatch.
//!
//! Events move orders between statuses. Each event id is stored in
//! `processed_webhook_events` once its handler succeeded, so redeliveries
//! are acknowledged without side effects while failed events stay eligible
//! for the provider's retries.

use super::PaymentGateway;
use crate::{
    core::{cart, order, order::OrderStatus},
    entities::{ProcessedWebhookEvent, ProcessedWebhookEventColumn, processed_webhook_event},
    errors::{Error, Result},
};
use hmac::{Hmac, Mac};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

/// Maximum age, in seconds, of a signed webhook timestamp
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

fn signed_mac(payload: &[u8], secret: &str, timestamp: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::Webhook {
        reason: "HMAC key error".to_string(),
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Builds a `stripe-signature` header value for `payload`.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mac = signed_mac(payload, secret, &timestamp.to_string())?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn rejected(reason: &str) -> Error {
    Error::Webhook {
        reason: reason.to_string(),
    }
}

/// Verifies a `stripe-signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex>`
/// entries; any matching `v1` entry is accepted. Comparison is constant
/// time.
///
/// # Errors
/// Returns `Error::Webhook` when the header is malformed, no signature
/// matches, or the timestamp is more than five minutes away from `now`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| rejected("Missing timestamp in signature header"))?;
    if signatures.is_empty() {
        return Err(rejected("No v1 signature in signature header"));
    }

    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        signed_mac(payload, secret, timestamp).is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
    });
    if !matched {
        return Err(rejected("Webhook signature mismatch"));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| rejected("Invalid timestamp"))?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(rejected("Webhook timestamp outside tolerance"));
    }
    Ok(())
}

/// A provider event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// What happened to a delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Duplicate,
}

async fn already_processed(db: &DatabaseConnection, event_id: &str) -> Result<bool> {
    let found = ProcessedWebhookEvent::find_by_id(event_id.to_string())
        .one(db)
        .await?;
    Ok(found.is_some())
}

async fn mark_processed(db: &DatabaseConnection, event: &WebhookEvent) -> Result<()> {
    let row = processed_webhook_event::ActiveModel {
        event_id: Set(event.id.clone()),
        event_type: Set(event.kind.clone()),
        processed_at: Set(chrono::Utc::now().naive_utc()),
    };
    ProcessedWebhookEvent::insert(row)
        .on_conflict(
            OnConflict::column(ProcessedWebhookEventColumn::EventId)
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(db)
        .await?;
    Ok(())
}

fn str_field<'a>(object: &'a Value, field: &str) -> Option<&'a str> {
    object[field].as_str().filter(|s| !s.is_empty())
}

fn session_id_from_metadata(object: &Value) -> Option<&str> {
    object["metadata"]["sessionId"]
        .as_str()
        .filter(|s| !s.is_empty())
}

/// checkout.session.completed: order paid, payment intent stored, cart emptied
async fn session_completed(db: &DatabaseConnection, session: &Value) -> Result<()> {
    let Some(session_id) = str_field(session, "id") else {
        tracing::error!("Completed checkout session without id");
        return Ok(());
    };
    let email = str_field(session, "customer_email")
        .or_else(|| session["customer_details"]["email"].as_str());
    if email.is_none() {
        tracing::error!(session_id, "Completed checkout session without customer email");
        return Ok(());
    }

    let payment_intent = str_field(session, "payment_intent");
    let updated =
        order::update_status_by_session(db, session_id, OrderStatus::Paid, payment_intent).await?;

    if let Some(user_id) = updated.and_then(|o| o.user_id) {
        let removed = cart::clear_cart(db, &user_id).await?;
        tracing::info!(%user_id, removed, "Cleared cart after payment");
    }
    Ok(())
}

async fn status_from_intent(db: &DatabaseConnection, intent: &Value, status: OrderStatus) -> Result<()> {
    let Some(session_id) = session_id_from_metadata(intent) else {
        tracing::error!(
            payment_intent = str_field(intent, "id"),
            "Payment intent without sessionId metadata"
        );
        return Ok(());
    };
    order::update_status_by_session(db, session_id, status, None).await?;
    Ok(())
}

async fn session_expired(db: &DatabaseConnection, session: &Value) -> Result<()> {
    let Some(session_id) = str_field(session, "id") else {
        tracing::error!("Expired checkout session without id");
        return Ok(());
    };
    order::update_status_by_session(db, session_id, OrderStatus::Expired, None).await?;
    Ok(())
}

async fn charge_refunded(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    charge: &Value,
) -> Result<()> {
    let Some(intent_id) = str_field(charge, "payment_intent") else {
        tracing::error!(charge = str_field(charge, "id"), "Refunded charge without payment intent");
        return Ok(());
    };
    let intent = gateway.retrieve_payment_intent(intent_id).await?;
    let Some(session_id) = intent.metadata.get("sessionId").filter(|s| !s.is_empty()) else {
        tracing::error!(payment_intent = intent_id, "Payment intent without sessionId metadata");
        return Ok(());
    };
    order::update_status_by_session(db, session_id, OrderStatus::Refunded, None).await?;
    Ok(())
}

/// Applies a verified event unless it was already processed.
///
/// # Errors
/// Propagates database and provider errors; the event is then left
/// unrecorded so a redelivery runs it again.
pub async fn process_event(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    event: &WebhookEvent,
) -> Result<Outcome> {
    if already_processed(db, &event.id).await? {
        tracing::info!(event_id = %event.id, "Duplicate webhook event, skipping");
        return Ok(Outcome::Duplicate);
    }

    tracing::info!(event_id = %event.id, event_type = %event.kind, "Processing webhook event");
    let object = &event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => session_completed(db, object).await?,
        "payment_intent.succeeded" => status_from_intent(db, object, OrderStatus::Paid).await?,
        "payment_intent.payment_failed" => {
            status_from_intent(db, object, OrderStatus::PaymentFailed).await?;
        }
        "checkout.session.expired" => session_expired(db, object).await?,
        "charge.refunded" => charge_refunded(db, gateway, object).await?,
        other => tracing::debug!(event_type = other, "Unhandled webhook event type"),
    }

    mark_processed(db, event).await?;
    Ok(Outcome::Processed)
}

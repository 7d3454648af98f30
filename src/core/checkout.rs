//! Checkout business logic - Turns carts and quotes into hosted checkout
//! sessions.
//!
//! Both flows create a `pending` order first, then the provider session, and
//! finally store the session id on the order so webhook events can find it.

use crate::{
    config::app::StoreConfig,
    core::{
        RequestMeta, cart,
        order::{self, NewOrder},
        security_log,
        validation::{self, to_cents},
    },
    entities::UserModel,
    errors::{Error, Result},
    media::MediaStore,
    payments::{CheckoutSessionRequest, LineItem, PaymentGateway},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

/// Longest product description forwarded to the hosted page
const MAX_LINE_DESCRIPTION: usize = 500;

/// Input of the quote checkout route
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Quoted price in dollars
    #[serde(deserialize_with = "number_or_text")]
    pub price: Option<f64>,
    pub filename: Option<String>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub volume_cm3: Option<f64>,
}

/// Quote forms post numbers either as JSON numbers or as strings
fn number_or_text<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {text}"))),
    }
}

fn expiry(store: &StoreConfig) -> i64 {
    chrono::Utc::now().timestamp() + store.checkout_expiry_minutes * 60
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Creates a pending order from the user's cart and opens a hosted checkout
/// session for it. Returns the URL of the hosted page.
///
/// # Errors
/// Returns a validation error for an empty cart and `Payment` when the
/// provider rejects the session.
pub async fn checkout_cart(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    store: &StoreConfig,
    media: &MediaStore,
    user: &UserModel,
    meta: &RequestMeta,
) -> Result<String> {
    let lines = cart::get_cart(db, &user.id).await?;
    if lines.is_empty() {
        return Err(Error::validation("Your cart is empty."));
    }
    let total = cart::cart_total(&lines);

    let snapshot: Vec<serde_json::Value> = lines
        .iter()
        .map(|line| {
            json!({
                "productId": line.product_id,
                "name": line.product.name,
                "price": line.product.price,
                "quantity": line.quantity,
            })
        })
        .collect();

    let order = order::create_pending_order(
        db,
        NewOrder {
            user_id: Some(user.id.clone()),
            customer_email: Some(user.email.clone()),
            cart_json: json!(snapshot),
            total,
            currency: store.currency.clone(),
        },
    )
    .await?;

    let line_items = lines
        .iter()
        .map(|line| LineItem {
            name: line.product.name.clone(),
            description: Some(truncate(&line.product.description, MAX_LINE_DESCRIPTION)),
            images: line
                .image
                .as_deref()
                .and_then(|image| media.cdn_url_for(image))
                .into_iter()
                .collect(),
            unit_amount: to_cents(line.product.price),
            quantity: i64::from(line.quantity),
        })
        .collect();

    let metadata = vec![
        ("orderId".to_string(), order.id.to_string()),
        ("userId".to_string(), user.id.clone()),
    ];
    let site_url = store.site_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        line_items,
        currency: store.currency.clone(),
        success_url: format!("{site_url}/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{site_url}/cancel"),
        customer_email: Some(user.email.clone()),
        metadata: metadata.clone(),
        shipping_countries: store.shipping_countries.clone(),
        require_billing_address: true,
        allow_promotion_codes: true,
        expires_at: Some(expiry(store)),
    };

    let session = gateway.create_checkout_session(&request).await?;
    order::attach_session(db, order.id, &session.id).await?;

    security_log::record(
        db,
        security_log::events::ORDER_CREATED,
        &user.id,
        json!({
            "orderId": order.id,
            "stripeSessionId": session.id,
            "totalAmount": total,
            "itemCount": lines.len(),
        }),
        meta,
    )
    .await;

    if let Some(payment_intent) = &session.payment_intent {
        let mut intent_metadata = metadata;
        intent_metadata.push(("sessionId".to_string(), session.id.clone()));
        if let Err(e) = gateway
            .update_payment_intent_metadata(payment_intent, &intent_metadata)
            .await
        {
            tracing::warn!(order_id = order.id, "Failed to update payment intent metadata: {}", e);
        }
    }

    tracing::info!(order_id = order.id, session_id = %session.id, "Checkout session created");
    session.url.ok_or_else(|| Error::Payment {
        message: "Checkout session has no URL".to_string(),
    })
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation(format!("Missing required field: {field}")))
}

/// Opens a one-line checkout session for a 3D print quote and records a
/// guest `pending` order. Returns the URL of the hosted page.
///
/// # Errors
/// Returns a validation error naming the first missing field among
/// `firstName`, `lastName`, `email`, `price` and `filename`, or for an
/// invalid email or price.
pub async fn quote_checkout(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    store: &StoreConfig,
    quote: &QuoteRequest,
) -> Result<String> {
    let first_name = required(quote.first_name.as_deref(), "firstName")?;
    let last_name = required(quote.last_name.as_deref(), "lastName")?;
    let email = validation::sanitize_email(required(quote.email.as_deref(), "email")?);
    let price = quote
        .price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| Error::validation("Missing required field: price"))?;
    let filename = required(quote.filename.as_deref(), "filename")?;

    if !validation::is_valid_email(&email) {
        return Err(Error::validation("Invalid email address"));
    }
    validation::check_amount(price)?;

    let material = quote.material.as_deref().filter(|m| !m.is_empty()).unwrap_or("PLA");
    let color = quote.color.as_deref().filter(|c| !c.is_empty()).unwrap_or("Default");

    let order = order::create_pending_order(
        db,
        NewOrder {
            user_id: None,
            customer_email: Some(email.clone()),
            cart_json: json!({
                "filename": filename,
                "material": material,
                "color": color,
                "volumeCm3": quote.volume_cm3,
            }),
            total: price,
            currency: store.currency.clone(),
        },
    )
    .await?;

    let site_url = store.site_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        line_items: vec![LineItem {
            name: format!("3D Print: {filename}"),
            description: Some(format!("Material: {material}, Color: {color}")),
            images: Vec::new(),
            unit_amount: to_cents(price),
            quantity: 1,
        }],
        currency: store.currency.clone(),
        success_url: format!("{site_url}/success"),
        cancel_url: format!("{site_url}/3dprint"),
        customer_email: Some(email),
        metadata: vec![
            ("orderId".to_string(), order.id.to_string()),
            ("filename".to_string(), filename.to_string()),
            ("firstName".to_string(), first_name.to_string()),
            ("lastName".to_string(), last_name.to_string()),
            ("city".to_string(), quote.city.clone().unwrap_or_default()),
            (
                "volume".to_string(),
                quote.volume_cm3.map(|v| v.to_string()).unwrap_or_default(),
            ),
        ],
        shipping_countries: Vec::new(),
        require_billing_address: false,
        allow_promotion_codes: false,
        expires_at: None,
    };

    let session = gateway.create_checkout_session(&request).await?;
    order::attach_session(db, order.id, &session.id).await?;

    tracing::info!(order_id = order.id, session_id = %session.id, "Quote checkout session created");
    session.url.ok_or_else(|| Error::Payment {
        message: "Checkout session has no URL".to_string(),
    })
}

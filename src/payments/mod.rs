//! Payment provider integration.
//!
//! The storefront talks to its payment provider through the
//! [`PaymentGateway`] trait. [`stripe::StripeClient`] implements it over the
//! Stripe REST API; tests substitute a recording fake. Amounts crossing this
//! boundary are in the provider's smallest currency unit (cents).

pub mod stripe;
pub mod webhook;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of a hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    /// Public image URLs shown on the hosted page
    pub images: Vec<String>,
    /// Price per unit in cents
    pub unit_amount: i64,
    pub quantity: i64,
}

/// Parameters of a hosted checkout session in payment mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    /// Lowercase ISO currency code
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    /// Copied onto both the session and its payment intent
    pub metadata: Vec<(String, String)>,
    /// Two-letter country codes accepted for shipping; empty skips
    /// shipping address collection
    pub shipping_countries: Vec<String>,
    pub require_billing_address: bool,
    pub allow_promotion_codes: bool,
    /// Unix timestamp after which the session expires
    pub expires_at: Option<i64>,
}

/// A created checkout session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the buyer is redirected to
    pub url: Option<String>,
    pub payment_intent: Option<String>,
}

/// A payment intent as far as the storefront cares
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A created refund
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    /// Refunded amount in cents
    pub amount: i64,
}

/// A provider coupon
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Coupon {
    pub id: String,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    /// Fixed discount in cents
    pub amount_off: Option<i64>,
    pub currency: Option<String>,
    /// `once`, `repeating` or `forever`
    pub duration: String,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    #[serde(default)]
    pub times_redeemed: i64,
    #[serde(default)]
    pub valid: bool,
    pub created: i64,
    pub redeem_by: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One page of provider coupons
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CouponList {
    pub data: Vec<Coupon>,
    pub has_more: bool,
}

/// Parameters of a new provider coupon
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCoupon {
    pub id: String,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    /// Fixed discount in cents
    pub amount_off: Option<i64>,
    /// Lowercase ISO currency code, required with `amount_off`
    pub currency: Option<String>,
    pub duration: String,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub redeem_by: Option<i64>,
    pub metadata: HashMap<String, String>,
}

/// An account balance entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalanceAmount {
    /// Amount in cents
    pub amount: i64,
    pub currency: String,
}

/// A balance transaction (charges, refunds, payouts...)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalanceTransaction {
    pub id: String,
    /// Gross amount in cents
    pub amount: i64,
    pub currency: String,
    /// Unix timestamp
    pub created: i64,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Operations the storefront needs from its payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession>;

    /// Merges `metadata` into a payment intent's metadata.
    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        metadata: &[(String, String)],
    ) -> Result<()>;

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent>;

    /// Refunds a payment intent in full.
    async fn create_refund(&self, payment_intent_id: &str) -> Result<Refund>;

    async fn list_coupons(&self, limit: u32) -> Result<CouponList>;

    async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon>;

    async fn delete_coupon(&self, coupon_id: &str) -> Result<()>;

    /// Available balance entries, one per currency.
    async fn available_balance(&self) -> Result<Vec<BalanceAmount>>;

    /// Most recent charge balance transactions.
    async fn list_charge_transactions(&self, limit: u32) -> Result<Vec<BalanceTransaction>>;

    /// Number of customers, counting at most `limit`.
    async fn count_customers(&self, limit: u32) -> Result<usize>;
}

//! Stripe integration via REST API (no SDK dependency)
//!
//! Requests are form encoded with Stripe's bracket notation for nested
//! fields (`line_items[0][price_data][currency]`) and authenticated with the
//! secret key as the basic-auth user.

use super::{
    BalanceAmount, BalanceTransaction, CheckoutSession, CheckoutSessionRequest, Coupon,
    CouponList, NewCoupon, PaymentGateway, PaymentIntent, Refund,
};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, de::DeserializeOwned};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    available: Vec<BalanceAmount>,
}

impl StripeClient {
    /// Creates a client for the live Stripe API.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: API_BASE.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            tracing::warn!(%status, "Stripe request failed: {}", message);
            return Err(Error::Payment { message });
        }
        serde_json::from_value(body).map_err(Into::into)
    }
}

/// Builds the form fields of a payment-mode checkout session.
#[must_use]
pub fn checkout_session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
    ];
    if request.require_billing_address {
        form.push(("billing_address_collection".into(), "required".into()));
    }
    if request.allow_promotion_codes {
        form.push(("allow_promotion_codes".into(), "true".into()));
    }
    if let Some(expires_at) = request.expires_at {
        form.push(("expires_at".into(), expires_at.to_string()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), request.currency.clone()));
        form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
        if let Some(description) = item.description.as_ref().filter(|d| !d.is_empty()) {
            form.push((
                format!("{prefix}[price_data][product_data][description]"),
                description.clone(),
            ));
        }
        for (j, url) in item.images.iter().enumerate() {
            form.push((format!("{prefix}[price_data][product_data][images][{j}]"), url.clone()));
        }
        form.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".into(), email.clone()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }
    for (i, country) in request.shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }
    form
}

/// Builds the form fields of a new coupon.
#[must_use]
pub fn coupon_form(coupon: &NewCoupon) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("id".into(), coupon.id.clone()),
        ("duration".into(), coupon.duration.clone()),
    ];
    let optional = [
        ("name", coupon.name.clone()),
        ("percent_off", coupon.percent_off.map(|p| p.to_string())),
        ("amount_off", coupon.amount_off.map(|a| a.to_string())),
        ("currency", coupon.currency.clone()),
        ("duration_in_months", coupon.duration_in_months.map(|m| m.to_string())),
        ("max_redemptions", coupon.max_redemptions.map(|m| m.to_string())),
        ("redeem_by", coupon.redeem_by.map(|r| r.to_string())),
    ];
    form.extend(
        optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v))),
    );
    let mut metadata: Vec<_> = coupon.metadata.iter().collect();
    metadata.sort();
    form.extend(
        metadata
            .into_iter()
            .map(|(k, v)| (format!("metadata[{k}]"), v.clone())),
    );
    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        let form = checkout_session_form(request);
        self.send(self.http.post(self.url("checkout/sessions")).form(&form))
            .await
    }

    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        metadata: &[(String, String)],
    ) -> Result<()> {
        let form: Vec<(String, String)> = metadata
            .iter()
            .map(|(k, v)| (format!("metadata[{k}]"), v.clone()))
            .collect();
        let _: PaymentIntent = self
            .send(
                self.http
                    .post(self.url(&format!("payment_intents/{payment_intent_id}")))
                    .form(&form),
            )
            .await?;
        Ok(())
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        self.send(
            self.http
                .get(self.url(&format!("payment_intents/{payment_intent_id}"))),
        )
        .await
    }

    async fn create_refund(&self, payment_intent_id: &str) -> Result<Refund> {
        self.send(
            self.http
                .post(self.url("refunds"))
                .form(&[("payment_intent", payment_intent_id)]),
        )
        .await
    }

    async fn list_coupons(&self, limit: u32) -> Result<CouponList> {
        self.send(
            self.http
                .get(self.url("coupons"))
                .query(&[("limit", limit.to_string())]),
        )
        .await
    }

    async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon> {
        let form = coupon_form(coupon);
        self.send(self.http.post(self.url("coupons")).form(&form))
            .await
    }

    async fn delete_coupon(&self, coupon_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .send(self.http.delete(self.url(&format!("coupons/{coupon_id}"))))
            .await?;
        Ok(())
    }

    async fn available_balance(&self) -> Result<Vec<BalanceAmount>> {
        let balance: BalanceResponse = self.send(self.http.get(self.url("balance"))).await?;
        Ok(balance.available)
    }

    async fn list_charge_transactions(&self, limit: u32) -> Result<Vec<BalanceTransaction>> {
        let list: ListResponse<BalanceTransaction> = self
            .send(
                self.http
                    .get(self.url("balance_transactions"))
                    .query(&[("type", "charge".to_string()), ("limit", limit.to_string())]),
            )
            .await?;
        Ok(list.data)
    }

    async fn count_customers(&self, limit: u32) -> Result<usize> {
        let list: ListResponse<serde_json::Value> = self
            .send(
                self.http
                    .get(self.url("customers"))
                    .query(&[("limit", limit.to_string())]),
            )
            .await?;
        Ok(list.data.len())
    }
}

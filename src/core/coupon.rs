//! Coupon management - Admin CRUD over payment provider coupons.
//!
//! Coupons live only at the provider; the coupon id doubles as the code
//! customers type at checkout. Amounts are dollars on this side and cents
//! on the provider side.

use crate::{
    core::{RequestMeta, security_log, validation},
    errors::{Error, Result},
    payments::{Coupon, NewCoupon, PaymentGateway},
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// How long a coupon keeps applying to a subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponDuration {
    #[default]
    Once,
    Forever,
    Repeating,
}

impl CouponDuration {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Forever => "forever",
            Self::Repeating => "repeating",
        }
    }
}

/// A coupon as shown in the admin panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponView {
    pub id: String,
    /// Falls back to the id
    pub name: String,
    pub code: String,
    pub percent_off: Option<f64>,
    /// Fixed discount in dollars
    pub amount_off: Option<f64>,
    pub currency: Option<String>,
    pub duration: String,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub times_redeemed: i64,
    pub valid: bool,
    pub created: Option<DateTime<Utc>>,
    pub redeem_by: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

impl From<Coupon> for CouponView {
    fn from(c: Coupon) -> Self {
        Self {
            name: c.name.filter(|n| !n.is_empty()).unwrap_or_else(|| c.id.clone()),
            code: c.id.clone(),
            percent_off: c.percent_off,
            amount_off: c.amount_off.map(validation::from_cents),
            currency: c.currency,
            duration: c.duration,
            duration_in_months: c.duration_in_months,
            max_redemptions: c.max_redemptions,
            times_redeemed: c.times_redeemed,
            valid: c.valid,
            created: timestamp(c.created),
            redeem_by: c.redeem_by.and_then(timestamp),
            metadata: c.metadata,
            id: c.id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPage {
    pub data: Vec<CouponView>,
    pub has_more: bool,
}

/// Lists provider coupons.
pub async fn list_coupons(gateway: &dyn PaymentGateway, limit: Option<u32>) -> Result<CouponPage> {
    let list = gateway
        .list_coupons(limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(CouponPage {
        data: list.data.into_iter().map(CouponView::from).collect(),
        has_more: list.has_more,
    })
}

/// Admin input for a new coupon
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    /// Code customers enter
    pub id: String,
    pub name: Option<String>,
    pub percent_off: Option<f64>,
    /// Fixed discount in dollars
    pub amount_off: Option<f64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub duration: CouponDuration,
    pub duration_in_months: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub redeem_by: Option<DateTime<Utc>>,
    pub metadata: Option<HashMap<String, String>>,
}

impl CouponInput {
    /// Checks the input and converts it to provider parameters.
    fn into_new_coupon(self) -> Result<NewCoupon> {
        let id = self.id.trim().to_string();
        validation::check_length("Coupon code", &id, 1, 50)?;

        if let Some(percent) = self.percent_off {
            if !(0.0..=100.0).contains(&percent) {
                return Err(Error::validation("percentOff must be between 0 and 100"));
            }
        }
        if self.amount_off.is_some_and(|a| a < 0.0) {
            return Err(Error::validation("amountOff must not be negative"));
        }

        let percent_off = self.percent_off.filter(|p| *p > 0.0);
        let amount_off = self.amount_off.filter(|a| *a > 0.0);
        if percent_off.is_none() && amount_off.is_none() {
            return Err(Error::validation(
                "Either percentOff or amountOff must be provided",
            ));
        }

        let currency = self.currency.map(|c| c.trim().to_lowercase());
        if let Some(currency) = &currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::validation("Currency must be a 3-letter code"));
            }
        }
        if amount_off.is_some() && currency.is_none() {
            return Err(Error::validation(
                "Currency is required when amountOff is provided",
            ));
        }

        let duration_in_months = match self.duration {
            CouponDuration::Repeating => {
                let months = self.duration_in_months.ok_or_else(|| {
                    Error::validation("durationInMonths is required when duration is repeating")
                })?;
                if !(1..=12).contains(&months) {
                    return Err(Error::validation("durationInMonths must be between 1 and 12"));
                }
                Some(months)
            }
            _ => None,
        };

        if self.max_redemptions.is_some_and(|m| m < 1) {
            return Err(Error::validation("maxRedemptions must be at least 1"));
        }

        // A percentage wins when both discounts are given
        let (amount_off, currency) = match percent_off {
            Some(_) => (None, None),
            None => (amount_off.map(validation::to_cents), currency),
        };

        Ok(NewCoupon {
            id,
            name: self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            percent_off,
            amount_off,
            currency,
            duration: self.duration.as_str().to_string(),
            duration_in_months,
            max_redemptions: self.max_redemptions,
            redeem_by: self.redeem_by.map(|d| d.timestamp()),
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

/// Creates a provider coupon and records `COUPON_CREATED`.
///
/// # Errors
/// Returns a validation error when the input breaks a coupon rule and
/// `Payment` when the provider rejects the coupon.
pub async fn create_coupon(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    admin_id: &str,
    input: CouponInput,
    meta: &RequestMeta,
) -> Result<CouponView> {
    let params = input.into_new_coupon()?;
    let coupon = gateway.create_coupon(&params).await?;

    tracing::info!(coupon_id = %coupon.id, "Coupon created");
    security_log::record(
        db,
        security_log::events::COUPON_CREATED,
        admin_id,
        json!({ "couponId": coupon.id }),
        meta,
    )
    .await;
    Ok(coupon.into())
}

/// Deletes a provider coupon and records `COUPON_DELETED`.
pub async fn delete_coupon(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    admin_id: &str,
    coupon_id: &str,
    meta: &RequestMeta,
) -> Result<()> {
    if coupon_id.trim().is_empty() {
        return Err(Error::validation("Coupon id is required"));
    }
    gateway.delete_coupon(coupon_id).await?;

    security_log::record(
        db,
        security_log::events::COUPON_DELETED,
        admin_id,
        json!({ "couponId": coupon_id }),
        meta,
    )
    .await;
    Ok(())
}

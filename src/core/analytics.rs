//! Dashboard analytics - Provider revenue figures plus database counts.

use crate::{
    core::validation,
    entities::{Order, Product, Review, ReviewColumn, User},
    errors::Result,
    payments::{BalanceTransaction, PaymentGateway},
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use sea_orm::{
    QuerySelect,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Charge transactions and customers fetched from the provider per request
pub const PROVIDER_FETCH_LIMIT: u32 = 100;

/// Optional inclusive date range applied to revenue
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start_date.is_none_or(|start| day >= start) && self.end_date.is_none_or(|end| day <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    /// First available balance entry, in dollars
    pub total: f64,
    /// Charge totals in dollars keyed by `YYYY-MM`
    pub by_month: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Total {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTotals {
    pub total: u64,
    pub average_rating: f64,
}

/// Figures shown on the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub revenue: Revenue,
    pub customers: Total,
    pub products: Total,
    pub reviews: ReviewTotals,
    pub users: Total,
    pub orders: Total,
}

pub(crate) fn created_at(txn: &BalanceTransaction) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(txn.created, 0).single()
}

/// Sums charge amounts (in dollars) per calendar month of their creation.
#[must_use]
pub fn revenue_by_month(transactions: &[BalanceTransaction], range: &DateRange) -> BTreeMap<String, f64> {
    let mut months = BTreeMap::new();
    for txn in transactions {
        let Some(at) = created_at(txn) else { continue };
        if !range.contains(at) {
            continue;
        }
        let key = format!("{}-{:02}", at.year(), at.month());
        *months.entry(key).or_insert(0.0) += validation::from_cents(txn.amount);
    }
    months
}

/// Mean rating across all reviews, 0 when there are none.
pub async fn global_average_rating<C: ConnectionTrait>(conn: &C) -> Result<f64> {
    let average = Review::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(ReviewColumn::Rating))),
            "average",
        )
        .into_tuple::<Option<f64>>()
        .one(conn)
        .await?
        .flatten()
        .unwrap_or(0.0);
    Ok(average)
}

/// Collects dashboard analytics.
///
/// # Errors
/// Returns `Payment` when any provider call fails and `Database` when a
/// count query fails.
pub async fn analytics(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    range: &DateRange,
) -> Result<Analytics> {
    let balance = gateway.available_balance().await?;
    let customers = gateway.count_customers(PROVIDER_FETCH_LIMIT).await?;
    let charges = gateway
        .list_charge_transactions(PROVIDER_FETCH_LIMIT)
        .await?;

    let products = Product::find().count(db).await?;
    let reviews = Review::find().count(db).await?;
    let users = User::find().count(db).await?;
    let orders = Order::find().count(db).await?;
    let average_rating = global_average_rating(db).await?;

    Ok(Analytics {
        revenue: Revenue {
            total: balance
                .first()
                .map_or(0.0, |b| validation::from_cents(b.amount)),
            by_month: revenue_by_month(&charges, range),
        },
        customers: Total {
            total: customers as u64,
        },
        products: Total { total: products },
        reviews: ReviewTotals {
            total: reviews,
            average_rating,
        },
        users: Total { total: users },
        orders: Total { total: orders },
    })
}

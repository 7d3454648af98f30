//! Report generation business logic.
//!
//! This module builds the admin sales and product reports. Sales figures
//! come from the payment provider's charge transactions; orders, products
//! and review statistics come from the database. All functions return
//! structured data that the API layer serializes as-is.

use crate::{
    core::{analytics, validation},
    entities::{Order, OrderColumn, Product, ProductColumn, ProductModel, Review, ReviewColumn},
    errors::Result,
    payments::PaymentGateway,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{
    QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::Serialize;
use std::collections::HashMap;

/// Orders and products included in a report
pub const REPORT_ROW_LIMIT: u64 = 100;

/// One charge in the sales report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueLine {
    pub date: Option<DateTime<Utc>>,
    /// Amount in dollars
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
}

/// One order in the sales report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub status: String,
    pub total: f64,
    pub created_at: NaiveDateTime,
}

/// Recent charges and orders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub revenue: Vec<RevenueLine>,
    pub orders: Vec<OrderLine>,
}

/// Generates the sales report from the latest provider charges and the
/// latest orders.
///
/// # Arguments
/// * `db` - Database connection
/// * `gateway` - Payment provider the charges are read from
///
/// # Returns
/// Up to 100 charges (newest first, as the provider returns them) and the
/// 100 most recent orders
pub async fn sales_report(db: &DatabaseConnection, gateway: &dyn PaymentGateway) -> Result<SalesReport> {
    let charges = gateway
        .list_charge_transactions(analytics::PROVIDER_FETCH_LIMIT)
        .await?;
    let revenue = charges
        .iter()
        .map(|txn| RevenueLine {
            date: analytics::created_at(txn),
            amount: validation::from_cents(txn.amount),
            currency: txn.currency.clone(),
            description: txn.description.clone(),
        })
        .collect();

    let orders = Order::find()
        .order_by_desc(OrderColumn::CreatedAt)
        .order_by_desc(OrderColumn::Id)
        .limit(REPORT_ROW_LIMIT)
        .all(db)
        .await?
        .into_iter()
        .map(|o| OrderLine {
            id: o.id,
            status: o.status,
            total: o.total,
            created_at: o.created_at,
        })
        .collect();

    Ok(SalesReport { revenue, orders })
}

/// A product with its review statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReportLine {
    #[serde(flatten)]
    pub product: ProductModel,
    pub review_count: i64,
    /// Mean rating recomputed from the reviews, 0 when unrated
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub products: Vec<ProductReportLine>,
}

/// Generates the product report: up to 100 products with their review
/// count and average rating.
pub async fn product_report(db: &DatabaseConnection) -> Result<ProductReport> {
    let products = Product::find()
        .order_by_asc(ProductColumn::Id)
        .limit(REPORT_ROW_LIMIT)
        .all(db)
        .await?;
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();

    // One grouped query for every listed product
    let stats: HashMap<i64, (i64, f64)> = Review::find()
        .select_only()
        .column(ReviewColumn::ProductId)
        .column_as(
            SimpleExpr::from(Func::count(Expr::col(ReviewColumn::Id))),
            "review_count",
        )
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(ReviewColumn::Rating))),
            "average",
        )
        .filter(ReviewColumn::ProductId.is_in(ids))
        .group_by(ReviewColumn::ProductId)
        .into_tuple::<(i64, i64, Option<f64>)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(product_id, count, average)| (product_id, (count, average.unwrap_or(0.0))))
        .collect();

    let products = products
        .into_iter()
        .map(|product| {
            let (review_count, average_rating) = stats.get(&product.id).copied().unwrap_or((0, 0.0));
            ProductReportLine {
                product,
                review_count,
                average_rating,
            }
        })
        .collect();
    Ok(ProductReport { products })
}

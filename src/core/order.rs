//! Order business logic - Order lifecycle and admin refund/cancel.
//!
//! Orders are created `pending` by the checkout flows, then moved between
//! statuses by webhook events (keyed by the checkout session id) and by the
//! admin refund and cancel routes.

use crate::{
    entities::{Order, OrderColumn, OrderModel, order},
    errors::{Error, Result},
    payments::{PaymentGateway, Refund},
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle states of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    PaymentFailed,
    Expired,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    /// Stored representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::PaymentFailed => "payment_failed",
            Self::Expired => "expired",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "payment_failed" => Ok(Self::PaymentFailed),
            "expired" => Ok(Self::Expired),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(format!("Unknown order status: {other}"))),
        }
    }
}

/// Input for [`create_pending_order`]
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub customer_email: Option<String>,
    /// Snapshot of what is being bought
    pub cart_json: serde_json::Value,
    /// Total in dollars
    pub total: f64,
    pub currency: String,
}

/// Inserts a `pending` order without a checkout session yet.
pub async fn create_pending_order<C: ConnectionTrait>(conn: &C, new: NewOrder) -> Result<OrderModel> {
    let now = chrono::Utc::now().naive_utc();
    order::ActiveModel {
        user_id: Set(new.user_id),
        customer_email: Set(new.customer_email),
        stripe_session_id: Set(String::new()),
        payment_intent_id: Set(None),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        cart_json: Set(new.cart_json),
        total: Set(new.total),
        currency: Set(new.currency),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

/// Stores the checkout session id on an order.
pub async fn attach_session<C: ConnectionTrait>(conn: &C, order_id: i64, session_id: &str) -> Result<()> {
    Order::update_many()
        .col_expr(OrderColumn::StripeSessionId, Expr::value(session_id))
        .col_expr(OrderColumn::UpdatedAt, Expr::value(chrono::Utc::now().naive_utc()))
        .filter(OrderColumn::Id.eq(order_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Retrieves an order by id.
///
/// # Errors
/// Returns `NotFound` if the order does not exist.
pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<OrderModel> {
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

/// Retrieves the order created for a checkout session.
pub async fn find_by_session<C: ConnectionTrait>(conn: &C, session_id: &str) -> Result<Option<OrderModel>> {
    if session_id.is_empty() {
        return Ok(None);
    }
    Order::find()
        .filter(OrderColumn::StripeSessionId.eq(session_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Moves the order of a checkout session to `status`, storing the payment
/// intent id when one is given.
///
/// Returns `None` when no order belongs to the session.
pub async fn update_status_by_session<C: ConnectionTrait>(
    conn: &C,
    session_id: &str,
    status: OrderStatus,
    payment_intent_id: Option<&str>,
) -> Result<Option<OrderModel>> {
    let Some(existing) = find_by_session(conn, session_id).await? else {
        tracing::warn!(session_id, "No order for checkout session");
        return Ok(None);
    };

    let mut active: order::ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    if let Some(intent) = payment_intent_id {
        active.payment_intent_id = Set(Some(intent.to_string()));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(conn).await?;

    tracing::info!(order_id = updated.id, status = %status, "Order status updated");
    Ok(Some(updated))
}

async fn set_status(db: &DatabaseConnection, existing: OrderModel, status: OrderStatus) -> Result<OrderModel> {
    let mut active: order::ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await.map_err(Into::into)
}

/// Retrieves a customer's orders, newest first.
pub async fn my_orders(db: &DatabaseConnection, user_id: &str) -> Result<Vec<OrderModel>> {
    Order::find()
        .filter(OrderColumn::UserId.eq(user_id))
        .order_by_desc(OrderColumn::CreatedAt)
        .order_by_desc(OrderColumn::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the most recent orders across all customers.
pub async fn latest_orders(db: &DatabaseConnection, limit: u64) -> Result<Vec<OrderModel>> {
    Order::find()
        .order_by_desc(OrderColumn::CreatedAt)
        .order_by_desc(OrderColumn::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Refunds an order in full through the payment provider and marks it
/// `refunded`.
///
/// # Errors
/// Returns `NotFound` when the order does not exist or was never paid (no
/// payment intent), and `Payment` when the provider rejects the refund.
pub async fn refund_order(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    order_id: i64,
) -> Result<(OrderModel, Refund)> {
    let existing = get_order(db, order_id).await?;
    let payment_intent = existing
        .payment_intent_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::not_found("Payment intent for order", order_id))?;

    let refund = gateway.create_refund(&payment_intent).await?;
    let updated = set_status(db, existing, OrderStatus::Refunded).await?;
    tracing::info!(order_id, refund_id = %refund.id, "Order refunded");
    Ok((updated, refund))
}

/// Marks an order `cancelled`.
///
/// # Errors
/// Returns `NotFound` for an unknown order and a validation error for an
/// order that was already refunded.
pub async fn cancel_order(db: &DatabaseConnection, order_id: i64) -> Result<OrderModel> {
    let existing = get_order(db, order_id).await?;
    if existing.status == OrderStatus::Refunded.as_str() {
        return Err(Error::validation("Cannot cancel a refunded order"));
    }
    let updated = set_status(db, existing, OrderStatus::Cancelled).await?;
    tracing::info!(order_id, "Order cancelled");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::PaymentFailed,
            OrderStatus::Expired,
            OrderStatus::Refunded,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[tokio::test]
    async fn test_status_by_session() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "buyer@example.com").await?;
        let order = create_test_order(&db, Some(&user.id), "cs_test_1").await?;

        let updated = update_status_by_session(&db, "cs_test_1", OrderStatus::Paid, Some("pi_1"))
            .await?
            .unwrap();
        assert_eq!(updated.id, order.id);
        assert_eq!(updated.status, "paid");
        assert_eq!(updated.payment_intent_id.as_deref(), Some("pi_1"));

        let none = update_status_by_session(&db, "cs_unknown", OrderStatus::Paid, None).await?;
        assert!(none.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_requires_payment_intent() -> Result<()> {
        let db = setup_test_db().await?;
        let gateway = FakeGateway::default();
        let order = create_test_order(&db, None, "cs_test_2").await?;

        let result = refund_order(&db, &gateway, order.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        let result = refund_order(&db, &gateway, 999).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        update_status_by_session(&db, "cs_test_2", OrderStatus::Paid, Some("pi_2")).await?;
        let (refunded, refund) = refund_order(&db, &gateway, order.id).await?;
        assert_eq!(refunded.status, "refunded");
        assert_eq!(refund.id, "re_pi_2");
        assert_eq!(gateway.calls(), vec!["create_refund:pi_2"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let gateway = FakeGateway::default();
        let order = create_test_order(&db, None, "cs_test_3").await?;

        assert_eq!(cancel_order(&db, order.id).await?.status, "cancelled");
        assert!(matches!(
            cancel_order(&db, 999).await,
            Err(Error::NotFound { .. })
        ));

        update_status_by_session(&db, "cs_test_3", OrderStatus::Paid, Some("pi_3")).await?;
        refund_order(&db, &gateway, order.id).await?;
        assert!(matches!(
            cancel_order(&db, order.id).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_my_orders_scoped_and_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let first = create_test_order(&db, Some(&alice.id), "cs_a1").await?;
        let second = create_test_order(&db, Some(&alice.id), "cs_a2").await?;
        create_test_order(&db, Some(&bob.id), "cs_b1").await?;

        let ids: Vec<i64> = my_orders(&db, &alice.id).await?.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(latest_orders(&db, 2).await?.len(), 2);
        Ok(())
    }
}

//! Cart business logic - A customer's shopping cart.
//!
//! A cart is the set of `cart_items` rows of one user, at most one line per
//! product. Mutations record `CART_ADD`, `CART_UPDATE` and `CART_REMOVE`
//! security events.

use crate::{
    core::{RequestMeta, product, security_log},
    entities::{CartItem, CartItemColumn, ProductModel, Product, cart_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A cart line joined with its product
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product: ProductModel,
    /// File name of the product's first image
    pub image: Option<String>,
}

/// Result of [`add_to_cart`]
#[derive(Debug, Clone, Serialize)]
pub struct CartMutation {
    /// False when the product was already in the cart
    pub success: bool,
    pub cart: Vec<CartLine>,
}

/// Direction of a quantity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAdjustment {
    Increment,
    Decrement,
}

impl CartAdjustment {
    /// Interprets the `increment`/`decrement` flags sent by the UI.
    ///
    /// # Errors
    /// Returns a validation error unless exactly one flag is set.
    pub fn from_flags(increment: bool, decrement: bool) -> Result<Self> {
        match (increment, decrement) {
            (true, false) => Ok(Self::Increment),
            (false, true) => Ok(Self::Decrement),
            _ => Err(Error::validation(
                "Exactly one of increment or decrement must be set",
            )),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }
}

/// Retrieves the user's cart lines with their products and first images.
pub async fn get_cart<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<Vec<CartLine>> {
    let rows = CartItem::find()
        .filter(CartItemColumn::UserId.eq(user_id))
        .order_by_asc(CartItemColumn::Id)
        .find_also_related(Product)
        .all(conn)
        .await?;

    let product_ids: Vec<i64> = rows.iter().map(|(line, _)| line.product_id).collect();
    let mut images = product::first_images(conn, &product_ids).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, product)| {
            product.map(|product| CartLine {
                id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                image: images.remove(&line.product_id),
                product,
            })
        })
        .collect())
}

/// Sum of price times quantity over all lines, in dollars.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines
        .iter()
        .map(|line| line.product.price * f64::from(line.quantity))
        .sum()
}

async fn find_line<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    product_id: i64,
) -> Result<Option<cart_item::Model>> {
    CartItem::find()
        .filter(CartItemColumn::UserId.eq(user_id))
        .filter(CartItemColumn::ProductId.eq(product_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Puts one unit of a product in the cart.
///
/// A product already in the cart is left alone and reported with
/// `success: false`.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    meta: &RequestMeta,
) -> Result<CartMutation> {
    product::get_product(db, product_id).await?;

    if find_line(db, user_id, product_id).await?.is_some() {
        return Ok(CartMutation {
            success: false,
            cart: get_cart(db, user_id).await?,
        });
    }

    cart_item::ActiveModel {
        user_id: Set(user_id.to_string()),
        product_id: Set(product_id),
        quantity: Set(1),
        ..Default::default()
    }
    .insert(db)
    .await?;

    security_log::record(
        db,
        security_log::events::CART_ADD,
        user_id,
        json!({ "productId": product_id }),
        meta,
    )
    .await;

    Ok(CartMutation {
        success: true,
        cart: get_cart(db, user_id).await?,
    })
}

/// Changes the quantity of a cart line by one. A line whose quantity would
/// reach zero is removed.
///
/// # Errors
/// Returns `NotFound` when the product is not in the cart.
pub async fn update_cart_item(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    adjustment: CartAdjustment,
    meta: &RequestMeta,
) -> Result<Vec<CartLine>> {
    let txn = db.begin().await?;
    let line = find_line(&txn, user_id, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Cart item", product_id))?;

    let quantity = match adjustment {
        CartAdjustment::Increment => line.quantity + 1,
        CartAdjustment::Decrement => line.quantity - 1,
    };
    if quantity <= 0 {
        CartItem::delete_by_id(line.id).exec(&txn).await?;
    } else {
        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.update(&txn).await?;
    }
    let cart = get_cart(&txn, user_id).await?;
    txn.commit().await?;

    security_log::record(
        db,
        security_log::events::CART_UPDATE,
        user_id,
        json!({
            "productId": product_id,
            "action": adjustment.as_str(),
            "quantity": quantity.max(0),
        }),
        meta,
    )
    .await;
    Ok(cart)
}

/// Removes a product from the cart.
pub async fn remove_from_cart(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    meta: &RequestMeta,
) -> Result<Vec<CartLine>> {
    CartItem::delete_many()
        .filter(CartItemColumn::UserId.eq(user_id))
        .filter(CartItemColumn::ProductId.eq(product_id))
        .exec(db)
        .await?;

    security_log::record(
        db,
        security_log::events::CART_REMOVE,
        user_id,
        json!({ "productId": product_id }),
        meta,
    )
    .await;
    get_cart(db, user_id).await
}

/// Empties a user's cart, returning the number of removed lines.
pub async fn clear_cart<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<u64> {
    let result = CartItem::delete_many()
        .filter(CartItemColumn::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_adjustment_flags() {
        assert_eq!(
            CartAdjustment::from_flags(true, false).ok(),
            Some(CartAdjustment::Increment)
        );
        assert_eq!(
            CartAdjustment::from_flags(false, true).ok(),
            Some(CartAdjustment::Decrement)
        );
        assert!(CartAdjustment::from_flags(true, true).is_err());
        assert!(CartAdjustment::from_flags(false, false).is_err());
    }

    #[tokio::test]
    async fn test_add_twice_reports_existing() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cart@example.com").await?;
        let product = create_test_product(&db, "Widget", 12.5).await?;
        let meta = RequestMeta::default();

        let first = add_to_cart(&db, &user.id, product.id, &meta).await?;
        assert!(first.success);
        assert_eq!(first.cart.len(), 1);
        assert_eq!(first.cart[0].quantity, 1);

        let second = add_to_cart(&db, &user.id, product.id, &meta).await?;
        assert!(!second.success);
        assert_eq!(second.cart.len(), 1);

        let missing = add_to_cart(&db, &user.id, 999, &meta).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_changes_and_removal_at_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cart@example.com").await?;
        let widget = create_test_product(&db, "Widget", 12.5).await?;
        let gadget = create_test_product(&db, "Gadget", 2.0).await?;
        let meta = RequestMeta::default();

        add_to_cart(&db, &user.id, widget.id, &meta).await?;
        add_to_cart(&db, &user.id, gadget.id, &meta).await?;
        let cart =
            update_cart_item(&db, &user.id, widget.id, CartAdjustment::Increment, &meta).await?;
        assert_eq!(cart[0].quantity, 2);
        assert_eq!(cart_total(&cart), 27.0);

        let cart =
            update_cart_item(&db, &user.id, gadget.id, CartAdjustment::Decrement, &meta).await?;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].product_id, widget.id);

        let missing =
            update_cart_item(&db, &user.id, gadget.id, CartAdjustment::Increment, &meta).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        let cart = remove_from_cart(&db, &user.id, widget.id, &meta).await?;
        assert!(cart.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cart_events_recorded() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cart@example.com").await?;
        let widget = create_test_product(&db, "Widget", 12.5).await?;
        let meta = RequestMeta::default();

        add_to_cart(&db, &user.id, widget.id, &meta).await?;
        update_cart_item(&db, &user.id, widget.id, CartAdjustment::Increment, &meta).await?;
        remove_from_cart(&db, &user.id, widget.id, &meta).await?;

        let logs = security_log::list_logs(&db, &security_log::LogQuery::default()).await?;
        let events: Vec<&str> = logs.data.iter().map(|e| e.log.event.as_str()).collect();
        assert_eq!(events, vec!["CART_REMOVE", "CART_UPDATE", "CART_ADD"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_cart_only_touches_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice@example.com").await?;
        let bob = create_test_user(&db, "bob@example.com").await?;
        let widget = create_test_product(&db, "Widget", 1.0).await?;
        let meta = RequestMeta::default();

        add_to_cart(&db, &alice.id, widget.id, &meta).await?;
        add_to_cart(&db, &bob.id, widget.id, &meta).await?;

        assert_eq!(clear_cart(&db, &alice.id).await?, 1);
        assert!(get_cart(&db, &alice.id).await?.is_empty());
        assert_eq!(get_cart(&db, &bob.id).await?.len(), 1);
        Ok(())
    }
}

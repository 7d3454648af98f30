//! Wishlist business logic - Products a customer saved for later.

use crate::{
    core::product::get_product,
    entities::{Product, ProductModel, WishlistItem, WishlistItemColumn, wishlist_item},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;

/// Result of [`toggle_wishlist`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistToggle {
    /// Whether the product is in the wishlist after the toggle
    pub in_wishlist: bool,
    /// Ids of every product now in the wishlist
    pub product_ids: Vec<i64>,
}

/// Retrieves the products in a user's wishlist, oldest entry first.
pub async fn get_wishlist(db: &DatabaseConnection, user_id: &str) -> Result<Vec<ProductModel>> {
    let rows = WishlistItem::find()
        .filter(WishlistItemColumn::UserId.eq(user_id))
        .order_by_asc(WishlistItemColumn::Id)
        .find_also_related(Product)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(_, product)| product).collect())
}

/// Whether `product_id` is in the user's wishlist.
pub async fn is_in_wishlist(db: &DatabaseConnection, user_id: &str, product_id: i64) -> Result<bool> {
    let count = WishlistItem::find()
        .filter(WishlistItemColumn::UserId.eq(user_id))
        .filter(WishlistItemColumn::ProductId.eq(product_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

async fn wishlist_product_ids(db: &DatabaseConnection, user_id: &str) -> Result<Vec<i64>> {
    let rows = WishlistItem::find()
        .filter(WishlistItemColumn::UserId.eq(user_id))
        .order_by_asc(WishlistItemColumn::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.product_id).collect())
}

/// Removes the product from the wishlist when present, adds it otherwise.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn toggle_wishlist(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
) -> Result<WishlistToggle> {
    get_product(db, product_id).await?;

    let removed = WishlistItem::delete_many()
        .filter(WishlistItemColumn::UserId.eq(user_id))
        .filter(WishlistItemColumn::ProductId.eq(product_id))
        .exec(db)
        .await?;

    let in_wishlist = if removed.rows_affected == 0 {
        wishlist_item::ActiveModel {
            user_id: Set(user_id.to_string()),
            product_id: Set(product_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        true
    } else {
        false
    };

    Ok(WishlistToggle {
        in_wishlist,
        product_ids: wishlist_product_ids(db, user_id).await?,
    })
}

//! Review business logic - Customer ratings and their moderation.
//!
//! Every mutation runs in one database transaction that also recomputes the
//! product's denormalized `average_rating` with the database's `AVG`, so the
//! product row never disagrees with its reviews.

use crate::{
    core::{Page, RequestMeta, SortOrder, UserSummary, product::get_product, security_log},
    entities::{
        Product, ProductColumn, Review, ReviewColumn, ReviewModel, User, UserColumn, review,
    },
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Review state of a product after a mutation
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub product_id: i64,
    /// The caller's review, absent after a delete
    pub review: Option<ReviewModel>,
    pub all_reviews: Vec<ReviewModel>,
    pub average_rating: f64,
}

/// Columns admin review listings can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewSortField {
    #[default]
    CreatedAt,
    Rating,
    ProductId,
}

impl ReviewSortField {
    const fn column(self) -> ReviewColumn {
        match self {
            Self::CreatedAt => ReviewColumn::CreatedAt,
            Self::Rating => ReviewColumn::Rating,
            Self::ProductId => ReviewColumn::ProductId,
        }
    }
}

/// Paging and sorting for [`list_reviews`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewQuery {
    pub limit: u64,
    pub offset: u64,
    pub sort_by: ReviewSortField,
    pub sort_order: SortOrder,
}

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            sort_by: ReviewSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// Product fields attached to admin review rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
}

/// A review as listed in the admin panel
#[derive(Debug, Clone, Serialize)]
pub struct AdminReviewRow {
    pub id: i64,
    pub rating: i32,
    pub created_at: DateTime,
    pub product: Option<ProductSummary>,
    pub user: Option<UserSummary>,
}

fn check_rating(rating: i32) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(Error::validation("Rating must be between 1 and 5"));
    }
    Ok(())
}

/// Computes `AVG(rating)` for a product (0 when it has no reviews) and stores
/// it on the product row.
pub async fn recalculate_average<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<f64> {
    let average = Review::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(ReviewColumn::Rating))),
            "average",
        )
        .filter(ReviewColumn::ProductId.eq(product_id))
        .into_tuple::<Option<f64>>()
        .one(conn)
        .await?
        .flatten()
        .unwrap_or(0.0);

    Product::update_many()
        .col_expr(ProductColumn::AverageRating, Expr::value(average))
        .filter(ProductColumn::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(average)
}

async fn find_user_review<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    product_id: i64,
) -> Result<Option<ReviewModel>> {
    Review::find()
        .filter(ReviewColumn::UserId.eq(user_id))
        .filter(ReviewColumn::ProductId.eq(product_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

async fn summarize<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    review: Option<ReviewModel>,
) -> Result<ReviewSummary> {
    let average_rating = recalculate_average(conn, product_id).await?;
    let all_reviews = Review::find()
        .filter(ReviewColumn::ProductId.eq(product_id))
        .order_by_desc(ReviewColumn::CreatedAt)
        .all(conn)
        .await?;

    Ok(ReviewSummary {
        product_id,
        review,
        all_reviews,
        average_rating,
    })
}

/// Creates the caller's review of a product, or replaces its rating when the
/// caller already reviewed it.
///
/// # Errors
/// Returns a validation error for a rating outside 1..=5 and `NotFound` for
/// an unknown product.
pub async fn create_review(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    rating: i32,
) -> Result<ReviewSummary> {
    check_rating(rating)?;

    let txn = db.begin().await?;
    get_product(&txn, product_id).await?;

    let saved = match find_user_review(&txn, user_id, product_id).await? {
        Some(existing) => {
            let mut active: review::ActiveModel = existing.into();
            active.rating = Set(rating);
            active.update(&txn).await?
        }
        None => {
            review::ActiveModel {
                product_id: Set(product_id),
                user_id: Set(user_id.to_string()),
                rating: Set(rating),
                created_at: Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let summary = summarize(&txn, product_id, Some(saved)).await?;
    txn.commit().await?;
    Ok(summary)
}

/// Changes the rating of the caller's existing review.
///
/// # Errors
/// Returns `NotFound` when the product does not exist or the caller has not
/// reviewed it.
pub async fn update_review(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
    rating: i32,
) -> Result<ReviewSummary> {
    check_rating(rating)?;

    let txn = db.begin().await?;
    get_product(&txn, product_id).await?;
    let existing = find_user_review(&txn, user_id, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Review", format!("product {product_id}")))?;

    let mut active: review::ActiveModel = existing.into();
    active.rating = Set(rating);
    let saved = active.update(&txn).await?;

    let summary = summarize(&txn, product_id, Some(saved)).await?;
    txn.commit().await?;
    Ok(summary)
}

/// Deletes the caller's review of a product, if any.
///
/// # Errors
/// Returns `NotFound` for an unknown product.
pub async fn delete_review(
    db: &DatabaseConnection,
    user_id: &str,
    product_id: i64,
) -> Result<ReviewSummary> {
    let txn = db.begin().await?;
    get_product(&txn, product_id).await?;

    Review::delete_many()
        .filter(ReviewColumn::UserId.eq(user_id))
        .filter(ReviewColumn::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    let summary = summarize(&txn, product_id, None).await?;
    txn.commit().await?;
    Ok(summary)
}

/// Retrieves one page of reviews with product and author summaries.
pub async fn list_reviews(
    db: &DatabaseConnection,
    query: &ReviewQuery,
) -> Result<Page<AdminReviewRow>> {
    let total = Review::find().count(db).await?;
    let reviews = Review::find()
        .order_by(query.sort_by.column(), query.sort_order.into())
        .order_by_desc(ReviewColumn::Id)
        .limit(query.limit)
        .offset(query.offset)
        .all(db)
        .await?;

    let product_ids: Vec<i64> = reviews.iter().map(|r| r.product_id).collect();
    let user_ids: Vec<String> = reviews.iter().map(|r| r.user_id.clone()).collect();

    let products: HashMap<i64, ProductSummary> = Product::find()
        .filter(ProductColumn::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, ProductSummary { id: p.id, name: p.name }))
        .collect();
    let users: HashMap<String, UserSummary> = User::find()
        .filter(UserColumn::Id.is_in(user_ids))
        .all(db)
        .await?
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect();

    let data = reviews
        .into_iter()
        .map(|r| AdminReviewRow {
            id: r.id,
            rating: r.rating,
            created_at: r.created_at,
            product: products.get(&r.product_id).cloned(),
            user: users.get(&r.user_id).cloned(),
        })
        .collect();
    Ok(Page { data, total })
}

/// Deletes any review, recomputes the product average and records
/// `REVIEW_DELETED`.
///
/// # Errors
/// Returns `NotFound` if no review has this id.
pub async fn admin_delete_review(
    db: &DatabaseConnection,
    admin_id: &str,
    review_id: i64,
    meta: &RequestMeta,
) -> Result<f64> {
    let txn = db.begin().await?;
    let existing = Review::find_by_id(review_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Review", review_id))?;
    Review::delete_by_id(review_id).exec(&txn).await?;
    let average = recalculate_average(&txn, existing.product_id).await?;
    txn.commit().await?;

    security_log::record(
        db,
        security_log::events::REVIEW_DELETED,
        admin_id,
        json!({
            "reviewId": review_id,
            "productId": existing.product_id,
            "reviewUserId": existing.user_id,
        }),
        meta,
    )
    .await;
    Ok(average)
}

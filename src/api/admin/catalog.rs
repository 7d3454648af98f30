//! Admin catalog: products, product images, categories and reviews

use crate::{
    api::{AdminUser, AppState, ClientMeta, Json, Path, Query},
    core::{
        Page, category,
        product::{self, NewProduct, ProductImageView, ProductUpdate},
        review::{self, AdminReviewRow, ReviewQuery},
    },
    entities::{CategoryModel, ProductModel},
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

/// Admin product listing page
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProductPage {
    pub limit: u64,
    pub offset: u64,
}

impl Default for ProductPage {
    fn default() -> Self {
        Self { limit: 10, offset: 0 }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewImage {
    /// `data:image/...;base64,...` URL
    pub image: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Deserialize)]
pub struct Priority {
    pub priority: i32,
}

#[derive(Debug, Deserialize)]
pub struct CategoryName {
    pub name: String,
}

/// GET /api/admin/products
pub async fn list_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<ProductPage>,
) -> Result<Json<Page<ProductModel>>> {
    Ok(Json(product::list_products(&state.db, page.limit, page.offset).await?))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<NewProduct>,
) -> Result<Json<ProductModel>> {
    let created = product::create_product(&state.db, &state.media, input).await?;
    tracing::info!(admin_id = %admin.id, product_id = created.id, "Product created");
    Ok(Json(created))
}

/// PUT /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(input): Json<ProductUpdate>,
) -> Result<Json<ProductModel>> {
    Ok(Json(product::update_product(&state.db, id, input).await?))
}

/// DELETE /api/admin/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    product::delete_product(&state.db, &state.media, id).await?;
    tracing::info!(admin_id = %admin.id, product_id = id, "Product deleted");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/products/{id}/images
pub async fn product_images(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProductImageView>>> {
    Ok(Json(product::list_product_images(&state.db, &state.media, id).await?))
}

/// POST /api/admin/products/{id}/images
pub async fn add_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<NewImage>,
) -> Result<Json<Vec<ProductImageView>>> {
    let images = product::add_product_image(&state.db, &state.media, id, &body.image, body.priority).await?;
    Ok(Json(images))
}

/// DELETE /api/admin/product-images/{id}
pub async fn delete_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProductImageView>>> {
    Ok(Json(product::delete_product_image(&state.db, &state.media, id).await?))
}

/// PUT /api/admin/product-images/{id}/priority
pub async fn set_image_priority(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Priority>,
) -> Result<Json<Vec<ProductImageView>>> {
    let images = product::set_image_priority(&state.db, &state.media, id, body.priority).await?;
    Ok(Json(images))
}

/// GET /api/admin/categories
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<CategoryModel>>> {
    Ok(Json(category::list_categories(&state.db).await?))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CategoryName>,
) -> Result<Json<CategoryModel>> {
    Ok(Json(category::create_category(&state.db, &body.name).await?))
}

/// PUT /api/admin/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<CategoryName>,
) -> Result<Json<CategoryModel>> {
    Ok(Json(category::update_category(&state.db, id, &body.name).await?))
}

/// GET /api/admin/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Page<AdminReviewRow>>> {
    Ok(Json(review::list_reviews(&state.db, &query).await?))
}

/// DELETE /api/admin/reviews/{id}
pub async fn delete_review(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let average_rating = review::admin_delete_review(&state.db, &admin.id, id, &meta).await?;
    Ok(Json(json!({ "success": true, "averageRating": average_rating })))
}

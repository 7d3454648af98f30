//! Admin panel routes, mounted under `/api/admin`
//!
//! Every handler takes an [`AdminUser`](crate::api::AdminUser), so a caller
//! without an admin session is rejected and the attempt is recorded before
//! any body is read.

pub mod catalog;
pub mod insights;
pub mod people;
pub mod store;

use crate::api::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/{id}",
            put(catalog::update_product).delete(catalog::delete_product),
        )
        .route(
            "/products/{id}/images",
            get(catalog::product_images).post(catalog::add_image),
        )
        .route(
            "/product-images/{id}",
            delete(catalog::delete_image),
        )
        .route("/product-images/{id}/priority", put(catalog::set_image_priority))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/categories/{id}", put(catalog::update_category))
        .route("/reviews", get(catalog::list_reviews))
        .route("/reviews/{id}", delete(catalog::delete_review))
        .route("/users", get(people::list_users))
        .route(
            "/users/{id}",
            patch(people::update_user).delete(people::delete_user),
        )
        .route("/users/{id}/password", post(people::reset_password))
        .route(
            "/notifications",
            get(people::list_notifications).post(people::create_notification),
        )
        .route(
            "/notifications/{id}",
            delete(people::delete_notification),
        )
        .route(
            "/coupons",
            get(store::list_coupons).post(store::create_coupon),
        )
        .route("/coupons/{id}", delete(store::delete_coupon))
        .route(
            "/email-templates",
            get(store::list_templates).post(store::create_template),
        )
        .route(
            "/email-templates/{id}",
            get(store::get_template)
                .patch(store::update_template)
                .delete(store::delete_template),
        )
        .route(
            "/settings",
            get(store::get_settings).put(store::update_settings),
        )
        .route("/analytics", get(insights::analytics))
        .route("/reports/sales", get(insights::sales_report))
        .route("/reports/products", get(insights::product_report))
        .route("/logs", get(insights::list_logs))
        .route("/logs/{id}", delete(insights::delete_log))
}

//! HTTP API for the storefront
//!
//! Handlers are thin: they resolve the caller through the extractors in
//! [`extract`], hand plain inputs to [`crate::core`], and serialize the
//! result. Errors leave through the `IntoResponse` impl in [`error`].

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod images;
pub mod orders;
pub mod reviews;
pub mod state;
pub mod stripe;

pub use extract::{AdminUser, ClientMeta, CurrentUser, Json, OptionalUser, Path, Query};
pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Public catalog and session routes
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/products/best", get(catalog::best_products))
        .route("/api/products/search", get(catalog::search_products))
        .route("/api/products/highest-id", get(catalog::highest_product_id))
        .route("/api/products/{id}", get(catalog::product_by_id))
        .route("/api/categories", get(catalog::categories))
        .route("/api/image/{file}", get(images::serve));

    // Signed-in customer
    let customer = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{product_id}",
            patch(cart::adjust_item).delete(cart::remove_item),
        )
        .route("/api/cart/checkout", post(cart::checkout))
        .route("/api/wishlist", get(account::get_wishlist))
        .route("/api/wishlist/{product_id}/toggle", post(account::toggle_wishlist))
        .route("/api/account/details", put(account::set_details))
        .route("/api/orders", get(account::my_orders))
        .route("/api/notifications", get(account::notifications))
        .route("/api/notifications/read-all", post(account::mark_all_read))
        .route("/api/notifications/{id}/read", post(account::mark_read))
        .route("/api/notifications/{id}", delete(account::delete_notification))
        .route("/api/reviews", post(reviews::create))
        .route(
            "/api/reviews/{product_id}",
            put(reviews::update).delete(reviews::delete),
        );

    // Provider callbacks and hosted checkout
    let payments = Router::new()
        .route("/api/stripe/create-session", post(stripe::create_session))
        .route("/api/stripe/webhook", post(stripe::webhook))
        .route("/api/orders/{id}/refund", post(orders::refund))
        .route("/api/orders/{id}/cancel", post(orders::cancel));

    Router::new()
        .merge(public)
        .merge(customer)
        .merge(payments)
        .nest("/api/admin", admin::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        auth::token,
        core::{order, security_log::events},
        entities::{SecurityLog, SecurityLogColumn, UserModel},
        errors::Result,
        payments::webhook,
        test_utils::*,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use sea_orm::{DatabaseConnection, prelude::*};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_app() -> Result<(Router, DatabaseConnection, tempfile::TempDir)> {
        let (db, media, dir) = setup_with_media().await?;
        let state = AppState::new(db.clone(), test_config(), Arc::new(FakeGateway::default()), media);
        Ok((create_router(state), db, dir))
    }

    fn bearer_for(user: &UserModel) -> String {
        let token = token::create_token(&user.id, &user.email, &user.role, TEST_JWT_SECRET, 1).unwrap();
        format!("Bearer {token}")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_routes_reject_and_record() -> Result<()> {
        let (app, db, _dir) = test_app().await?;
        let customer = create_test_user(&db, "shopper@example.com").await?;

        let anonymous = Request::builder()
            .uri("/api/admin/settings")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, anonymous).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "User must be logged in and be an admin.");

        let as_customer = Request::builder()
            .uri("/api/admin/users")
            .header(header::AUTHORIZATION, bearer_for(&customer))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, as_customer).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let logged = SecurityLog::find()
            .filter(SecurityLogColumn::Event.eq(events::UNAUTHORIZED_ACCESS))
            .all(&db)
            .await?;
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().any(|l| l.ip.as_deref() == Some("203.0.113.9")));
        assert!(logged.iter().any(|l| l.user_id == customer.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_session_reaches_handler() -> Result<()> {
        let (app, db, _dir) = test_app().await?;
        let admin = create_test_admin(&db, "admin@example.com").await?;

        let request = Request::builder()
            .uri("/api/admin/settings")
            .header(header::AUTHORIZATION, bearer_for(&admin))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["siteName"], "CMK");
        assert_eq!(body["allowRegistrations"], true);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_login_me() -> Result<()> {
        let (app, _db, _dir) = test_app().await?;

        let (status, registered) = send(
            &app,
            json_request(
                "POST",
                "/api/auth/register",
                &json!({ "email": "New@Example.com", "password": TEST_PASSWORD, "name": "Newcomer" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(registered["user"]["email"], "new@example.com");

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": "new@example.com", "password": "wrong-password" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, session) = send(
            &app,
            json_request(
                "POST",
                "/api/auth/login",
                &json!({ "email": "new@example.com", "password": TEST_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = session["token"].as_str().unwrap();

        let me = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "new@example.com");

        let (status, body) = send(&app, Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User must be logged in.");
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_signature_checks() -> Result<()> {
        let (app, _db, _dir) = test_app().await?;
        let payload = json!({ "id": "evt_1", "type": "ping", "data": { "object": {} } }).to_string();

        let unsigned = Request::builder()
            .method("POST")
            .uri("/api/stripe/webhook")
            .body(Body::from(payload.clone()))
            .unwrap();
        let (status, body) = send(&app, unsigned).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let now = chrono::Utc::now().timestamp();
        let forged = webhook::sign(payload.as_bytes(), "whsec_other", now)?;
        let request = Request::builder()
            .method("POST")
            .uri("/api/stripe/webhook")
            .header("stripe-signature", forged)
            .body(Body::from(payload))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_marks_order_paid() -> Result<()> {
        let (app, db, _dir) = test_app().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        create_test_order(&db, Some(&buyer.id), "cs_router").await?;

        let payload = json!({
            "id": "evt_paid",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_router",
                "customer_email": "buyer@example.com",
                "payment_intent": "pi_router",
            } },
        })
        .to_string();
        let signed = webhook::sign(payload.as_bytes(), TEST_WEBHOOK_SECRET, chrono::Utc::now().timestamp())?;

        for _ in 0..2 {
            let request = Request::builder()
                .method("POST")
                .uri("/api/stripe/webhook")
                .header("stripe-signature", signed.clone())
                .body(Body::from(payload.clone()))
                .unwrap();
            let (status, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "received": true }));
        }

        let paid = order::find_by_session(&db, "cs_router").await?.unwrap();
        assert_eq!(paid.status, "paid");
        assert_eq!(paid.payment_intent_id.as_deref(), Some("pi_router"));
        Ok(())
    }

    #[tokio::test]
    async fn test_image_route_not_found() -> Result<()> {
        let (app, _db, _dir) = test_app().await?;
        for uri in ["/api/image/missing.png", "/api/image/bad.name.png", "/api/image/noext"] {
            let (status, body) = send(&app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["code"], "NOT_FOUND");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_input_is_a_validation_error() -> Result<()> {
        let (app, db, _dir) = test_app().await?;
        let reviewer = create_test_user(&db, "reviewer@example.com").await?;
        let auth = bearer_for(&reviewer);

        let mut bad_body = json_request("POST", "/api/reviews", &json!({ "productId": 1, "rating": "five" }));
        bad_body.headers_mut().insert(header::AUTHORIZATION, auth.parse().unwrap());
        let (status, body) = send(&app, bad_body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let truncated = Request::builder()
            .method("POST")
            .uri("/api/reviews")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, auth.clone())
            .body(Body::from("{\"productId\":"))
            .unwrap();
        let (status, body) = send(&app, truncated).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let bad_path = Request::builder()
            .method("DELETE")
            .uri("/api/reviews/abc")
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, bad_path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        Ok(())
    }

    #[tokio::test]
    async fn test_quote_session_accepts_string_price() -> Result<()> {
        let (app, _db, _dir) = test_app().await?;
        let quote = json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "price": "42.5",
            "filename": "gear.stl",
        });
        let (status, body) = send(&app, json_request("POST", "/api/stripe/create-session", &quote)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.test/cs_test_1");
        Ok(())
    }

    #[tokio::test]
    async fn test_cart_checkout_through_router() -> Result<()> {
        let (app, db, _dir) = test_app().await?;
        let buyer = create_test_user(&db, "cart@example.com").await?;
        let lamp = create_test_product(&db, "Desk lamp", 25.0).await?;
        let auth = bearer_for(&buyer);

        let mut add = json_request("POST", "/api/cart/items", &json!({ "productId": lamp.id }));
        add.headers_mut().insert(header::AUTHORIZATION, auth.parse().unwrap());
        let (status, body) = send(&app, add).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let checkout = Request::builder()
            .method("POST")
            .uri("/api/cart/checkout")
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, checkout).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.test/cs_test_1");
        Ok(())
    }
}

//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults, plus [`FakeGateway`], a
//! recording stand-in for the payment provider.

use crate::{
    auth::password,
    config::AppConfig,
    core::order::{self, NewOrder},
    entities::{self, OrderModel, ProductModel, UserModel, account, product, user},
    errors::{Error, Result},
    media::MediaStore,
    payments::{
        BalanceAmount, BalanceTransaction, CheckoutSession, CheckoutSessionRequest, Coupon,
        CouponList, NewCoupon, PaymentGateway, PaymentIntent, Refund,
    },
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

/// 1x1 PNG as a data URL
pub const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Password of every user created by [`create_test_user`]
pub const TEST_PASSWORD: &str = "correct-horse-1";

/// Secrets used by [`test_config`]
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Available balance reported by [`FakeGateway`], in cents
pub const FAKE_BALANCE_CENTS: i64 = 12_345;
/// Customer count reported by [`FakeGateway`]
pub const FAKE_CUSTOMERS: usize = 3;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test database plus a media store in a fresh temporary
/// directory. Keep the returned `TempDir` alive for the whole test.
pub async fn setup_with_media() -> Result<(DatabaseConnection, MediaStore, tempfile::TempDir)> {
    let db = setup_test_db().await?;
    let dir = tempfile::tempdir()?;
    let media = MediaStore::new(dir.path(), None);
    Ok((db, media, dir))
}

/// Configuration with test secrets and defaults everywhere else.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.secrets.jwt_secret = TEST_JWT_SECRET.to_string();
    config.secrets.stripe_secret_key = "sk_test".to_string();
    config.secrets.stripe_webhook_secret = TEST_WEBHOOK_SECRET.to_string();
    config
}

// Argon2 is slow in debug builds; hash the shared password once
fn test_password_hash() -> Result<String> {
    static HASH: OnceLock<String> = OnceLock::new();
    if let Some(hash) = HASH.get() {
        return Ok(hash.clone());
    }
    let hash = password::hash_password(TEST_PASSWORD)?;
    Ok(HASH.get_or_init(|| hash).clone())
}

async fn insert_user(db: &DatabaseConnection, email: &str, role: &str) -> Result<UserModel> {
    let now = chrono::Utc::now().naive_utc();
    let id = uuid::Uuid::new_v4().to_string();
    let created = user::ActiveModel {
        id: Set(id.clone()),
        name: Set(email.split('@').next().map(str::to_string)),
        email: Set(email.to_string()),
        email_verified: Set(true),
        image: Set(None),
        role: Set(role.to_string()),
        first_name: Set(None),
        last_name: Set(None),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        state: Set(None),
        zip: Set(None),
        country: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    account::ActiveModel {
        user_id: Set(id.clone()),
        provider_id: Set(account::CREDENTIAL_PROVIDER.to_string()),
        account_id: Set(id),
        password: Set(Some(test_password_hash()?)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// Creates a customer with a credential account using [`TEST_PASSWORD`].
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<UserModel> {
    insert_user(db, email, entities::user::ROLE_USER).await
}

/// Creates an administrator with a credential account using [`TEST_PASSWORD`].
pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<UserModel> {
    insert_user(db, email, entities::user::ROLE_ADMIN).await
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * `description`: "A product used in tests"
/// * `category_id`: None
/// * `product_type`: "physical"
/// * `stock`: 10
pub async fn create_test_product(db: &DatabaseConnection, name: &str, price: f64) -> Result<ProductModel> {
    let now = chrono::Utc::now().naive_utc();
    product::ActiveModel {
        name: Set(name.to_string()),
        description: Set("A product used in tests".to_string()),
        price: Set(price),
        category_id: Set(None),
        product_type: Set("physical".to_string()),
        stock: Set(10),
        thumbnail: Set(None),
        average_rating: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a `pending` order of 10.00 attached to `session_id`.
pub async fn create_test_order(
    db: &DatabaseConnection,
    user_id: Option<&str>,
    session_id: &str,
) -> Result<OrderModel> {
    let created = order::create_pending_order(
        db,
        NewOrder {
            user_id: user_id.map(str::to_string),
            customer_email: Some("buyer@example.com".to_string()),
            cart_json: serde_json::json!([]),
            total: 10.0,
            currency: "usd".to_string(),
        },
    )
    .await?;
    order::attach_session(db, created.id, session_id).await?;
    order::get_order(db, created.id).await
}

/// Payment gateway that records calls and answers with canned data.
///
/// Checkout sessions are numbered `cs_test_1`, `cs_test_2`... with matching
/// `pi_test_N` payment intents. Retrieved payment intents carry a
/// `sessionId` of `cs_` followed by the intent id without its `pi_` prefix.
#[derive(Debug, Default)]
pub struct FakeGateway {
    fail_metadata_update: bool,
    fail_retrieve: bool,
    calls: Mutex<Vec<String>>,
    sessions: Mutex<u32>,
    last_checkout: Mutex<Option<CheckoutSessionRequest>>,
}

impl FakeGateway {
    /// A gateway whose `update_payment_intent_metadata` calls fail.
    pub fn failing_metadata_update() -> Self {
        Self {
            fail_metadata_update: true,
            ..Self::default()
        }
    }

    /// A gateway whose `retrieve_payment_intent` calls fail.
    pub fn failing_retrieve() -> Self {
        Self {
            fail_retrieve: true,
            ..Self::default()
        }
    }

    /// Recorded mutating calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The most recent checkout session request.
    pub fn last_checkout(&self) -> Option<CheckoutSessionRequest> {
        self.last_checkout.lock().ok().and_then(|r| r.clone())
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

fn fake_coupon(id: &str) -> Coupon {
    Coupon {
        id: id.to_string(),
        name: None,
        percent_off: Some(10.0),
        amount_off: None,
        currency: None,
        duration: "once".to_string(),
        duration_in_months: None,
        max_redemptions: None,
        times_redeemed: 0,
        valid: true,
        created: 1_700_000_000,
        redeem_by: None,
        metadata: HashMap::new(),
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        self.record("create_checkout_session".to_string());
        let n = {
            let mut sessions = self.sessions.lock().map_err(|_| Error::Payment {
                message: "fake gateway poisoned".to_string(),
            })?;
            *sessions += 1;
            *sessions
        };
        if let Ok(mut last) = self.last_checkout.lock() {
            *last = Some(request.clone());
        }
        let id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/{id}")),
            payment_intent: Some(format!("pi_test_{n}")),
            id,
        })
    }

    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        _metadata: &[(String, String)],
    ) -> Result<()> {
        self.record(format!("update_payment_intent_metadata:{payment_intent_id}"));
        if self.fail_metadata_update {
            return Err(Error::Payment {
                message: "metadata update rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        self.record(format!("retrieve_payment_intent:{payment_intent_id}"));
        if self.fail_retrieve {
            return Err(Error::Payment {
                message: "provider unavailable".to_string(),
            });
        }
        let suffix = payment_intent_id
            .strip_prefix("pi_")
            .unwrap_or(payment_intent_id);
        Ok(PaymentIntent {
            id: payment_intent_id.to_string(),
            metadata: HashMap::from([("sessionId".to_string(), format!("cs_{suffix}"))]),
        })
    }

    async fn create_refund(&self, payment_intent_id: &str) -> Result<Refund> {
        self.record(format!("create_refund:{payment_intent_id}"));
        Ok(Refund {
            id: format!("re_{payment_intent_id}"),
            status: Some("succeeded".to_string()),
            amount: 1_000,
        })
    }

    async fn list_coupons(&self, _limit: u32) -> Result<CouponList> {
        Ok(CouponList {
            data: vec![fake_coupon("WELCOME")],
            has_more: false,
        })
    }

    async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon> {
        self.record(format!("create_coupon:{}", coupon.id));
        Ok(Coupon {
            name: coupon.name.clone(),
            percent_off: coupon.percent_off,
            amount_off: coupon.amount_off,
            currency: coupon.currency.clone(),
            duration: coupon.duration.clone(),
            duration_in_months: coupon.duration_in_months,
            max_redemptions: coupon.max_redemptions,
            redeem_by: coupon.redeem_by,
            metadata: coupon.metadata.clone(),
            ..fake_coupon(&coupon.id)
        })
    }

    async fn delete_coupon(&self, coupon_id: &str) -> Result<()> {
        self.record(format!("delete_coupon:{coupon_id}"));
        Ok(())
    }

    async fn available_balance(&self) -> Result<Vec<BalanceAmount>> {
        Ok(vec![BalanceAmount {
            amount: FAKE_BALANCE_CENTS,
            currency: "usd".to_string(),
        }])
    }

    async fn list_charge_transactions(&self, _limit: u32) -> Result<Vec<BalanceTransaction>> {
        Ok(vec![BalanceTransaction {
            id: "txn_1".to_string(),
            amount: 2_000,
            currency: "usd".to_string(),
            created: 1_705_320_000,
            description: Some("Order".to_string()),
            kind: "charge".to_string(),
        }])
    }

    async fn count_customers(&self, _limit: u32) -> Result<usize> {
        Ok(FAKE_CUSTOMERS)
    }
}

//! Core business logic - framework-agnostic storefront operations.
//!
//! Every operation takes a database connection plus plain inputs, validates
//! the inputs, runs its queries and returns a typed result. Authorization is
//! resolved by the caller (the HTTP extractors) and passed in as user ids.

pub mod analytics;
pub mod cart;
pub mod category;
pub mod checkout;
pub mod coupon;
pub mod email_template;
pub mod notification;
pub mod order;
pub mod product;
pub mod report;
pub mod review;
pub mod security_log;
pub mod settings;
pub mod user;
pub mod validation;
pub mod wishlist;

use serde::{Deserialize, Serialize};

/// Client metadata recorded with security events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// First entry of `x-forwarded-for`, if present
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One page of rows plus the total number of matching rows
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
}

/// Sort direction accepted by admin listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for sea_orm::Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

/// Minimal user fields attached to admin listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

impl From<&crate::entities::UserModel> for UserSummary {
    fn from(user: &crate::entities::UserModel) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

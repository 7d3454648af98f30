//! Security log entity - Audit trail written by storefront actions.
//!
//! `user_id` is free text so anonymous callers can be recorded as
//! `anonymous`; there is deliberately no foreign key to `users`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "security_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event name (e.g., `LOGIN_FAILED`, `CART_ADD`)
    pub event: String,
    pub user_id: String,
    /// Event specific payload
    pub details: Json,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Order entity - A checkout attempt and its payment lifecycle.
//!
//! Orders are created `pending` when a hosted checkout session is opened and
//! moved through their statuses by webhook events and admin actions. Guest
//! orders (quote checkout) carry `customer_email` instead of `user_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer, absent for guest orders
    pub user_id: Option<String>,
    pub customer_email: Option<String>,
    /// Hosted checkout session id; empty until the session is created
    pub stripe_session_id: String,
    /// Set once the session completes
    pub payment_intent_id: Option<String>,
    /// See `core::order::OrderStatus`
    pub status: String,
    /// Snapshot of the cart lines at checkout time
    pub cart_json: Json,
    /// Order total in dollars
    pub total: f64,
    pub currency: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! User entity - A storefront customer or administrator.
//!
//! Identity fields (`name`, `email`, `image`) come from registration; the
//! address block is filled in from the account details page.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role value carried by administrators.
pub const ROLE_ADMIN: &str = "admin";
/// Role value carried by ordinary customers.
pub const ROLE_USER: &str = "user";

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Random UUID assigned at registration
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: Option<String>,
    /// Login email, always stored lowercased
    #[sea_orm(unique)]
    pub email: String,
    pub email_verified: bool,
    /// Avatar URL or data URL
    pub image: Option<String>,
    /// Either `user` or `admin`
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    /// Whether this user may call admin operations.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account::Entity")]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Account entity - Links a user to an authentication provider.
//!
//! Credential accounts carry an argon2 password hash; accounts linked
//! through an external provider leave `password` empty.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provider id of password-based accounts.
pub const CREDENTIAL_PROVIDER: &str = "credential";

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    /// `credential` or the name of an external provider
    pub provider_id: String,
    /// Identifier of the user at the provider
    pub account_id: String,
    /// PHC-formatted argon2 hash, never serialized
    #[serde(skip_serializing)]
    pub password: Option<String>,
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

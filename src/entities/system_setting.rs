//! System setting entity - Stores key-value pairs for site configuration.
//! Used for settings editable from the admin panel such as the site name,
//! maintenance mode and whether registrations are open.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// System setting database model - stores key-value configuration pairs
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Setting key (e.g., `"allowRegistrations"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Setting value stored as string
    pub value: String,
    /// Admin who last changed the value
    pub updated_by: Option<String>,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

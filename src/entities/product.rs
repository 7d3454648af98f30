//! Product entity - An item offered in the storefront.
//!
//! Prices are stored in dollars. `average_rating` is denormalized from the
//! reviews table and recomputed whenever a review changes; `thumbnail`
//! mirrors the product image with the lowest priority.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Unit price in dollars
    pub price: f64,
    /// Category this product is listed under, if any
    pub category_id: Option<i64>,
    /// Free-form product kind (e.g., "physical", "3d-print")
    pub product_type: String,
    pub stock: i32,
    /// Stored image name of the first product image
    pub thumbnail: Option<String>,
    /// Mean review rating, 0 when unrated
    pub average_rating: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

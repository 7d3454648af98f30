//! Database configuration module for the storefront.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Composite unique constraints that the entity macros cannot express
//! are added as explicit indexes afterwards.

use crate::entities::{
    Account, CartItem, Category, CategoryColumn, EmailTemplate, Image, Notification, Order,
    ProcessedWebhookEvent, Product, ProductImage, Review, SecurityLog, SystemSetting, User,
    WishlistItem, category,
};
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Schema, Set,
};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url()).await.map_err(Into::into)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Referenced tables are created before the tables pointing at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Account).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Image).await?;
    create_table(db, &schema, ProductImage).await?;
    create_table(db, &schema, Review).await?;
    create_table(db, &schema, CartItem).await?;
    create_table(db, &schema, WishlistItem).await?;
    create_table(db, &schema, Order).await?;
    create_table(db, &schema, Notification).await?;
    create_table(db, &schema, SecurityLog).await?;
    create_table(db, &schema, EmailTemplate).await?;
    create_table(db, &schema, SystemSetting).await?;
    create_table(db, &schema, ProcessedWebhookEvent).await?;

    for sql in [
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_user_product ON reviews (user_id, product_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_cart_items_user_product ON cart_items (user_id, product_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_wishlist_items_user_product ON wishlist_items (user_id, product_id)",
        "CREATE INDEX IF NOT EXISTS idx_orders_stripe_session ON orders (stripe_session_id)",
        "CREATE INDEX IF NOT EXISTS idx_security_logs_created ON security_logs (created_at)",
    ] {
        db.execute_unprepared(sql).await?;
    }

    Ok(())
}

/// Inserts the configured categories that do not exist yet.
///
/// Returns the number of categories created.
pub async fn seed_categories(db: &DatabaseConnection, names: &[String]) -> Result<usize> {
    let mut created = 0;
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let existing = Category::find()
            .filter(CategoryColumn::Name.eq(name))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }

        category::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {} categories", created);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OrderModel, ReviewModel, UserModel};
    use sea_orm::{PaginatorTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<ReviewModel> = Review::find().limit(1).all(&db).await?;
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        assert_eq!(ProcessedWebhookEvent::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_categories_skips_existing() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let names = vec!["Figurines".to_string(), "Tools".to_string(), "  ".to_string()];
        assert_eq!(seed_categories(&db, &names).await?, 2);
        assert_eq!(seed_categories(&db, &names).await?, 0);
        assert_eq!(Category::find().count(&db).await?, 2);
        Ok(())
    }
}

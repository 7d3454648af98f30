//! Category business logic - Admin management of catalog categories.

use crate::{
    core::validation::check_min_length,
    entities::{Category, CategoryColumn, CategoryModel, category},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Retrieves all categories ordered by name.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<CategoryModel>> {
    Category::find()
        .order_by_asc(CategoryColumn::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str, except: Option<i64>) -> Result<()> {
    let mut query = Category::find().filter(CategoryColumn::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(CategoryColumn::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::validation(format!("Category '{name}' already exists")));
    }
    Ok(())
}

fn map_duplicate(err: DbErr, name: &str) -> Error {
    let err = Error::from(err);
    if err.is_unique_violation() {
        Error::validation(format!("Category '{name}' already exists"))
    } else {
        err
    }
}

/// Creates a category.
///
/// # Errors
/// Returns a validation error if the trimmed name is shorter than 2
/// characters or already used by another category.
pub async fn create_category(db: &DatabaseConnection, name: &str) -> Result<CategoryModel> {
    let name = name.trim();
    check_min_length("Category name", name, 2)?;
    ensure_name_free(db, name, None).await?;

    category::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_duplicate(e, name))
}

/// Renames a category.
///
/// # Errors
/// Returns `NotFound` for an unknown id and a validation error for a short
/// or duplicate name.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: &str,
) -> Result<CategoryModel> {
    let name = name.trim();
    check_min_length("Category name", name, 2)?;

    let existing = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;
    ensure_name_free(db, name, Some(category_id)).await?;

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name.to_string());
    active.update(db).await.map_err(|e| map_duplicate(e, name))
}

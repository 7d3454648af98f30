//! Product business logic - Catalog reads and admin product management.
//!
//! Public catalog reads (best products, search, product page) and the admin
//! operations (paged listing, create, update, delete, product images) live
//! here. Every product image mutation recomputes the product thumbnail as the
//! image with the lowest priority.

use crate::{
    core::{Page, validation},
    entities::{
        Category, Image, ImageModel, Product, ProductColumn, ProductImage, ProductImageColumn,
        ProductImageModel, ProductModel, image, product, product_image,
    },
    errors::{Error, Result},
    media::MediaStore,
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::{Expr, LikeExpr}};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of products shown on the landing page
pub const BEST_PRODUCTS_LIMIT: u64 = 8;

/// Product page payload
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: ProductModel,
    pub is_in_wishlist: bool,
    pub images: Vec<ProductImageView>,
}

/// A product image as shown to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductImageView {
    /// Id of the product image link, used by the priority and delete operations
    pub id: i64,
    pub image_id: i64,
    /// Stored file name
    pub image: String,
    pub url: String,
    pub priority: i32,
}

/// Input for [`create_product`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub description: String,
    /// `data:image/...;base64,...` URL of the main picture
    pub image: String,
    pub product_type: String,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub stock: i32,
}

/// Input for [`update_product`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: Option<i64>,
    pub product_type: String,
}

/// Retrieves the first products of the catalog for the landing page.
pub async fn best_products(db: &DatabaseConnection) -> Result<Vec<ProductModel>> {
    Product::find()
        .order_by_asc(ProductColumn::Id)
        .limit(BEST_PRODUCTS_LIMIT)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product by id.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn get_product<C: ConnectionTrait>(conn: &C, product_id: i64) -> Result<ProductModel> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))
}

/// Retrieves a product with its images and whether `viewer` has it in their
/// wishlist (always false for anonymous viewers).
pub async fn product_details(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_id: i64,
    viewer: Option<&str>,
) -> Result<ProductDetails> {
    let product = get_product(db, product_id).await?;
    let is_in_wishlist = match viewer {
        Some(user_id) => crate::core::wishlist::is_in_wishlist(db, user_id, product_id).await?,
        None => false,
    };
    let images = product_images(db, media, product_id).await?;

    Ok(ProductDetails {
        product,
        is_in_wishlist,
        images,
    })
}

/// Retrieves products whose name contains `term`, ignoring case.
///
/// An empty or whitespace-only term yields no products.
pub async fn search_products(db: &DatabaseConnection, term: &str) -> Result<Vec<ProductModel>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let by_name = Product::find().order_by_asc(ProductColumn::Name);

    // SQLite LIKE folds ASCII case only
    if !term.is_ascii() {
        let needle = term.to_lowercase();
        let products = by_name.all(db).await?;
        return Ok(products
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect());
    }

    let pattern = format!("%{}%", escape_like(term));
    by_name
        .filter(Expr::col(ProductColumn::Name).like(LikeExpr::new(pattern).escape('\\')))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Escapes LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Returns the highest product id, or 0 for an empty catalog.
pub async fn highest_product_id(db: &DatabaseConnection) -> Result<i64> {
    let last = Product::find()
        .order_by_desc(ProductColumn::Id)
        .one(db)
        .await?;
    Ok(last.map_or(0, |p| p.id))
}

/// Retrieves one page of products and the total count in a single transaction.
pub async fn list_products(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
) -> Result<Page<ProductModel>> {
    let txn = db.begin().await?;
    let total = Product::find().count(&txn).await?;
    let data = Product::find()
        .order_by_asc(ProductColumn::Id)
        .limit(limit)
        .offset(offset)
        .all(&txn)
        .await?;
    txn.commit().await?;

    Ok(Page { data, total })
}

fn validate_fields(name: &str, description: &str, price: f64, product_type: &str) -> Result<()> {
    validation::check_length("Product name", name, 2, 255)?;
    validation::check_min_length("Description", description, 10)?;
    validation::check_amount(price)?;
    if product_type.trim().is_empty() {
        return Err(Error::validation("Product type is required"));
    }
    Ok(())
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, category_id: Option<i64>) -> Result<()> {
    if let Some(id) = category_id {
        Category::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| Error::not_found("Category", id))?;
    }
    Ok(())
}

/// Creates a product with its main picture.
///
/// The picture is stored through the media store, attached with priority 0
/// and used as the thumbnail.
///
/// # Errors
/// Returns an error if:
/// - The image is not a `data:image/` URL
/// - The name is shorter than 2 or the description shorter than 10 characters
/// - The price is negative or not finite, or the stock is negative
/// - The category does not exist
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    media: &MediaStore,
    input: NewProduct,
) -> Result<ProductModel> {
    if !input.image.starts_with("data:image/") {
        return Err(Error::validation("Image must be a data:image/ URL"));
    }
    let name = input.name.trim().to_string();
    let description = input.description.trim().to_string();
    validate_fields(&name, &description, input.price, &input.product_type)?;
    if input.stock < 0 {
        return Err(Error::validation("Stock cannot be negative"));
    }
    ensure_category(db, input.category_id).await?;

    let file_name = media.save_data_url(&input.image).await?;
    let now = chrono::Utc::now().naive_utc();

    let txn = db.begin().await?;
    let created = product::ActiveModel {
        name: Set(name),
        description: Set(description),
        price: Set(input.price),
        category_id: Set(input.category_id),
        product_type: Set(input.product_type.trim().to_string()),
        stock: Set(input.stock),
        thumbnail: Set(Some(file_name.clone())),
        average_rating: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    attach_image(&txn, created.id, file_name, 0).await?;
    txn.commit().await?;

    tracing::info!(product_id = created.id, "Created product '{}'", created.name);
    Ok(created)
}

/// Updates a product's descriptive fields.
///
/// # Errors
/// Returns `NotFound` for an unknown product or category and a validation
/// error for a name shorter than 2 or a description shorter than 10 characters.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    input: ProductUpdate,
) -> Result<ProductModel> {
    let name = input.name.trim().to_string();
    let description = input.description.trim().to_string();
    validate_fields(&name, &description, input.price, &input.product_type)?;

    let mut product: product::ActiveModel = get_product(db, product_id).await?.into();
    ensure_category(db, input.category_id).await?;

    product.name = Set(name);
    product.description = Set(description);
    product.price = Set(input.price);
    product.category_id = Set(input.category_id);
    product.product_type = Set(input.product_type.trim().to_string());
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

/// Deletes a product. Reviews, cart lines, wishlist entries and image links
/// go with it through the foreign keys; the image rows and files it used are
/// removed as well.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn delete_product(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_id: i64,
) -> Result<()> {
    get_product(db, product_id).await?;
    let images = linked_images(db, product_id).await?;

    let txn = db.begin().await?;
    Product::delete_by_id(product_id).exec(&txn).await?;
    let image_ids: Vec<i64> = images.iter().map(|(_, image)| image.id).collect();
    if !image_ids.is_empty() {
        Image::delete_many()
            .filter(crate::entities::ImageColumn::Id.is_in(image_ids))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    for (_, image) in &images {
        media.remove(&image.image).await;
    }
    tracing::info!(product_id, "Deleted product");
    Ok(())
}

async fn attach_image<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    file_name: String,
    priority: i32,
) -> Result<ProductImageModel> {
    let image = image::ActiveModel {
        image: Set(file_name),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    product_image::ActiveModel {
        product_id: Set(product_id),
        image_id: Set(image.id),
        priority: Set(priority),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

async fn linked_images<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<Vec<(ProductImageModel, ImageModel)>> {
    let rows = ProductImage::find()
        .filter(ProductImageColumn::ProductId.eq(product_id))
        .find_also_related(Image)
        .order_by_asc(ProductImageColumn::Priority)
        .order_by_asc(ProductImageColumn::Id)
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(link, image)| image.map(|image| (link, image)))
        .collect())
}

/// Points the product thumbnail at its lowest-priority image (or clears it).
pub(crate) async fn refresh_thumbnail<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
) -> Result<Option<String>> {
    let thumbnail = linked_images(conn, product_id)
        .await?
        .into_iter()
        .next()
        .map(|(_, image)| image.image);

    Product::update_many()
        .col_expr(ProductColumn::Thumbnail, Expr::value(thumbnail.clone()))
        .filter(ProductColumn::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(thumbnail)
}

async fn product_images(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_id: i64,
) -> Result<Vec<ProductImageView>> {
    Ok(linked_images(db, product_id)
        .await?
        .into_iter()
        .map(|(link, image)| ProductImageView {
            id: link.id,
            image_id: image.id,
            url: media.url_for(&image.image),
            image: image.image,
            priority: link.priority,
        })
        .collect())
}

/// Retrieves a product's images ordered by priority and refreshes its thumbnail.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn list_product_images(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_id: i64,
) -> Result<Vec<ProductImageView>> {
    get_product(db, product_id).await?;
    refresh_thumbnail(db, product_id).await?;
    product_images(db, media, product_id).await
}

/// Stores a new image for a product.
///
/// # Errors
/// Returns `NotFound` for an unknown product and a validation error for a
/// bad data URL or a negative priority.
pub async fn add_product_image(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_id: i64,
    data_url: &str,
    priority: i32,
) -> Result<Vec<ProductImageView>> {
    if priority < 0 {
        return Err(Error::validation("Priority cannot be negative"));
    }
    get_product(db, product_id).await?;
    let file_name = media.save_data_url(data_url).await?;

    let txn = db.begin().await?;
    attach_image(&txn, product_id, file_name, priority).await?;
    refresh_thumbnail(&txn, product_id).await?;
    txn.commit().await?;

    product_images(db, media, product_id).await
}

async fn find_link(db: &DatabaseConnection, product_image_id: i64) -> Result<ProductImageModel> {
    ProductImage::find_by_id(product_image_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product image", product_image_id))
}

/// Removes an image from its product and deletes the stored file.
///
/// Returns the product's remaining images.
pub async fn delete_product_image(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_image_id: i64,
) -> Result<Vec<ProductImageView>> {
    let link = find_link(db, product_image_id).await?;
    let image = Image::find_by_id(link.image_id).one(db).await?;

    let txn = db.begin().await?;
    ProductImage::delete_by_id(link.id).exec(&txn).await?;
    Image::delete_by_id(link.image_id).exec(&txn).await?;
    refresh_thumbnail(&txn, link.product_id).await?;
    txn.commit().await?;

    if let Some(image) = image {
        media.remove(&image.image).await;
    }
    product_images(db, media, link.product_id).await
}

/// Changes the display priority of a product image.
///
/// Returns the product's images in their new order.
pub async fn set_image_priority(
    db: &DatabaseConnection,
    media: &MediaStore,
    product_image_id: i64,
    priority: i32,
) -> Result<Vec<ProductImageView>> {
    if priority < 0 {
        return Err(Error::validation("Priority cannot be negative"));
    }
    let link = find_link(db, product_image_id).await?;
    let product_id = link.product_id;

    let txn = db.begin().await?;
    let mut active: product_image::ActiveModel = link.into();
    active.priority = Set(priority);
    active.update(&txn).await?;
    refresh_thumbnail(&txn, product_id).await?;
    txn.commit().await?;

    product_images(db, media, product_id).await
}

/// Maps each product id to the file name of its lowest-priority image.
pub async fn first_images<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[i64],
) -> Result<HashMap<i64, String>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = ProductImage::find()
        .filter(ProductImageColumn::ProductId.is_in(product_ids.iter().copied()))
        .find_also_related(Image)
        .order_by_asc(ProductImageColumn::Priority)
        .order_by_asc(ProductImageColumn::Id)
        .all(conn)
        .await?;

    let mut first = HashMap::new();
    for (link, image) in rows {
        if let Some(image) = image {
            first.entry(link.product_id).or_insert(image.image);
        }
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    fn new_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: 19.99,
            description: "A sturdy printed widget".to_string(),
            image: PIXEL_PNG.to_string(),
            product_type: "physical".to_string(),
            category_id: None,
            stock: 5,
        }
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let media = MediaStore::new("unused", None);

        let mut input = new_product("Widget");
        input.image = "https://example.com/widget.png".to_string();
        let result = create_product(&db, &media, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_product(&db, &media, new_product("W")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut input = new_product("Widget");
        input.description = "short".to_string();
        let result = create_product(&db, &media, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut input = new_product("Widget");
        input.price = -1.0;
        let result = create_product(&db, &media, input).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_sets_thumbnail() -> Result<()> {
        let (db, media, _dir) = setup_with_media().await?;
        let product = create_product(&db, &media, new_product("Widget")).await?;

        let images = list_product_images(&db, &media, product.id).await?;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].priority, 0);
        assert_eq!(product.thumbnail.as_deref(), Some(images[0].image.as_str()));
        assert_eq!(product.average_rating, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_thumbnail_follows_lowest_priority() -> Result<()> {
        let (db, media, _dir) = setup_with_media().await?;
        let product = create_product(&db, &media, new_product("Widget")).await?;
        let original = product.thumbnail.clone();

        let images = add_product_image(&db, &media, product.id, PIXEL_PNG, 5).await?;
        assert_eq!(images.len(), 2);
        let second = images[1].clone();
        assert_eq!(get_product(&db, product.id).await?.thumbnail, original);

        // Moving the second image in front makes it the thumbnail
        let images = set_image_priority(&db, &media, images[0].id, 10).await?;
        assert_eq!(images[0].id, second.id);
        assert_eq!(
            get_product(&db, product.id).await?.thumbnail.as_deref(),
            Some(second.image.as_str())
        );

        // Deleting the last image clears the thumbnail
        delete_product_image(&db, &media, images[1].id).await?;
        let images = delete_product_image(&db, &media, second.id).await?;
        assert!(images.is_empty());
        assert_eq!(get_product(&db, product.id).await?.thumbnail, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product() -> Result<()> {
        let (db, media, _dir) = setup_with_media().await?;
        let product = create_product(&db, &media, new_product("Widget")).await?;

        let update = ProductUpdate {
            name: "Widget Pro".to_string(),
            description: "An even sturdier widget".to_string(),
            price: 24.5,
            category_id: None,
            product_type: "physical".to_string(),
        };
        let updated = update_product(&db, product.id, update.clone()).await?;
        assert_eq!(updated.name, "Widget Pro");
        assert_eq!(updated.price, 24.5);

        let missing = update_product(&db, 999, update.clone()).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        let bad_category = ProductUpdate {
            category_id: Some(42),
            ..update
        };
        let result = update_product(&db, product.id, bad_category).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_reads() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(highest_product_id(&db).await?, 0);

        for i in 0..10 {
            create_test_product(&db, &format!("Gadget {i}"), 10.0).await?;
        }
        let dragon = create_test_product(&db, "Dragon Figurine", 30.0).await?;

        assert_eq!(best_products(&db).await?.len(), 8);
        assert_eq!(highest_product_id(&db).await?, dragon.id);

        let found = search_products(&db, "dRaGoN").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, dragon.id);
        assert!(search_products(&db, "   ").await?.is_empty());

        let page = list_products(&db, 4, 8).await?;
        assert_eq!(page.total, 11);
        assert_eq!(page.data.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_matches_literally() -> Result<()> {
        let db = setup_test_db().await?;
        let discount = create_test_product(&db, "50% off mug", 8.0).await?;
        let snake = create_test_product(&db, "snake_case tee", 20.0).await?;
        let eclair = create_test_product(&db, "Éclair print", 12.0).await?;
        create_test_product(&db, "Plain mug", 6.0).await?;
        create_test_product(&db, "snakeXcase tee", 20.0).await?;

        let found = search_products(&db, "%").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, discount.id);

        let found = search_products(&db, "SNAKE_").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, snake.id);

        let found = search_products(&db, "éCLAIR").await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, eclair.id);

        assert!(search_products(&db, "\\").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_product_details_wishlist_flag() -> Result<()> {
        let (db, media, _dir) = setup_with_media().await?;
        let user = create_test_user(&db, "viewer@example.com").await?;
        let product = create_test_product(&db, "Widget", 10.0).await?;

        let anonymous = product_details(&db, &media, product.id, None).await?;
        assert!(!anonymous.is_in_wishlist);

        crate::core::wishlist::toggle_wishlist(&db, &user.id, product.id).await?;
        let viewer = product_details(&db, &media, product.id, Some(&user.id)).await?;
        assert!(viewer.is_in_wishlist);

        let missing = product_details(&db, &media, 999, None).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_cascades() -> Result<()> {
        let (db, media, _dir) = setup_with_media().await?;
        let user = create_test_user(&db, "buyer@example.com").await?;
        let product = create_product(&db, &media, new_product("Widget")).await?;
        crate::core::review::create_review(&db, &user.id, product.id, 4).await?;

        delete_product(&db, &media, product.id).await?;
        assert!(matches!(
            get_product(&db, product.id).await,
            Err(Error::NotFound { .. })
        ));
        assert_eq!(crate::entities::Review::find().count(&db).await?, 0);
        assert_eq!(Image::find().count(&db).await?, 0);
        Ok(())
    }
}

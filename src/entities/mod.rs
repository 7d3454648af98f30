//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the storefront tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod cart_item;
pub mod category;
pub mod email_template;
pub mod image;
pub mod notification;
pub mod order;
pub mod processed_webhook_event;
pub mod product;
pub mod product_image;
pub mod review;
pub mod security_log;
pub mod system_setting;
pub mod user;
pub mod wishlist_item;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use email_template::{
    Column as EmailTemplateColumn, Entity as EmailTemplate, Model as EmailTemplateModel,
};
pub use image::{Column as ImageColumn, Entity as Image, Model as ImageModel};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use processed_webhook_event::{
    Column as ProcessedWebhookEventColumn, Entity as ProcessedWebhookEvent,
    Model as ProcessedWebhookEventModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use product_image::{
    Column as ProductImageColumn, Entity as ProductImage, Model as ProductImageModel,
};
pub use review::{Column as ReviewColumn, Entity as Review, Model as ReviewModel};
pub use security_log::{
    Column as SecurityLogColumn, Entity as SecurityLog, Model as SecurityLogModel,
};
pub use system_setting::{
    Column as SystemSettingColumn, Entity as SystemSetting, Model as SystemSettingModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wishlist_item::{
    Column as WishlistItemColumn, Entity as WishlistItem, Model as WishlistItemModel,
};

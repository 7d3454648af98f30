//! Shared application state handed to every handler

use crate::{config::AppConfig, media::MediaStore, payments::PaymentGateway};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SeaORM connection pool
    pub db: DatabaseConnection,
    /// Configuration loaded at start up, secrets included
    pub config: Arc<AppConfig>,
    /// Payment provider (Stripe in production, a fake in tests)
    pub gateway: Arc<dyn PaymentGateway>,
    /// Uploaded product images
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        media: MediaStore,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            gateway,
            media: Arc::new(media),
        }
    }
}

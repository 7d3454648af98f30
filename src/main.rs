use dotenvy::dotenv;
use std::sync::Arc;
use storefront::{
    api::{self, AppState},
    config::{self, database},
    errors::Result,
    media::MediaStore,
    payments::stripe::StripeClient,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=info,tower_http=info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Load config.toml and the secrets from the environment
    let app_config = config::app::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed categories from config.toml
    database::seed_categories(&db, &app_config.seed.categories)
        .await
        .inspect_err(|e| error!("Failed to seed categories: {}", e))?;

    // 6. Serve
    let gateway = Arc::new(StripeClient::new(app_config.secrets.stripe_secret_key.clone()));
    let media = MediaStore::new(
        app_config.media.assets_dir.clone(),
        app_config.media.cdn_url.clone(),
    );
    let bind_address = app_config.server.bind_address.clone();
    let state = AppState::new(db, app_config, gateway, media);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!("Storefront API listening on {}", bind_address);
    axum::serve(listener, api::create_router(state)).await?;

    Ok(())
}

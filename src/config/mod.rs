/// Application configuration loading from config.toml and the environment
pub mod app;

/// Database configuration and connection management
pub mod database;

pub use app::AppConfig;

/// Database configuration and connection management
pub mod database;

/// Service settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, MemberSeed, PoolSettings, RetrySettings, ServerSettings};

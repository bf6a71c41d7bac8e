use dotenvy::dotenv;
use kambio_pool::{
    api::{AppState, app_router},
    config::{self, database},
    core::{PoolRules, PoolService, member},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let rules = PoolRules::from_settings(&app_config.pool)
        .inspect_err(|e| error!("Invalid pool settings: {}", e))?;

    // 4. Connect and make sure the schema exists
    let database_url = database::get_database_url();
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed configured members
    let seeded = member::seed_members(&db, &app_config.members).await?;
    if seeded > 0 {
        info!("Seeded {seeded} member(s)");
    }

    // 6. Serve
    let state = AppState::new(PoolService::new(db, rules));
    let router = app_router(state);
    let listener = tokio::net::TcpListener::bind(&app_config.server.listen_addr).await?;
    info!("Listening on {}", app_config.server.listen_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

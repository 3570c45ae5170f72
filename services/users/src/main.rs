use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::database::{self, DatabaseConfig};
use users::{
    AppState,
    config::AppConfig,
    jwt::JwtKey,
    repositories::{PgRoleRepository, PgUserRepository},
    routes,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting user service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    let state = AppState::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgRoleRepository::new(pool)),
        &JwtKey::generate(),
        config.clone(),
    );

    let app = routes::create_router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("User service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

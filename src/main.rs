use course_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the database (with migrations), storage and the
/// HTTP server, in that order. Any startup failure is returned and ends the process.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging. RUST_LOG wins over the development default.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "course_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.dev_auth_bypass {
        tracing::warn!("x-user-id authentication bypass is enabled");
    }

    // 3. Database and schema.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Storage for course images.
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // LOCAL-ONLY: provision the MinIO bucket. A failure here is not fatal.
    if config.env == Env::Local {
        if let Err(e) = s3_client.ensure_bucket_exists().await {
            tracing::warn!("could not ensure storage bucket: {}", e);
        }
    }

    let storage = Arc::new(s3_client) as StorageState;

    // 5. Application context and server.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}

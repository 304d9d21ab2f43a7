use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use student_portal::{
    AppState,
    auth::hash_password,
    config::{AppConfig, Env},
    create_router,
    error::AppError,
    models::Role,
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for
/// initializing all core components: Configuration, Logging, Database, and the
/// HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "student_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize logging based on environment.
    match config.env {
        Env::Local => {
            // LOCAL: pretty-printed output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // Schema setup: the migrations also seed the academic catalog, which is
    // static reference data with no exposed mutation.
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    // Instantiate the Repository, wrapping it in an Arc for thread-safe sharing.
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Admin Bootstrap
    // Roles are never changeable through self-service, so the one admin
    // account comes from configuration at startup.
    ensure_admin_account(&repo, &config).await;

    // 6. Unified State Assembly
    let app_state = AppState { repo, config };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}

/// ensure_admin_account
///
/// Creates the configured administrator account if it does not exist yet. An
/// already-present username is left untouched (the duplicate rejection of the
/// credential store doubles as the idempotency check here).
async fn ensure_admin_account(repo: &RepositoryState, config: &AppConfig) {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        tracing::info!("No admin bootstrap credentials configured; skipping.");
        return;
    };

    let plaintext = password.clone();
    let password_hash = match tokio::task::spawn_blocking(move || hash_password(&plaintext)).await
    {
        Ok(Ok(hash)) => hash,
        Ok(Err(e)) => {
            tracing::error!("Admin bootstrap hashing failed: {:?}", e);
            return;
        }
        Err(e) => {
            tracing::error!("Admin bootstrap hashing task panicked: {:?}", e);
            return;
        }
    };

    match repo.create_user(username, &password_hash, Role::Admin).await {
        Ok(user) => tracing::info!("Bootstrap admin account '{}' created.", user.username),
        Err(AppError::DuplicateUsername) => {
            tracing::debug!("Admin account '{}' already present.", username);
        }
        Err(e) => tracing::error!("Admin bootstrap failed: {:?}", e),
    }
}

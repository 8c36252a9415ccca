use blog_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    models::User,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// main
///
/// Loads configuration, initializes logging and the store, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_portal=debug,tower_http=info,axum=trace".into());

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

    // 3. Store
    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run database migrations.");

            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on exit.");
            let store = InMemoryRepository::new();
            // Two accounts usable through the local `x-user-id` bypass.
            for (n, premium) in [(1u128, false), (2u128, true)] {
                let user = User {
                    id: Uuid::from_u128(n),
                    email: format!("demo{}@localhost", n),
                    premium,
                };
                tracing::info!(user_id = %user.id, premium, "seeded demo user");
                store.add_user(user).await;
            }
            Arc::new(store)
        }
    };

    // 4. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check APP_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("HTTP server error");
}

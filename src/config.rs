use std::env;

/// AppConfig
///
/// The application's configuration, loaded once at startup and immutable afterwards.
/// Handlers and extractors pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` only in local mode, where the in-memory store is used.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the local `x-user-id` bypass and log format.
    pub env: Env,
    // Secret used to verify incoming bearer tokens (HS256).
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Local enables development conveniences (header bypass, pretty logs, optional database).
/// Production requires every secret to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Safe, non-panicking values for tests: local mode, in-memory store.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, so the service never
    /// starts with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("APP_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                bind_addr,
            },
        }
    }
}

use std::env;

/// Fallback signing secret for local runs. Production refuses to start without `JWT_SECRET`.
pub const LOCAL_JWT_SECRET: &str = "inkwell-local-development-secret";

/// Sessions last 30 days unless `TOKEN_TTL_SECS` says otherwise.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Upper bound on an uploaded logo image (5 MiB).
pub const DEFAULT_MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup
/// and immutable afterwards; handlers reach it through `FromRef<AppState>`.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Postgres connection string. Optional only in local mode (in-memory store fallback).
    pub db_url: Option<String>,
    // Process-wide HMAC secret used to sign and validate session tokens.
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub bind_addr: String,
    pub max_logo_bytes: usize,
    // bcrypt work factor. Tests lower it to keep hashing fast.
    pub bcrypt_cost: u32,
    // First-run administrator, created when no user holds that email yet.
    pub admin_seed: Option<AdminSeed>,
}

/// AdminSeed
///
/// Credentials read from `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME`.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Env
///
/// Defines the runtime context: pretty logs and lenient defaults locally,
/// JSON logs and mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for tests. No database: callers pick a store explicitly.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            bind_addr: "127.0.0.1:3000".to_string(),
            max_logo_bytes: DEFAULT_MAX_LOGO_BYTES,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_seed: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and fails fast.
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, so the
    /// service never starts with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let admin_seed = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed {
                    email,
                    password,
                    name: env::var("ADMIN_NAME").ok().filter(|n| !n.is_empty()),
                })
            }
            _ => None,
        };

        Self {
            env,
            db_url,
            jwt_secret,
            token_ttl_secs: parse_var("TOKEN_TTL_SECS").unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_logo_bytes: parse_var("MAX_LOGO_BYTES").unwrap_or(DEFAULT_MAX_LOGO_BYTES),
            bcrypt_cost: parse_var("BCRYPT_COST").unwrap_or(bcrypt::DEFAULT_COST),
            admin_seed,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

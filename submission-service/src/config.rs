use std::env;

use sqlx::postgres::PgSslMode;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub ssl_mode: PgSslMode,
    pub max_connections: u32,
    /// Empty means any origin may call the API.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            Error::Config(
                "DATABASE_URL environment variable is required to run the API server".to_string(),
            )
        })?;

        let ssl_mode = parse_ssl_mode(&env::var("PGSSLMODE").unwrap_or_default())?;

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(5);

        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .unwrap_or_default();

        Ok(Self {
            port,
            database_url,
            ssl_mode,
            max_connections,
            allowed_origins,
        })
    }
}

/// Maps `PGSSLMODE` onto a connection mode. Unset, `disable` and `allow`
/// connect without TLS; `require` encrypts without verifying the server
/// certificate; the verifying libpq modes pass through.
pub fn parse_ssl_mode(raw: &str) -> Result<PgSslMode> {
    match raw.trim().to_lowercase().as_str() {
        "" | "disable" | "allow" => Ok(PgSslMode::Disable),
        "prefer" => Ok(PgSslMode::Prefer),
        "require" => Ok(PgSslMode::Require),
        "verify-ca" => Ok(PgSslMode::VerifyCa),
        "verify-full" => Ok(PgSslMode::VerifyFull),
        other => Err(Error::Config(format!("Unsupported PGSSLMODE '{other}'"))),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

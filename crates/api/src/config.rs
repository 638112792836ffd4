//! Application configuration loaded from environment variables.

use access::{AuthConfig, DEFAULT_TOKEN_TTL_MINUTES, MAX_TOKEN_TTL_MINUTES};

/// Signing secret used when `JWT_SECRET` is unset. Only suitable for local
/// development.
pub const DEV_JWT_SECRET: &str = "MyVerySecureAndLongSecretKey12345";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the
///   in-memory store
/// - `JWT_SECRET`: token signing secret, at least 32 bytes
/// - `JWT_ISSUER` / `JWT_AUDIENCE`: expected token issuer and audience
/// - `TOKEN_TTL_MINUTES`: token lifetime, at most one week (default: `30`)
/// - `CORS_ORIGIN`: allowed browser origin (default: `"http://localhost:5173"`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_minutes: i64,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            jwt_secret: lookup("JWT_SECRET").filter(|secret| !secret.is_empty()),
            jwt_issuer: lookup("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: lookup("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            token_ttl_minutes: lookup("TOKEN_TTL_MINUTES")
                .and_then(|m| m.parse().ok())
                .filter(|m: &i64| (1..=MAX_TOKEN_TTL_MINUTES).contains(m))
                .unwrap_or(defaults.token_ttl_minutes),
            cors_origin: lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Token settings for the access gate.
    ///
    /// Falls back to [`DEV_JWT_SECRET`] with a warning when no secret is
    /// configured.
    pub fn auth_config(&self) -> AuthConfig {
        let secret = match &self.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!("JWT_SECRET not set, using the development signing secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        AuthConfig::new(secret)
            .with_issuer(self.jwt_issuer.clone())
            .with_audience(self.jwt_audience.clone())
            .with_ttl(chrono::Duration::minutes(self.token_ttl_minutes))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            jwt_secret: None,
            jwt_issuer: "http://localhost:5122".to_string(),
            jwt_audience: "http://localhost:5173".to_string(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

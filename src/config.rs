//! Runtime configuration, read from the environment at startup.
//! The signing secret and token TTL have no defaults: a deployment that
//! forgot them should fail to boot rather than run with a guessable key.

use anyhow::{ensure, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub db_root: String,
    /// Base64-encoded HMAC-SHA256 signing key.
    pub jwt_secret: String,
    /// Token lifetime in milliseconds.
    pub jwt_ttl_ms: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_port = match std::env::var("GATEHOUSE_HTTP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("GATEHOUSE_HTTP_PORT is not a valid port: {v}"))?,
            Err(_) => 7878,
        };
        let db_root =
            std::env::var("GATEHOUSE_DB_FOLDER").unwrap_or_else(|_| "dbs".to_string());
        let jwt_secret = std::env::var("GATEHOUSE_JWT_SECRET")
            .context("GATEHOUSE_JWT_SECRET must be set to a base64-encoded HMAC key")?;
        let jwt_ttl_ms: i64 = std::env::var("GATEHOUSE_JWT_TTL_MS")
            .context("GATEHOUSE_JWT_TTL_MS must be set to the token lifetime in milliseconds")?
            .parse()
            .context("GATEHOUSE_JWT_TTL_MS is not a number")?;
        ensure!(jwt_ttl_ms > 0, "GATEHOUSE_JWT_TTL_MS must be positive");
        Ok(Self { http_port, db_root, jwt_secret, jwt_ttl_ms })
    }
}

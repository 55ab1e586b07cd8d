use anyhow::Context;

/// Process configuration, read from the environment (and `.env` via dotenvy).
///
/// | Env Var          | Default                              |
/// |------------------|--------------------------------------|
/// | `DATABASE_URL`   | `sqlite://arc_exchange.db?mode=rwc`  |
/// | `SECRET_KEY`     | required                             |
/// | `HOST`           | `0.0.0.0`                            |
/// | `PORT`           | `3000`                               |
/// | `FRONTEND_URL`   | `http://127.0.0.1:3001`              |
/// | `MAX_BODY_BYTES` | `1048576`                            |
/// | `TOKEN_TTL_DAYS` | `30`                                 |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    /// Where non-API requests are proxied (the web frontend).
    pub frontend_url: String,
    pub max_body_bytes: usize,
    pub token_ttl_days: i64,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;

        let port = var_or("PORT", "3000")
            .parse()
            .context("PORT must be a valid u16")?;
        let max_body_bytes = var_or("MAX_BODY_BYTES", "1048576")
            .parse()
            .context("MAX_BODY_BYTES must be a valid size")?;
        let token_ttl_days = var_or("TOKEN_TTL_DAYS", "30")
            .parse()
            .context("TOKEN_TTL_DAYS must be a number of days")?;

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://arc_exchange.db?mode=rwc"),
            secret_key,
            host: var_or("HOST", "0.0.0.0"),
            port,
            frontend_url: var_or("FRONTEND_URL", "http://127.0.0.1:3001"),
            max_body_bytes,
            token_ttl_days,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

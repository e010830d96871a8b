/// Configuration management for the API server
///
/// Loaded from the environment (and `.env` when present).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8000`)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for permissive (default `*`)
/// - `PRODUCTION`: enables HSTS (default `false`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `JWT_SECRET`: HS256 signing secret, at least 32 characters (required)
/// - `REDIS_URL`: enables per-user rate limiting when set
/// - `PAYDUNYA_MASTER_KEY`, `PAYDUNYA_PRIVATE_KEY`, `PAYDUNYA_TOKEN`: gateway credentials
/// - `PAYDUNYA_MODE`: `test` (sandbox) or `live` (default `test`)
/// - `PAYDUNYA_STORE_NAME`: store name on invoices (default `TaskAfy`)
/// - `FRONTEND_URL`: base of payment return/cancel URLs
/// - `PUBLIC_API_URL`: base of the IPN callback URL
///
/// # Example
///
/// ```no_run
/// use taskafy_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis_url: Option<String>,
    pub paydunya: PaydunyaSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,

    /// Web frontend base URL
    pub frontend_url: String,

    /// Externally reachable base URL of this API
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaydunyaSettings {
    pub master_key: String,
    pub private_key: String,
    pub token: String,
    pub mode: String,
    pub store_name: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` or `JWT_SECRET` is missing, the secret is
    /// shorter than 32 characters, or a numeric variable doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = var_or("API_PORT", "8000").parse::<u16>()?;

        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = var_or("PRODUCTION", "false").eq_ignore_ascii_case("true");

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port,
                cors_origins,
                production,
                frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
                public_url: var_or("PUBLIC_API_URL", "http://localhost:8000"),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            redis_url,
            paydunya: PaydunyaSettings {
                master_key: var_or("PAYDUNYA_MASTER_KEY", ""),
                private_key: var_or("PAYDUNYA_PRIVATE_KEY", ""),
                token: var_or("PAYDUNYA_TOKEN", ""),
                mode: var_or("PAYDUNYA_MODE", "test"),
                store_name: var_or("PAYDUNYA_STORE_NAME", "TaskAfy"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Where Paydunya posts instant payment notifications
    pub fn ipn_callback_url(&self) -> String {
        format!(
            "{}/api/payments/webhook/paydunya-ipn",
            self.api.public_url.trim_end_matches('/')
        )
    }

    pub fn payment_return_url(&self, task_id: uuid::Uuid) -> String {
        format!(
            "{}/payment/success?task_id={}",
            self.api.frontend_url.trim_end_matches('/'),
            task_id
        )
    }

    pub fn payment_cancel_url(&self, task_id: uuid::Uuid) -> String {
        format!(
            "{}/payment/cancel?task_id={}",
            self.api.frontend_url.trim_end_matches('/'),
            task_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["*".to_string()],
                production: false,
                frontend_url: "https://taskafy.app/".to_string(),
                public_url: "https://api.taskafy.app".to_string(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            redis_url: None,
            paydunya: PaydunyaSettings {
                master_key: String::new(),
                private_key: String::new(),
                token: String::new(),
                mode: "test".to_string(),
                store_name: "TaskAfy".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(sample().bind_address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_payment_urls() {
        let config = sample();
        let task_id = uuid::Uuid::nil();

        assert_eq!(
            config.ipn_callback_url(),
            "https://api.taskafy.app/api/payments/webhook/paydunya-ipn"
        );
        assert_eq!(
            config.payment_return_url(task_id),
            format!("https://taskafy.app/payment/success?task_id={}", task_id)
        );
        assert!(config.payment_cancel_url(task_id).starts_with("https://taskafy.app/payment/cancel"));
    }
}

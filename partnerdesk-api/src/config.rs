/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `APP_ENV`: `production` enables secure cross-site cookies and JSON
///   logs; anything else is development (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any
///   (default: `FRONTEND_URL`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `ADMIN_EMAILS`: Comma-separated admin allow-list
/// - `FRONTEND_URL`: Base URL used in invite links (default: http://localhost:3000)
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM`:
///   SMTP relay; when `SMTP_HOST` is unset emails are only logged
///
/// # Example
///
/// ```no_run
/// use partnerdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production deployment (secure cookies, JSON logs)
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HS256 secret
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Admin bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Emails allowed to log in as admin
    pub emails: Vec<String>,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Base URL of the frontend that serves `/setup-partner`
    pub frontend_url: String,

    /// SMTP relay; `None` logs emails instead of sending them
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        let frontend_url = var("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| vec![frontend_url.clone()]);

        let admin_emails = var("ADMIN_EMAILS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let smtp = match var("SMTP_HOST") {
            None => None,
            Some(host) => {
                let port = var("SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("SMTP_PORT is not a valid port: {}", e))?;
                let from = var("MAIL_FROM").ok_or_else(|| {
                    anyhow::anyhow!("MAIL_FROM is required when SMTP_HOST is set")
                })?;

                Some(SmtpSettings {
                    host,
                    port,
                    username: var("SMTP_USERNAME"),
                    password: var("SMTP_PASSWORD"),
                    from,
                })
            }
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            admin: AdminConfig {
                emails: admin_emails,
            },
            mail: MailConfig { frontend_url, smtp },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: any)
/// - `APP_ENV`: `production` enables production mode
/// - `DATABASE_URL`: PostgreSQL connection string (unset = in-memory store)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT validation (required, >= 32 chars)
/// - `FLUTTERWAVE_SECRET_KEY`: Processor secret key (required)
/// - `FLUTTERWAVE_BASE_URL`: Processor API base (default: https://api.flutterwave.com)
/// - `FLUTTERWAVE_SECRET_HASH`: Webhook shared secret (unset = webhooks rejected)
/// - `FRONTEND_URL`: Where checkout redirects back to (default: http://localhost:5173)
/// - `PRO_PLAN_PRICE`: Price of the pro plan (default: 2000)
/// - `PRO_PLAN_CURRENCY`: Currency code (default: NGN)
/// - `PAYMENT_TIMEOUT_SECS`: Processor call timeout (default: 15)
/// - `PAYMENT_REFERENCE_TTL_MINUTES`: Pending reference lifetime (default: 30)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use organizit_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use organizit_shared::payments::flutterwave::{FlutterwaveConfig, DEFAULT_BASE_URL};
use organizit_shared::payments::UpgradeSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Payment processor and upgrade flow
    pub payment: PaymentConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; `None` runs on the in-memory store
    pub url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT validation
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Payment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Flutterwave secret key (bearer token)
    pub flutterwave_secret_key: String,

    /// Flutterwave API base URL
    pub base_url: String,

    /// Shared secret the processor sends in `verif-hash`
    pub webhook_secret_hash: Option<String>,

    /// Frontend origin for the post-checkout redirect
    pub frontend_url: String,

    /// Price of the pro plan
    pub price: Decimal,

    /// ISO currency code
    pub currency: String,

    /// Processor call timeout in seconds
    pub timeout_secs: u64,

    /// Pending reference lifetime in minutes
    pub reference_ttl_minutes: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let defaults = UpgradeSettings::default();
        Self {
            flutterwave_secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            webhook_secret_hash: None,
            frontend_url: defaults.frontend_url,
            price: defaults.price,
            currency: defaults.currency,
            timeout_secs: 15,
            reference_ttl_minutes: defaults.reference_ttl.num_minutes(),
        }
    }
}

impl PaymentConfig {
    /// Settings for the upgrade flow
    pub fn upgrade_settings(&self) -> UpgradeSettings {
        UpgradeSettings {
            price: self.price,
            currency: self.currency.clone(),
            frontend_url: self.frontend_url.clone(),
            reference_ttl: chrono::Duration::minutes(self.reference_ttl_minutes),
            ..Default::default()
        }
    }

    /// Settings for the Flutterwave client
    pub fn flutterwave(&self) -> FlutterwaveConfig {
        FlutterwaveConfig {
            secret_key: self.flutterwave_secret_key.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Reads an optional variable, treating blank values as unset
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a comma-separated origin list
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = optional_var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = optional_var("DATABASE_URL");
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let defaults = PaymentConfig::default();

        let flutterwave_secret_key = optional_var("FLUTTERWAVE_SECRET_KEY").ok_or_else(|| {
            anyhow::anyhow!("FLUTTERWAVE_SECRET_KEY environment variable is required")
        })?;

        let price = match optional_var("PRO_PLAN_PRICE") {
            Some(raw) => Decimal::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("PRO_PLAN_PRICE is not a valid amount: {}", e))?,
            None => defaults.price,
        };
        if price <= Decimal::ZERO {
            anyhow::bail!("PRO_PLAN_PRICE must be positive");
        }

        let timeout_secs = match optional_var("PAYMENT_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>()?,
            None => defaults.timeout_secs,
        };
        let reference_ttl_minutes = match optional_var("PAYMENT_REFERENCE_TTL_MINUTES") {
            Some(raw) => raw.parse::<i64>()?,
            None => defaults.reference_ttl_minutes,
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
            },
            payment: PaymentConfig {
                flutterwave_secret_key,
                base_url: optional_var("FLUTTERWAVE_BASE_URL").unwrap_or(defaults.base_url),
                webhook_secret_hash: optional_var("FLUTTERWAVE_SECRET_HASH"),
                frontend_url: optional_var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
                price,
                currency: optional_var("PRO_PLAN_CURRENCY").unwrap_or(defaults.currency),
                timeout_secs,
                reference_ttl_minutes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

use std::env;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub jwt: JwtConfig,
    pub tokens: TokenTtlConfig,
    pub stripe: StripeConfig,
    pub token_cleanup_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

/// Lifetimes of the one-time account tokens.
#[derive(Debug, Clone)]
pub struct TokenTtlConfig {
    pub activation_ttl_hours: i64,
    pub password_reset_ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout_secs: u64,
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            access_ttl_minutes: parse_or("JWT_ACCESS_TTL_MINUTES", 15),
            refresh_ttl_days: parse_or("JWT_REFRESH_TTL_DAYS", 14),
        };

        let tokens = TokenTtlConfig {
            activation_ttl_hours: parse_or("ACTIVATION_TTL_HOURS", 24),
            password_reset_ttl_hours: parse_or("PASSWORD_RESET_TTL_HOURS", 1),
        };

        let stripe = StripeConfig {
            secret_key: env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY is not set")?,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET is not set")?,
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            currency: env::var("STRIPE_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            success_url: env::var("STRIPE_SUCCESS_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}/success")),
            cancel_url: env::var("STRIPE_CANCEL_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}/cancel")),
            timeout_secs: parse_or("PAYMENT_TIMEOUT_SECS", 10),
            webhook_tolerance_secs: parse_or("WEBHOOK_TOLERANCE_SECS", 300),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            jwt,
            tokens,
            stripe,
            token_cleanup_interval_secs: parse_or("TOKEN_CLEANUP_INTERVAL_SECS", 3600),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

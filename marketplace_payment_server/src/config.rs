use std::env;

use chrono::Duration;
use log::*;
use mpg_common::Secret;

const DEFAULT_MPG_HOST: &str = "127.0.0.1";
const DEFAULT_MPG_PORT: u16 = 4460;
/// Maximum age of a delivery's signed timestamp, in seconds.
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
/// How long an uncommitted idempotency claim shadows redeliveries, in seconds.
const DEFAULT_LEDGER_LEASE_SECS: i64 = 300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret with the payment provider, used to verify webhook signatures.
    pub webhook: WebhookConfig,
    /// The lease duration handed to the idempotency ledger for every claim.
    pub ledger_lease: Duration,
}

/// The subset of configuration the webhook route needs. Shared with the actix workers as
/// `web::Data`.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    /// Deliveries whose signed timestamp is older than this are rejected outright.
    pub tolerance: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MPG_HOST.to_string(),
            port: DEFAULT_MPG_PORT,
            database_url: String::default(),
            webhook: WebhookConfig {
                secret: Secret::default(),
                tolerance: Duration::seconds(DEFAULT_WEBHOOK_TOLERANCE_SECS),
            },
            ledger_lease: Duration::seconds(DEFAULT_LEDGER_LEASE_SECS),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MPG_HOST").ok().unwrap_or_else(|| DEFAULT_MPG_HOST.into());
        let port = env::var("MPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MPG_PORT. {e} Using the default, {DEFAULT_MPG_PORT}, instead."
                    );
                    DEFAULT_MPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MPG_PORT);
        let database_url = env::var("MPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MPG_DATABASE_URL is not set. Please set it to the URL for the payments database.");
            String::default()
        });
        let secret = env::var("MPG_WEBHOOK_SECRET").map(Secret::new).unwrap_or_default();
        if secret.is_empty() {
            error!(
                "🪛️ MPG_WEBHOOK_SECRET is not set. Every webhook delivery will fail signature verification until it \
                 is configured."
            );
        }
        let tolerance = duration_from_env("MPG_WEBHOOK_TOLERANCE_SECS", DEFAULT_WEBHOOK_TOLERANCE_SECS);
        let ledger_lease = duration_from_env("MPG_LEDGER_LEASE_SECS", DEFAULT_LEDGER_LEASE_SECS);
        Self {
            host,
            port,
            database_url,
            webhook: WebhookConfig { secret, tolerance },
            ledger_lease,
        }
    }
}

fn duration_from_env(var: &str, default_secs: i64) -> Duration {
    let secs = env::var(var)
        .map(|s| {
            s.parse::<i64>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid number of seconds for {var}. {e} Using {default_secs} instead.");
                default_secs
            })
        })
        .ok()
        .unwrap_or(default_secs);
    Duration::seconds(secs)
}

use std::env;

use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use ucs_common::{Secret, Usdt};

const DEFAULT_UCS_HOST: &str = "127.0.0.1";
const DEFAULT_UCS_PORT: u16 = 8380;
const DEFAULT_CATALOG_PATH: &str = "data/catalog.json";
const DEFAULT_MIN_COMMISSION_MILLI: i64 = 30;
const DEFAULT_TOPUP_LIFETIME: Duration = Duration::hours(2);
const DEFAULT_RUB_USDT_RATE: f64 = 95.0;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The shared secret the bot process must present in the `X-Api-Key` header on `/api` calls.
    pub api_secret: Secret<String>,
    /// Path to the JSON item catalog loaded at startup.
    pub catalog_path: String,
    /// The smallest commission added to wallet deposits before disambiguation.
    pub min_commission: Usdt,
    /// How long an unpaid deposit request survives before the sweep deletes it.
    pub topup_lifetime: Duration,
    /// Rubles per USDT, used to credit ruble-gateway deposits.
    pub rub_usdt_rate: f64,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UCS_HOST.to_string(),
            port: DEFAULT_UCS_PORT,
            database_url: String::default(),
            api_secret: Secret::default(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            min_commission: Usdt::from_milli(DEFAULT_MIN_COMMISSION_MILLI),
            topup_lifetime: DEFAULT_TOPUP_LIFETIME,
            rub_usdt_rate: DEFAULT_RUB_USDT_RATE,
            use_x_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("UCS_HOST").ok().unwrap_or_else(|| DEFAULT_UCS_HOST.into());
        let port = env::var("UCS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for UCS_PORT. {e} Using the default, {DEFAULT_UCS_PORT}, instead."
                    );
                    DEFAULT_UCS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_UCS_PORT);
        let database_url = env::var("UCS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ UCS_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let api_secret = env::var("UCS_API_SECRET").ok().unwrap_or_else(|| {
            let secret: String = rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect();
            warn!(
                "🪛️ UCS_API_SECRET is not set. A random secret has been generated for this run, which means API \
                 clients will be locked out after a restart. Set UCS_API_SECRET to a stable value in production."
            );
            secret
        });
        let catalog_path = env::var("UCS_CATALOG_PATH").ok().unwrap_or_else(|| DEFAULT_CATALOG_PATH.into());
        let min_commission = env::var("UCS_MIN_COMMISSION")
            .ok()
            .and_then(|s| {
                s.parse::<Usdt>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid amount for UCS_MIN_COMMISSION. {e} Using the default.");
                    })
                    .ok()
            })
            .unwrap_or_else(|| Usdt::from_milli(DEFAULT_MIN_COMMISSION_MILLI));
        let topup_lifetime = env::var("UCS_TOPUP_LIFETIME_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or(DEFAULT_TOPUP_LIFETIME);
        let rub_usdt_rate = env::var("UCS_RUB_USDT_RATE")
            .ok()
            .and_then(|s| {
                s.parse::<f64>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid rate for UCS_RUB_USDT_RATE. {e} Using the default.");
                    })
                    .ok()
            })
            .filter(|rate| {
                let valid = rate.is_finite() && *rate > 0.0;
                if !valid {
                    error!("🪛️ UCS_RUB_USDT_RATE must be a positive number. Using the default.");
                }
                valid
            })
            .unwrap_or(DEFAULT_RUB_USDT_RATE);
        let use_x_forwarded_for =
            env::var("UCS_USE_X_FORWARDED_FOR").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        Self {
            host,
            port,
            database_url,
            api_secret: Secret::new(api_secret),
            catalog_path,
            min_commission,
            topup_lifetime,
            rub_usdt_rate,
            use_x_forwarded_for,
        }
    }
}

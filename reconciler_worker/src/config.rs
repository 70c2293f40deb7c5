//! Worker configuration.
//!
//! Every setting is read from an `RCW_*` environment variable. Missing or invalid values are logged and replaced by
//! their defaults, so a worker always starts; only the adapters whose URL is missing are disabled.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use order_reconciler::{
    fanout::DEFAULT_POOL_REFRESH_TTL,
    order_fixes::DEFAULT_FIX_PAGE_SIZE,
    pipelines::DEFAULT_ACTIVITY_BATCH_SIZE,
};
use reconcile_common::{parse_boolean_flag, Address, Secret};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/reconciler.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACTIVITY_TRIGGER_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// JSON-RPC endpoint for read-only contract calls. These URLs usually carry an API key.
    pub rpc_url: Option<Secret<String>>,
    /// The protocol SDK service that runs off-chain order checks and mint refreshes.
    pub sdk_url: Option<String>,
    pub search_url: Option<String>,
    /// When false the worker connects and migrates the store but starts no consumers or triggers.
    pub do_background_work: bool,
    /// Enables the activity and token listing pipelines.
    pub do_search_work: bool,
    pub activity_trigger_interval: Duration,
    pub fix_page_size: u32,
    pub pool_refresh_ttl: Duration,
    pub activity_batch_size: u32,
    /// Transfers from these addresses are indexed as mints, in addition to transfers from the zero address.
    pub mint_addresses: Vec<Address>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            rpc_url: None,
            sdk_url: None,
            search_url: None,
            do_background_work: true,
            do_search_work: false,
            activity_trigger_interval: DEFAULT_ACTIVITY_TRIGGER_INTERVAL,
            fix_page_size: DEFAULT_FIX_PAGE_SIZE,
            pool_refresh_ttl: DEFAULT_POOL_REFRESH_TTL,
            activity_batch_size: DEFAULT_ACTIVITY_BATCH_SIZE,
            mint_addresses: Vec::new(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let database_url = env::var("RCW_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ RCW_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections = parse_or_default("RCW_DB_MAX_CONNECTIONS", defaults.db_max_connections);
        let rpc_url = optional_url("RCW_RPC_URL", "Collection pool checks").map(Secret::new);
        let sdk_url = optional_url("RCW_SDK_URL", "Off-chain checks and mint refreshes");
        let search_url = optional_url("RCW_SEARCH_URL", "Token listing indexing");
        let do_background_work = parse_boolean_flag(env::var("RCW_DO_BACKGROUND_WORK").ok(), true);
        let do_search_work = parse_boolean_flag(env::var("RCW_DO_SEARCH_WORK").ok(), false);
        let activity_trigger_interval = Duration::from_secs(parse_or_default(
            "RCW_ACTIVITY_TRIGGER_INTERVAL_SECS",
            defaults.activity_trigger_interval.as_secs(),
        ));
        let fix_page_size = parse_or_default("RCW_FIX_PAGE_SIZE", defaults.fix_page_size).max(1);
        let pool_refresh_ttl =
            Duration::from_secs(parse_or_default("RCW_POOL_REFRESH_TTL_SECS", defaults.pool_refresh_ttl.as_secs()));
        let activity_batch_size = parse_or_default("RCW_ACTIVITY_BATCH_SIZE", defaults.activity_batch_size).max(1);
        let mint_addresses = env::var("RCW_MINT_ADDRESSES").map(|s| parse_addresses(&s)).unwrap_or_default();
        Self {
            database_url,
            db_max_connections,
            rpc_url,
            sdk_url,
            search_url,
            do_background_work,
            do_search_work,
            activity_trigger_interval,
            fix_page_size,
            pool_refresh_ttl,
            activity_batch_size,
            mint_addresses,
        }
    }
}

fn parse_or_default<T>(var: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match env::var(var) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
    }
}

fn optional_url(var: &str, feature: &str) -> Option<String> {
    match env::var(var).map(|s| s.trim().trim_end_matches('/').to_string()) {
        Ok(s) if !s.is_empty() => Some(s),
        _ => {
            warn!("🪛️ {var} is not set. {feature} will be unavailable.");
            None
        },
    }
}

/// Parses a comma-separated address list, skipping (and logging) anything that is not an address.
pub fn parse_addresses(s: &str) -> Vec<Address> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<Address>()
                .map_err(|e| warn!("🪛️ Ignoring invalid address ({s}) in RCW_MINT_ADDRESSES: {e}"))
                .ok()
        })
        .collect()
}

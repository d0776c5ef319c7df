use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use apisign_common::flag_or_default;
use apisign_engine::{
    config::{DEFAULT_SALT_GENERATE_PATH, DEFAULT_SIGN_GENERATE_PATH},
    BackendKind,
    SaltMode,
    SignConfig,
};
use log::*;

const DEFAULT_APISIGN_HOST: &str = "127.0.0.1";
const DEFAULT_APISIGN_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/apisign.db";
const DEFAULT_STATIC_CONFIG: &str = "apisign.toml";
const DEFAULT_SALT_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Only used by the `sql` and `mapped` backends.
    pub database_url: String,
    pub backend: BackendKind,
    /// The TOML file holding apps and interface salts for the `static` backend.
    pub static_config: PathBuf,
    pub sign: SignConfig,
    /// How often expired salts are removed from the ledger. Only relevant in stateful salt mode.
    pub salt_purge_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_APISIGN_HOST.to_string(),
            port: DEFAULT_APISIGN_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            backend: BackendKind::default(),
            static_config: PathBuf::from(DEFAULT_STATIC_CONFIG),
            sign: SignConfig::default(),
            salt_purge_interval: DEFAULT_SALT_PURGE_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("APISIGN_HOST").ok().unwrap_or(defaults.host);
        let port = parse_or_default("APISIGN_PORT", env::var("APISIGN_PORT").ok(), defaults.port);
        let backend = parse_or_default("APISIGN_BACKEND", env::var("APISIGN_BACKEND").ok(), defaults.backend);
        let database_url = env::var("APISIGN_DATABASE_URL").ok().unwrap_or_else(|| {
            if backend != BackendKind::Static {
                warn!("🪛️ APISIGN_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            }
            defaults.database_url
        });
        let static_config = env::var("APISIGN_STATIC_CONFIG").map(PathBuf::from).unwrap_or_else(|_| {
            if backend == BackendKind::Static {
                warn!("🪛️ APISIGN_STATIC_CONFIG is not set. Looking for secrets in {DEFAULT_STATIC_CONFIG}.");
            }
            defaults.static_config
        });
        let sign = sign_config_from_env();
        let salt_purge_interval = parse_or_default(
            "APISIGN_SALT_PURGE_INTERVAL_SECS",
            env::var("APISIGN_SALT_PURGE_INTERVAL_SECS").ok(),
            defaults.salt_purge_interval.as_secs(),
        );
        Self {
            host,
            port,
            database_url,
            backend,
            static_config,
            sign,
            salt_purge_interval: Duration::from_secs(salt_purge_interval.max(1)),
        }
    }
}

fn sign_config_from_env() -> SignConfig {
    let defaults = SignConfig::default();
    let signature_ttl = parse_or_default(
        "APISIGN_SIGNATURE_TTL_MS",
        env::var("APISIGN_SIGNATURE_TTL_MS").ok(),
        defaults.signature_ttl_ms(),
    );
    let dynamic_salt_ttl = parse_or_default(
        "APISIGN_DYNAMIC_SALT_TTL_MS",
        env::var("APISIGN_DYNAMIC_SALT_TTL_MS").ok(),
        defaults.dynamic_salt_ttl_ms(),
    );
    let salt_mode = parse_or_default("APISIGN_SALT_MODE", env::var("APISIGN_SALT_MODE").ok(), defaults.salt_mode);
    let salt_generate_path =
        env::var("APISIGN_SALT_GENERATE_PATH").ok().unwrap_or_else(|| DEFAULT_SALT_GENERATE_PATH.to_string());
    let sign_generate_path =
        env::var("APISIGN_SIGN_GENERATE_PATH").ok().unwrap_or_else(|| DEFAULT_SIGN_GENERATE_PATH.to_string());
    let default_with_params =
        flag_or_default(env::var("APISIGN_DEFAULT_WITH_PARAMS").ok().as_deref(), defaults.default_with_params);
    SignConfig {
        signature_ttl: chrono::Duration::milliseconds(positive_or_default(
            "APISIGN_SIGNATURE_TTL_MS",
            signature_ttl,
            defaults.signature_ttl_ms(),
        )),
        dynamic_salt_ttl: chrono::Duration::milliseconds(positive_or_default(
            "APISIGN_DYNAMIC_SALT_TTL_MS",
            dynamic_salt_ttl,
            defaults.dynamic_salt_ttl_ms(),
        )),
        salt_mode,
        salt_generate_path,
        sign_generate_path,
        default_with_params,
    }
}

/// Parses an environment value, logging and falling back to `default` when it is missing or malformed.
fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn positive_or_default(name: &str, value: i64, default: i64) -> i64 {
    if value > 0 {
        value
    } else {
        error!("🪛️ {name} must be positive. Using the default, {default}, instead.");
        default
    }
}

//! # Static secret store
//!
//! Caller secrets, permissions and per-endpoint fixed salts loaded once from a TOML table and never changed. Suited to
//! deployments with a handful of callers.
//!
//! ```toml
//! [[apps]]
//! app_code = "ios1"
//! app_secret = "a-long-shared-secret"
//! description = "iOS client"
//! permissions = ["/api/sign/dynamic-salt-generate", "/api/orders/**"]
//! forbidden = ["/api/orders/admin"]
//! status = "active"
//! expire_time = 1767225600000
//!
//! [[interface_salts]]
//! path = "/api/sign/submit-test"
//! salt = "fixed-salt-for-submit-test"
//! ```
//!
//! Salts issued in stateful mode are kept in an in-process ledger. The ledger is not shared between processes, so a
//! multi-instance deployment that needs replay protection should use one of the database backends.
use std::{collections::HashMap, path::Path, sync::Arc};

use apisign_common::{EpochMillis, Secret};
use log::*;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    db_types::{ApiDescriptor, ApiType, AppIdentity, DynamicSalt, RecordStatus},
    path_pattern::PathPattern,
    ResolverError,
    SaltLedger,
    SecretResolver,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticConfigFile {
    #[serde(default)]
    pub apps: Vec<StaticApp>,
    #[serde(default)]
    pub interface_salts: Vec<InterfaceSalt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticApp {
    pub app_code: String,
    pub app_secret: Secret<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default)]
    pub status: RecordStatus,
    pub expire_time: Option<EpochMillis>,
}

impl From<StaticApp> for AppIdentity {
    fn from(app: StaticApp) -> Self {
        AppIdentity {
            app_code: app.app_code,
            secret_key: app.app_secret,
            description: app.description,
            status: app.status,
            expire_time: app.expire_time,
            permitted_paths: app.permissions,
            forbidden_paths: app.forbidden,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceSalt {
    pub path: String,
    pub salt: Secret<String>,
    #[serde(default)]
    pub api_type: ApiType,
}

impl From<InterfaceSalt> for ApiDescriptor {
    fn from(s: InterfaceSalt) -> Self {
        ApiDescriptor { api_path: s.path, api_type: s.api_type, fixed_salt: Some(s.salt), status: RecordStatus::Active }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SaltKey {
    app_code: String,
    api_path: String,
    salt_value: String,
    issued_at: EpochMillis,
}

#[derive(Debug, Clone, Copy)]
struct SaltEntry {
    expires_at: EpochMillis,
    used: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    identities: Arc<HashMap<String, AppIdentity>>,
    descriptors: Arc<HashMap<String, ApiDescriptor>>,
    ledger: Arc<Mutex<HashMap<SaltKey, SaltEntry>>>,
}

impl StaticSecretStore {
    pub fn new(identities: Vec<AppIdentity>, descriptors: Vec<ApiDescriptor>) -> Self {
        let identities = identities.into_iter().map(|id| (id.app_code.clone(), id)).collect::<HashMap<_, _>>();
        let descriptors = descriptors.into_iter().map(|d| (d.api_path.clone(), d)).collect::<HashMap<_, _>>();
        Self { identities: Arc::new(identities), descriptors: Arc::new(descriptors), ledger: Arc::default() }
    }

    /// Builds a store from a parsed configuration file. Duplicate app codes and invalid permission patterns are
    /// configuration errors.
    pub fn from_config(config: StaticConfigFile) -> Result<Self, ResolverError> {
        let mut identities = Vec::with_capacity(config.apps.len());
        for app in config.apps {
            if app.app_code.trim().is_empty() || app.app_secret.is_empty() {
                return Err(ResolverError::ConfigurationError("Every app needs an app_code and app_secret".into()));
            }
            if identities.iter().any(|id: &AppIdentity| id.app_code == app.app_code) {
                return Err(ResolverError::ConfigurationError(format!("Duplicate app_code {}", app.app_code)));
            }
            for p in app.permissions.iter().chain(app.forbidden.iter()) {
                PathPattern::parse(p).map_err(|e| {
                    ResolverError::ConfigurationError(format!("Invalid path pattern '{p}' for {}. {e}", app.app_code))
                })?;
            }
            identities.push(AppIdentity::from(app));
        }
        let descriptors = config.interface_salts.into_iter().map(ApiDescriptor::from).collect::<Vec<_>>();
        info!(
            "🪛️ Static secret store loaded with {} apps and {} interface salts",
            identities.len(),
            descriptors.len()
        );
        Ok(Self::new(identities, descriptors))
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ResolverError> {
        let config = toml::from_str::<StaticConfigFile>(s)
            .map_err(|e| ResolverError::ConfigurationError(format!("Could not parse static configuration. {e}")))?;
        Self::from_config(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ResolverError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ResolverError::ConfigurationError(format!("Could not read static configuration {}. {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn app_count(&self) -> usize {
        self.identities.len()
    }
}

impl SecretResolver for StaticSecretStore {
    async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError> {
        Ok(self.identities.get(app_code).cloned())
    }

    async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError> {
        Ok(self.descriptors.get(api_path).cloned())
    }
}

impl SaltLedger for StaticSecretStore {
    async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError> {
        let key = SaltKey {
            app_code: salt.app_code.clone(),
            api_path: salt.api_path.clone(),
            salt_value: salt.salt_value.clone(),
            issued_at: salt.issued_at,
        };
        let mut ledger = self.ledger.lock().await;
        ledger.entry(key).or_insert(SaltEntry { expires_at: salt.expires_at, used: false });
        trace!("🧂️ {} salts in the in-memory ledger", ledger.len());
        Ok(())
    }

    async fn consume_salt(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
        now: EpochMillis,
    ) -> Result<bool, ResolverError> {
        let key = SaltKey {
            app_code: app_code.to_string(),
            api_path: api_path.to_string(),
            salt_value: salt_value.to_string(),
            issued_at,
        };
        let mut ledger = self.ledger.lock().await;
        let consumed = match ledger.get_mut(&key) {
            Some(entry) if !entry.used && now <= entry.expires_at => {
                entry.used = true;
                true
            },
            _ => false,
        };
        Ok(consumed)
    }

    async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError> {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.len();
        ledger.retain(|_, entry| entry.expires_at >= now);
        Ok((before - ledger.len()) as u64)
    }
}

//! # Backend selection
//!
//! [`SecretBackend`] wraps exactly one resolver strategy, chosen once from [`BackendKind`] at start-up. The engine
//! APIs are generic over their backend, so they are instantiated with `SecretBackend` in the server and with the
//! concrete stores (or mocks) in tests.
use std::{fmt::Display, str::FromStr};

use apisign_common::EpochMillis;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{MappedSecretStore, SqlSecretStore};
use crate::{
    db_types::{ApiDescriptor, AppIdentity, DynamicSalt},
    ResolverError,
    SaltLedger,
    SecretResolver,
    StaticSecretStore,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Secrets from a static TOML table
    #[default]
    Static,
    /// Direct parameterised SQL
    Sql,
    /// Record-mapping repositories over the same schema as `Sql`
    Mapped,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "file" => Ok(BackendKind::Static),
            "sql" | "jdbc" => Ok(BackendKind::Sql),
            "mapped" | "orm" => Ok(BackendKind::Mapped),
            _ => Err(format!("Invalid secret backend: {s}")),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Static => write!(f, "static"),
            BackendKind::Sql => write!(f, "sql"),
            BackendKind::Mapped => write!(f, "mapped"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SecretBackend {
    Static(StaticSecretStore),
    #[cfg(feature = "sqlite")]
    Sql(SqlSecretStore),
    #[cfg(feature = "sqlite")]
    Mapped(MappedSecretStore),
}

impl SecretBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            SecretBackend::Static(_) => BackendKind::Static,
            #[cfg(feature = "sqlite")]
            SecretBackend::Sql(_) => BackendKind::Sql,
            #[cfg(feature = "sqlite")]
            SecretBackend::Mapped(_) => BackendKind::Mapped,
        }
    }
}

impl From<StaticSecretStore> for SecretBackend {
    fn from(store: StaticSecretStore) -> Self {
        SecretBackend::Static(store)
    }
}

#[cfg(feature = "sqlite")]
impl From<SqlSecretStore> for SecretBackend {
    fn from(store: SqlSecretStore) -> Self {
        SecretBackend::Sql(store)
    }
}

#[cfg(feature = "sqlite")]
impl From<MappedSecretStore> for SecretBackend {
    fn from(store: MappedSecretStore) -> Self {
        SecretBackend::Mapped(store)
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            SecretBackend::Static($store) => $call,
            #[cfg(feature = "sqlite")]
            SecretBackend::Sql($store) => $call,
            #[cfg(feature = "sqlite")]
            SecretBackend::Mapped($store) => $call,
        }
    };
}

impl SecretResolver for SecretBackend {
    async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError> {
        delegate!(self, s => s.fetch_identity(app_code).await)
    }

    async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError> {
        delegate!(self, s => s.fetch_api_descriptor(api_path).await)
    }
}

impl SaltLedger for SecretBackend {
    async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError> {
        delegate!(self, s => s.record_salt(salt).await)
    }

    async fn consume_salt(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
        now: EpochMillis,
    ) -> Result<bool, ResolverError> {
        delegate!(self, s => s.consume_salt(app_code, api_path, salt_value, issued_at, now).await)
    }

    async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError> {
        delegate!(self, s => s.purge_expired_salts(now).await)
    }
}

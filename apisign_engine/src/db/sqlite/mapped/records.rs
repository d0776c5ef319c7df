//! Row-shaped records for the signing tables and their mapping into domain types.
use apisign_common::{EpochMillis, Secret};
use chrono::NaiveDateTime;
use log::warn;
use sqlx::FromRow;

use crate::db_types::{ApiDescriptor, ApiType, AppIdentity, DynamicSalt, RecordStatus};

#[derive(Debug, Clone, FromRow)]
pub struct ApiUserRecord {
    pub id: i64,
    pub app_code: String,
    pub app_secret: String,
    pub description: Option<String>,
    pub status: i64,
    pub expire_time: Option<EpochMillis>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApiAuthRecord {
    pub id: i64,
    pub app_code: String,
    pub api_path: String,
    pub status: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ApiInfoRecord {
    pub id: i64,
    pub api_path: String,
    pub api_name: Option<String>,
    pub api_type: String,
    pub fixed_salt: Option<String>,
    pub status: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct DynamicSaltRecord {
    pub id: i64,
    pub app_code: String,
    pub api_path: String,
    pub salt_value: String,
    pub salt_timestamp: EpochMillis,
    pub expire_time: EpochMillis,
    pub used: bool,
}

impl ApiUserRecord {
    /// Combines the user row with its grants.
    pub fn into_identity(self, grants: Vec<ApiAuthRecord>) -> AppIdentity {
        let (permitted, forbidden): (Vec<ApiAuthRecord>, Vec<ApiAuthRecord>) =
            grants.into_iter().partition(|g| RecordStatus::from_flag(g.status) == RecordStatus::Active);
        AppIdentity {
            app_code: self.app_code,
            secret_key: Secret::new(self.app_secret),
            description: self.description,
            status: RecordStatus::from_flag(self.status),
            expire_time: self.expire_time,
            permitted_paths: permitted.into_iter().map(|g| g.api_path).collect(),
            forbidden_paths: forbidden.into_iter().map(|g| g.api_path).collect(),
        }
    }
}

impl From<ApiInfoRecord> for ApiDescriptor {
    fn from(record: ApiInfoRecord) -> Self {
        let api_type = record.api_type.parse::<ApiType>().unwrap_or_else(|e| {
            warn!("🗃️ {e} for {}. Treating it as NEED_SIGN.", record.api_path);
            ApiType::NeedSign
        });
        ApiDescriptor {
            api_path: record.api_path,
            api_type,
            fixed_salt: record.fixed_salt.map(Secret::new),
            status: RecordStatus::from_flag(record.status),
        }
    }
}

impl From<DynamicSaltRecord> for DynamicSalt {
    fn from(record: DynamicSaltRecord) -> Self {
        DynamicSalt {
            app_code: record.app_code,
            api_path: record.api_path,
            salt_value: record.salt_value,
            issued_at: record.salt_timestamp,
            expires_at: record.expire_time,
            consumed: record.used,
        }
    }
}

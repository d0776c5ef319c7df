//! Domain records shared by every secret-resolver backend.
use std::{fmt::Display, str::FromStr};

use apisign_common::{EpochMillis, Secret};
use serde::{Deserialize, Serialize};

use crate::{canonical::SignParams, path_pattern::matches_any};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    /// Status columns are stored as integers, `1` being active.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            RecordStatus::Active
        } else {
            RecordStatus::Inactive
        }
    }

    pub fn as_flag(&self) -> i64 {
        match self {
            RecordStatus::Active => 1,
            RecordStatus::Inactive => 0,
        }
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "active"),
            RecordStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// A registered caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub app_code: String,
    pub secret_key: Secret<String>,
    pub description: Option<String>,
    pub status: RecordStatus,
    pub expire_time: Option<EpochMillis>,
    pub permitted_paths: Vec<String>,
    pub forbidden_paths: Vec<String>,
}

impl AppIdentity {
    pub fn new<S: Into<String>>(app_code: S, secret_key: S) -> Self {
        Self {
            app_code: app_code.into(),
            secret_key: Secret::new(secret_key.into()),
            description: None,
            status: RecordStatus::Active,
            expire_time: None,
            permitted_paths: vec![],
            forbidden_paths: vec![],
        }
    }

    pub fn with_permissions<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.permitted_paths = paths.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    pub fn with_forbidden<S: AsRef<str>>(mut self, paths: &[S]) -> Self {
        self.forbidden_paths = paths.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_expire_time(mut self, expire_time: EpochMillis) -> Self {
        self.expire_time = Some(expire_time);
        self
    }

    /// Inactive or expired identities behave as if they did not exist.
    pub fn is_usable(&self, now: EpochMillis) -> bool {
        self.status == RecordStatus::Active && self.expire_time.map(|t| now < t).unwrap_or(true)
    }

    /// Forbidden entries are checked independently of, and take precedence over, permitted entries.
    pub fn permits(&self, api_path: &str) -> bool {
        !matches_any(&self.forbidden_paths, api_path) && matches_any(&self.permitted_paths, api_path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiType {
    #[default]
    NeedSign,
    NoSign,
}

impl FromStr for ApiType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEED_SIGN" => Ok(ApiType::NeedSign),
            "NO_SIGN" => Ok(ApiType::NoSign),
            _ => Err(format!("Invalid API type: {s}")),
        }
    }
}

impl Display for ApiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiType::NeedSign => write!(f, "NEED_SIGN"),
            ApiType::NoSign => write!(f, "NO_SIGN"),
        }
    }
}

/// A protected endpoint, keyed by its route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDescriptor {
    pub api_path: String,
    pub api_type: ApiType,
    pub fixed_salt: Option<Secret<String>>,
    pub status: RecordStatus,
}

impl ApiDescriptor {
    pub fn new<S: Into<String>>(api_path: S, fixed_salt: S) -> Self {
        Self {
            api_path: api_path.into(),
            api_type: ApiType::NeedSign,
            fixed_salt: Some(Secret::new(fixed_salt.into())),
            status: RecordStatus::Active,
        }
    }

    /// The fixed salt, if this descriptor may be used to derive dynamic salts.
    pub fn usable_fixed_salt(&self) -> Option<&str> {
        if self.api_type != ApiType::NeedSign || self.status != RecordStatus::Active {
            return None;
        }
        self.fixed_salt.as_ref().map(|s| s.reveal().as_str()).filter(|s| !s.is_empty())
    }
}

/// A short-lived nonce bound to `(app_code, api_path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSalt {
    pub app_code: String,
    pub api_path: String,
    pub salt_value: String,
    pub issued_at: EpochMillis,
    pub expires_at: EpochMillis,
    /// Only meaningful for salts held in a ledger.
    pub consumed: bool,
}

/// The proof a caller attaches to a signed request. Exists for the duration of one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProof {
    pub app_code: String,
    pub api_path: String,
    pub timestamp: Option<EpochMillis>,
    pub signature_value: String,
    pub parameters: Option<SignParams>,
}

/// A signature issued by the server on a caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedSignature {
    pub app_code: String,
    pub api_path: String,
    pub signature_value: String,
    pub timestamp: EpochMillis,
    pub expires_at: Option<EpochMillis>,
}

use std::{fmt::Display, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SALT_GENERATE_PATH: &str = "/api/sign/dynamic-salt-generate";
pub const DEFAULT_SIGN_GENERATE_PATH: &str = "/api/sign/generate";

/// How dynamic salts are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaltMode {
    /// Salts are never stored. Validation recomputes the salt, so a salt may be used any number of times within its
    /// TTL.
    #[default]
    Stateless,
    /// Salts are recorded on issue and consumed on first successful validation.
    Stateful,
}

impl FromStr for SaltMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stateless" | "algorithm" => Ok(SaltMode::Stateless),
            "stateful" | "database" => Ok(SaltMode::Stateful),
            _ => Err(format!("Invalid salt mode: {s}")),
        }
    }
}

impl Display for SaltMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaltMode::Stateless => write!(f, "stateless"),
            SaltMode::Stateful => write!(f, "stateful"),
        }
    }
}

/// Protocol parameters shared by the salt and signature APIs. Built once at start-up and handed to each API.
#[derive(Debug, Clone)]
pub struct SignConfig {
    pub signature_ttl: Duration,
    pub dynamic_salt_ttl: Duration,
    pub salt_mode: SaltMode,
    /// Callers need permission for this path (as well as the target path) to obtain a dynamic salt.
    pub salt_generate_path: String,
    /// Callers need permission for this path (as well as the target path) to have the server issue a signature.
    pub sign_generate_path: String,
    /// Whether endpoints that require signing, but don't say otherwise, include request parameters.
    pub default_with_params: bool,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            signature_ttl: Duration::minutes(10),
            dynamic_salt_ttl: Duration::hours(24),
            salt_mode: SaltMode::default(),
            salt_generate_path: DEFAULT_SALT_GENERATE_PATH.to_string(),
            sign_generate_path: DEFAULT_SIGN_GENERATE_PATH.to_string(),
            default_with_params: false,
        }
    }
}

impl SignConfig {
    pub fn with_salt_mode(mut self, mode: SaltMode) -> Self {
        self.salt_mode = mode;
        self
    }

    pub fn with_signature_ttl(mut self, ttl: Duration) -> Self {
        self.signature_ttl = ttl;
        self
    }

    pub fn with_dynamic_salt_ttl(mut self, ttl: Duration) -> Self {
        self.dynamic_salt_ttl = ttl;
        self
    }

    /// Where the salt- and signature-issuing endpoints are served. Permission checks use the same paths.
    pub fn with_issuance_paths(mut self, salt_generate_path: &str, sign_generate_path: &str) -> Self {
        self.salt_generate_path = salt_generate_path.to_string();
        self.sign_generate_path = sign_generate_path.to_string();
        self
    }

    pub fn with_default_with_params(mut self, with_params: bool) -> Self {
        self.default_with_params = with_params;
        self
    }

    pub fn signature_ttl_ms(&self) -> i64 {
        self.signature_ttl.num_milliseconds()
    }

    pub fn dynamic_salt_ttl_ms(&self) -> i64 {
        self.dynamic_salt_ttl.num_milliseconds()
    }

    pub fn is_stateful(&self) -> bool {
        self.salt_mode == SaltMode::Stateful
    }
}

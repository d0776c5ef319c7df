//! Request and response bodies. Field names are camelCase on the wire.
use std::fmt::Display;

use apisign_common::EpochMillis;
use apisign_engine::db_types::{DynamicSalt, IssuedSignature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// Body of a dynamic salt request. The `Sign-appCode` and `Sign-path` headers take priority over these fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaltRequest {
    pub app_code: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaltResponse {
    pub app_code: String,
    pub path: String,
    pub dynamic_salt: String,
    pub dynamic_salt_time: EpochMillis,
}

impl From<DynamicSalt> for SaltResponse {
    fn from(salt: DynamicSalt) -> Self {
        Self {
            app_code: salt.app_code,
            path: salt.api_path,
            dynamic_salt: salt.salt_value,
            dynamic_salt_time: salt.issued_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaltValidateRequest {
    pub app_code: Option<String>,
    pub path: Option<String>,
    pub dynamic_salt: Option<String>,
    pub dynamic_salt_time: Option<EpochMillis>,
}

/// Result of the salt and signature validation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub app_code: String,
    pub path: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignGenerateRequest {
    pub app_code: Option<String>,
    pub path: Option<String>,
    pub dynamic_salt: Option<String>,
    pub dynamic_salt_time: Option<EpochMillis>,
    /// The request parameters to sign. Only a JSON object contributes parameters.
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub app_code: String,
    pub path: String,
    pub sign: String,
    pub time: EpochMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<EpochMillis>,
}

impl From<IssuedSignature> for SignResponse {
    fn from(sig: IssuedSignature) -> Self {
        Self {
            app_code: sig.app_code,
            path: sig.api_path,
            sign: sig.signature_value,
            time: sig.timestamp,
            expire_time: sig.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermittedPathsResponse {
    pub app_code: String,
    pub paths: Vec<String>,
}

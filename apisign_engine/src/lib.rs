//! API Sign Engine
//!
//! Request signing and replay protection for machine-to-machine API calls. A caller, identified by its `appCode`,
//! proves that it holds a shared secret by signing a canonical form of each request. Signatures are only valid for a
//! short window, and before signing the caller obtains a short-lived dynamic salt for the endpoint it wants to call.
//!
//! The library is divided into three main sections:
//! 1. Pure protocol pieces: the canonical string builder ([`mod@canonical`]), the digest algorithms
//!    ([`mod@digest`]) and path permission patterns ([`mod@path_pattern`]).
//! 2. Secret resolution. The [`SecretResolver`] and [`SaltLedger`] traits are implemented by a static TOML-backed
//!    store and by two SQLite-backed stores. [`SecretBackend`] wraps whichever one the deployment is configured for.
//! 3. The public API ([`DynamicSaltApi`], [`SignatureApi`] and [`VerificationPipeline`]). Hosts (such as the API Sign
//!    server) only talk to these.
mod backend;
mod clock;
mod db;
mod static_store;
mod traits;

pub mod canonical;
pub mod config;
pub mod db_types;
pub mod digest;
pub mod path_pattern;
mod sign_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use backend::{BackendKind, SecretBackend};
pub use clock::{older_than, Clock, ManualClock, SystemClock};
pub use config::{SaltMode, SignConfig};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{
    api_info,
    identities,
    mapped,
    salts,
    MappedSecretStore,
    SqlSecretStore,
    SqliteDatabase,
};
pub use sign_api::{
    errors::{ErrorKind, ResolverError, SignApiError},
    pipeline::{Authorized, Rejection, SignedRequest, VerificationPipeline, VerificationStage},
    policy::{resolve_policy, EffectivePolicy, SignPolicy, WithParams},
    salt_api::{derive_salt, DynamicSaltApi},
    signature_api::{compute_signature, SignRequest, SignatureApi},
};
pub use static_store::{InterfaceSalt, StaticApp, StaticConfigFile, StaticSecretStore};
pub use traits::{SaltLedger, SecretResolver};

//! A small, fixed population of callers and endpoints shared by the engine and server tests.
use crate::{
    api_info,
    db_types::{ApiDescriptor, AppIdentity, RecordStatus},
    identities,
    ResolverError,
    SqliteDatabase,
    StaticSecretStore,
};

pub const IOS_APP: &str = "ios1";
pub const IOS_SECRET: &str = "ios1-shared-secret-4b1d";
/// Permitted to fetch salts, but nothing else.
pub const SALT_ONLY_APP: &str = "salt-only";
/// Active, with no permissions at all.
pub const EMPTY_APP: &str = "no-perms";
pub const RETIRED_APP: &str = "retired";
/// Active, but its access lapsed at [`LAPSED_AT`].
pub const LAPSED_APP: &str = "lapsed";
pub const LAPSED_AT: i64 = 1_000;

pub const SALT_PATH: &str = "/api/sign/dynamic-salt-generate";
pub const SIGN_PATH: &str = "/api/sign/generate";
pub const SUBMIT_TEST_PATH: &str = "/api/sign/submit-test";
pub const SUBMIT_WITH_PARAMS_PATH: &str = "/api/sign/submit-with-params";
pub const ORDER_PATH: &str = "/api/orders/{id}";
pub const SUBMIT_TEST_SALT: &str = "submit-test-fixed-salt";

pub fn fixture_identities() -> Vec<AppIdentity> {
    vec![
        AppIdentity::new(IOS_APP, IOS_SECRET)
            .with_permissions(&[
                SALT_PATH,
                SIGN_PATH,
                SUBMIT_TEST_PATH,
                SUBMIT_WITH_PARAMS_PATH,
                "/api/sign/user-auth-list",
                "/api/orders/**",
            ])
            .with_forbidden(&["/api/orders/admin"]),
        AppIdentity::new(SALT_ONLY_APP, "salt-only-secret").with_permissions(&[SALT_PATH, SUBMIT_TEST_PATH]),
        AppIdentity::new(EMPTY_APP, "no-perms-secret"),
        AppIdentity::new(RETIRED_APP, "retired-secret")
            .with_permissions(&[SALT_PATH, SIGN_PATH, SUBMIT_TEST_PATH])
            .with_status(RecordStatus::Inactive),
        AppIdentity::new(LAPSED_APP, "lapsed-secret")
            .with_permissions(&[SALT_PATH, SUBMIT_TEST_PATH])
            .with_expire_time(LAPSED_AT),
    ]
}

pub fn fixture_descriptors() -> Vec<ApiDescriptor> {
    vec![
        ApiDescriptor::new(SUBMIT_TEST_PATH, SUBMIT_TEST_SALT),
        ApiDescriptor::new(SUBMIT_WITH_PARAMS_PATH, "submit-with-params-fixed-salt"),
        ApiDescriptor::new(ORDER_PATH, "order-fixed-salt"),
    ]
}

pub fn static_store() -> StaticSecretStore {
    StaticSecretStore::new(fixture_identities(), fixture_descriptors())
}

/// Writes the fixture population into a migrated database.
pub async fn seed_database(db: &SqliteDatabase) -> Result<(), ResolverError> {
    let mut tx = db.pool().begin().await?;
    for identity in fixture_identities() {
        identities::insert_identity(&identity, &mut *tx).await?;
    }
    for descriptor in fixture_descriptors() {
        api_info::upsert_api_descriptor(&descriptor, &mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

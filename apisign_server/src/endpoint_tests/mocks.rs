use apisign_common::EpochMillis;
use apisign_engine::{
    db_types::{ApiDescriptor, AppIdentity, DynamicSalt},
    test_utils::fixtures::{IOS_APP, IOS_SECRET, SALT_PATH, SIGN_PATH, SUBMIT_TEST_PATH, SUBMIT_TEST_SALT},
    ResolverError,
    SaltLedger,
    SecretResolver,
};
use mockall::mock;

mock! {
    pub Backend {}
    impl SecretResolver for Backend {
        async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError>;
        async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError>;
    }
    impl SaltLedger for Backend {
        async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError>;
        async fn consume_salt(
            &self,
            app_code: &str,
            api_path: &str,
            salt_value: &str,
            issued_at: EpochMillis,
            now: EpochMillis,
        ) -> Result<bool, ResolverError>;
        async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError>;
    }
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
}

/// A mock whose clones are set up the same way. The APIs each hold their own clone of the backend.
pub fn mock_backend(setup: fn(&mut MockBackend)) -> MockBackend {
    let mut backend = MockBackend::new();
    setup(&mut backend);
    backend.expect_clone().returning(move || mock_backend(setup));
    backend
}

/// `ios1` and the submit-test endpoint, as a healthy store would return them.
pub fn healthy(backend: &mut MockBackend) {
    backend.expect_fetch_identity().returning(|_| {
        Ok(Some(AppIdentity::new(IOS_APP, IOS_SECRET).with_permissions(&[SALT_PATH, SIGN_PATH, SUBMIT_TEST_PATH])))
    });
    backend
        .expect_fetch_api_descriptor()
        .returning(|_| Ok(Some(ApiDescriptor::new(SUBMIT_TEST_PATH, SUBMIT_TEST_SALT))));
}

/// Every lookup times out.
pub fn unavailable(backend: &mut MockBackend) {
    backend.expect_fetch_identity().returning(|_| Err(ResolverError::Timeout("pool timed out".into())));
    backend.expect_fetch_api_descriptor().returning(|_| Err(ResolverError::Timeout("pool timed out".into())));
}

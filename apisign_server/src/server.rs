use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use apisign_engine::{
    BackendKind,
    DynamicSaltApi,
    MappedSecretStore,
    SaltLedger,
    SecretBackend,
    SecretResolver,
    SignConfig,
    SignPolicy,
    SignatureApi,
    SqlSecretStore,
    SqliteDatabase,
    StaticSecretStore,
    VerificationPipeline,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::ScopeSignPolicy,
    routes::{
        dynamic_salt_generate,
        health,
        sign_generate,
        DynamicSaltValidateRoute,
        OrderByIdRoute,
        SignValidateRoute,
        SubmitTestRoute,
        SubmitWithParamsRoute,
        UserAuthListRoute,
    },
    salt_purge_worker::start_salt_purge_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let backend = build_backend(&config).await?;
    if config.sign.is_stateful() {
        let salts = DynamicSaltApi::new(backend.clone(), config.sign.clone());
        start_salt_purge_worker(salts, config.salt_purge_interval);
    }
    let srv = create_server_instance(config, backend)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Loads the secret backend named in the configuration. Database backends are migrated before use.
pub async fn build_backend(config: &ServerConfig) -> Result<SecretBackend, ServerError> {
    let backend = match config.backend {
        BackendKind::Static => {
            let store = StaticSecretStore::from_file(&config.static_config).map_err(|e| {
                ServerError::InitializeError(format!("Could not load {}. {e}", config.static_config.display()))
            })?;
            info!("🗃️ Loaded {} apps from {}", store.app_count(), config.static_config.display());
            SecretBackend::from(store)
        },
        BackendKind::Sql => SecretBackend::from(SqlSecretStore::new(connect(&config.database_url).await?)),
        BackendKind::Mapped => SecretBackend::from(MappedSecretStore::new(&connect(&config.database_url).await?)),
    };
    info!("🗃️ Using the {} secret backend with {} dynamic salts", backend.kind(), config.sign.salt_mode);
    Ok(backend)
}

async fn connect(url: &str) -> Result<SqliteDatabase, ServerError> {
    let db = SqliteDatabase::new_with_url(url, 25).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    Ok(db)
}

pub fn create_server_instance(config: ServerConfig, backend: SecretBackend) -> Result<Server, ServerError> {
    let sign = config.sign.clone();
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("apisign::access_log"))
            .configure(configure_apis(backend.clone(), sign.clone()))
            .configure(configure_routes::<SecretBackend>(&sign))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the salt API, signature API and verification pipeline as app data.
pub fn configure_apis<A>(backend: A, sign: SignConfig) -> impl FnOnce(&mut ServiceConfig)
where A: SecretResolver + SaltLedger + Clone + 'static {
    move |cfg| {
        let signatures = SignatureApi::new(backend.clone(), sign.clone());
        let pipeline = VerificationPipeline::new(signatures.clone(), backend.clone());
        let salts = DynamicSaltApi::new(backend, sign);
        cfg.app_data(web::Data::new(salts))
            .app_data(web::Data::new(signatures))
            .app_data(web::Data::new(pipeline));
    }
}

/// Registers every route. The salt- and sign-issuing endpoints are served at the paths in `sign`, so the permission
/// the engine checks for them is always the path the caller used.
pub fn configure_routes<A>(sign: &SignConfig) -> impl FnOnce(&mut ServiceConfig)
where A: SecretResolver + SaltLedger + Clone + 'static {
    let salt_generate_path = sign.salt_generate_path.clone();
    let sign_generate_path = sign.sign_generate_path.clone();
    move |cfg| {
        // Registered ahead of the `/api/sign` scope, which would otherwise claim the default paths
        let salt_generate = web::resource(salt_generate_path)
            .name("dynamic_salt_generate")
            .route(web::post().to(dynamic_salt_generate::<A>));
        let sign_generate =
            web::resource(sign_generate_path).name("sign_generate").route(web::post().to(sign_generate::<A>));
        cfg.service(salt_generate).service(sign_generate);
        configure_fixed_routes::<A>(cfg);
    }
}

fn configure_fixed_routes<A>(cfg: &mut ServiceConfig)
where A: SecretResolver + SaltLedger + Clone + 'static {
    let sign_scope = web::scope("/api/sign")
        .service(DynamicSaltValidateRoute::<A>::new())
        .service(SignValidateRoute::<A>::new())
        .service(SubmitTestRoute::<A>::new())
        .service(SubmitWithParamsRoute::<A>::new())
        .service(UserAuthListRoute::<A>::new());
    // Order lookups sign their query strings
    let orders_scope = web::scope("/api/orders")
        .app_data(ScopeSignPolicy(SignPolicy::with_params()))
        .service(OrderByIdRoute::<A>::new());
    cfg.service(health).service(sign_scope).service(orders_scope);
}

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use super::fixtures::seed_database;
use crate::SqliteDatabase;

/// Creates a fresh database at `url`, runs the migrations and returns a connection to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

/// [`prepare_test_env`] on a throw-away database file, seeded with the shared fixtures.
pub async fn prepare_seeded_env() -> SqliteDatabase {
    let db = prepare_test_env(&random_db_path()).await;
    seed_database(&db).await.expect("Error seeding test database");
    debug!("🚀️ Test database seeded");
    db
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("apisign_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

use rocket::fairing::{self, Fairing};
use rocket::{error, info, Build, Rocket};
use rocket_db_pools::{sqlx, Database};

/// The SQLite pool configured under `databases.sqlite`.
#[derive(Database)]
#[database("sqlite")]
pub(crate) struct PalateDatabase(sqlx::SqlitePool);

pub(crate) fn migrations_fairing() -> impl Fairing {
    fairing::AdHoc::try_on_ignite("Database Migrations", |rocket| {
        Box::pin(run_migrations(rocket))
    })
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let Some(database) = PalateDatabase::fetch(&rocket) else {
        error!("migrations need the database pool, attach it first");
        return Err(rocket);
    };
    match sqlx::migrate!().run(&**database).await {
        Ok(()) => {
            info!("🍷 database is up to date");
            Ok(rocket)
        }
        Err(e) => {
            error!("failed to migrate database: {e:?}");
            Err(rocket)
        }
    }
}

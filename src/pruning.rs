use crate::database::{connect, Repository};
use crate::infra::PalateDatabase;
use anyhow::{Context as _, Result};
use rocket::fairing::{self, Fairing};
use rocket::tokio::time::interval;
use rocket::tokio::{self, select};
use rocket::{info, warn, Orbit, Rocket, Shutdown};
use std::time::Duration;
use time::OffsetDateTime;

const PRUNING_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Periodically removes expired temporary profiles together with
/// their ratings, and login codes nobody used in time.
pub(crate) fn database_pruning() -> impl Fairing {
    fairing::AdHoc::on_liftoff("Database Pruning", |rocket| {
        Box::pin(start_pruning_with_error_handling(rocket))
    })
}

async fn start_pruning_with_error_handling(rocket: &Rocket<Orbit>) {
    if let Err(error) = start_pruning(rocket).await {
        warn!("failed to start database pruning: {error:?}");
    }
}

async fn start_pruning(rocket: &Rocket<Orbit>) -> Result<()> {
    let database = PalateDatabase::fetch(rocket).context("database pool is not attached")?;
    let repository = connect(database).await?;
    tokio::spawn(run_pruning(repository, rocket.shutdown()));
    Ok(())
}

async fn run_pruning(mut repository: Box<dyn Repository>, mut shutdown: Shutdown) {
    let mut interval = interval(PRUNING_INTERVAL);
    loop {
        select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => prune_with_error_handling(repository.as_mut()).await
        }
    }
}

async fn prune_with_error_handling(repository: &mut dyn Repository) {
    match repository.prune(OffsetDateTime::now_utc()).await {
        Ok(deleted) if deleted >= 1 => info!("🌳 Database pruning removed {deleted} rows"),
        Ok(_) => {}
        Err(error) => warn!("🌳 Database pruning failed: {error:?}"),
    };
}

use crate::email::email_sender_fairing;
use crate::infra::{
    configure_template_engines, figment, migrations_fairing, AppConfig, PalateDatabase,
};
use crate::pruning::database_pruning;
use anyhow::Result;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_db_pools::Database as _;
use rocket_dyn_templates::Template;

mod analytics;
mod auth;
mod buddies;
mod database;
mod duplicates;
mod email;
mod events;
mod fs;
mod infra;
mod login;
mod organizations;
mod pages;
mod profiles;
mod pruning;
mod ratings;
mod recommendations;
mod result;
mod serde_formats;
mod stats;
mod submissions;
mod taste;
mod wines;

#[rocket::main]
async fn main() -> Result<()> {
    let _rocket = rocket()?.launch().await?;
    Ok(())
}

fn rocket() -> Result<Rocket<Build>> {
    Ok(rocket::custom(figment()?)
        .attach(PalateDatabase::init())
        .attach(migrations_fairing())
        .attach(AdHoc::config::<AppConfig>())
        .attach(email_sender_fairing())
        .attach(Template::custom(configure_template_engines))
        .attach(database_pruning())
        .mount("/api", api_routes())
        .mount("/", pages::routes())
        .register("/api", result::api_catchers())
        .register("/", pages::catchers()))
}

fn api_routes() -> Vec<rocket::Route> {
    [
        profiles::routes(),
        login::routes(),
        events::routes(),
        wines::routes(),
        ratings::routes(),
        taste::routes(),
        recommendations::routes(),
        buddies::routes(),
        submissions::routes(),
        analytics::routes(),
        organizations::routes(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

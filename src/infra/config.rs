use crate::login::SessionKey;
use anyhow::Result;
use rand::rng;
use rocket::figment::providers::{Env, Format as _, Toml};
use rocket::figment::{Figment, Profile};
use rocket::Config;
use serde::Deserialize;
use time::Duration;

pub(crate) fn figment() -> Result<Figment> {
    let figment = default_figment();
    let secret_keys_path: String = figment.extract_inner("secret_keys_path")?;
    let key = SessionKey::read_or_generate(secret_keys_path, &mut rng())?;
    Ok(figment.merge((Config::SECRET_KEY, &key.0)))
}

/// Adapted from [`Config::figment`] but with the
/// ability to have two rocket config files.
fn default_figment() -> Figment {
    Figment::from(Config::default())
        .merge(Toml::file(Env::var_or("ROCKET_DEFAULT_CONFIG", "Rocket.default.toml")).nested())
        .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
        .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
        .select(Profile::from_env_or(
            "ROCKET_PROFILE",
            Config::DEFAULT_PROFILE,
        ))
}

/// Settings of our own, read from the same figment as Rocket's.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AppConfig {
    #[serde(default = "default_temporary_profile_lifetime_hours")]
    pub(crate) temporary_profile_lifetime_hours: u32,
}

fn default_temporary_profile_lifetime_hours() -> u32 {
    48
}

impl AppConfig {
    /// How long a profile handed out on joining an event stays usable.
    pub(crate) fn temporary_profile_lifetime(&self) -> Duration {
        Duration::hours(i64::from(self.temporary_profile_lifetime_hours))
    }
}

use crate::auth::{CookieJarExt as _, LoginState};
use crate::database::Repository;
use crate::id_newtype;
use crate::result::{HttpError, HttpResult};
use anyhow::Result;
use email_address::EmailAddress;
use lettre::message::Mailbox;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::{get, patch, post, routes, Route};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::{Duration, OffsetDateTime};

pub(crate) fn routes() -> Vec<Route> {
    routes![me, update_me, upgrade, signup]
}

id_newtype! {
    pub(crate) struct ProfileId;
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Profile {
    pub(crate) id: ProfileId,
    pub(crate) display_name: String,
    pub(crate) email_address: Option<String>,
    pub(crate) is_temporary: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub(crate) expires_at: Option<OffsetDateTime>,
    pub(crate) is_admin: bool,
    pub(crate) is_curator: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

impl Profile {
    pub(crate) fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.is_temporary && self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Temporary profiles never administer anything,
    /// even if the flag was set on them by hand.
    pub(crate) fn can_administer(&self) -> bool {
        self.is_admin && !self.is_temporary
    }

    pub(crate) fn can_curate(&self) -> bool {
        self.is_curator && !self.is_temporary
    }

    pub(crate) fn mailbox(&self) -> Result<Option<Mailbox>> {
        self.email_address
            .as_deref()
            .map(|address| Ok(Mailbox::new(Some(self.display_name.clone()), address.parse()?)))
            .transpose()
    }

    pub(crate) fn to_public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            display_name: self.display_name.clone(),
        }
    }
}

/// What other attendees get to see of a profile.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PublicProfile {
    pub(crate) id: ProfileId,
    pub(crate) display_name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewProfile {
    pub(crate) display_name: String,
    pub(crate) email_address: Option<String>,
    pub(crate) is_temporary: bool,
    pub(crate) expires_at: Option<OffsetDateTime>,
}

impl NewProfile {
    pub(crate) fn temporary(display_name: String, lifetime: Duration, now: OffsetDateTime) -> Self {
        Self {
            display_name,
            email_address: None,
            is_temporary: true,
            expires_at: Some(now + lifetime),
        }
    }

    pub(crate) fn permanent(display_name: String, email_address: &EmailAddress) -> Self {
        Self {
            display_name,
            email_address: Some(email_address.to_string()),
            is_temporary: false,
            expires_at: None,
        }
    }
}

pub(crate) const MAX_DISPLAY_NAME_LENGTH: usize = 80;

pub(crate) fn parse_display_name(input: &str) -> Option<String> {
    let name = input.trim();
    let length = name.chars().count();
    (1..=MAX_DISPLAY_NAME_LENGTH)
        .contains(&length)
        .then(|| name.to_owned())
}

pub(crate) fn parse_email_address(input: &str) -> HttpResult<EmailAddress> {
    EmailAddress::from_str(input.trim())
        .map_err(|_| HttpError::unprocessable("Please enter a valid email address"))
}

/// Used when someone enters with nothing but an email address.
pub(crate) fn display_name_from_email(email_address: &EmailAddress) -> String {
    parse_display_name(email_address.local_part()).unwrap_or_else(|| "Guest".to_owned())
}

#[get("/me")]
async fn me(profile: Profile) -> Json<Profile> {
    Json(profile)
}

#[derive(Debug, Deserialize)]
struct UpdateProfileData {
    display_name: String,
}

#[patch("/me", data = "<data>")]
async fn update_me(
    profile: Profile,
    data: Json<UpdateProfileData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Profile>> {
    let display_name = parse_display_name(&data.display_name)
        .ok_or_else(|| HttpError::unprocessable("Please enter your name"))?;
    repository
        .update_display_name(profile.id, &display_name)
        .await?;
    Ok(Json(Profile {
        display_name,
        ..profile
    }))
}

#[derive(Debug, Deserialize)]
struct UpgradeData {
    email_address: String,
}

#[post("/me/upgrade", data = "<data>")]
async fn upgrade(
    profile: Profile,
    data: Json<UpgradeData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Profile>> {
    if !profile.is_temporary {
        return Err(HttpError::conflict("Your profile is already permanent"));
    }
    let email_address = parse_email_address(&data.email_address)?;
    if repository
        .get_profile_by_email(email_address.as_str())
        .await?
        .is_some()
    {
        return Err(HttpError::conflict("That email address is already in use"));
    }
    repository
        .make_permanent(profile.id, email_address.as_str())
        .await?;
    Ok(Json(Profile {
        email_address: Some(email_address.to_string()),
        is_temporary: false,
        expires_at: None,
        ..profile
    }))
}

#[derive(Debug, Deserialize)]
struct SignupData {
    display_name: String,
    email_address: String,
}

#[post("/signup", data = "<data>")]
async fn signup(
    data: Json<SignupData>,
    cookies: &CookieJar<'_>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Profile>> {
    let display_name = parse_display_name(&data.display_name)
        .ok_or_else(|| HttpError::unprocessable("Please enter your name"))?;
    let email_address = parse_email_address(&data.email_address)?;
    if repository
        .get_profile_by_email(email_address.as_str())
        .await?
        .is_some()
    {
        return Err(HttpError::conflict("That email address is already in use"));
    }
    let profile = repository
        .add_profile(NewProfile::permanent(display_name, &email_address))
        .await?;
    cookies.set_login_state(LoginState::Authenticated(profile.id));
    Ok(Json(profile))
}

use crate::auth::{Administer, AuthorizedTo, CookieJarExt as _};
use crate::database::Repository;
use crate::id_newtype;
use crate::organizations::OrganizationId;
use crate::profiles::{Profile, ProfileId};
use crate::result::{HttpError, HttpResult};
use crate::serde_formats::iso_date;
use anyhow::{bail, Result};
use rand::distr::Distribution;
use rand::{rng, Rng};
use rocket::http::CookieJar;
use rocket::request::FromParam;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, routes, Route};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, OffsetDateTime};

mod access;
pub(crate) use access::*;
mod ics_file;
mod join;
pub(crate) use join::{join, Admission, JoinData};
mod locations;
pub(crate) use locations::*;

pub(crate) fn routes() -> Vec<Route> {
    routes![
        create_event,
        list_events,
        current_event,
        event_by_code,
        update_event,
        delete_event,
        ics_file::calendar,
        join::join_event,
        locations::add_location,
        locations::list_locations,
        locations::delete_location,
    ]
}

id_newtype! {
    pub(crate) struct EventId;
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct TastingEvent {
    pub(crate) id: EventId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) code: EventCode,
    #[serde(with = "iso_date")]
    pub(crate) event_date: Date,
    /// Entry requires an email address instead of a throwaway profile.
    pub(crate) booth_mode: bool,
    pub(crate) created_by: ProfileId,
    pub(crate) organization_id: Option<OrganizationId>,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

/// What attendees see of an event before and after joining.
#[derive(Debug, Serialize)]
pub(crate) struct EventSummary {
    pub(crate) id: EventId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) code: EventCode,
    #[serde(with = "iso_date")]
    pub(crate) event_date: Date,
    pub(crate) booth_mode: bool,
}

impl From<TastingEvent> for EventSummary {
    fn from(event: TastingEvent) -> Self {
        EventSummary {
            id: event.id,
            name: event.name,
            description: event.description,
            code: event.code,
            event_date: event.event_date,
            booth_mode: event.booth_mode,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewEvent {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) code: EventCode,
    pub(crate) event_date: Date,
    pub(crate) booth_mode: bool,
    pub(crate) created_by: ProfileId,
    pub(crate) organization_id: Option<OrganizationId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventPatch {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    #[serde(default, with = "iso_date_option")]
    pub(crate) event_date: Option<Date>,
    pub(crate) booth_mode: Option<bool>,
}

mod iso_date_option {
    use super::iso_date;
    use serde::{Deserialize, Deserializer};
    use time::Date;

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "iso_date")] Date);
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(date)| date))
    }
}

/// The short code attendees type in to join an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub(crate) struct EventCode(pub(crate) String);

/// Upper-case letters and digits without the easily confused `0`, `O`, `1` and `I`.
pub(crate) const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub(crate) const CODE_LENGTH: usize = 6;

impl EventCode {
    /// Accepts codes typed in any case and surrounded by whitespace.
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let is_valid = code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b));
        is_valid.then_some(EventCode(code))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub(crate) struct InvalidEventCode;

impl<'a> FromParam<'a> for EventCode {
    type Error = InvalidEventCode;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        EventCode::parse(param).ok_or(InvalidEventCode)
    }
}

pub(crate) struct EventCodes;

impl Distribution<EventCode> for EventCodes {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> EventCode {
        let code = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        EventCode(code)
    }
}

const MAX_CODE_ATTEMPTS: usize = 5;

async fn generate_unique_code(repository: &mut dyn Repository) -> Result<EventCode> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = rng().sample(EventCodes);
        if !repository.event_code_exists(&code).await? {
            return Ok(code);
        }
    }
    bail!("failed to generate a unique event code after {MAX_CODE_ATTEMPTS} attempts")
}

#[derive(Debug, Deserialize)]
struct CreateEventData {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(with = "iso_date")]
    event_date: Date,
    #[serde(default)]
    booth_mode: bool,
    organization_id: Option<OrganizationId>,
}

#[post("/events", data = "<data>")]
async fn create_event(
    admin: AuthorizedTo<Administer>,
    data: Json<CreateEventData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<TastingEvent>> {
    let data = data.into_inner();
    let name = parse_event_name(&data.name)?;
    if let Some(organization) = data.organization_id {
        let role = repository.get_member_role(organization, admin.id).await?;
        if !role.is_some_and(|r| r.can_manage()) {
            return Err(HttpError::forbidden());
        }
    }
    let code = generate_unique_code(repository.as_mut()).await?;
    let event = repository
        .add_event(NewEvent {
            name,
            description: data.description,
            code,
            event_date: data.event_date,
            booth_mode: data.booth_mode,
            created_by: admin.id,
            organization_id: data.organization_id,
        })
        .await?;
    Ok(Json(event))
}

fn parse_event_name(input: &str) -> HttpResult<String> {
    let name = input.trim();
    if name.is_empty() {
        Err(HttpError::unprocessable("Please give the event a name"))
    } else {
        Ok(name.to_owned())
    }
}

#[get("/events")]
async fn list_events(
    admin: AuthorizedTo<Administer>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<TastingEvent>>> {
    Ok(Json(repository.get_managed_events(admin.id).await?))
}

#[get("/events/current")]
async fn current_event(
    _profile: Profile,
    cookies: &CookieJar<'_>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventSummary>> {
    let id = cookies
        .current_event()?
        .ok_or_else(|| HttpError::not_found("Current event"))?;
    let event = repository
        .get_event(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Current event"))?;
    Ok(Json(event.into()))
}

#[get("/events/<code>", rank = 2)]
async fn event_by_code(
    code: EventCode,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventSummary>> {
    let event = repository
        .get_event_by_code(&code)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))?;
    Ok(Json(event.into()))
}

#[patch("/events/<id>", data = "<patch>")]
async fn update_event(
    id: EventId,
    profile: Profile,
    patch: Json<EventPatch>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<TastingEvent>> {
    managed_event(repository.as_mut(), &profile, id).await?;
    let mut patch = patch.into_inner();
    patch.name = patch.name.as_deref().map(parse_event_name).transpose()?;
    repository.update_event(id, patch).await?;
    let event = repository
        .get_event(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))?;
    Ok(Json(event))
}

#[delete("/events/<id>")]
async fn delete_event(
    id: EventId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    managed_event(repository.as_mut(), &profile, id).await?;
    repository.delete_event(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    mod event_code {
        use super::*;

        #[test]
        fn generated_codes_use_the_unambiguous_alphabet() {
            let mut rng = SmallRng::seed_from_u64(7);
            for _ in 0..200 {
                let code: EventCode = rng.sample(EventCodes);
                assert_eq!(CODE_LENGTH, code.as_str().len());
                assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
            }
        }

        #[test]
        fn parsing_normalizes_case_and_whitespace() {
            assert_eq!(
                Some(EventCode("ABC234".to_owned())),
                EventCode::parse(" abc234\n")
            );
        }

        #[test]
        fn rejects_ambiguous_characters() {
            assert_eq!(None, EventCode::parse("ABC10O"));
        }

        #[test]
        fn rejects_wrong_length() {
            assert_eq!(None, EventCode::parse("ABC23"));
            assert_eq!(None, EventCode::parse("current"));
        }
    }

    mod event_patch {
        use super::*;
        use time::macros::date;

        #[test]
        fn missing_fields_stay_unset() {
            let patch: EventPatch = rocket::serde::json::from_str(r#"{"name":"Riesling night"}"#).unwrap();
            assert_eq!(Some("Riesling night".to_owned()), patch.name);
            assert_eq!(None, patch.event_date);
            assert_eq!(None, patch.booth_mode);
        }

        #[test]
        fn parses_event_date() {
            let patch: EventPatch =
                rocket::serde::json::from_str(r#"{"event_date":"2026-12-04"}"#).unwrap();
            assert_eq!(Some(date!(2026 - 12 - 04)), patch.event_date);
        }
    }
}

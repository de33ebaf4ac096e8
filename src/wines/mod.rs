use crate::database::Repository;
use crate::duplicates::{find_duplicates, Duplicate};
use crate::events::{attended_event, managed_event, EventId, LocationId};
use crate::id_newtype;
use crate::profiles::{Profile, ProfileId};
use crate::ratings::Rating;
use crate::result::{HttpError, HttpResult};
use anyhow::Result;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, routes, Route};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod master;
pub(crate) use master::*;

pub(crate) fn routes() -> Vec<Route> {
    routes![
        add_wine,
        list_wines,
        update_wine,
        delete_wine,
        wine_duplicates,
        master::search_master_wines,
        master::create_master_wine,
    ]
}

id_newtype! {
    pub(crate) struct EventWineId;
}

/// The descriptive fields shared by event wines, master wines and submissions.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub(crate) struct WineDetails {
    pub(crate) name: String,
    pub(crate) producer: String,
    pub(crate) vintage: Option<i32>,
    pub(crate) region: Option<String>,
    pub(crate) grape_variety: Option<String>,
    pub(crate) wine_type: Option<String>,
}

impl WineDetails {
    /// Trims all text and turns blank optional fields into `None`.
    /// Fails if the name or producer is blank.
    pub(crate) fn normalized(self) -> HttpResult<Self> {
        let name = self.name.trim().to_owned();
        let producer = self.producer.trim().to_owned();
        if name.is_empty() {
            return Err(HttpError::unprocessable("Please give the wine a name"));
        }
        if producer.is_empty() {
            return Err(HttpError::unprocessable("Please name the producer"));
        }
        Ok(WineDetails {
            name,
            producer,
            vintage: self.vintage,
            region: non_blank(self.region),
            grape_variety: non_blank(self.grape_variety),
            wine_type: non_blank(self.wine_type),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct EventWine {
    pub(crate) id: EventWineId,
    pub(crate) event_id: EventId,
    pub(crate) master_wine_id: Option<MasterWineId>,
    pub(crate) location_id: Option<LocationId>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub(crate) details: WineDetails,
    pub(crate) price_cents: Option<i64>,
    pub(crate) tasting_order: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewEventWine {
    #[serde(flatten)]
    pub(crate) details: WineDetails,
    pub(crate) master_wine_id: Option<MasterWineId>,
    pub(crate) location_id: Option<LocationId>,
    pub(crate) price_cents: Option<i64>,
    #[serde(default)]
    pub(crate) tasting_order: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EventWineView {
    #[serde(flatten)]
    pub(crate) wine: EventWine,
    pub(crate) my_rating: Option<Rating>,
}

async fn validate_new_wine(
    repository: &mut dyn Repository,
    event: EventId,
    wine: NewEventWine,
) -> HttpResult<NewEventWine> {
    if let Some(master) = wine.master_wine_id {
        if repository.get_master_wine(master).await?.is_none() {
            return Err(HttpError::unprocessable("That master wine does not exist"));
        }
    }
    if let Some(location) = wine.location_id {
        let location = repository.get_location(location).await?;
        if !location.is_some_and(|l| l.event_id == event) {
            return Err(HttpError::unprocessable("That location is not part of this event"));
        }
    }
    if wine.price_cents.is_some_and(|price| price < 0) {
        return Err(HttpError::unprocessable("Prices can not be negative"));
    }
    Ok(NewEventWine {
        details: wine.details.normalized()?,
        ..wine
    })
}

#[post("/events/<id>/wines", data = "<wine>")]
async fn add_wine(
    id: EventId,
    profile: Profile,
    wine: Json<NewEventWine>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventWine>> {
    managed_event(repository.as_mut(), &profile, id).await?;
    let wine = validate_new_wine(repository.as_mut(), id, wine.into_inner()).await?;
    Ok(Json(repository.add_event_wine(id, wine).await?))
}

#[get("/events/<id>/wines")]
async fn list_wines(
    id: EventId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<EventWineView>>> {
    attended_event(repository.as_mut(), &profile, id).await?;
    Ok(Json(wines_with_ratings(repository.as_mut(), profile.id, id).await?))
}

/// The event's wines in tasting order, each with the profile's own rating.
pub(crate) async fn wines_with_ratings(
    repository: &mut dyn Repository,
    profile: ProfileId,
    event: EventId,
) -> Result<Vec<EventWineView>> {
    let mut my_ratings: HashMap<_, _> = repository
        .get_profile_event_ratings(profile, event)
        .await?
        .into_iter()
        .map(|r| (r.event_wine_id, r))
        .collect();
    Ok(repository
        .get_event_wines(event)
        .await?
        .into_iter()
        .map(|wine| EventWineView {
            my_rating: my_ratings.remove(&wine.id),
            wine,
        })
        .collect())
}

/// Fetches an event wine whose event the profile manages.
async fn managed_wine(
    repository: &mut dyn Repository,
    profile: &Profile,
    id: EventWineId,
) -> HttpResult<EventWine> {
    let wine = repository
        .get_event_wine(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Wine"))?;
    managed_event(repository, profile, wine.event_id).await?;
    Ok(wine)
}

#[patch("/wines/<id>", data = "<wine>")]
async fn update_wine(
    id: EventWineId,
    profile: Profile,
    wine: Json<NewEventWine>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventWine>> {
    let existing = managed_wine(repository.as_mut(), &profile, id).await?;
    let wine = validate_new_wine(repository.as_mut(), existing.event_id, wine.into_inner()).await?;
    repository.update_event_wine(id, wine).await?;
    let wine = repository
        .get_event_wine(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Wine"))?;
    Ok(Json(wine))
}

#[delete("/wines/<id>")]
async fn delete_wine(
    id: EventWineId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    managed_wine(repository.as_mut(), &profile, id).await?;
    repository.delete_event_wine(id).await?;
    Ok(())
}

#[get("/wines/<id>/duplicates")]
async fn wine_duplicates(
    id: EventWineId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<Duplicate>>> {
    let wine = managed_wine(repository.as_mut(), &profile, id).await?;
    let candidates = repository.get_duplicate_candidates(&wine.details).await?;
    Ok(Json(
        find_duplicates(&wine.details, &candidates)
            .into_iter()
            .map(Into::into)
            .collect(),
    ))
}

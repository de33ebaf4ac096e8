use super::{attended_event, managed_event, EventId};
use crate::database::Repository;
use crate::id_newtype;
use crate::profiles::Profile;
use crate::result::{HttpError, HttpResult};
use rocket::serde::json::Json;
use rocket::{delete, get, post};
use serde::{Deserialize, Serialize};

id_newtype! {
    pub(crate) struct LocationId;
}

/// One stop of a multi-location tasting crawl.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct EventLocation {
    pub(crate) id: LocationId,
    pub(crate) event_id: EventId,
    pub(crate) name: String,
    pub(crate) address: String,
    pub(crate) position: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewLocation {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) address: String,
    #[serde(default)]
    pub(crate) position: i64,
}

#[post("/events/<id>/locations", data = "<location>")]
pub(super) async fn add_location(
    id: EventId,
    profile: Profile,
    location: Json<NewLocation>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventLocation>> {
    managed_event(repository.as_mut(), &profile, id).await?;
    let mut location = location.into_inner();
    location.name = location.name.trim().to_owned();
    if location.name.is_empty() {
        return Err(HttpError::unprocessable("Please give the location a name"));
    }
    Ok(Json(repository.add_location(id, location).await?))
}

#[get("/events/<id>/locations")]
pub(super) async fn list_locations(
    id: EventId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<EventLocation>>> {
    attended_event(repository.as_mut(), &profile, id).await?;
    Ok(Json(repository.get_locations(id).await?))
}

#[delete("/locations/<id>")]
pub(super) async fn delete_location(
    id: LocationId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    let location = repository
        .get_location(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Location"))?;
    managed_event(repository.as_mut(), &profile, location.event_id).await?;
    repository.delete_location(id).await?;
    Ok(())
}

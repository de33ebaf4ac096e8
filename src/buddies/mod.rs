use crate::database::{connect, Repository};
use crate::infra::PalateDatabase;
use crate::profiles::{Profile, ProfileId, PublicProfile};
use crate::ratings::RatedWine;
use crate::result::{HttpError, HttpResult};
use anyhow::Result;
use rocket::futures::future::try_join_all;
use rocket::serde::json::Json;
use rocket::{delete, get, post, routes, Route};
use serde::{Deserialize, Serialize};

mod comparison;
pub(crate) use comparison::*;

pub(crate) fn routes() -> Vec<Route> {
    routes![add_buddy, remove_buddy, list_buddies, buddy_comparison]
}

#[derive(Debug, Deserialize)]
struct AddBuddyData {
    buddy_id: ProfileId,
}

#[post("/buddies", data = "<data>")]
async fn add_buddy(
    profile: Profile,
    data: Json<AddBuddyData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<PublicProfile>> {
    let buddy_id = data.buddy_id;
    if buddy_id == profile.id {
        return Err(HttpError::unprocessable("You can not be your own buddy"));
    }
    let buddy = repository
        .get_profile(buddy_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Profile"))?;
    if repository.is_buddy(profile.id, buddy_id).await? {
        return Err(HttpError::conflict("You are already buddies"));
    }
    repository.add_buddy(profile.id, buddy_id).await?;
    Ok(Json(buddy.to_public()))
}

#[delete("/buddies/<id>")]
async fn remove_buddy(
    id: ProfileId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    if repository.remove_buddy(profile.id, id).await? {
        Ok(())
    } else {
        Err(HttpError::not_found("Buddy"))
    }
}

#[derive(Debug, Serialize)]
struct BuddyOverview {
    buddy: PublicProfile,
    #[serde(flatten)]
    summary: ComparisonSummary,
}

#[get("/buddies")]
async fn list_buddies(
    profile: Profile,
    database: &PalateDatabase,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<BuddyOverview>>> {
    let mine = repository.get_profile_ratings(profile.id).await?;
    let buddies = repository.get_buddies(profile.id).await?;
    let ratings = try_join_all(buddies.iter().map(|b| fetch_ratings(database, b.id))).await?;
    Ok(Json(
        buddies
            .iter()
            .zip(ratings)
            .map(|(buddy, theirs)| BuddyOverview {
                buddy: buddy.to_public(),
                summary: compare(&mine, &theirs).summary,
            })
            .collect(),
    ))
}

async fn fetch_ratings(database: &PalateDatabase, profile: ProfileId) -> Result<Vec<RatedWine>> {
    connect(database).await?.get_profile_ratings(profile).await
}

#[derive(Debug, Serialize)]
struct BuddyComparison {
    buddy: PublicProfile,
    #[serde(flatten)]
    comparison: Comparison,
}

#[get("/buddies/<id>/comparison")]
async fn buddy_comparison(
    id: ProfileId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<BuddyComparison>> {
    if !repository.is_buddy(profile.id, id).await? {
        return Err(HttpError::not_found("Buddy"));
    }
    let buddy = repository
        .get_profile(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Buddy"))?;
    let mine = repository.get_profile_ratings(profile.id).await?;
    let theirs = repository.get_profile_ratings(id).await?;
    Ok(Json(BuddyComparison {
        buddy: buddy.to_public(),
        comparison: compare(&mine, &theirs),
    }))
}

use super::WineDetails;
use crate::auth::{AuthorizedTo, Curate};
use crate::database::Repository;
use crate::id_newtype;
use crate::profiles::Profile;
use crate::result::HttpResult;
use rocket::serde::json::Json;
use rocket::{get, post};
use serde::Serialize;
use time::OffsetDateTime;

id_newtype! {
    pub(crate) struct MasterWineId;
}

/// The deduplicated canonical record of a wine, shared across events.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct MasterWine {
    pub(crate) id: MasterWineId,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub(crate) details: WineDetails,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

impl MasterWine {
    /// Whether `query`, already lowercased, occurs in the name or producer.
    /// An empty query matches every wine.
    pub(crate) fn matches(&self, query: &str) -> bool {
        query.is_empty()
            || self.details.name.to_lowercase().contains(query)
            || self.details.producer.to_lowercase().contains(query)
    }
}

const DEFAULT_SEARCH_LIMIT: u32 = 25;
const MAX_SEARCH_LIMIT: u32 = 100;

#[get("/master-wines?<q>&<limit>")]
pub(super) async fn search_master_wines(
    _profile: Profile,
    q: Option<&str>,
    limit: Option<u32>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<MasterWine>>> {
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
    let query = q.unwrap_or_default().trim();
    Ok(Json(repository.search_master_wines(query, limit).await?))
}

#[post("/master-wines", data = "<wine>")]
pub(super) async fn create_master_wine(
    _curator: AuthorizedTo<Curate>,
    wine: Json<WineDetails>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<MasterWine>> {
    let wine = wine.into_inner().normalized()?;
    Ok(Json(repository.add_master_wine(wine).await?))
}

use crate::database::Repository;
use crate::id_newtype;
use crate::profiles::{Profile, ProfileId};
use crate::result::HttpResult;
use crate::wines::{MasterWineId, WineDetails};
use rocket::serde::json::Json;
use rocket::{get, post, routes, Route};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod curation;

pub(crate) fn routes() -> Vec<Route> {
    routes![
        submit_wine,
        my_submissions,
        curation::queue,
        curation::approve,
        curation::merge,
        curation::reject,
    ]
}

id_newtype! {
    pub(crate) struct SubmissionId;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Pending,
    /// Turned into a new master wine.
    Approved,
    /// Recognized as an existing master wine.
    Merged,
    Rejected,
}

/// A wine suggested by a taster for the master database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Submission {
    pub(crate) id: SubmissionId,
    pub(crate) submitted_by: ProfileId,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub(crate) wine: WineDetails,
    pub(crate) status: SubmissionStatus,
    pub(crate) master_wine_id: Option<MasterWineId>,
    pub(crate) reviewed_by: Option<ProfileId>,
    pub(crate) review_note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

impl Submission {
    pub(crate) fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

/// The outcome a curator decided on for a pending submission.
#[derive(Debug, Clone)]
pub(crate) struct Review {
    pub(crate) status: SubmissionStatus,
    pub(crate) master_wine_id: Option<MasterWineId>,
    pub(crate) reviewed_by: ProfileId,
    pub(crate) note: Option<String>,
}

#[post("/submissions", data = "<wine>")]
async fn submit_wine(
    profile: Profile,
    wine: Json<WineDetails>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Submission>> {
    let wine = wine.into_inner().normalized()?;
    Ok(Json(repository.add_submission(profile.id, wine).await?))
}

#[get("/submissions/mine")]
async fn my_submissions(
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<Submission>>> {
    Ok(Json(repository.get_submissions_by(profile.id).await?))
}

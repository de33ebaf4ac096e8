use super::{Review, Submission, SubmissionId, SubmissionStatus};
use crate::auth::{AuthorizedTo, Curate};
use crate::database::Repository;
use crate::duplicates::{find_duplicates, Duplicate};
use crate::result::{HttpError, HttpResult};
use crate::wines::{MasterWine, MasterWineId};
use rocket::serde::json::Json;
use rocket::{get, post};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct QueueEntry {
    submission: Submission,
    duplicates: Vec<Duplicate>,
}

#[get("/curation/queue")]
pub(super) async fn queue(
    _curator: AuthorizedTo<Curate>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<QueueEntry>>> {
    let mut entries = Vec::new();
    for submission in repository.get_pending_submissions().await? {
        let candidates = repository.get_duplicate_candidates(&submission.wine).await?;
        let duplicates = find_duplicates(&submission.wine, &candidates)
            .into_iter()
            .map(Into::into)
            .collect();
        entries.push(QueueEntry {
            submission,
            duplicates,
        });
    }
    Ok(Json(entries))
}

#[post("/curation/<id>/approve")]
pub(super) async fn approve(
    id: SubmissionId,
    curator: AuthorizedTo<Curate>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<MasterWine>> {
    pending_submission(repository.as_mut(), id).await?;
    repository
        .approve_submission(id, curator.id)
        .await?
        .map(Json)
        .ok_or_else(already_reviewed)
}

#[derive(Debug, Deserialize)]
pub(super) struct MergeData {
    master_wine_id: MasterWineId,
    note: Option<String>,
}

#[post("/curation/<id>/merge", data = "<data>")]
pub(super) async fn merge(
    id: SubmissionId,
    curator: AuthorizedTo<Curate>,
    data: Json<MergeData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Submission>> {
    let data = data.into_inner();
    pending_submission(repository.as_mut(), id).await?;
    if repository.get_master_wine(data.master_wine_id).await?.is_none() {
        return Err(HttpError::unprocessable("That master wine does not exist"));
    }
    let review = Review {
        status: SubmissionStatus::Merged,
        master_wine_id: Some(data.master_wine_id),
        reviewed_by: curator.id,
        note: non_blank(data.note),
    };
    record_review(repository.as_mut(), id, review).await
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RejectData {
    note: Option<String>,
}

#[post("/curation/<id>/reject", data = "<data>")]
pub(super) async fn reject(
    id: SubmissionId,
    curator: AuthorizedTo<Curate>,
    data: Option<Json<RejectData>>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Submission>> {
    let data = data.map(Json::into_inner).unwrap_or_default();
    pending_submission(repository.as_mut(), id).await?;
    let review = Review {
        status: SubmissionStatus::Rejected,
        master_wine_id: None,
        reviewed_by: curator.id,
        note: non_blank(data.note),
    };
    record_review(repository.as_mut(), id, review).await
}

async fn pending_submission(
    repository: &mut dyn Repository,
    id: SubmissionId,
) -> HttpResult<Submission> {
    let submission = repository
        .get_submission(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Submission"))?;
    if submission.is_pending() {
        Ok(submission)
    } else {
        Err(already_reviewed())
    }
}

async fn record_review(
    repository: &mut dyn Repository,
    id: SubmissionId,
    review: Review,
) -> HttpResult<Json<Submission>> {
    if !repository.review_submission(id, review).await? {
        return Err(already_reviewed());
    }
    repository
        .get_submission(id)
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::not_found("Submission"))
}

fn already_reviewed() -> HttpError {
    HttpError::conflict("This submission has already been reviewed")
}

fn non_blank(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty())
}

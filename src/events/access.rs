use super::{EventId, TastingEvent};
use crate::database::Repository;
use crate::profiles::Profile;
use crate::result::{HttpError, HttpResult};
use anyhow::Result;

/// Admins manage the events they created and those of
/// organizations in which they are an owner or admin.
pub(crate) async fn can_manage(
    repository: &mut dyn Repository,
    profile: &Profile,
    event: &TastingEvent,
) -> Result<bool> {
    if !profile.can_administer() {
        return Ok(false);
    }
    if event.created_by == profile.id {
        return Ok(true);
    }
    match event.organization_id {
        Some(organization) => Ok(repository
            .get_member_role(organization, profile.id)
            .await?
            .is_some_and(|role| role.can_manage())),
        None => Ok(false),
    }
}

pub(crate) async fn can_attend(
    repository: &mut dyn Repository,
    profile: &Profile,
    event: &TastingEvent,
) -> Result<bool> {
    Ok(repository.is_participant(event.id, profile.id).await?
        || can_manage(repository, profile, event).await?)
}

/// Fetches an event the profile is allowed to manage.
pub(crate) async fn managed_event(
    repository: &mut dyn Repository,
    profile: &Profile,
    id: EventId,
) -> HttpResult<TastingEvent> {
    let event = repository
        .get_event(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))?;
    if can_manage(repository, profile, &event).await? {
        Ok(event)
    } else {
        Err(HttpError::forbidden())
    }
}

/// Fetches an event the profile has joined or manages.
pub(crate) async fn attended_event(
    repository: &mut dyn Repository,
    profile: &Profile,
    id: EventId,
) -> HttpResult<TastingEvent> {
    let event = repository
        .get_event(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))?;
    if can_attend(repository, profile, &event).await? {
        Ok(event)
    } else {
        Err(HttpError::forbidden())
    }
}

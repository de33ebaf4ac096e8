use crate::database::Repository;
use crate::events::EventId;
use crate::profiles::{Profile, ProfileId};
use anyhow::{Error, Result};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::outcome::{try_outcome, IntoOutcome};
use rocket::request::{FromRequest, Outcome};
use rocket::{async_trait, Request};
use std::borrow::Cow;
use std::sync::Arc;
use time::OffsetDateTime;

#[async_trait]
impl<'r> FromRequest<'r> for Profile {
    type Error = Arc<Error>;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        request
            .local_cache_async(async {
                let mut repository = try_outcome!(request
                    .guard::<Box<dyn Repository>>()
                    .await
                    .map_error(|(status, e)| (status, Arc::new(e))));
                match fetch_profile(request, repository.as_mut()).await {
                    Ok(Some(profile)) => Outcome::Success(profile),
                    Ok(None) => Outcome::Forward(Status::Unauthorized),
                    Err(e) => Outcome::Error((Status::InternalServerError, Arc::new(e))),
                }
            })
            .await
            .clone()
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for LoginState {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        request
            .cookies()
            .login_state()
            .or_error(Status::InternalServerError)
    }
}

async fn fetch_profile(
    request: &Request<'_>,
    repository: &mut dyn Repository,
) -> Result<Option<Profile>> {
    let login_state = request.cookies().login_state()?;
    resolve_profile(repository, login_state, OffsetDateTime::now_utc()).await
}

/// Resolves the profile a session refers to.
/// Temporary profiles past their expiry are treated as gone.
async fn resolve_profile(
    repository: &mut dyn Repository,
    login_state: LoginState,
    now: OffsetDateTime,
) -> Result<Option<Profile>> {
    match login_state.profile_id() {
        Some(id) => Ok(repository
            .get_profile(id)
            .await?
            .filter(|profile| !profile.is_expired(now))),
        None => Ok(None),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum LoginState {
    Authenticated(ProfileId),
    Anonymous,
}

impl LoginState {
    pub(crate) fn profile_id(self) -> Option<ProfileId> {
        match self {
            LoginState::Authenticated(id) => Some(id),
            LoginState::Anonymous => None,
        }
    }
}

pub(crate) trait CookieJarExt {
    fn login_state(&self) -> Result<LoginState>;

    fn set_login_state(&self, state: LoginState);

    /// The event the visitor joined most recently.
    fn current_event(&self) -> Result<Option<EventId>>;

    fn set_current_event(&self, event: Option<EventId>);
}

impl CookieJarExt for CookieJar<'_> {
    fn login_state(&self) -> Result<LoginState> {
        Ok(parse_id_cookie(self.get_private(PROFILE_ID_COOKIE_NAME))?
            .map(|id| LoginState::Authenticated(ProfileId(id)))
            .unwrap_or(LoginState::Anonymous))
    }

    fn set_login_state(&self, state: LoginState) {
        match state {
            LoginState::Authenticated(id) => {
                self.add_private(private_cookie(PROFILE_ID_COOKIE_NAME, id.0.to_string()))
            }
            LoginState::Anonymous => {
                self.remove_private(private_cookie(PROFILE_ID_COOKIE_NAME, ""));
                self.remove_private(private_cookie(CURRENT_EVENT_COOKIE_NAME, ""));
            }
        }
    }

    fn current_event(&self) -> Result<Option<EventId>> {
        Ok(parse_id_cookie(self.get_private(CURRENT_EVENT_COOKIE_NAME))?.map(EventId))
    }

    fn set_current_event(&self, event: Option<EventId>) {
        match event {
            Some(id) => self.add_private(private_cookie(CURRENT_EVENT_COOKIE_NAME, id.0.to_string())),
            None => self.remove_private(private_cookie(CURRENT_EVENT_COOKIE_NAME, "")),
        }
    }
}

fn parse_id_cookie(cookie: Option<Cookie>) -> Result<Option<i64>> {
    Ok(cookie.map(|c| c.value().parse()).transpose()?)
}

fn private_cookie<'a>(name: &'a str, value: impl Into<Cow<'a, str>>) -> impl Into<Cookie<'a>> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .permanent()
        .same_site(SameSite::Lax)
}

const PROFILE_ID_COOKIE_NAME: &str = "profile-id";
const CURRENT_EVENT_COOKIE_NAME: &str = "current-event";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::tests::{profile, repository};
    use crate::profiles::NewProfile;
    use time::Duration;

    #[rocket::async_test]
    async fn anonymous_sessions_have_no_profile() {
        let mut repository = repository().await;
        let now = OffsetDateTime::now_utc();
        assert!(resolve_profile(&mut repository, LoginState::Anonymous, now)
            .await
            .unwrap()
            .is_none());
    }

    #[rocket::async_test]
    async fn sessions_of_deleted_profiles_have_no_profile() {
        let mut repository = repository().await;
        let state = LoginState::Authenticated(ProfileId(404));
        let now = OffsetDateTime::now_utc();
        assert!(resolve_profile(&mut repository, state, now).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn permanent_profiles_never_expire() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let state = LoginState::Authenticated(host.id);
        let much_later = OffsetDateTime::now_utc() + Duration::days(3650);
        let resolved = resolve_profile(&mut repository, state, much_later).await.unwrap();
        assert_eq!(Some(host.id), resolved.map(|p| p.id));
    }

    #[rocket::async_test]
    async fn temporary_profiles_stop_resolving_once_expired() {
        let mut repository = repository().await;
        let created_at = OffsetDateTime::now_utc();
        let guest = repository
            .add_profile(NewProfile::temporary(
                "Guest".to_owned(),
                Duration::hours(48),
                created_at,
            ))
            .await
            .unwrap();
        let state = LoginState::Authenticated(guest.id);

        let before = created_at + Duration::hours(47);
        let resolved = resolve_profile(&mut repository, state, before).await.unwrap();
        assert_eq!(Some(guest.id), resolved.map(|p| p.id));

        let after = created_at + Duration::hours(48);
        assert!(resolve_profile(&mut repository, state, after).await.unwrap().is_none());
    }
}

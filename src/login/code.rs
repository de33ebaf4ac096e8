use crate::auth::{CookieJarExt as _, LoginState};
use crate::database::Repository;
use crate::profiles::Profile;
use crate::result::{HttpError, HttpResult};
use rocket::http::{CookieJar, Status};
use rocket::post;
use rocket::serde::json::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct LoginWithCodeData {
    code: String,
}

#[post("/login/code", data = "<data>")]
pub(super) async fn login_with_code(
    data: Json<LoginWithCodeData>,
    cookies: &CookieJar<'_>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Profile>> {
    let profile = redeem_login_code(repository.as_mut(), &data.code).await?;
    cookies.set_login_state(LoginState::Authenticated(profile.id));
    Ok(Json(profile))
}

/// Spends a one-time login code, yielding the profile it was issued for.
pub(crate) async fn redeem_login_code(
    repository: &mut dyn Repository,
    code: &str,
) -> HttpResult<Profile> {
    let profile = match repository.use_login_token(code.trim()).await? {
        Some(id) => repository.get_profile(id).await?,
        None => None,
    };
    profile.ok_or_else(|| {
        HttpError::rejected(Status::Unauthorized, "That code is invalid or has expired")
    })
}

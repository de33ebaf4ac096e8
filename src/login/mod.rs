use crate::auth::{CookieJarExt as _, LoginState};
use crate::database::Repository;
use crate::email::{EmailMessage, EmailSender};
use crate::profiles::{parse_email_address, Profile, ProfileId};
use crate::result::{HttpError, HttpResult};
use anyhow::{Context as _, Result};
use rand::distr::Distribution;
use rand::{rng, Rng};
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{post, routes, Request, Response, Route, State};
use rocket_dyn_templates::tera::Context;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

mod code;
mod secret_key;
pub(crate) use code::redeem_login_code;
pub(crate) use secret_key::*;

pub(crate) fn routes() -> Vec<Route> {
    routes![login, code::login_with_code, logout]
}

#[derive(Debug, Deserialize)]
struct LoginData {
    email_address: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginPending {
    message: &'static str,
}

impl LoginPending {
    pub(crate) fn code_sent() -> Self {
        Self {
            message: "We sent you an email with a login code",
        }
    }
}

#[post("/login", data = "<data>")]
async fn login(
    data: Json<LoginData>,
    email_sender: &State<Box<dyn EmailSender>>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<LoginPending>> {
    let email_address = parse_email_address(&data.email_address)?;
    let profile = repository
        .get_profile_by_email(email_address.as_str())
        .await?
        .ok_or_else(|| HttpError::not_found("Profile"))?;
    send_login_code(repository.as_mut(), email_sender.inner().as_ref(), &profile).await?;
    Ok(Json(LoginPending::code_sent()))
}

/// Issues a one-time login code for `profile` and mails it to the
/// profile's address.
pub(crate) async fn send_login_code(
    repository: &mut dyn Repository,
    email_sender: &dyn EmailSender,
    profile: &Profile,
) -> Result<()> {
    let mailbox = profile
        .mailbox()?
        .context("cannot send a login code to a profile without an email address")?;
    let email = generate_login_email(repository, profile).await?;
    email_sender.send(mailbox, &email).await
}

async fn generate_login_email(
    repository: &mut dyn Repository,
    profile: &Profile,
) -> Result<LoginEmail> {
    let token = LoginToken::generate_one_time(profile.id, &mut rng());
    repository.add_login_token(&token).await?;
    Ok(LoginEmail {
        name: profile.display_name.clone(),
        code: token.token,
    })
}

#[post("/logout")]
fn logout() -> Logout {
    Logout
}

pub(crate) struct Logout;

impl<'r> Responder<'r, 'static> for Logout {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        request.cookies().set_login_state(LoginState::Anonymous);

        Response::build()
            .raw_header("Clear-Site-Data", "\"cookies\"")
            .ok()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LoginToken {
    pub(crate) token: String,
    pub(crate) profile_id: ProfileId,
    pub(crate) valid_until: OffsetDateTime,
}

const ONE_TIME_TOKEN_LIFETIME: Duration = Duration::minutes(10);

impl LoginToken {
    pub(crate) fn generate_one_time<R: Rng>(profile_id: ProfileId, rng: &mut R) -> Self {
        Self {
            token: rng.sample(OneTimeToken),
            profile_id,
            valid_until: OffsetDateTime::now_utc() + ONE_TIME_TOKEN_LIFETIME,
        }
    }
}

pub(crate) const ONE_TIME_TOKEN_LENGTH: usize = 6;

struct OneTimeToken;

impl Distribution<String> for OneTimeToken {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..ONE_TIME_TOKEN_LENGTH)
            .map(|_| rng.random_range(1..=9_u8).to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
struct LoginEmail {
    name: String,
    code: String,
}

impl EmailMessage for LoginEmail {
    fn subject(&self) -> String {
        "Your Palate Collectif login code".to_owned()
    }

    fn template_name(&self) -> String {
        "login".to_owned()
    }

    fn template_context(&self) -> Result<Context> {
        Ok(Context::from_serialize(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn one_time_tokens_are_six_nonzero_digits() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            let token: String = rng.sample(OneTimeToken);
            assert_eq!(ONE_TIME_TOKEN_LENGTH, token.len());
            assert!(token.chars().all(|c| ('1'..='9').contains(&c)), "{token}");
        }
    }

    #[test]
    fn one_time_tokens_expire_after_ten_minutes() {
        let before = OffsetDateTime::now_utc();
        let token = LoginToken::generate_one_time(ProfileId(3), &mut SmallRng::seed_from_u64(1));
        assert_eq!(ProfileId(3), token.profile_id);
        assert!(token.valid_until >= before + ONE_TIME_TOKEN_LIFETIME);
        assert!(token.valid_until <= OffsetDateTime::now_utc() + ONE_TIME_TOKEN_LIFETIME);
    }

    #[test]
    fn login_email_exposes_name_and_code() {
        let email = LoginEmail {
            name: "Ada".to_owned(),
            code: "123456".to_owned(),
        };
        let context = email.template_context().unwrap();
        assert_eq!(Some("123456"), context.get("code").and_then(|v| v.as_str()));
    }
}

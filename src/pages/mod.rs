use crate::auth::{CookieJarExt as _, LoginState};
use crate::database::Repository;
use crate::email::EmailSender;
use crate::events::{can_attend, join, Admission, EventCode, EventLocation, JoinData, TastingEvent};
use crate::infra::AppConfig;
use crate::login::redeem_login_code;
use crate::profiles::Profile;
use crate::result::{HttpError, HttpResult};
use crate::taste::build_taste_profile;
use crate::wines::{wines_with_ratings, EventWineView};
use anyhow::Error;
use rocket::form::Form;
use rocket::http::{CookieJar, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::Redirect;
use rocket::{
    async_trait, catch, catchers, get, post, routes, uri, Catcher, FromForm, Request, Route, State,
};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use std::borrow::Cow;

pub(crate) fn routes() -> Vec<Route> {
    routes![index, event_page, join_form, login_code_form, taste_page]
}

pub(crate) fn catchers() -> Vec<Catcher> {
    catchers![page_error]
}

/// Renders templates with the visitor's profile and the current path in scope.
pub(crate) struct PageBuilder {
    profile: Option<Profile>,
    path: String,
}

impl PageBuilder {
    pub(crate) fn render(
        &self,
        name: impl Into<Cow<'static, str>>,
        context: impl Serialize,
    ) -> Template {
        Template::render(
            name,
            context! { profile: &self.profile, path: &self.path, page: context },
        )
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for PageBuilder {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let profile = request.guard::<Profile>().await.succeeded();
        Outcome::Success(PageBuilder {
            profile,
            path: request.uri().path().to_string(),
        })
    }
}

#[get("/?<code>")]
fn index(code: Option<&str>, page: PageBuilder) -> Result<Redirect, Template> {
    match code.map(EventCode::parse) {
        Some(Some(code)) => Ok(Redirect::to(uri!(event_page(code = code.as_str())))),
        Some(None) => Err(page.render("index", context! { invalid_code: true })),
        None => Err(page.render("index", context! { invalid_code: false })),
    }
}

#[derive(Debug, Serialize)]
struct EventPage {
    event: TastingEvent,
    locations: Vec<EventLocation>,
    /// Whether the visitor may see and rate the wines, even when none are poured yet.
    attending: bool,
    wines: Vec<EventWineView>,
}

#[get("/e/<code>")]
async fn event_page(
    code: &str,
    page: PageBuilder,
    profile: Option<Profile>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Template> {
    let event = find_event(repository.as_mut(), code).await?;
    let locations = repository.get_locations(event.id).await?;
    let attending = match &profile {
        Some(profile) => can_attend(repository.as_mut(), profile, &event).await?,
        None => false,
    };
    let wines = match profile.filter(|_| attending) {
        Some(profile) => wines_with_ratings(repository.as_mut(), profile.id, event.id).await?,
        None => Vec::new(),
    };
    Ok(page.render(
        "event",
        EventPage {
            event,
            locations,
            attending,
            wines,
        },
    ))
}

#[post("/e/<code>/join", data = "<form>")]
async fn join_form(
    code: &str,
    form: Form<JoinData>,
    page: PageBuilder,
    profile: Option<Profile>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    email_sender: &State<Box<dyn EmailSender>>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Result<Redirect, Template>> {
    let event = find_event(repository.as_mut(), code).await?;
    let admission = join(
        repository.as_mut(),
        &event,
        profile,
        &form,
        config,
        email_sender.inner().as_ref(),
        cookies,
    )
    .await?;
    Ok(match admission {
        Admission::Joined(_) => Ok(Redirect::to(uri!(event_page(code = event.code.as_str())))),
        Admission::LoginCodeSent => Err(page.render("login_code", context! { event })),
    })
}

#[derive(Debug, FromForm)]
struct LoginCodeForm {
    login_code: String,
}

/// Second step of entering a booth with an address that already has a profile.
#[post("/e/<code>/login", data = "<form>")]
async fn login_code_form(
    code: &str,
    form: Form<LoginCodeForm>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    email_sender: &State<Box<dyn EmailSender>>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Redirect> {
    let event = find_event(repository.as_mut(), code).await?;
    let profile = redeem_login_code(repository.as_mut(), &form.login_code).await?;
    cookies.set_login_state(LoginState::Authenticated(profile.id));
    join(
        repository.as_mut(),
        &event,
        Some(profile),
        &JoinData::default(),
        config,
        email_sender.inner().as_ref(),
        cookies,
    )
    .await?;
    Ok(Redirect::to(uri!(event_page(code = event.code.as_str()))))
}

async fn find_event(repository: &mut dyn Repository, code: &str) -> HttpResult<TastingEvent> {
    let code = EventCode::parse(code).ok_or_else(|| HttpError::not_found("Event"))?;
    repository
        .get_event_by_code(&code)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))
}

#[get("/me/taste")]
async fn taste_page(
    profile: Profile,
    page: PageBuilder,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Template> {
    let ratings = repository.get_profile_ratings(profile.id).await?;
    let taste = build_taste_profile(&ratings);
    Ok(page.render("taste", context! { taste, ratings }))
}

#[catch(default)]
fn page_error(status: Status, _request: &Request<'_>) -> Template {
    Template::render(
        "error",
        context! {
            code: status.code,
            reason: status.reason().unwrap_or("Something went wrong"),
            unauthorized: status == Status::Unauthorized,
        },
    )
}

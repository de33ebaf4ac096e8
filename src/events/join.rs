use super::{EventCode, EventSummary, TastingEvent};
use crate::auth::{CookieJarExt as _, LoginState};
use crate::database::Repository;
use crate::email::EmailSender;
use crate::infra::AppConfig;
use crate::login::{send_login_code, LoginPending};
use crate::profiles::{
    display_name_from_email, parse_display_name, parse_email_address, NewProfile, Profile,
};
use crate::result::{HttpError, HttpResult};
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::{post, FromForm, Responder, State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize, FromForm)]
pub(crate) struct JoinData {
    pub(crate) display_name: Option<String>,
    pub(crate) email_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Joined {
    event: EventSummary,
    profile: Profile,
}

#[derive(Debug, Responder)]
pub(super) enum JoinResponse {
    Joined(Json<Joined>),
    #[response(status = 202)]
    LoginCodeSent(Json<LoginPending>),
}

#[post("/events/<code>/join", data = "<data>")]
pub(super) async fn join_event(
    code: EventCode,
    data: Option<Json<JoinData>>,
    profile: Option<Profile>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    email_sender: &State<Box<dyn EmailSender>>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<JoinResponse> {
    let event = repository
        .get_event_by_code(&code)
        .await?
        .ok_or_else(|| HttpError::not_found("Event"))?;
    let data = data.map(Json::into_inner).unwrap_or_default();
    let admission = join(
        repository.as_mut(),
        &event,
        profile,
        &data,
        config,
        email_sender.inner().as_ref(),
        cookies,
    )
    .await?;
    Ok(match admission {
        Admission::Joined(profile) => JoinResponse::Joined(Json(Joined {
            event: event.into(),
            profile,
        })),
        Admission::LoginCodeSent => JoinResponse::LoginCodeSent(Json(LoginPending::code_sent())),
    })
}

#[derive(Debug)]
pub(crate) enum Admission {
    Joined(Profile),
    /// The email address belongs to an existing profile, which has to
    /// log in with the code we mailed before joining.
    LoginCodeSent,
}

/// Adds the visitor to the event's participants, handing out a profile
/// if needed, and remembers both in the session.
pub(crate) async fn join(
    repository: &mut dyn Repository,
    event: &TastingEvent,
    profile: Option<Profile>,
    data: &JoinData,
    config: &AppConfig,
    email_sender: &dyn EmailSender,
    cookies: &CookieJar<'_>,
) -> HttpResult<Admission> {
    let admission = admit(repository, event, profile, data, config, email_sender).await?;
    if let Admission::Joined(profile) = &admission {
        cookies.set_login_state(LoginState::Authenticated(profile.id));
        cookies.set_current_event(Some(event.id));
    }
    Ok(admission)
}

async fn admit(
    repository: &mut dyn Repository,
    event: &TastingEvent,
    profile: Option<Profile>,
    data: &JoinData,
    config: &AppConfig,
    email_sender: &dyn EmailSender,
) -> HttpResult<Admission> {
    let profile = match profile {
        Some(profile) if !event.booth_mode || !profile.is_temporary => profile,
        _ => {
            let now = OffsetDateTime::now_utc();
            match entrant(repository, event, data, config, now).await? {
                Entrant::Created(profile) => profile,
                Entrant::Registered(profile) => {
                    send_login_code(repository, email_sender, &profile).await?;
                    return Ok(Admission::LoginCodeSent);
                }
            }
        }
    };
    repository.add_participant(event.id, profile.id).await?;
    Ok(Admission::Joined(profile))
}

#[derive(Debug)]
enum Entrant {
    Created(Profile),
    /// Knowing an address is not proof of owning it.
    Registered(Profile),
}

/// Booth-mode events identify visitors by email address,
/// every other event hands out a temporary profile.
async fn entrant(
    repository: &mut dyn Repository,
    event: &TastingEvent,
    data: &JoinData,
    config: &AppConfig,
    now: OffsetDateTime,
) -> HttpResult<Entrant> {
    let display_name = data.display_name.as_deref().and_then(parse_display_name);
    if event.booth_mode {
        let email_address = data
            .email_address
            .as_deref()
            .ok_or_else(|| HttpError::unprocessable("This event requires an email address"))
            .and_then(parse_email_address)?;
        if let Some(profile) = repository
            .get_profile_by_email(email_address.as_str())
            .await?
        {
            return Ok(Entrant::Registered(profile));
        }
        let display_name = display_name.unwrap_or_else(|| display_name_from_email(&email_address));
        Ok(Entrant::Created(
            repository
                .add_profile(NewProfile::permanent(display_name, &email_address))
                .await?,
        ))
    } else {
        let display_name = display_name.unwrap_or_else(|| "Guest".to_owned());
        Ok(Entrant::Created(
            repository
                .add_profile(NewProfile::temporary(
                    display_name,
                    config.temporary_profile_lifetime(),
                    now,
                ))
                .await?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::tests::{event, profile, repository};
    use crate::email::EmailMessage;
    use anyhow::Result;
    use lettre::message::Mailbox;
    use rocket::async_trait;
    use rocket::http::Status;
    use rocket::response::status::Custom;
    use std::sync::{Arc, Mutex};
    use time::Duration;

    /// Remembers who was mailed which login code.
    #[derive(Debug, Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<(String, String)>>>);

    #[async_trait]
    impl EmailSender for Outbox {
        async fn send(&self, recipient: Mailbox, email: &dyn EmailMessage) -> Result<()> {
            let context = email.template_context()?;
            let code = context
                .get("code")
                .and_then(|code| code.as_str())
                .unwrap_or_default()
                .to_owned();
            self.0.lock().unwrap().push((recipient.email.to_string(), code));
            Ok(())
        }
    }

    impl Outbox {
        fn sent(&self) -> Vec<(String, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            temporary_profile_lifetime_hours: 48,
        }
    }

    fn with_email(email_address: &str) -> JoinData {
        JoinData {
            display_name: None,
            email_address: Some(email_address.to_owned()),
        }
    }

    #[rocket::async_test]
    async fn open_events_hand_out_expiring_guest_profiles() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let event = event(&mut repository, host.id).await;
        let now = OffsetDateTime::now_utc();

        let entrant = entrant(&mut repository, &event, &JoinData::default(), &config(), now)
            .await
            .unwrap();
        let Entrant::Created(guest) = entrant else {
            panic!("expected a new profile, got {entrant:?}");
        };
        assert_eq!("Guest", guest.display_name);
        assert!(guest.is_temporary);
        assert!(!guest.is_expired(now + Duration::hours(47)));
        assert!(guest.is_expired(now + Duration::hours(48)));
    }

    #[rocket::async_test]
    async fn booth_events_require_an_email_address() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let mut event = event(&mut repository, host.id).await;
        event.booth_mode = true;

        let result = entrant(
            &mut repository,
            &event,
            &JoinData::default(),
            &config(),
            OffsetDateTime::now_utc(),
        )
        .await;
        assert!(matches!(
            result,
            Err(HttpError::Rejected(Custom(Status::UnprocessableEntity, _)))
        ));
    }

    #[rocket::async_test]
    async fn booth_events_create_permanent_profiles_for_new_addresses() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let mut event = event(&mut repository, host.id).await;
        event.booth_mode = true;
        let outbox = Outbox::default();

        let admission = admit(
            &mut repository,
            &event,
            None,
            &with_email("visitor@example.org"),
            &config(),
            &outbox,
        )
        .await
        .unwrap();
        let Admission::Joined(visitor) = admission else {
            panic!("expected to join, got {admission:?}");
        };
        assert!(!visitor.is_temporary);
        assert_eq!(Some("visitor@example.org"), visitor.email_address.as_deref());
        assert!(repository.is_participant(event.id, visitor.id).await.unwrap());
        assert!(outbox.sent().is_empty());
    }

    #[rocket::async_test]
    async fn booth_events_mail_a_login_code_to_registered_addresses() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let mut event = event(&mut repository, host.id).await;
        event.booth_mode = true;
        let outbox = Outbox::default();

        let entrant = entrant(
            &mut repository,
            &event,
            &with_email("Host@Example.org"),
            &config(),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();
        assert!(matches!(entrant, Entrant::Registered(ref p) if p.id == host.id));

        let admission = admit(
            &mut repository,
            &event,
            None,
            &with_email("host@example.org"),
            &config(),
            &outbox,
        )
        .await
        .unwrap();
        assert!(matches!(admission, Admission::LoginCodeSent));
        assert!(!repository.is_participant(event.id, host.id).await.unwrap());

        let sent = outbox.sent();
        assert_eq!(1, sent.len());
        assert_eq!("host@example.org", sent[0].0);
        assert_eq!(Some(host.id), repository.use_login_token(&sent[0].1).await.unwrap());
    }

    #[rocket::async_test]
    async fn temporary_visitors_at_booths_still_need_an_address() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let mut event = event(&mut repository, host.id).await;
        event.booth_mode = true;
        let guest = repository
            .add_profile(NewProfile::temporary(
                "Guest".to_owned(),
                Duration::hours(1),
                OffsetDateTime::now_utc(),
            ))
            .await
            .unwrap();

        let result = admit(
            &mut repository,
            &event,
            Some(guest),
            &JoinData::default(),
            &config(),
            &Outbox::default(),
        )
        .await;
        assert!(matches!(
            result,
            Err(HttpError::Rejected(Custom(Status::UnprocessableEntity, _)))
        ));
    }

    #[rocket::async_test]
    async fn logged_in_profiles_join_directly() {
        let mut repository = repository().await;
        let host = profile(&mut repository, "Host").await;
        let event = event(&mut repository, host.id).await;
        let taster = profile(&mut repository, "Taster").await;

        let admission = admit(
            &mut repository,
            &event,
            Some(taster.clone()),
            &JoinData::default(),
            &config(),
            &Outbox::default(),
        )
        .await
        .unwrap();
        assert!(matches!(admission, Admission::Joined(ref p) if p.id == taster.id));
        assert!(repository.is_participant(event.id, taster.id).await.unwrap());
    }
}

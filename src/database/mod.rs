use crate::events::{EventCode, EventId, EventLocation, EventPatch, NewEvent, NewLocation};
use crate::events::{LocationId, TastingEvent};
use crate::infra::PalateDatabase;
use crate::login::LoginToken;
use crate::organizations::{Membership, Organization, OrganizationId, OrganizationRole};
use crate::profiles::{NewProfile, Profile, ProfileId};
use crate::ratings::{NewRating, RatedWine, Rating};
use crate::submissions::{Review, Submission, SubmissionId};
use crate::wines::{EventWine, EventWineId, MasterWine, MasterWineId, NewEventWine, WineDetails};
use anyhow::{anyhow, Error, Result};
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome};
use rocket::{async_trait, Request};
use rocket_db_pools::Connection;
use time::OffsetDateTime;

pub(crate) mod sqlite;
pub(crate) use sqlite::*;

/// Declares a row id newtype that can be bound in queries,
/// serialized as a plain number and parsed from a path segment.
#[macro_export]
macro_rules! id_newtype {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            sqlx::Type,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[sqlx(transparent)]
        #[serde(transparent)]
        $vis struct $name(pub(crate) i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl<'a> rocket::request::FromParam<'a> for $name {
            type Error = std::num::ParseIntError;

            fn from_param(param: &'a str) -> Result<Self, Self::Error> {
                param.parse().map($name)
            }
        }
    };
}

#[async_trait]
pub(crate) trait Repository: Send {
    async fn add_profile(&mut self, profile: NewProfile) -> Result<Profile>;

    async fn get_profile(&mut self, id: ProfileId) -> Result<Option<Profile>>;

    async fn get_profile_by_email(&mut self, email_address: &str) -> Result<Option<Profile>>;

    async fn update_display_name(&mut self, id: ProfileId, display_name: &str) -> Result<()>;

    /// Turns a temporary profile into a permanent one bound to an email address.
    async fn make_permanent(&mut self, id: ProfileId, email_address: &str) -> Result<()>;

    async fn add_login_token(&mut self, token: &LoginToken) -> Result<()>;

    /// Consumes a login token, returning the profile it belongs to
    /// if the token exists and has not yet expired.
    async fn use_login_token(&mut self, token: &str) -> Result<Option<ProfileId>>;

    async fn add_event(&mut self, event: NewEvent) -> Result<TastingEvent>;

    async fn event_code_exists(&mut self, code: &EventCode) -> Result<bool>;

    async fn get_event(&mut self, id: EventId) -> Result<Option<TastingEvent>>;

    async fn get_event_by_code(&mut self, code: &EventCode) -> Result<Option<TastingEvent>>;

    /// Events created by the profile or owned by an organization
    /// the profile owns or administers.
    async fn get_managed_events(&mut self, profile: ProfileId) -> Result<Vec<TastingEvent>>;

    async fn get_organization_events(
        &mut self,
        organization: OrganizationId,
    ) -> Result<Vec<TastingEvent>>;

    async fn update_event(&mut self, id: EventId, patch: EventPatch) -> Result<()>;

    async fn delete_event(&mut self, id: EventId) -> Result<()>;

    async fn add_participant(&mut self, event: EventId, profile: ProfileId) -> Result<()>;

    async fn is_participant(&mut self, event: EventId, profile: ProfileId) -> Result<bool>;

    async fn add_location(&mut self, event: EventId, location: NewLocation) -> Result<EventLocation>;

    async fn get_location(&mut self, id: LocationId) -> Result<Option<EventLocation>>;

    async fn get_locations(&mut self, event: EventId) -> Result<Vec<EventLocation>>;

    async fn delete_location(&mut self, id: LocationId) -> Result<()>;

    async fn add_event_wine(&mut self, event: EventId, wine: NewEventWine) -> Result<EventWine>;

    async fn get_event_wine(&mut self, id: EventWineId) -> Result<Option<EventWine>>;

    async fn get_event_wines(&mut self, event: EventId) -> Result<Vec<EventWine>>;

    async fn update_event_wine(&mut self, id: EventWineId, wine: NewEventWine) -> Result<()>;

    async fn delete_event_wine(&mut self, id: EventWineId) -> Result<()>;

    async fn add_master_wine(&mut self, wine: WineDetails) -> Result<MasterWine>;

    async fn get_master_wine(&mut self, id: MasterWineId) -> Result<Option<MasterWine>>;

    async fn search_master_wines(&mut self, query: &str, limit: u32) -> Result<Vec<MasterWine>>;

    /// Master wines whose name or producer is a substring of the
    /// candidate's (or vice versa), ignoring case.
    async fn get_duplicate_candidates(&mut self, wine: &WineDetails) -> Result<Vec<MasterWine>>;

    /// Inserts a rating or replaces the existing rating of the same profile for the same wine.
    async fn upsert_rating(&mut self, rating: NewRating) -> Result<Rating>;

    async fn delete_rating(&mut self, profile: ProfileId, wine: EventWineId) -> Result<bool>;

    async fn get_profile_ratings(&mut self, profile: ProfileId) -> Result<Vec<RatedWine>>;

    async fn get_profile_event_ratings(
        &mut self,
        profile: ProfileId,
        event: EventId,
    ) -> Result<Vec<Rating>>;

    async fn get_event_ratings(&mut self, event: EventId) -> Result<Vec<Rating>>;

    async fn add_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<()>;

    async fn remove_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<bool>;

    async fn get_buddies(&mut self, profile: ProfileId) -> Result<Vec<Profile>>;

    async fn is_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<bool>;

    async fn add_submission(
        &mut self,
        submitted_by: ProfileId,
        wine: WineDetails,
    ) -> Result<Submission>;

    async fn get_submission(&mut self, id: SubmissionId) -> Result<Option<Submission>>;

    async fn get_submissions_by(&mut self, profile: ProfileId) -> Result<Vec<Submission>>;

    async fn get_pending_submissions(&mut self) -> Result<Vec<Submission>>;

    /// Records a review on a pending submission.
    /// Returns `false` if the submission was no longer pending.
    async fn review_submission(&mut self, id: SubmissionId, review: Review) -> Result<bool>;

    /// Creates a master wine from a pending submission and marks it approved.
    /// Returns `None` if the submission was no longer pending.
    async fn approve_submission(
        &mut self,
        id: SubmissionId,
        reviewed_by: ProfileId,
    ) -> Result<Option<MasterWine>>;

    /// Creates an organization with the given profile as its owner.
    async fn add_organization(&mut self, name: &str, owner: ProfileId) -> Result<Organization>;

    async fn get_organization(&mut self, id: OrganizationId) -> Result<Option<Organization>>;

    async fn get_memberships(&mut self, profile: ProfileId) -> Result<Vec<Membership>>;

    async fn get_member_role(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
    ) -> Result<Option<OrganizationRole>>;

    async fn set_member_role(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
        role: OrganizationRole,
    ) -> Result<()>;

    async fn remove_member(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
    ) -> Result<bool>;

    async fn count_owners(&mut self, organization: OrganizationId) -> Result<u64>;

    /// Deletes expired temporary profiles and login tokens.
    async fn prune(&mut self, now: OffsetDateTime) -> Result<u64>;
}

/// Acquires a connection of its own from the pool,
/// for work running alongside a request or outside of one.
pub(crate) async fn connect(database: &PalateDatabase) -> Result<Box<dyn Repository>> {
    Ok(Box::new(SqliteRepository(database.acquire().await?)))
}

#[async_trait]
impl<'r> FromRequest<'r> for Box<dyn Repository> {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let connection = try_outcome!(request
            .guard::<Connection<PalateDatabase>>()
            .await
            .map_error(|(status, e)| (
                status,
                anyhow!("failed to acquire a database connection: {e:?}")
            )));
        Outcome::Success(Box::new(SqliteRepository(connection.into_inner())))
    }
}

use super::Repository;
use crate::duplicates::is_candidate;
use crate::events::{EventCode, EventId, EventLocation, EventPatch, NewEvent, NewLocation};
use crate::events::{LocationId, TastingEvent};
use crate::login::LoginToken;
use crate::organizations::{Membership, Organization, OrganizationId, OrganizationRole};
use crate::profiles::{NewProfile, Profile, ProfileId};
use crate::ratings::{NewRating, RatedWine, Rating};
use crate::submissions::{Review, Submission, SubmissionId, SubmissionStatus};
use crate::wines::{EventWine, EventWineId, MasterWine, MasterWineId, NewEventWine, WineDetails};
use anyhow::Result;
use rocket::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Connection as _, Sqlite};
use std::ops::DerefMut;
use time::OffsetDateTime;

type SqliteConnection = PoolConnection<Sqlite>;

pub(crate) struct SqliteRepository(pub(crate) SqliteConnection);

#[async_trait]
impl Repository for SqliteRepository {
    async fn add_profile(&mut self, profile: NewProfile) -> Result<Profile> {
        let profile = sqlx::query_as(
            "INSERT INTO profiles (display_name, email_address, is_temporary, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING *",
        )
        .bind(profile.display_name)
        .bind(profile.email_address)
        .bind(profile.is_temporary)
        .bind(profile.expires_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(profile)
    }

    async fn get_profile(&mut self, id: ProfileId) -> Result<Option<Profile>> {
        let profile = sqlx::query_as("SELECT * FROM profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(profile)
    }

    async fn get_profile_by_email(&mut self, email_address: &str) -> Result<Option<Profile>> {
        let profile =
            sqlx::query_as("SELECT * FROM profiles WHERE lower(email_address) = lower(?1)")
                .bind(email_address)
                .fetch_optional(self.0.deref_mut())
                .await?;
        Ok(profile)
    }

    async fn update_display_name(&mut self, id: ProfileId, display_name: &str) -> Result<()> {
        sqlx::query("UPDATE profiles SET display_name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(display_name)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn make_permanent(&mut self, id: ProfileId, email_address: &str) -> Result<()> {
        sqlx::query(
            "UPDATE profiles SET email_address = ?2, is_temporary = FALSE, expires_at = NULL
             WHERE id = ?1",
        )
        .bind(id)
        .bind(email_address)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn add_login_token(&mut self, token: &LoginToken) -> Result<()> {
        sqlx::query("INSERT INTO login_tokens (token, profile_id, valid_until) VALUES (?1, ?2, ?3)")
            .bind(&token.token)
            .bind(token.profile_id)
            .bind(token.valid_until)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn use_login_token(&mut self, token: &str) -> Result<Option<ProfileId>> {
        let token: Option<LoginToken> =
            sqlx::query_as("DELETE FROM login_tokens WHERE token = ?1 RETURNING *")
                .bind(token)
                .fetch_optional(self.0.deref_mut())
                .await?;
        let now = OffsetDateTime::now_utc();
        Ok(token
            .filter(|token| token.valid_until > now)
            .map(|token| token.profile_id))
    }

    async fn add_event(&mut self, event: NewEvent) -> Result<TastingEvent> {
        let event = sqlx::query_as(
            "INSERT INTO events
                (name, description, code, event_date, booth_mode, created_by, organization_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING *",
        )
        .bind(event.name)
        .bind(event.description)
        .bind(event.code)
        .bind(event.event_date)
        .bind(event.booth_mode)
        .bind(event.created_by)
        .bind(event.organization_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(event)
    }

    async fn event_code_exists(&mut self, code: &EventCode) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE code = ?1)")
            .bind(code)
            .fetch_one(self.0.deref_mut())
            .await?;
        Ok(exists)
    }

    async fn get_event(&mut self, id: EventId) -> Result<Option<TastingEvent>> {
        let event = sqlx::query_as("SELECT * FROM events WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(event)
    }

    async fn get_event_by_code(&mut self, code: &EventCode) -> Result<Option<TastingEvent>> {
        let event = sqlx::query_as("SELECT * FROM events WHERE code = ?1")
            .bind(code)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(event)
    }

    async fn get_managed_events(&mut self, profile: ProfileId) -> Result<Vec<TastingEvent>> {
        let events = sqlx::query_as(
            "SELECT DISTINCT e.* FROM events e
             LEFT JOIN organization_members m
                ON m.organization_id = e.organization_id AND m.profile_id = ?1
             WHERE e.created_by = ?1 OR m.role IN ('owner', 'admin')
             ORDER BY e.event_date DESC, e.id DESC",
        )
        .bind(profile)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(events)
    }

    async fn get_organization_events(
        &mut self,
        organization: OrganizationId,
    ) -> Result<Vec<TastingEvent>> {
        let events = sqlx::query_as(
            "SELECT * FROM events WHERE organization_id = ?1 ORDER BY event_date DESC, id DESC",
        )
        .bind(organization)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(events)
    }

    async fn update_event(&mut self, id: EventId, patch: EventPatch) -> Result<()> {
        sqlx::query(
            "UPDATE events SET
                name = coalesce(?2, name),
                description = coalesce(?3, description),
                event_date = coalesce(?4, event_date),
                booth_mode = coalesce(?5, booth_mode)
             WHERE id = ?1",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.event_date)
        .bind(patch.booth_mode)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn delete_event(&mut self, id: EventId) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn add_participant(&mut self, event: EventId, profile: ProfileId) -> Result<()> {
        sqlx::query(
            "INSERT INTO event_participants (event_id, profile_id, joined_at) VALUES (?1, ?2, ?3)
             ON CONFLICT DO NOTHING",
        )
        .bind(event)
        .bind(profile)
        .bind(OffsetDateTime::now_utc())
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn is_participant(&mut self, event: EventId, profile: ProfileId) -> Result<bool> {
        let is_participant = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_participants WHERE event_id = ?1 AND profile_id = ?2)",
        )
        .bind(event)
        .bind(profile)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(is_participant)
    }

    async fn add_location(&mut self, event: EventId, location: NewLocation) -> Result<EventLocation> {
        let location = sqlx::query_as(
            "INSERT INTO event_locations (event_id, name, address, position) VALUES (?1, ?2, ?3, ?4)
             RETURNING *",
        )
        .bind(event)
        .bind(location.name)
        .bind(location.address)
        .bind(location.position)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(location)
    }

    async fn get_location(&mut self, id: LocationId) -> Result<Option<EventLocation>> {
        let location = sqlx::query_as("SELECT * FROM event_locations WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(location)
    }

    async fn get_locations(&mut self, event: EventId) -> Result<Vec<EventLocation>> {
        let locations =
            sqlx::query_as("SELECT * FROM event_locations WHERE event_id = ?1 ORDER BY position, id")
                .bind(event)
                .fetch_all(self.0.deref_mut())
                .await?;
        Ok(locations)
    }

    async fn delete_location(&mut self, id: LocationId) -> Result<()> {
        sqlx::query("DELETE FROM event_locations WHERE id = ?1")
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn add_event_wine(&mut self, event: EventId, wine: NewEventWine) -> Result<EventWine> {
        let details = wine.details;
        let wine = sqlx::query_as(
            "INSERT INTO event_wines
                (event_id, master_wine_id, location_id, name, producer, vintage,
                 region, grape_variety, wine_type, price_cents, tasting_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING *",
        )
        .bind(event)
        .bind(wine.master_wine_id)
        .bind(wine.location_id)
        .bind(details.name)
        .bind(details.producer)
        .bind(details.vintage)
        .bind(details.region)
        .bind(details.grape_variety)
        .bind(details.wine_type)
        .bind(wine.price_cents)
        .bind(wine.tasting_order)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(wine)
    }

    async fn get_event_wine(&mut self, id: EventWineId) -> Result<Option<EventWine>> {
        let wine = sqlx::query_as("SELECT * FROM event_wines WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(wine)
    }

    async fn get_event_wines(&mut self, event: EventId) -> Result<Vec<EventWine>> {
        let wines = sqlx::query_as(
            "SELECT * FROM event_wines WHERE event_id = ?1 ORDER BY tasting_order, id",
        )
        .bind(event)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(wines)
    }

    async fn update_event_wine(&mut self, id: EventWineId, wine: NewEventWine) -> Result<()> {
        let details = wine.details;
        sqlx::query(
            "UPDATE event_wines SET
                master_wine_id = ?2, location_id = ?3, name = ?4, producer = ?5, vintage = ?6,
                region = ?7, grape_variety = ?8, wine_type = ?9, price_cents = ?10, tasting_order = ?11
             WHERE id = ?1",
        )
        .bind(id)
        .bind(wine.master_wine_id)
        .bind(wine.location_id)
        .bind(details.name)
        .bind(details.producer)
        .bind(details.vintage)
        .bind(details.region)
        .bind(details.grape_variety)
        .bind(details.wine_type)
        .bind(wine.price_cents)
        .bind(wine.tasting_order)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn delete_event_wine(&mut self, id: EventWineId) -> Result<()> {
        sqlx::query("DELETE FROM event_wines WHERE id = ?1")
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn add_master_wine(&mut self, wine: WineDetails) -> Result<MasterWine> {
        insert_master_wine(&mut self.0, wine).await
    }

    async fn get_master_wine(&mut self, id: MasterWineId) -> Result<Option<MasterWine>> {
        let wine = sqlx::query_as("SELECT * FROM master_wines WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(wine)
    }

    async fn search_master_wines(&mut self, query: &str, limit: u32) -> Result<Vec<MasterWine>> {
        let query = query.to_lowercase();
        Ok(all_master_wines(&mut self.0)
            .await?
            .into_iter()
            .filter(|wine| wine.matches(&query))
            .take(usize::try_from(limit)?)
            .collect())
    }

    async fn get_duplicate_candidates(&mut self, wine: &WineDetails) -> Result<Vec<MasterWine>> {
        Ok(all_master_wines(&mut self.0)
            .await?
            .into_iter()
            .filter(|master_wine| is_candidate(wine, &master_wine.details))
            .collect())
    }

    async fn upsert_rating(&mut self, rating: NewRating) -> Result<Rating> {
        let rating = sqlx::query_as(
            "INSERT INTO ratings (profile_id, event_wine_id, score, notes, flavors, would_buy, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (profile_id, event_wine_id) DO UPDATE SET
                score = excluded.score,
                notes = excluded.notes,
                flavors = excluded.flavors,
                would_buy = excluded.would_buy,
                updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(rating.profile_id)
        .bind(rating.event_wine_id)
        .bind(i64::from(rating.score.get()))
        .bind(rating.notes)
        .bind(rating.flavors)
        .bind(rating.would_buy)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(rating)
    }

    async fn delete_rating(&mut self, profile: ProfileId, wine: EventWineId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ratings WHERE profile_id = ?1 AND event_wine_id = ?2")
            .bind(profile)
            .bind(wine)
            .execute(self.0.deref_mut())
            .await?;
        Ok(result.rows_affected() >= 1)
    }

    async fn get_profile_ratings(&mut self, profile: ProfileId) -> Result<Vec<RatedWine>> {
        let ratings = sqlx::query_as(
            "SELECT r.*, w.event_id, w.name, w.producer, w.vintage,
                    w.region, w.grape_variety, w.wine_type
             FROM ratings r
             JOIN event_wines w ON w.id = r.event_wine_id
             WHERE r.profile_id = ?1
             ORDER BY r.updated_at DESC",
        )
        .bind(profile)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(ratings)
    }

    async fn get_profile_event_ratings(
        &mut self,
        profile: ProfileId,
        event: EventId,
    ) -> Result<Vec<Rating>> {
        let ratings = sqlx::query_as(
            "SELECT r.* FROM ratings r
             JOIN event_wines w ON w.id = r.event_wine_id
             WHERE r.profile_id = ?1 AND w.event_id = ?2",
        )
        .bind(profile)
        .bind(event)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(ratings)
    }

    async fn get_event_ratings(&mut self, event: EventId) -> Result<Vec<Rating>> {
        let ratings = sqlx::query_as(
            "SELECT r.* FROM ratings r
             JOIN event_wines w ON w.id = r.event_wine_id
             WHERE w.event_id = ?1",
        )
        .bind(event)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(ratings)
    }

    async fn add_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<()> {
        sqlx::query(
            "INSERT INTO buddies (profile_id, buddy_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT DO NOTHING",
        )
        .bind(profile)
        .bind(buddy)
        .bind(OffsetDateTime::now_utc())
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn remove_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM buddies WHERE profile_id = ?1 AND buddy_id = ?2")
            .bind(profile)
            .bind(buddy)
            .execute(self.0.deref_mut())
            .await?;
        Ok(result.rows_affected() >= 1)
    }

    async fn get_buddies(&mut self, profile: ProfileId) -> Result<Vec<Profile>> {
        let buddies = sqlx::query_as(
            "SELECT p.* FROM profiles p
             JOIN buddies b ON b.buddy_id = p.id
             WHERE b.profile_id = ?1
             ORDER BY p.display_name, p.id",
        )
        .bind(profile)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(buddies)
    }

    async fn is_buddy(&mut self, profile: ProfileId, buddy: ProfileId) -> Result<bool> {
        let is_buddy = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM buddies WHERE profile_id = ?1 AND buddy_id = ?2)",
        )
        .bind(profile)
        .bind(buddy)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(is_buddy)
    }

    async fn add_submission(
        &mut self,
        submitted_by: ProfileId,
        wine: WineDetails,
    ) -> Result<Submission> {
        let submission = sqlx::query_as(
            "INSERT INTO submissions
                (submitted_by, name, producer, vintage, region, grape_variety, wine_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING *",
        )
        .bind(submitted_by)
        .bind(wine.name)
        .bind(wine.producer)
        .bind(wine.vintage)
        .bind(wine.region)
        .bind(wine.grape_variety)
        .bind(wine.wine_type)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(submission)
    }

    async fn get_submission(&mut self, id: SubmissionId) -> Result<Option<Submission>> {
        let submission = sqlx::query_as("SELECT * FROM submissions WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(submission)
    }

    async fn get_submissions_by(&mut self, profile: ProfileId) -> Result<Vec<Submission>> {
        let submissions = sqlx::query_as(
            "SELECT * FROM submissions WHERE submitted_by = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(profile)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(submissions)
    }

    async fn get_pending_submissions(&mut self) -> Result<Vec<Submission>> {
        let submissions = sqlx::query_as(
            "SELECT * FROM submissions WHERE status = 'pending' ORDER BY created_at, id",
        )
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(submissions)
    }

    async fn review_submission(&mut self, id: SubmissionId, review: Review) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE submissions
             SET status = ?2, master_wine_id = ?3, reviewed_by = ?4, review_note = ?5
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(review.status)
        .bind(review.master_wine_id)
        .bind(review.reviewed_by)
        .bind(review.note)
        .execute(self.0.deref_mut())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn approve_submission(
        &mut self,
        id: SubmissionId,
        reviewed_by: ProfileId,
    ) -> Result<Option<MasterWine>> {
        let mut transaction = self.0.begin().await?;

        let submission: Option<Submission> =
            sqlx::query_as("SELECT * FROM submissions WHERE id = ?1 AND status = 'pending'")
                .bind(id)
                .fetch_optional(&mut *transaction)
                .await?;
        let Some(submission) = submission else {
            return Ok(None);
        };

        let master_wine = insert_master_wine(&mut transaction, submission.wine).await?;
        sqlx::query(
            "UPDATE submissions SET status = ?2, master_wine_id = ?3, reviewed_by = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(SubmissionStatus::Approved)
        .bind(master_wine.id)
        .bind(reviewed_by)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;
        Ok(Some(master_wine))
    }

    async fn add_organization(&mut self, name: &str, owner: ProfileId) -> Result<Organization> {
        let mut transaction = self.0.begin().await?;

        let organization: Organization =
            sqlx::query_as("INSERT INTO organizations (name, created_at) VALUES (?1, ?2) RETURNING *")
                .bind(name)
                .bind(OffsetDateTime::now_utc())
                .fetch_one(&mut *transaction)
                .await?;
        sqlx::query(
            "INSERT INTO organization_members (organization_id, profile_id, role) VALUES (?1, ?2, ?3)",
        )
        .bind(organization.id)
        .bind(owner)
        .bind(OrganizationRole::Owner)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;
        Ok(organization)
    }

    async fn get_organization(&mut self, id: OrganizationId) -> Result<Option<Organization>> {
        let organization = sqlx::query_as("SELECT * FROM organizations WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(organization)
    }

    async fn get_memberships(&mut self, profile: ProfileId) -> Result<Vec<Membership>> {
        let memberships = sqlx::query_as(
            "SELECT o.*, m.role FROM organizations o
             JOIN organization_members m ON m.organization_id = o.id
             WHERE m.profile_id = ?1
             ORDER BY o.name, o.id",
        )
        .bind(profile)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(memberships)
    }

    async fn get_member_role(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
    ) -> Result<Option<OrganizationRole>> {
        let role = sqlx::query_scalar(
            "SELECT role FROM organization_members WHERE organization_id = ?1 AND profile_id = ?2",
        )
        .bind(organization)
        .bind(profile)
        .fetch_optional(self.0.deref_mut())
        .await?;
        Ok(role)
    }

    async fn set_member_role(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
        role: OrganizationRole,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO organization_members (organization_id, profile_id, role) VALUES (?1, ?2, ?3)
             ON CONFLICT (organization_id, profile_id) DO UPDATE SET role = excluded.role",
        )
        .bind(organization)
        .bind(profile)
        .bind(role)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn remove_member(
        &mut self,
        organization: OrganizationId,
        profile: ProfileId,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = ?1 AND profile_id = ?2",
        )
        .bind(organization)
        .bind(profile)
        .execute(self.0.deref_mut())
        .await?;
        Ok(result.rows_affected() >= 1)
    }

    async fn count_owners(&mut self, organization: OrganizationId) -> Result<u64> {
        let owners: i64 = sqlx::query_scalar(
            "SELECT count(1) FROM organization_members WHERE organization_id = ?1 AND role = 'owner'",
        )
        .bind(organization)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(owners.try_into()?)
    }

    async fn prune(&mut self, now: OffsetDateTime) -> Result<u64> {
        let mut transaction = self.0.begin().await?;

        // Timestamps are all written by us in UTC, so comparing them as text is sound.
        let tokens = sqlx::query("DELETE FROM login_tokens WHERE valid_until <= ?1")
            .bind(now)
            .execute(&mut *transaction)
            .await?;
        let profiles = sqlx::query(
            "DELETE FROM profiles
             WHERE is_temporary AND expires_at <= ?1
               AND id NOT IN (SELECT created_by FROM events)",
        )
        .bind(now)
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;
        Ok(tokens.rows_affected() + profiles.rows_affected())
    }
}

// SQLite's lower() only folds ASCII, so text matching on
// master wines happens here rather than in SQL.
async fn all_master_wines(connection: &mut sqlx::SqliteConnection) -> Result<Vec<MasterWine>> {
    let wines = sqlx::query_as("SELECT * FROM master_wines ORDER BY name, producer, vintage")
        .fetch_all(connection)
        .await?;
    Ok(wines)
}

async fn insert_master_wine(
    connection: &mut sqlx::SqliteConnection,
    wine: WineDetails,
) -> Result<MasterWine> {
    let wine = sqlx::query_as(
        "INSERT INTO master_wines
            (name, producer, vintage, region, grape_variety, wine_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         RETURNING *",
    )
    .bind(wine.name)
    .bind(wine.producer)
    .bind(wine.vintage)
    .bind(wine.region)
    .bind(wine.grape_variety)
    .bind(wine.wine_type)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(connection)
    .await?;
    Ok(wine)
}

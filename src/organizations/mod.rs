use crate::auth::{Administer, AuthorizedTo};
use crate::database::Repository;
use crate::id_newtype;
use crate::profiles::{Profile, ProfileId};
use crate::result::{HttpError, HttpResult};
use rocket::serde::json::Json;
use rocket::{delete, get, post, routes, Route};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub(crate) fn routes() -> Vec<Route> {
    routes![
        create_organization,
        list_organizations,
        set_member,
        remove_member
    ]
}

id_newtype! {
    pub(crate) struct OrganizationId;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum OrganizationRole {
    Owner,
    Admin,
    Member,
}

impl OrganizationRole {
    /// Owners and admins manage the organization's events and members.
    pub(crate) fn can_manage(self) -> bool {
        matches!(self, OrganizationRole::Owner | OrganizationRole::Admin)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Organization {
    pub(crate) id: OrganizationId,
    pub(crate) name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Membership {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub(crate) organization: Organization,
    pub(crate) role: OrganizationRole,
}

/// Fetches an organization in which the profile is an owner or admin,
/// returning the organization together with the profile's role.
pub(crate) async fn managed_organization(
    repository: &mut dyn Repository,
    profile: &Profile,
    id: OrganizationId,
) -> HttpResult<Membership> {
    let organization = repository
        .get_organization(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Organization"))?;
    match repository.get_member_role(id, profile.id).await? {
        Some(role) if role.can_manage() => Ok(Membership { organization, role }),
        _ => Err(HttpError::forbidden()),
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrganizationData {
    name: String,
}

#[post("/organizations", data = "<data>")]
async fn create_organization(
    admin: AuthorizedTo<Administer>,
    data: Json<CreateOrganizationData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Organization>> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(HttpError::unprocessable("Please give the organization a name"));
    }
    Ok(Json(repository.add_organization(name, admin.id).await?))
}

#[get("/organizations")]
async fn list_organizations(
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<Membership>>> {
    Ok(Json(repository.get_memberships(profile.id).await?))
}

#[derive(Debug, Deserialize)]
struct MemberData {
    profile_id: ProfileId,
    role: OrganizationRole,
}

#[post("/organizations/<id>/members", data = "<data>")]
async fn set_member(
    id: OrganizationId,
    profile: Profile,
    data: Json<MemberData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    let MemberData { profile_id, role } = data.into_inner();
    let membership = managed_organization(repository.as_mut(), &profile, id).await?;
    if repository.get_profile(profile_id).await?.is_none() {
        return Err(HttpError::not_found("Profile"));
    }
    let current_role = repository.get_member_role(id, profile_id).await?;
    check_role_change(
        membership.role,
        current_role,
        Some(role),
        repository.count_owners(id).await?,
    )?;
    repository.set_member_role(id, profile_id, role).await?;
    Ok(())
}

#[delete("/organizations/<id>/members/<profile_id>")]
async fn remove_member(
    id: OrganizationId,
    profile_id: ProfileId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    let membership = managed_organization(repository.as_mut(), &profile, id).await?;
    let current_role = repository
        .get_member_role(id, profile_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Member"))?;
    check_role_change(
        membership.role,
        Some(current_role),
        None,
        repository.count_owners(id).await?,
    )?;
    if repository.remove_member(id, profile_id).await? {
        Ok(())
    } else {
        Err(HttpError::not_found("Member"))
    }
}

/// Only owners hand out or take away ownership,
/// and an organization always keeps at least one owner.
fn check_role_change(
    actor: OrganizationRole,
    from: Option<OrganizationRole>,
    to: Option<OrganizationRole>,
    owner_count: u64,
) -> HttpResult<()> {
    let touches_owner = from == Some(OrganizationRole::Owner) || to == Some(OrganizationRole::Owner);
    if touches_owner && actor != OrganizationRole::Owner {
        return Err(HttpError::forbidden());
    }
    let loses_owner = from == Some(OrganizationRole::Owner) && to != Some(OrganizationRole::Owner);
    if loses_owner && owner_count <= 1 {
        return Err(HttpError::conflict(
            "An organization needs at least one owner",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrganizationRole::*;

    #[test]
    fn admins_manage_but_members_do_not() {
        assert!(Owner.can_manage());
        assert!(Admin.can_manage());
        assert!(!Member.can_manage());
    }

    #[test]
    fn admins_can_add_members_and_admins() {
        assert!(check_role_change(Admin, None, Some(Member), 1).is_ok());
        assert!(check_role_change(Admin, Some(Member), Some(Admin), 1).is_ok());
        assert!(check_role_change(Admin, Some(Admin), None, 1).is_ok());
    }

    #[test]
    fn only_owners_grant_or_revoke_ownership() {
        assert!(check_role_change(Admin, Some(Member), Some(Owner), 1).is_err());
        assert!(check_role_change(Admin, Some(Owner), None, 2).is_err());
        assert!(check_role_change(Owner, Some(Member), Some(Owner), 1).is_ok());
    }

    #[test]
    fn last_owner_can_not_leave() {
        assert!(check_role_change(Owner, Some(Owner), None, 1).is_err());
        assert!(check_role_change(Owner, Some(Owner), Some(Admin), 1).is_err());
        assert!(check_role_change(Owner, Some(Owner), None, 2).is_ok());
    }

    #[test]
    fn roles_use_lower_case_names() {
        let role: OrganizationRole = rocket::serde::json::from_str(r#""admin""#).unwrap();
        assert_eq!(Admin, role);
    }
}

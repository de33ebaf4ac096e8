use crate::profiles::Profile;
use anyhow::Error;
use rocket::http::Status;
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome};
use rocket::{async_trait, Request};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// A profile that satisfies the predicate `P`.
pub(crate) struct AuthorizedTo<P>(Profile, PhantomData<P>);

pub(crate) trait ProfilePredicate {
    fn is_satisfied(profile: &Profile) -> bool;
}

#[async_trait]
impl<'r, P: ProfilePredicate> FromRequest<'r> for AuthorizedTo<P> {
    type Error = Arc<Error>;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let profile: Profile = try_outcome!(request.guard().await);
        if let Some(result) = AuthorizedTo::new(profile) {
            Outcome::Success(result)
        } else {
            Outcome::Forward(Status::Forbidden)
        }
    }
}

impl<P> AuthorizedTo<P>
where
    P: ProfilePredicate,
{
    pub(crate) fn new(inner: Profile) -> Option<Self> {
        P::is_satisfied(&inner).then_some(Self(inner, PhantomData))
    }
}

impl<P> Deref for AuthorizedTo<P> {
    type Target = Profile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub(crate) struct Administer;

impl ProfilePredicate for Administer {
    fn is_satisfied(profile: &Profile) -> bool {
        profile.can_administer()
    }
}

pub(crate) struct Curate;

impl ProfilePredicate for Curate {
    fn is_satisfied(profile: &Profile) -> bool {
        profile.can_curate()
    }
}

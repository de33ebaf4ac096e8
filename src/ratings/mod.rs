use crate::database::Repository;
use crate::events::{attended_event, EventId};
use crate::profiles::{Profile, ProfileId};
use crate::result::{HttpError, HttpResult};
use crate::wines::{EventWineId, WineDetails};
use itertools::Itertools as _;
use rocket::serde::json::Json;
use rocket::{delete, get, put, routes, Route};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
use sqlx::{Database, Decode, Encode, Sqlite, Type};
use std::fmt;
use time::OffsetDateTime;

pub(crate) fn routes() -> Vec<Route> {
    routes![put_rating, delete_rating, my_ratings]
}

/// A rating on the five point scale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub(crate) struct Score(u8);

impl Score {
    pub(crate) const MIN: u8 = 1;
    pub(crate) const MAX: u8 = 5;

    pub(crate) fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Score(value))
    }

    pub(crate) fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug)]
pub(crate) struct ScoreOutOfRange(i64);

impl fmt::Display for ScoreOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score {} is outside of 1..=5", self.0)
    }
}

impl std::error::Error for ScoreOutOfRange {}

impl TryFrom<i64> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Score::new)
            .ok_or(ScoreOutOfRange(value))
    }
}

/// Flavor descriptors ("cherry", "oak", ...) noted alongside a rating,
/// stored as a single comma separated column.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct Flavors(Vec<String>);

impl Flavors {
    /// Lower-cases, trims and deduplicates the descriptors.
    /// Commas are dropped as they separate descriptors in storage.
    pub(crate) fn new<I, S>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Flavors(
            descriptors
                .into_iter()
                .map(|d| d.as_ref().replace(',', " ").split_whitespace().join(" "))
                .map(|d| d.to_lowercase())
                .filter(|d| !d.is_empty())
                .unique()
                .collect(),
        )
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn to_column(&self) -> String {
        self.0.join(",")
    }

    fn from_column(column: &str) -> Self {
        Flavors::new(column.split(','))
    }
}

impl Type<Sqlite> for Flavors {
    fn type_info() -> SqliteTypeInfo {
        <&str as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <&str as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for Flavors
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(&self, buf: &mut DB::ArgumentBuffer<'q>) -> Result<IsNull, BoxDynError> {
        self.to_column().encode_by_ref(buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Flavors {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
        Ok(Flavors::from_column(text))
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Rating {
    pub(crate) profile_id: ProfileId,
    pub(crate) event_wine_id: EventWineId,
    #[sqlx(try_from = "i64")]
    pub(crate) score: Score,
    pub(crate) notes: String,
    pub(crate) flavors: Flavors,
    pub(crate) would_buy: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) updated_at: OffsetDateTime,
}

/// A rating together with the wine it was given to.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct RatedWine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub(crate) rating: Rating,
    pub(crate) event_id: EventId,
    #[sqlx(flatten)]
    pub(crate) wine: WineDetails,
}

#[derive(Debug, Clone)]
pub(crate) struct NewRating {
    pub(crate) profile_id: ProfileId,
    pub(crate) event_wine_id: EventWineId,
    pub(crate) score: Score,
    pub(crate) notes: String,
    pub(crate) flavors: Flavors,
    pub(crate) would_buy: bool,
}

#[derive(Debug, Deserialize)]
struct RatingData {
    score: u8,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    flavors: Vec<String>,
    #[serde(default)]
    would_buy: bool,
}

#[put("/wines/<id>/rating", data = "<data>")]
async fn put_rating(
    id: EventWineId,
    profile: Profile,
    data: Json<RatingData>,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Rating>> {
    let data = data.into_inner();
    let score = Score::new(data.score)
        .ok_or_else(|| HttpError::unprocessable("Ratings go from 1 to 5"))?;
    let wine = repository
        .get_event_wine(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Wine"))?;
    attended_event(repository.as_mut(), &profile, wine.event_id).await?;
    let rating = repository
        .upsert_rating(NewRating {
            profile_id: profile.id,
            event_wine_id: id,
            score,
            notes: data.notes.trim().to_owned(),
            flavors: Flavors::new(data.flavors),
            would_buy: data.would_buy,
        })
        .await?;
    Ok(Json(rating))
}

#[delete("/wines/<id>/rating")]
async fn delete_rating(
    id: EventWineId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<()> {
    if repository.delete_rating(profile.id, id).await? {
        Ok(())
    } else {
        Err(HttpError::not_found("Rating"))
    }
}

#[get("/me/ratings")]
async fn my_ratings(
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<RatedWine>>> {
    Ok(Json(repository.get_profile_ratings(profile.id).await?))
}

//! Rollups over the ratings of one event or of all events of an organization.

use crate::database::Repository;
use crate::events::{managed_event, EventId};
use crate::organizations::{managed_organization, OrganizationId};
use crate::profiles::Profile;
use crate::ratings::{Rating, Score};
use crate::result::HttpResult;
use crate::stats::{mean, rate, round_to};
use crate::wines::{EventWine, EventWineId};
use itertools::Itertools as _;
use rocket::serde::json::Json;
use rocket::{get, routes, Route};
use serde::Serialize;

pub(crate) fn routes() -> Vec<Route> {
    routes![event_analytics, organization_analytics]
}

/// Wines with fewer ratings are too noisy to rank.
pub(crate) const MIN_RATINGS_FOR_RANKING: usize = 2;
pub(crate) const DEFAULT_TOP_LIMIT: usize = 5;
const MAX_TOP_LIMIT: usize = 50;

const BUCKETS: usize = (Score::MAX - Score::MIN + 1) as usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct EventAnalytics {
    pub(crate) wine_count: usize,
    pub(crate) rating_count: usize,
    /// Number of distinct profiles that rated at least one wine.
    pub(crate) participant_count: usize,
    pub(crate) average_rating: Option<f64>,
    pub(crate) would_buy_rate: Option<f64>,
    /// Number of ratings per score, index 0 holding the ones.
    pub(crate) distribution: [usize; BUCKETS],
    pub(crate) top_wines: Vec<WineStanding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WineStanding {
    pub(crate) wine_id: EventWineId,
    pub(crate) event_id: EventId,
    pub(crate) name: String,
    pub(crate) producer: String,
    pub(crate) rating_count: usize,
    pub(crate) average_rating: f64,
    pub(crate) would_buy_rate: f64,
}

pub(crate) fn summarize(wines: &[EventWine], ratings: &[Rating], limit: usize) -> EventAnalytics {
    let mut distribution = [0; BUCKETS];
    for rating in ratings {
        distribution[usize::from(rating.score.get() - Score::MIN)] += 1;
    }
    EventAnalytics {
        wine_count: wines.len(),
        rating_count: ratings.len(),
        participant_count: ratings.iter().map(|r| r.profile_id).unique().count(),
        average_rating: mean(ratings.iter().map(score)).map(|m| round_to(m, 1)),
        would_buy_rate: rate(ratings.iter().map(|r| r.would_buy)).map(|r| round_to(r, 2)),
        distribution,
        top_wines: top_wines(wines, ratings, limit),
    }
}

/// Ranks wines by their average rating, best first.
/// Wines with equal averages keep the order they were passed in.
fn top_wines(wines: &[EventWine], ratings: &[Rating], limit: usize) -> Vec<WineStanding> {
    let ratings_by_wine = ratings.iter().into_group_map_by(|r| r.event_wine_id);
    let mut ranked: Vec<(f64, &EventWine, &Vec<&Rating>)> = wines
        .iter()
        .filter_map(|wine| {
            let ratings = ratings_by_wine.get(&wine.id)?;
            if ratings.len() < MIN_RATINGS_FOR_RANKING {
                return None;
            }
            let average = mean(ratings.iter().copied().map(score))?;
            Some((average, wine, ratings))
        })
        .collect();
    ranked.sort_by(|(a, ..), (b, ..)| b.total_cmp(a));
    ranked
        .into_iter()
        .take(limit)
        .map(|(average, wine, ratings)| WineStanding {
            wine_id: wine.id,
            event_id: wine.event_id,
            name: wine.details.name.clone(),
            producer: wine.details.producer.clone(),
            rating_count: ratings.len(),
            average_rating: round_to(average, 1),
            would_buy_rate: rate(ratings.iter().map(|r| r.would_buy))
                .map(|r| round_to(r, 2))
                .unwrap_or_default(),
        })
        .collect()
}

fn score(rating: &Rating) -> f64 {
    f64::from(rating.score.get())
}

fn top_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_TOP_LIMIT).min(MAX_TOP_LIMIT)
}

#[get("/events/<id>/analytics?<limit>")]
async fn event_analytics(
    id: EventId,
    limit: Option<usize>,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventAnalytics>> {
    managed_event(repository.as_mut(), &profile, id).await?;
    let wines = repository.get_event_wines(id).await?;
    let ratings = repository.get_event_ratings(id).await?;
    Ok(Json(summarize(&wines, &ratings, top_limit(limit))))
}

#[get("/organizations/<id>/analytics?<limit>")]
async fn organization_analytics(
    id: OrganizationId,
    limit: Option<usize>,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<EventAnalytics>> {
    managed_organization(repository.as_mut(), &profile, id).await?;
    let mut wines = Vec::new();
    let mut ratings = Vec::new();
    for event in repository.get_organization_events(id).await? {
        wines.extend(repository.get_event_wines(event.id).await?);
        ratings.extend(repository.get_event_ratings(event.id).await?);
    }
    Ok(Json(summarize(&wines, &ratings, top_limit(limit))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ProfileId;
    use crate::ratings::Flavors;
    use crate::wines::WineDetails;
    use time::OffsetDateTime;

    fn wine(id: i64) -> EventWine {
        EventWine {
            id: EventWineId(id),
            event_id: EventId(1),
            master_wine_id: None,
            location_id: None,
            details: WineDetails {
                name: format!("Wine {id}"),
                producer: "Producer".to_owned(),
                vintage: None,
                region: None,
                grape_variety: None,
                wine_type: None,
            },
            price_cents: None,
            tasting_order: id,
        }
    }

    fn rating(profile: i64, wine: i64, score: u8, would_buy: bool) -> Rating {
        Rating {
            profile_id: ProfileId(profile),
            event_wine_id: EventWineId(wine),
            score: Score::new(score).unwrap(),
            notes: String::new(),
            flavors: Flavors::default(),
            would_buy,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn ranked_ids(analytics: &EventAnalytics) -> Vec<i64> {
        analytics.top_wines.iter().map(|w| w.wine_id.0).collect()
    }

    #[test]
    fn empty_event() {
        let analytics = summarize(&[wine(1)], &[], DEFAULT_TOP_LIMIT);
        assert_eq!(1, analytics.wine_count);
        assert_eq!(0, analytics.rating_count);
        assert_eq!(None, analytics.average_rating);
        assert_eq!([0; 5], analytics.distribution);
        assert!(analytics.top_wines.is_empty());
    }

    #[test]
    fn histogram_sums_to_rating_count() {
        let ratings = [
            rating(1, 1, 1, false),
            rating(2, 1, 5, true),
            rating(3, 1, 5, true),
            rating(1, 2, 3, false),
            rating(2, 2, 4, false),
        ];
        let analytics = summarize(&[wine(1), wine(2)], &ratings, DEFAULT_TOP_LIMIT);
        assert_eq!([1, 0, 1, 1, 2], analytics.distribution);
        assert_eq!(
            analytics.rating_count,
            analytics.distribution.iter().sum::<usize>()
        );
        assert_eq!(3, analytics.participant_count);
        assert_eq!(Some(3.6), analytics.average_rating);
        assert_eq!(Some(0.4), analytics.would_buy_rate);
    }

    #[test]
    fn wines_with_a_single_rating_are_not_ranked() {
        let ratings = [
            rating(1, 1, 5, false),
            rating(1, 2, 3, false),
            rating(2, 2, 4, false),
        ];
        let analytics = summarize(&[wine(1), wine(2)], &ratings, DEFAULT_TOP_LIMIT);
        assert_eq!(vec![2], ranked_ids(&analytics));
        assert_eq!(3.5, analytics.top_wines[0].average_rating);
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let wines = [wine(1), wine(2), wine(3), wine(4)];
        let ratings = [
            rating(1, 1, 3, false),
            rating(2, 1, 3, false),
            rating(1, 2, 5, false),
            rating(2, 2, 4, false),
            rating(1, 3, 3, false),
            rating(2, 3, 3, false),
            rating(1, 4, 5, true),
            rating(2, 4, 5, true),
        ];
        let analytics = summarize(&wines, &ratings, DEFAULT_TOP_LIMIT);
        assert_eq!(vec![4, 2, 1, 3], ranked_ids(&analytics));
        assert_eq!(1.0, analytics.top_wines[0].would_buy_rate);
    }

    #[test]
    fn ranking_is_limited() {
        let wines: Vec<_> = (1..=8).map(wine).collect();
        let ratings: Vec<_> = (1..=8)
            .flat_map(|w| [rating(1, w, 4, false), rating(2, w, 4, false)])
            .collect();
        assert_eq!(5, summarize(&wines, &ratings, DEFAULT_TOP_LIMIT).top_wines.len());
        assert_eq!(2, summarize(&wines, &ratings, 2).top_wines.len());
    }

    #[test]
    fn limit_defaults_and_is_capped() {
        assert_eq!(DEFAULT_TOP_LIMIT, top_limit(None));
        assert_eq!(MAX_TOP_LIMIT, top_limit(Some(10_000)));
    }
}

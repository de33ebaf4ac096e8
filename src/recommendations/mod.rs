use crate::database::Repository;
use crate::events::{attended_event, EventId};
use crate::profiles::{Profile, ProfileId};
use crate::ratings::Rating;
use crate::result::HttpResult;
use crate::stats::{mean, round_to, Frequency};
use crate::taste::build_taste_profile;
use crate::wines::EventWine;
use itertools::Itertools as _;
use rocket::serde::json::Json;
use rocket::{get, routes, Route};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub(crate) fn routes() -> Vec<Route> {
    routes![event_recommendations]
}

const GRAPE_WEIGHT: f64 = 0.6;
const CROWD_WEIGHT: f64 = 0.4;
/// Crowd score of a wine nobody has rated yet.
const UNRATED_CROWD_SCORE: f64 = 0.5;
pub(crate) const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Recommendation {
    pub(crate) wine: EventWine,
    pub(crate) score: f64,
    pub(crate) grape_affinity: f64,
    pub(crate) crowd_score: f64,
}

/// Suggests the wines of an event that `profile` has not rated yet,
/// favouring grapes the profile liked before and wines the crowd enjoys.
pub(crate) fn recommend(
    profile: ProfileId,
    wines: &[EventWine],
    event_ratings: &[Rating],
    preferred_grapes: &[Frequency],
    limit: usize,
) -> Vec<Recommendation> {
    let already_rated: HashSet<_> = event_ratings
        .iter()
        .filter(|r| r.profile_id == profile)
        .map(|r| r.event_wine_id)
        .collect();
    let averages = event_ratings
        .iter()
        .into_group_map_by(|r| r.event_wine_id)
        .into_iter()
        .filter_map(|(wine, ratings)| {
            Some((wine, mean(ratings.iter().map(|r| f64::from(r.score.get())))?))
        })
        .collect::<HashMap<_, _>>();
    let total_preference: usize = preferred_grapes.iter().map(|f| f.count).sum();

    let mut recommendations: Vec<_> = wines
        .iter()
        .filter(|wine| !already_rated.contains(&wine.id))
        .map(|wine| {
            let grape_affinity = grape_affinity(
                wine.details.grape_variety.as_deref(),
                preferred_grapes,
                total_preference,
            );
            let crowd_score = averages
                .get(&wine.id)
                .map(|average| (average - 1.0) / 4.0)
                .unwrap_or(UNRATED_CROWD_SCORE);
            Recommendation {
                wine: wine.clone(),
                score: round_to(GRAPE_WEIGHT * grape_affinity + CROWD_WEIGHT * crowd_score, 2),
                grape_affinity: round_to(grape_affinity, 2),
                crowd_score: round_to(crowd_score, 2),
            }
        })
        .collect();
    recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
    recommendations.truncate(limit);
    recommendations
}

fn grape_affinity(grape: Option<&str>, preferred_grapes: &[Frequency], total: usize) -> f64 {
    let Some(grape) = grape.map(str::trim).filter(|g| !g.is_empty()) else {
        return 0.0;
    };
    if total == 0 {
        return 0.0;
    }
    preferred_grapes
        .iter()
        .find(|f| f.value.to_lowercase() == grape.to_lowercase())
        .map(|f| f.count as f64 / total as f64)
        .unwrap_or_default()
}

#[get("/events/<id>/recommendations")]
async fn event_recommendations(
    id: EventId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<Vec<Recommendation>>> {
    attended_event(repository.as_mut(), &profile, id).await?;
    let wines = repository.get_event_wines(id).await?;
    let event_ratings = repository.get_event_ratings(id).await?;
    let taste = build_taste_profile(&repository.get_profile_ratings(profile.id).await?);
    Ok(Json(recommend(
        profile.id,
        &wines,
        &event_ratings,
        &taste.preferred_grapes,
        DEFAULT_RECOMMENDATION_LIMIT,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::{Flavors, Score};
    use crate::wines::{EventWineId, WineDetails};
    use time::OffsetDateTime;

    const ME: ProfileId = ProfileId(1);

    fn wine(id: i64, grape_variety: Option<&str>) -> EventWine {
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
                grape_variety: grape_variety.map(ToOwned::to_owned),
                wine_type: None,
            },
            price_cents: None,
            tasting_order: id,
        }
    }

    fn rating(profile: i64, wine: i64, score: u8) -> Rating {
        Rating {
            profile_id: ProfileId(profile),
            event_wine_id: EventWineId(wine),
            score: Score::new(score).unwrap(),
            notes: String::new(),
            flavors: Flavors::default(),
            would_buy: false,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn grapes(entries: &[(&str, usize)]) -> Vec<Frequency> {
        entries
            .iter()
            .map(|(value, count)| Frequency {
                value: (*value).to_owned(),
                count: *count,
            })
            .collect()
    }

    fn ids(recommendations: &[Recommendation]) -> Vec<i64> {
        recommendations.iter().map(|r| r.wine.id.0).collect()
    }

    #[test]
    fn skips_wines_already_rated() {
        let wines = [wine(1, None), wine(2, None)];
        let ratings = [rating(1, 1, 4)];
        assert_eq!(vec![2], ids(&recommend(ME, &wines, &ratings, &[], 5)));
    }

    #[test]
    fn unrated_wines_get_a_neutral_crowd_score() {
        let wines = [wine(1, None)];
        let recommendations = recommend(ME, &wines, &[], &[], 5);
        assert_eq!(0.5, recommendations[0].crowd_score);
        assert_eq!(0.2, recommendations[0].score);
    }

    #[test]
    fn crowd_average_is_normalized() {
        let wines = [wine(1, None), wine(2, None)];
        let ratings = [rating(2, 1, 5), rating(3, 1, 5), rating(2, 2, 1)];
        let recommendations = recommend(ME, &wines, &ratings, &[], 5);
        assert_eq!(vec![1, 2], ids(&recommendations));
        assert_eq!(1.0, recommendations[0].crowd_score);
        assert_eq!(0.0, recommendations[1].crowd_score);
    }

    #[test]
    fn preferred_grapes_outweigh_the_crowd() {
        let wines = [wine(1, Some("Merlot")), wine(2, Some("syrah"))];
        let ratings = [rating(2, 1, 5), rating(3, 1, 5)];
        let preferred = grapes(&[("Syrah", 3), ("Gamay", 1)]);
        let recommendations = recommend(ME, &wines, &ratings, &preferred, 5);
        assert_eq!(vec![2, 1], ids(&recommendations));
        assert_eq!(0.75, recommendations[0].grape_affinity);
    }

    #[test]
    fn ties_keep_the_tasting_order() {
        let wines: Vec<_> = (1..=7).map(|id| wine(id, None)).collect();
        assert_eq!(
            vec![1, 2, 3, 4, 5],
            ids(&recommend(ME, &wines, &[], &[], DEFAULT_RECOMMENDATION_LIMIT))
        );
    }
}

use crate::database::Repository;
use crate::profiles::Profile;
use crate::ratings::RatedWine;
use crate::result::HttpResult;
use crate::stats::{frequency_table, mean, rate, round_to, Frequency};
use rocket::serde::json::Json;
use rocket::{get, routes, Route};
use serde::Serialize;

pub(crate) fn routes() -> Vec<Route> {
    routes![my_taste_profile]
}

/// Ratings at or above this score say something about what the taster enjoys.
pub(crate) const LIKED_SCORE: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TasteProfile {
    pub(crate) rating_count: usize,
    /// Mean score rounded to one decimal.
    pub(crate) average_rating: Option<f64>,
    /// Share of ratings marked "would buy", rounded to two decimals.
    pub(crate) would_buy_rate: Option<f64>,
    pub(crate) top_flavors: Vec<Frequency>,
    pub(crate) preferred_grapes: Vec<Frequency>,
    pub(crate) preferred_types: Vec<Frequency>,
}

pub(crate) fn build_taste_profile(ratings: &[RatedWine]) -> TasteProfile {
    let liked = || {
        ratings
            .iter()
            .filter(|r| r.rating.score.get() >= LIKED_SCORE)
    };
    TasteProfile {
        rating_count: ratings.len(),
        average_rating: mean(ratings.iter().map(|r| f64::from(r.rating.score.get())))
            .map(|m| round_to(m, 1)),
        would_buy_rate: rate(ratings.iter().map(|r| r.rating.would_buy)).map(|r| round_to(r, 2)),
        top_flavors: frequency_table(ratings.iter().flat_map(|r| r.rating.flavors.iter())),
        preferred_grapes: frequency_table(liked().filter_map(|r| r.wine.grape_variety.as_deref())),
        preferred_types: frequency_table(liked().filter_map(|r| r.wine.wine_type.as_deref())),
    }
}

#[get("/me/taste-profile")]
async fn my_taste_profile(
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Json<TasteProfile>> {
    let ratings = repository.get_profile_ratings(profile.id).await?;
    Ok(Json(build_taste_profile(&ratings)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::EventId;
    use crate::profiles::ProfileId;
    use crate::ratings::{Flavors, Rating, Score};
    use crate::wines::{EventWineId, WineDetails};
    use time::OffsetDateTime;

    pub(crate) fn rated(
        wine: i64,
        score: u8,
        would_buy: bool,
        flavors: &[&str],
        grape_variety: Option<&str>,
        wine_type: Option<&str>,
    ) -> RatedWine {
        RatedWine {
            rating: Rating {
                profile_id: ProfileId(1),
                event_wine_id: EventWineId(wine),
                score: Score::new(score).unwrap(),
                notes: String::new(),
                flavors: Flavors::new(flavors),
                would_buy,
                updated_at: OffsetDateTime::now_utc(),
            },
            event_id: EventId(1),
            wine: WineDetails {
                name: format!("Wine {wine}"),
                producer: "Producer".to_owned(),
                vintage: None,
                region: None,
                grape_variety: grape_variety.map(ToOwned::to_owned),
                wine_type: wine_type.map(ToOwned::to_owned),
            },
        }
    }

    #[test]
    fn empty_profile_has_no_averages() {
        let profile = build_taste_profile(&[]);
        assert_eq!(0, profile.rating_count);
        assert_eq!(None, profile.average_rating);
        assert_eq!(None, profile.would_buy_rate);
        assert!(profile.top_flavors.is_empty());
    }

    #[test]
    fn average_is_the_mean_rounded_to_one_decimal() {
        let ratings = [
            rated(1, 5, false, &[], None, None),
            rated(2, 4, false, &[], None, None),
            rated(3, 4, false, &[], None, None),
        ];
        // 13 / 3 = 4.333...
        assert_eq!(Some(4.3), build_taste_profile(&ratings).average_rating);
    }

    #[test]
    fn would_buy_rate_is_a_fraction() {
        let ratings = [
            rated(1, 3, true, &[], None, None),
            rated(2, 3, false, &[], None, None),
            rated(3, 3, false, &[], None, None),
        ];
        assert_eq!(Some(0.33), build_taste_profile(&ratings).would_buy_rate);
    }

    #[test]
    fn flavors_are_counted_across_all_ratings() {
        let ratings = [
            rated(1, 2, false, &["Cherry", "oak"], None, None),
            rated(2, 5, false, &["cherry"], None, None),
        ];
        let flavors = build_taste_profile(&ratings).top_flavors;
        assert_eq!(
            vec![("cherry", 2), ("oak", 1)],
            flavors
                .iter()
                .map(|f| (f.value.as_str(), f.count))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn preferences_only_consider_liked_wines() {
        let ratings = [
            rated(1, 5, false, &[], Some("Syrah"), Some("Red")),
            rated(2, 4, false, &[], Some("syrah"), Some("Red")),
            rated(3, 4, false, &[], Some("Riesling"), Some("White")),
            rated(4, 2, false, &[], Some("Merlot"), Some("Red")),
            rated(5, 1, false, &[], Some("Merlot"), None),
        ];
        let profile = build_taste_profile(&ratings);
        assert_eq!(
            vec![("Syrah", 2), ("Riesling", 1)],
            profile
                .preferred_grapes
                .iter()
                .map(|f| (f.value.as_str(), f.count))
                .collect::<Vec<_>>()
        );
        assert_eq!(
            vec![("Red", 2), ("White", 1)],
            profile
                .preferred_types
                .iter()
                .map(|f| (f.value.as_str(), f.count))
                .collect::<Vec<_>>()
        );
    }
}

//! Detection of wines that probably already exist in the master database.
//!
//! The score is a weighted sum over the fields both records carry.
//! Overlapping names weigh the most, followed by the producer.
//! Fields missing on either side count neither for nor against a match.

use crate::wines::{MasterWine, WineDetails};
use serde::Serialize;

pub(crate) const NAME_WEIGHT: f64 = 0.5;
pub(crate) const PRODUCER_WEIGHT: f64 = 0.3;
pub(crate) const VINTAGE_WEIGHT: f64 = 0.1;
pub(crate) const REGION_WEIGHT: f64 = 0.1;

/// Candidates scoring below this are not worth showing to a curator.
pub(crate) const DUPLICATE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
pub(crate) struct DuplicateCandidate<'a> {
    pub(crate) master_wine: &'a MasterWine,
    pub(crate) score: f64,
}

/// A [`DuplicateCandidate`] that outlives the master wines it was found in.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Duplicate {
    pub(crate) master_wine: MasterWine,
    pub(crate) score: f64,
}

impl From<DuplicateCandidate<'_>> for Duplicate {
    fn from(candidate: DuplicateCandidate<'_>) -> Self {
        Duplicate {
            master_wine: candidate.master_wine.clone(),
            score: candidate.score,
        }
    }
}

/// Scores how likely `candidate` describes the same wine as `existing`, in `[0, 1]`.
pub(crate) fn similarity(candidate: &WineDetails, existing: &WineDetails) -> f64 {
    let checks = [
        (
            NAME_WEIGHT,
            both(non_blank(&candidate.name), non_blank(&existing.name)).map(overlaps),
        ),
        (
            PRODUCER_WEIGHT,
            both(non_blank(&candidate.producer), non_blank(&existing.producer))
                .map(same_text),
        ),
        (
            VINTAGE_WEIGHT,
            both(candidate.vintage, existing.vintage).map(|(a, b)| a == b),
        ),
        (
            REGION_WEIGHT,
            both(
                candidate.region.as_deref().and_then(non_blank),
                existing.region.as_deref().and_then(non_blank),
            )
            .map(same_text),
        ),
    ];
    let (matched, applicable) = checks
        .into_iter()
        .filter_map(|(weight, matches)| matches.map(|m| (weight, m)))
        .fold((0.0, 0.0), |(matched, applicable), (weight, m)| {
            (matched + if m { weight } else { 0.0 }, applicable + weight)
        });
    if applicable > 0.0 {
        matched / applicable
    } else {
        0.0
    }
}

/// Whether the names or the producers overlap as substrings, folding
/// case with Unicode rules. The store prefilters master wines with this.
pub(crate) fn is_candidate(candidate: &WineDetails, existing: &WineDetails) -> bool {
    let names = both(non_blank(&candidate.name), non_blank(&existing.name));
    let producers = both(non_blank(&candidate.producer), non_blank(&existing.producer));
    names.is_some_and(overlaps) || producers.is_some_and(overlaps)
}

/// Scores all prefiltered master wines, drops those below [`DUPLICATE_THRESHOLD`]
/// and orders the rest from most to least similar.
pub(crate) fn find_duplicates<'a>(
    candidate: &WineDetails,
    master_wines: &'a [MasterWine],
) -> Vec<DuplicateCandidate<'a>> {
    let mut duplicates: Vec<_> = master_wines
        .iter()
        .filter(|m| is_candidate(candidate, &m.details))
        .map(|master_wine| DuplicateCandidate {
            master_wine,
            score: similarity(candidate, &master_wine.details),
        })
        .filter(|d| d.score >= DUPLICATE_THRESHOLD)
        .collect();
    duplicates.sort_by(|a, b| b.score.total_cmp(&a.score));
    duplicates
}

fn both<T>(a: Option<T>, b: Option<T>) -> Option<(T, T)> {
    a.zip(b)
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn same_text((a, b): (&str, &str)) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn overlaps((a, b): (&str, &str)) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wines::MasterWineId;
    use time::OffsetDateTime;

    fn wine(name: &str, producer: &str, vintage: Option<i32>, region: Option<&str>) -> WineDetails {
        WineDetails {
            name: name.to_owned(),
            producer: producer.to_owned(),
            vintage,
            region: region.map(ToOwned::to_owned),
            grape_variety: None,
            wine_type: None,
        }
    }

    fn master(id: i64, details: WineDetails) -> MasterWine {
        MasterWine {
            id: MasterWineId(id),
            details,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    mod similarity {
        use super::*;

        #[test]
        fn identical_wines_score_one() {
            let a = wine("Chablis Premier Cru", "Fèvre", Some(2020), Some("Burgundy"));
            assert_eq!(1.0, similarity(&a, &a.clone()));
        }

        #[test]
        fn nothing_in_common_scores_zero() {
            let a = wine("Chablis", "Fèvre", Some(2020), Some("Burgundy"));
            let b = wine("Rioja Reserva", "Muga", Some(2015), Some("Rioja"));
            assert_eq!(0.0, similarity(&a, &b));
        }

        #[test]
        fn name_match_is_a_substring_match_ignoring_case() {
            let a = wine("chablis", "A", None, None);
            let b = wine("Chablis Premier Cru", "B", None, None);
            assert_eq!(
                NAME_WEIGHT / (NAME_WEIGHT + PRODUCER_WEIGHT),
                similarity(&a, &b)
            );
        }

        #[test]
        fn producer_and_region_ignore_case() {
            let a = wine("Chablis", "FÈVRE", None, Some("burgundy"));
            let b = wine("Chablis", "Fèvre", None, Some("Burgundy"));
            assert_eq!(1.0, similarity(&a, &b));
        }

        #[test]
        fn missing_fields_are_excluded_from_the_denominator() {
            let a = wine("Chablis", "Fèvre", None, Some("Burgundy"));
            let b = wine("Chablis", "Fèvre", Some(2020), None);
            assert_eq!(1.0, similarity(&a, &b));
        }

        #[test]
        fn score_grows_with_each_matching_field() {
            let candidate = wine("Chablis", "Fèvre", Some(2020), Some("Burgundy"));
            let steps = [
                wine("Sancerre", "Vacheron", Some(2018), Some("Loire")),
                wine("Sancerre", "Vacheron", Some(2018), Some("Burgundy")),
                wine("Sancerre", "Vacheron", Some(2020), Some("Burgundy")),
                wine("Sancerre", "Fèvre", Some(2020), Some("Burgundy")),
                wine("Chablis", "Fèvre", Some(2020), Some("Burgundy")),
            ];
            let scores: Vec<_> = steps.iter().map(|s| similarity(&candidate, s)).collect();
            assert!(scores.windows(2).all(|w| w[0] < w[1]), "{scores:?}");
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }

        #[test]
        fn blank_records_score_zero() {
            let a = wine(" ", "", None, None);
            assert_eq!(0.0, similarity(&a, &a.clone()));
        }
    }

    mod find_duplicates {
        use super::*;

        #[test]
        fn drops_candidates_below_threshold_and_sorts_by_score() {
            let candidate = wine("Chablis", "Fèvre", Some(2020), Some("Burgundy"));
            let masters = [
                // Only the name overlaps.
                master(1, wine("Petit Chablis", "Fèvre Frères", Some(2017), Some("Yonne"))),
                master(2, wine("Chablis", "Fèvre", Some(2019), Some("Burgundy"))),
                master(3, wine("Chablis", "Fèvre", Some(2020), Some("Burgundy"))),
                master(4, wine("Margaux", "Palmer", Some(2020), Some("Bordeaux"))),
            ];
            let duplicates = find_duplicates(&candidate, &masters);
            let ids: Vec<_> = duplicates.iter().map(|d| d.master_wine.id.0).collect();
            assert_eq!(vec![3, 2, 1], ids);
            assert_eq!(1.0, duplicates[0].score);
        }

        #[test]
        fn ignores_wines_the_prefilter_rejects() {
            let candidate = wine("Chablis", "Fèvre", Some(2020), Some("Burgundy"));
            let masters = [master(
                1,
                wine("Sancerre", "Vacheron", Some(2020), Some("Burgundy")),
            )];
            assert!(find_duplicates(&candidate, &masters).is_empty());
        }

        #[test]
        fn low_scoring_overlaps_are_discarded() {
            let candidate = wine("Rosé", "Domaine Ott", Some(2022), Some("Provence"));
            // The producers overlap but are not equal,
            // so only vintage and region add to the score.
            let masters = [master(
                1,
                wine("Bandol", "Domaine Ott Frères", Some(2022), Some("Provence")),
            )];
            assert!(similarity(&candidate, &masters[0].details) < DUPLICATE_THRESHOLD);
            assert!(find_duplicates(&candidate, &masters).is_empty());
        }
    }
}

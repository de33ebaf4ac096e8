use crate::ratings::{RatedWine, Score};
use crate::stats::{mean, rate, round_to};
use crate::wines::EventWineId;
use serde::Serialize;
use std::collections::HashMap;

/// Scores at most this far apart count as agreeing.
const AGREEMENT_TOLERANCE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SharedWine {
    pub(crate) event_wine_id: EventWineId,
    pub(crate) name: String,
    pub(crate) producer: String,
    pub(crate) my_score: Score,
    pub(crate) buddy_score: Score,
}

impl SharedWine {
    fn difference(&self) -> u8 {
        self.my_score.get().abs_diff(self.buddy_score.get())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ComparisonSummary {
    pub(crate) shared_count: usize,
    /// Mean absolute score difference, rounded to one decimal.
    pub(crate) average_difference: Option<f64>,
    pub(crate) agreement_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Comparison {
    #[serde(flatten)]
    pub(crate) summary: ComparisonSummary,
    pub(crate) shared_wines: Vec<SharedWine>,
}

/// Lines up the wines both profiles rated, in the order of `mine`.
pub(crate) fn compare(mine: &[RatedWine], theirs: &[RatedWine]) -> Comparison {
    let theirs: HashMap<_, _> = theirs
        .iter()
        .map(|r| (r.rating.event_wine_id, r.rating.score))
        .collect();
    let shared_wines: Vec<_> = mine
        .iter()
        .filter_map(|r| {
            let buddy_score = *theirs.get(&r.rating.event_wine_id)?;
            Some(SharedWine {
                event_wine_id: r.rating.event_wine_id,
                name: r.wine.name.clone(),
                producer: r.wine.producer.clone(),
                my_score: r.rating.score,
                buddy_score,
            })
        })
        .collect();
    Comparison {
        summary: ComparisonSummary {
            shared_count: shared_wines.len(),
            average_difference: mean(shared_wines.iter().map(|w| f64::from(w.difference())))
                .map(|d| round_to(d, 1)),
            agreement_rate: rate(
                shared_wines
                    .iter()
                    .map(|w| w.difference() <= AGREEMENT_TOLERANCE),
            )
            .map(|r| round_to(r, 2)),
        },
        shared_wines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taste::tests::rated;

    #[test]
    fn nothing_in_common() {
        let comparison = compare(
            &[rated(1, 4, false, &[], None, None)],
            &[rated(2, 4, false, &[], None, None)],
        );
        assert_eq!(0, comparison.summary.shared_count);
        assert_eq!(None, comparison.summary.average_difference);
        assert_eq!(None, comparison.summary.agreement_rate);
        assert!(comparison.shared_wines.is_empty());
    }

    #[test]
    fn only_wines_rated_by_both_are_counted() {
        let mine = [
            rated(1, 5, false, &[], None, None),
            rated(2, 2, false, &[], None, None),
            rated(3, 4, false, &[], None, None),
        ];
        let theirs = [
            rated(3, 1, false, &[], None, None),
            rated(1, 4, false, &[], None, None),
            rated(9, 5, false, &[], None, None),
        ];
        let comparison = compare(&mine, &theirs);
        assert_eq!(
            vec![1, 3],
            comparison
                .shared_wines
                .iter()
                .map(|w| w.event_wine_id.0)
                .collect::<Vec<_>>()
        );
        assert_eq!(2, comparison.summary.shared_count);
        assert_eq!(Some(2.0), comparison.summary.average_difference);
        assert_eq!(Some(0.5), comparison.summary.agreement_rate);
    }

    #[test]
    fn average_difference_is_rounded() {
        let mine = [
            rated(1, 5, false, &[], None, None),
            rated(2, 5, false, &[], None, None),
            rated(3, 5, false, &[], None, None),
        ];
        let theirs = [
            rated(1, 5, false, &[], None, None),
            rated(2, 5, false, &[], None, None),
            rated(3, 4, false, &[], None, None),
        ];
        let summary = compare(&mine, &theirs).summary;
        assert_eq!(Some(0.3), summary.average_difference);
        assert_eq!(Some(1.0), summary.agreement_rate);
    }
}

use itertools::Itertools as _;
use serde::Serialize;

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Share of `true` values, `None` for an empty input.
pub(crate) fn rate(values: impl IntoIterator<Item = bool>) -> Option<f64> {
    mean(values.into_iter().map(|v| if v { 1.0 } else { 0.0 }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Frequency {
    pub(crate) value: String,
    pub(crate) count: usize,
}

/// Counts values case-insensitively, keeping the spelling seen first.
/// Sorted by descending count, then alphabetically ignoring case.
pub(crate) fn frequency_table<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<Frequency> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .into_group_map_by(|value| value.to_lowercase())
        .into_iter()
        .filter_map(|(key, spellings)| {
            let value = (*spellings.first()?).to_owned();
            let count = spellings.len();
            Some((key, Frequency { value, count }))
        })
        .sorted_by(|(a_key, a), (b_key, b)| b.count.cmp(&a.count).then_with(|| a_key.cmp(b_key)))
        .map(|(_, frequency)| frequency)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(3.3, round_to(3.25, 1));
        assert_eq!(4.0, round_to(3.96, 1));
        assert_eq!(0.67, round_to(2.0 / 3.0, 2));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(None, mean([]));
        assert_eq!(Some(2.5), mean([2.0, 3.0]));
    }

    #[test]
    fn rate_counts_true_values() {
        assert_eq!(Some(0.25), rate([true, false, false, false]));
    }

    #[test]
    fn frequency_table_is_case_insensitive_and_sorted() {
        let table = frequency_table(["Syrah", "merlot", "syrah", "Gamay", "  ", "Merlot", "Syrah"]);
        assert_eq!(
            vec![
                Frequency {
                    value: "Syrah".to_owned(),
                    count: 3
                },
                Frequency {
                    value: "merlot".to_owned(),
                    count: 2
                },
                Frequency {
                    value: "Gamay".to_owned(),
                    count: 1
                },
            ],
            table
        );
    }

    #[test]
    fn frequency_ties_are_ordered_ignoring_case() {
        let table = frequency_table(["merlot", "Syrah", "cabernet franc", "Gamay"]);
        let values: Vec<_> = table.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(vec!["cabernet franc", "Gamay", "merlot", "Syrah"], values);
    }
}

use time::Date;

time::serde::format_description!(iso8601_date, Date, "[year]-[month]-[day]");

/// Serializes a [`Date`] as `YYYY-MM-DD`.
pub(crate) mod iso_date {
    pub(crate) use super::iso8601_date::{deserialize, serialize};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dated {
        #[serde(with = "iso_date")]
        date: Date,
    }

    #[test]
    fn dates_are_formatted_as_iso_8601() {
        let dated = Dated {
            date: date!(2026 - 03 - 07),
        };
        let json = rocket::serde::json::to_string(&dated).unwrap();
        assert_eq!(r#"{"date":"2026-03-07"}"#, json);
    }

    #[test]
    fn parses_iso_8601_dates() {
        let dated: Dated = rocket::serde::json::from_str(r#"{"date":"2026-11-20"}"#).unwrap();
        assert_eq!(date!(2026 - 11 - 20), dated.date);
    }
}

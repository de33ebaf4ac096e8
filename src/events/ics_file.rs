use super::{attended_event, EventId, EventLocation, TastingEvent};
use crate::database::Repository;
use crate::profiles::Profile;
use crate::result::HttpResult;
use anyhow::{Context as _, Result};
use ics::components::{Parameter, Property};
use ics::properties::{Description, DtEnd, DtStart, Location, Status, Summary};
use ics::{escape_text, ICalendar};
use itertools::Itertools as _;
use rocket::{get, Responder};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[get("/events/<id>/calendar.ics")]
pub(super) async fn calendar(
    id: EventId,
    profile: Profile,
    mut repository: Box<dyn Repository>,
) -> HttpResult<Ics> {
    let event = attended_event(repository.as_mut(), &profile, id).await?;
    let locations = repository.get_locations(id).await?;
    Ok(Ics::from_event(&event, &locations, OffsetDateTime::now_utc())?)
}

#[derive(Debug, Responder)]
#[response(content_type = "text/calendar;charset=utf-8")]
pub(crate) struct Ics(pub(crate) String);

impl Ics {
    pub(crate) fn from_event(
        event: &TastingEvent,
        locations: &[EventLocation],
        now: OffsetDateTime,
    ) -> Result<Ics> {
        let mut calendar = ICalendar::new("2.0", "palate-collectif");
        calendar.add_event(to_ical_event(event, locations, now)?);
        Ok(Ics(calendar.to_string()))
    }
}

fn to_ical_event<'a>(
    event: &'a TastingEvent,
    locations: &[EventLocation],
    now: OffsetDateTime,
) -> Result<ics::Event<'a>> {
    let mut ical_event = ics::Event::new(event_uid(event), format_timestamp(now)?);
    ical_event.push(Summary::new(escape_text(&event.name)));
    if !event.description.is_empty() {
        ical_event.push(Description::new(escape_text(&event.description)));
    }
    if !locations.is_empty() {
        ical_event.push(Location::new(escape_text(format_locations(locations))));
    }
    ical_event.push(Status::confirmed());
    ical_event.push(as_date(DtStart::new(format_date(event.event_date)?)));
    // DTEND is exclusive for all-day events.
    let ends_on = event
        .event_date
        .next_day()
        .context("event date has no following day")?;
    ical_event.push(as_date(DtEnd::new(format_date(ends_on)?)));
    Ok(ical_event)
}

fn as_date<'a>(property: impl Into<Property<'a>>) -> Property<'a> {
    let mut property = property.into();
    property.add(Parameter::new("VALUE", "DATE"));
    property
}

fn event_uid(event: &TastingEvent) -> String {
    format!("event-{}-{}@palate-collectif", event.id, event.code)
}

/// Crawls list their stops in order.
fn format_locations(locations: &[EventLocation]) -> String {
    locations
        .iter()
        .sorted_by_key(|l| (l.position, l.id))
        .map(|l| {
            if l.address.is_empty() {
                l.name.clone()
            } else {
                format!("{}, {}", l.name, l.address)
            }
        })
        .join(" → ")
}

fn format_date(value: Date) -> Result<String> {
    const FORMAT: &[FormatItem<'_>] = format_description!("[year][month][day]");
    Ok(value.format(&FORMAT)?)
}

fn format_timestamp(value: OffsetDateTime) -> Result<String> {
    const FORMAT: &[FormatItem<'_>] =
        format_description!("[year][month][day]T[hour][minute][second]Z");
    Ok(value.to_offset(time::UtcOffset::UTC).format(&FORMAT)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCode, LocationId};
    use crate::profiles::ProfileId;
    use time::macros::{date, datetime};

    fn event() -> TastingEvent {
        TastingEvent {
            id: EventId(3),
            name: "Loire Evening".to_owned(),
            description: "Chenin, Cabernet Franc; and more".to_owned(),
            code: EventCode("LOIRE2".to_owned()),
            event_date: date!(2026 - 12 - 04),
            booth_mode: false,
            created_by: ProfileId(1),
            organization_id: None,
            created_at: datetime!(2026-10-01 12:00 UTC),
        }
    }

    fn location(id: i64, name: &str, position: i64) -> EventLocation {
        EventLocation {
            id: LocationId(id),
            event_id: EventId(3),
            name: name.to_owned(),
            address: String::new(),
            position,
        }
    }

    #[test]
    fn renders_an_all_day_event() {
        let Ics(ics) = Ics::from_event(&event(), &[], datetime!(2026-10-16 08:30 UTC)).unwrap();
        assert!(ics.contains("DTSTART;VALUE=DATE:20261204"));
        assert!(ics.contains("DTEND;VALUE=DATE:20261205"));
        assert!(ics.contains("DTSTAMP:20261016T083000Z"));
        assert!(ics.contains("SUMMARY:Loire Evening"));
    }

    #[test]
    fn events_on_the_last_representable_date_are_an_error() {
        let event = TastingEvent {
            event_date: Date::MAX,
            ..event()
        };
        assert!(Ics::from_event(&event, &[], datetime!(2026-10-16 08:30 UTC)).is_err());
    }

    #[test]
    fn lists_crawl_stops_in_order() {
        let locations = [location(1, "Cellar", 2), location(2, "Wine bar", 1)];
        assert_eq!("Wine bar → Cellar", format_locations(&locations));
    }
}

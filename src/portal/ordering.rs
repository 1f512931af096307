//! Display ordering for events and execom rosters.

use super::models::{Event, Person};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::cmp::Reverse;

/// Priority for roles not in [`ROLE_PRIORITY`].
pub const DEFAULT_ROLE_PRIORITY: u32 = 100;

/// Execom roles, most senior first.
pub const ROLE_PRIORITY: &[(&str, u32)] = &[
    ("Nodal Officer 1", 1),
    ("Nodal Officer 2", 2),
    ("Joint Coordinator", 3),
    ("Chief Mentor", 4),
    ("CEO", 5),
    ("CMO", 6),
    ("CCMO", 7),
    ("CFO", 8),
    ("CCO", 9),
    ("CTO", 10),
    ("COO", 11),
    ("Senior Community Mentor", 12),
    ("Senior Finance & Documentation Mentor", 13),
    ("Senior Operations Mentor", 14),
    ("Senior Marketing & Branding Mentor", 15),
    ("Faculty Advisor", 16),
    ("Senior Mentor", 17),
    ("Club Lead", 18),
    ("Joint Club Lead", 19),
];

pub fn role_priority(role: &str) -> u32 {
    ROLE_PRIORITY
        .iter()
        .find(|(name, _)| *name == role)
        .map(|(_, priority)| *priority)
        .unwrap_or(DEFAULT_ROLE_PRIORITY)
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses the date formats event forms produce. Values without an offset are
/// taken as UTC.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return Some(parsed.and_time(NaiveTime::MIN).and_utc());
        }
    }

    None
}

/// Most recent first. Events whose date does not parse go last; ties keep
/// their incoming order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by_cached_key(|event| match parse_event_date(&event.date) {
        Some(date) => (false, Reverse(Some(date))),
        None => (true, Reverse(None)),
    });
}

/// By role priority, then by name.
pub fn sort_people(people: &mut [Person]) {
    people.sort_by(|a, b| {
        role_priority(&a.role)
            .cmp(&role_priority(&b.role))
            .then_with(|| a.name.cmp(&b.name))
    });
}

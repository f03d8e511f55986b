// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Index fields derived from calendar and contact payloads.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use icalendar::parser::{Component, Property, read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use rrule::RRuleSet;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Upper bound for recurrence expansion, 2038-01-01T00:00:00Z.
///
/// Events recurring without `COUNT` or `UNTIL` report this as their last occurrence.
pub const RECURRENCE_HORIZON: i64 = 2_145_916_800;

/// Occurrences expanded before a bounded rule is treated as reaching the horizon.
const MAX_EXPANDED: u16 = 10_000;

/// Index fields of a calendar object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObjectInfo {
    /// Hex SHA-256 of the payload.
    pub content_hash: String,

    /// Payload size in bytes.
    pub size: i64,

    /// Name of the authoritative component, e.g. `VEVENT`.
    pub component_type: String,

    /// UID of that component, empty when absent.
    pub uid: String,

    /// Unix time of the first occurrence.
    pub first_occurrence: Option<i64>,

    /// Unix time the last occurrence ends.
    pub last_occurrence: Option<i64>,
}

/// Index fields of a contact object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactObjectInfo {
    /// Hex SHA-256 of the payload.
    pub content_hash: String,

    /// Payload size in bytes.
    pub size: i64,

    /// `UID` property.
    pub uid: Option<String>,

    /// `FN` property, empty when absent.
    pub formatted_name: String,

    /// `N` components joined with `;`.
    pub structured_name: String,
}

/// Hex SHA-256 of a payload.
pub fn content_hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Normalizes an iCalendar object.
///
/// The first component that is not a `VTIMEZONE` is authoritative.
pub fn normalize_calendar_object(ics: &str) -> Result<CalendarObjectInfo> {
    let unfolded = unfold(ics);
    let calendar =
        read_calendar(&unfolded).map_err(|e| Error::Parse(format!("Invalid iCalendar: {e}")))?;

    let component = calendar
        .components
        .iter()
        .find(|c| c.name != "VTIMEZONE")
        .ok_or_else(|| Error::Parse("No usable calendar component".to_string()))?;

    let component_type = component.name.as_ref().to_ascii_uppercase();
    let uid = component
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let (first, last) = if component_type == "VEVENT" {
        event_span(component)
    } else {
        generic_span(component)
    };

    Ok(CalendarObjectInfo {
        content_hash: content_hash(ics),
        size: byte_len(ics),
        component_type,
        uid,
        first_occurrence: first.map(|t| t.timestamp()),
        last_occurrence: last.map(|t| t.timestamp()),
    })
}

/// Start and end of a `VEVENT`, extended to its last recurrence.
fn event_span(event: &Component<'_>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let Some((start, date_only)) = prop_time(event, "DTSTART") else {
        return (None, None);
    };

    let end = if let Some((end, _)) = prop_time(event, "DTEND") {
        end
    } else if let Some(duration) = event
        .find_prop("DURATION")
        .and_then(|p| parse_ical_duration(p.val.as_ref()))
    {
        start + duration
    } else if date_only {
        start + Duration::days(1)
    } else {
        start
    };

    let Some(rrule) = event.find_prop("RRULE").map(|p| p.val.to_string()) else {
        return (Some(start), Some(end));
    };

    let last = last_recurrence_end(event, &rrule, start, end - start);
    (Some(start), Some(last))
}

/// Span of a `VTODO`, `VJOURNAL` or other dated component.
fn generic_span(component: &Component<'_>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let first = prop_time(component, "DTSTART")
        .or_else(|| prop_time(component, "DUE"))
        .map(|(t, _)| t);
    let last = prop_time(component, "DUE")
        .or_else(|| prop_time(component, "DTEND"))
        .map(|(t, _)| t)
        .or(first);
    (first, last)
}

/// End of the last occurrence before [`RECURRENCE_HORIZON`].
///
/// The rule is expanded in the zone of `DTSTART`, honouring `RDATE` and `EXDATE`.
fn last_recurrence_end(
    event: &Component<'_>,
    rrule: &str,
    start: DateTime<Utc>,
    duration: Duration,
) -> DateTime<Utc> {
    let horizon = horizon();
    let upper = rrule.to_ascii_uppercase();
    if !upper.contains("COUNT=") && !upper.contains("UNTIL=") {
        return horizon;
    }

    let Some(dtstart) = event
        .find_prop("DTSTART")
        .and_then(|p| rule_lines(p).into_iter().next())
    else {
        return start + duration;
    };
    let extra: Vec<String> = event
        .properties
        .iter()
        .filter(|p| {
            let name: &str = p.name.as_ref();
            name.eq_ignore_ascii_case("RDATE") || name.eq_ignore_ascii_case("EXDATE")
        })
        .flat_map(rule_lines)
        .collect();

    let Some(set) = parse_rule_set(&format!("{dtstart}\nRRULE:{rrule}"), &extra) else {
        return horizon;
    };

    let tz: rrule::Tz = Utc.into();
    let result = set.before(horizon.with_timezone(&tz)).all(MAX_EXPANDED);
    if result.limited {
        return horizon;
    }
    match result.dates.last() {
        Some(last) => (last.with_timezone(&Utc) + duration).min(horizon),
        None => start + duration,
    }
}

fn parse_rule_set(rule: &str, extra: &[String]) -> Option<RRuleSet> {
    if !extra.is_empty() {
        match format!("{rule}\n{}", extra.join("\n")).parse() {
            Ok(set) => return Some(set),
            Err(e) => tracing::debug!(err = %e, "ignoring unparsable RDATE/EXDATE"),
        }
    }
    match rule.parse() {
        Ok(set) => Some(set),
        Err(e) => {
            tracing::warn!(%rule, err = %e, "unparsable RRULE, assuming unbounded");
            None
        }
    }
}

/// Content lines for the rrule parser, one per value of a `DTSTART`, `RDATE` or `EXDATE`.
///
/// Dates become midnight UTC. Floating times and unknown zones are read as UTC,
/// as in [`prop_time`]. Period values are skipped.
fn rule_lines(prop: &Property<'_>) -> Vec<String> {
    let name = prop.name.to_string().to_ascii_uppercase();
    let param = |key: &str| {
        prop.params
            .iter()
            .find(|p| {
                let k: &str = p.key.as_ref();
                k.eq_ignore_ascii_case(key)
            })
            .and_then(|p| p.val.as_ref())
            .map(|v| v.to_string())
    };
    let date_only = param("VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    let tzid = param("TZID").filter(|tz| tz.parse::<chrono_tz::Tz>().is_ok());

    let value = prop.val.to_string();
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains('/'))
        .filter_map(|v| {
            if date_only || v.len() == 8 {
                let date = NaiveDate::parse_from_str(v, "%Y%m%d").ok()?;
                return Some(format!("{name}:{}T000000Z", date.format("%Y%m%d")));
            }
            let local = v.strip_suffix('Z').unwrap_or(v);
            NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S").ok()?;
            Some(match &tzid {
                Some(tz) if !v.ends_with('Z') => format!("{name};TZID={tz}:{local}"),
                _ => format!("{name}:{local}Z"),
            })
        })
        .collect()
}

/// A date or date-time property in UTC, and whether it was date-only.
fn prop_time(component: &Component<'_>, name: &str) -> Option<(DateTime<Utc>, bool)> {
    let prop = component.find_prop(name)?;
    let value = DatePerhapsTime::try_from(prop).ok()?;
    Some(match value {
        DatePerhapsTime::Date(d) => (d.and_time(NaiveTime::MIN).and_utc(), true),
        DatePerhapsTime::DateTime(dt) => (calendar_datetime_to_utc(dt), false),
    })
}

fn calendar_datetime_to_utc(dt: CalendarDateTime) -> DateTime<Utc> {
    match dt {
        CalendarDateTime::Utc(dt) => dt,
        CalendarDateTime::Floating(naive) => naive.and_utc(),
        CalendarDateTime::WithTimezone { date_time, tzid } => zoned_to_utc(date_time, &tzid),
    }
}

/// Resolves a TZID through the IANA database; unknown zones are read as UTC.
fn zoned_to_utc(date_time: NaiveDateTime, tzid: &str) -> DateTime<Utc> {
    match tzid.parse::<chrono_tz::Tz>() {
        Ok(tz) => tz
            .from_local_datetime(&date_time)
            .earliest()
            .map_or_else(|| date_time.and_utc(), |t| t.with_timezone(&Utc)),
        Err(_) => {
            tracing::debug!(%tzid, "unknown TZID, reading as UTC");
            date_time.and_utc()
        }
    }
}

/// Parses an iCalendar `DURATION` value such as `PT1H30M`, `P2D` or `-P1W`.
fn parse_ical_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let parsed = iso8601::duration(rest).ok()?;
    let std: std::time::Duration = parsed.into();
    let duration = Duration::from_std(std).ok()?;
    Some(if negative { -duration } else { duration })
}

fn horizon() -> DateTime<Utc> {
    DateTime::from_timestamp(RECURRENCE_HORIZON, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn byte_len(data: &str) -> i64 {
    i64::try_from(data.len()).unwrap_or(i64::MAX)
}

/// Normalizes a vCard.
pub fn normalize_contact_object(vcf: &str) -> Result<ContactObjectInfo> {
    let unfolded = strip_groups(&unfold(vcf));
    let parsed =
        read_calendar(&unfolded).map_err(|e| Error::Parse(format!("Invalid vCard: {e}")))?;
    let card = parsed
        .components
        .iter()
        .find(|c| c.name.to_string().eq_ignore_ascii_case("VCARD"))
        .ok_or_else(|| Error::Parse("Missing BEGIN:VCARD".to_string()))?;

    let text = |name: &str| card.find_prop(name).map(|p| p.val.to_string());
    let structured_name = text("N")
        .map(|n| {
            split_components(&n)
                .iter()
                .map(|c| unescape(c))
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default();

    Ok(ContactObjectInfo {
        content_hash: content_hash(vcf),
        size: byte_len(vcf),
        uid: text("UID").map(|v| v.trim().to_string()),
        formatted_name: text("FN").map(|v| unescape(&v)).unwrap_or_default(),
        structured_name,
    })
}

/// Drops group prefixes such as `item1.` from property names.
fn strip_groups(unfolded: &str) -> String {
    let mut out = String::with_capacity(unfolded.len());
    for line in unfolded.lines() {
        let name_end = line.find([':', ';']).unwrap_or(line.len());
        let line = match line[..name_end].rfind('.') {
            Some(dot) => &line[dot + 1..],
            None => line,
        };
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

/// Splits a structured value on unescaped `;`.
fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ';' if !escaped => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.trim().chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

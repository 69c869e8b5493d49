//! Raw provider event normalization
//!
//! Converts a raw provider event into the stored [`EventRecord`] shape,
//! computing the day/month/fiscal-year index keys in the event's own
//! time zone so a 23:00 lecture in Tokyo lands on the Tokyo date, not
//! the server's.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::api;
use crate::models::{EventRecord, RawEventTime};
use crate::timekeys::{day_keys, fiscal_year_keys, month_keys};

/// Normalize one raw provider event for `calendar_id`.
///
/// `default_tz` is used when the event carries no IANA zone of its own.
pub fn normalize_event(calendar_id: &str, raw: api::RawEvent, default_tz: Tz) -> EventRecord {
    let now = Utc::now();
    let created_at = parse_instant(raw.created.as_deref()).unwrap_or(now);
    let updated_at = parse_instant(raw.updated.as_deref()).unwrap_or(now);

    let event_id = raw.id.unwrap_or_else(|| {
        // Provider protocol violation; keep the record addressable anyway.
        let generated = Uuid::new_v4().simple().to_string();
        log::warn!("event without id in calendar {}, generated {}", calendar_id, generated);
        generated
    });

    let start = raw.start.unwrap_or_default();
    let end = raw.end.unwrap_or_default();

    // dateTime wins: an event with both fields set is a timed event.
    let all_day = start.date.is_some() && start.date_time.is_none();
    let tz = event_zone(&start, default_tz);

    let (start_utc, end_utc, local_start, local_end) = if all_day {
        let start_date = start
            .date
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(|| updated_at.date_naive());
        // The provider's all-day end date is exclusive.
        let end_date = end
            .date
            .as_deref()
            .and_then(parse_date)
            .and_then(|d| d.pred_opt())
            .unwrap_or(start_date)
            .max(start_date);
        (
            midnight_utc(start_date),
            midnight_utc(end_date),
            start_date,
            end_date,
        )
    } else {
        let start_utc = start
            .date_time
            .as_deref()
            .and_then(|s| parse_instant(Some(s)))
            .unwrap_or(updated_at);
        let end_utc = end
            .date_time
            .as_deref()
            .and_then(|s| parse_instant(Some(s)))
            .unwrap_or(start_utc)
            .max(start_utc);
        (
            start_utc,
            end_utc,
            start_utc.with_timezone(&tz).date_naive(),
            end_utc.with_timezone(&tz).date_naive(),
        )
    };

    EventRecord {
        calendar_id: calendar_id.to_string(),
        event_id,
        summary: raw.summary.unwrap_or_default(),
        description: raw.description,
        location: raw.location,
        start_date_key: local_start.format("%Y-%m-%d").to_string(),
        end_date_key: local_end.format("%Y-%m-%d").to_string(),
        start_ts: start_utc.timestamp_millis(),
        end_ts: end_utc.timestamp_millis(),
        all_day,
        day_keys: day_keys(local_start, local_end),
        month_keys: month_keys(local_start, local_end),
        fiscal_year_keys: fiscal_year_keys(local_start, local_end),
        status: raw.status.unwrap_or_else(|| "confirmed".to_string()),
        start_raw: raw_time(start),
        end_raw: raw_time(end),
        organizer: raw.organizer.and_then(|o| o.email.or(o.display_name)),
        color_id: raw.color_id,
        created_at,
        updated_at,
    }
}

/// Resolve the zone the event's index keys are computed in.
fn event_zone(start: &api::RawTime, default_tz: Tz) -> Tz {
    start
        .time_zone
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(default_tz)
}

fn parse_instant(s: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn raw_time(t: api::RawTime) -> RawEventTime {
    RawEventTime {
        date: t.date,
        date_time: t.date_time,
        time_zone: t.time_zone,
    }
}

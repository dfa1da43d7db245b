use crate::domain::models::{BusyInterval, MeetingSlot, SlotRequest};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

pub const SEARCH_DAYS: i64 = 7;
pub const MAX_SUGGESTIONS: usize = 5;

/// Greedy scan for free meeting slots.
///
/// Walks days `today + 1 ..= today + 7` and, within each day, whole hours from
/// the start of the working window to the last hour where the meeting still
/// ends by the window end. A candidate is kept when it overlaps no busy
/// interval. Results keep scan order (day, then hour) and stop at five.
/// Busy intervals are used as given; they are neither sorted nor merged.
pub fn find_meeting_slots(
    today: NaiveDate,
    time_zone: Tz,
    busy: &[BusyInterval],
    request: SlotRequest,
) -> Vec<MeetingSlot> {
    let duration = Duration::minutes(i64::from(request.duration_minutes));
    let hours_needed = i64::from(request.duration_minutes.div_ceil(60));
    let first_hour = i64::from(request.working_hours.start);
    let last_hour = i64::from(request.working_hours.end) - hours_needed;

    let mut suggestions = Vec::new();
    for offset in 1..=SEARCH_DAYS {
        let day = today + Duration::days(offset);
        for hour in first_hour..=last_hour {
            let Some(start) = local_hour(day, hour, time_zone) else {
                continue;
            };
            let end = start + duration;
            if overlaps_any(start, end, busy) {
                continue;
            }

            let local_start = start.with_timezone(&time_zone);
            suggestions.push(MeetingSlot {
                start,
                end,
                day: local_start.format("%A").to_string(),
                time: local_start.format("%-I:%M %p").to_string(),
            });
            if suggestions.len() == MAX_SUGGESTIONS {
                return suggestions;
            }
        }
    }
    suggestions
}

/// Free/busy window covering every day the scan visits: local midnight of
/// tomorrow up to local midnight after the last scanned day.
pub fn busy_query_window(today: NaiveDate, time_zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_day_start(today + Duration::days(1), time_zone),
        local_day_start(today + Duration::days(SEARCH_DAYS + 1), time_zone),
    )
}

/// Local midnight of `date`, or the first valid instant after it.
pub fn local_day_start(date: NaiveDate, time_zone: Tz) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| time_zone.from_local_datetime(&naive).earliest())
        .map(|value| value.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
}

fn overlaps_any(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
    busy.iter()
        .any(|interval| start < interval.end && end > interval.start)
}

fn local_hour(day: NaiveDate, hour: i64, time_zone: Tz) -> Option<DateTime<Utc>> {
    let hour = u32::try_from(hour).ok()?;
    let naive = day.and_hms_opt(hour, 0, 0)?;
    // Nonexistent local times (spring-forward gap) have no slot.
    time_zone
        .from_local_datetime(&naive)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
}

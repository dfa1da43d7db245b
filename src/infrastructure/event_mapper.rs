use crate::domain::models::{CalendarEvent, EventDraft, EventTiming};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

const UNTITLED_EVENT: &str = "Untitled Event";
const DEFAULT_STATUS: &str = "confirmed";
const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;
const POPUP_REMINDER_MINUTES: u32 = 10;

/// Either `date` (all-day) or `dateTime` is set by the provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEventAttendee {
    pub email: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEventReminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<CalendarReminderOverride>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<CalendarEventAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<CalendarEventReminders>,
}

/// Builds the request body for events.insert / events.update.
pub fn encode_event(draft: &EventDraft, time_zone: Tz, with_reminders: bool) -> GoogleCalendarEvent {
    let zone_name = time_zone.name().to_string();
    let reminders = with_reminders.then(|| CalendarEventReminders {
        use_default: false,
        overrides: vec![
            CalendarReminderOverride {
                method: "email".to_string(),
                minutes: EMAIL_REMINDER_MINUTES,
            },
            CalendarReminderOverride {
                method: "popup".to_string(),
                minutes: POPUP_REMINDER_MINUTES,
            },
        ],
    });

    GoogleCalendarEvent {
        summary: Some(draft.title.trim().to_string()),
        description: Some(draft.description.clone()),
        start: CalendarEventDateTime {
            date: None,
            date_time: Some(draft.start.with_timezone(&time_zone).to_rfc3339()),
            time_zone: Some(zone_name.clone()),
        },
        end: CalendarEventDateTime {
            date: None,
            date_time: Some(draft.end.with_timezone(&time_zone).to_rfc3339()),
            time_zone: Some(zone_name),
        },
        attendees: draft
            .attendees
            .iter()
            .map(|email| email.trim())
            .filter(|email| !email.is_empty())
            .map(|email| CalendarEventAttendee {
                email: email.to_string(),
            })
            .collect(),
        reminders,
        ..GoogleCalendarEvent::default()
    }
}

pub fn normalize_timing(event: &GoogleCalendarEvent) -> Result<EventTiming, InfraError> {
    if let Some(raw_start) = non_empty(event.start.date_time.as_deref()) {
        let start = parse_rfc3339_utc(raw_start, "start.dateTime")?;
        let end = match non_empty(event.end.date_time.as_deref()) {
            Some(raw_end) => parse_rfc3339_utc(raw_end, "end.dateTime")?,
            None => start,
        };
        return Ok(EventTiming::Timed { start, end });
    }

    if let Some(raw_start) = non_empty(event.start.date.as_deref()) {
        let start_date = parse_date(raw_start, "start.date")?;
        let end_date = match non_empty(event.end.date.as_deref()) {
            Some(raw_end) => parse_date(raw_end, "end.date")?,
            None => start_date,
        };
        return Ok(EventTiming::AllDay {
            start_date,
            end_date,
        });
    }

    Err(InfraError::Provider(format!(
        "calendar event {} has neither start.date nor start.dateTime",
        event.id.as_deref().unwrap_or("<no id>")
    )))
}

/// Normalizes a provider event into its display shape.
pub fn format_event(event: &GoogleCalendarEvent, time_zone: Tz) -> Result<CalendarEvent, InfraError> {
    let timing = normalize_timing(event)?;
    let (start_time, end_time) = match &timing {
        EventTiming::Timed { start, end } => (
            display_time(*start, time_zone),
            display_time(*end, time_zone),
        ),
        EventTiming::AllDay { .. } => (String::new(), String::new()),
    };

    Ok(CalendarEvent {
        id: event.id.clone().unwrap_or_default(),
        title: non_empty(event.summary.as_deref())
            .unwrap_or(UNTITLED_EVENT)
            .to_string(),
        description: event.description.clone().unwrap_or_default(),
        location: event.location.clone().unwrap_or_default(),
        is_all_day: timing.is_all_day(),
        timing,
        start_time,
        end_time,
        attendees: event
            .attendees
            .iter()
            .map(|attendee| attendee.email.clone())
            .collect(),
        status: non_empty(event.status.as_deref())
            .unwrap_or(DEFAULT_STATUS)
            .to_string(),
        html_link: event.html_link.clone(),
    })
}

pub fn display_time(value: DateTime<Utc>, time_zone: Tz) -> String {
    value.with_timezone(&time_zone).format("%-I:%M %p").to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn parse_rfc3339_utc(value: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::Provider(format!(
                "invalid calendar event {field_name} '{value}': {error}"
            ))
        })
}

fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|error| {
        InfraError::Provider(format!(
            "invalid calendar event {field_name} '{value}': {error}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_event() -> GoogleCalendarEvent {
        GoogleCalendarEvent {
            id: Some("evt-1".to_string()),
            summary: Some("Agency sync".to_string()),
            description: Some("Weekly check-in".to_string()),
            start: CalendarEventDateTime {
                date_time: Some("2026-07-11T13:00:00Z".to_string()),
                ..CalendarEventDateTime::default()
            },
            end: CalendarEventDateTime {
                date_time: Some("2026-07-11T14:30:00Z".to_string()),
                ..CalendarEventDateTime::default()
            },
            ..GoogleCalendarEvent::default()
        }
    }

    #[test]
    fn timed_event_gets_meridiem_times() {
        let formatted = format_event(&timed_event(), Tz::UTC).expect("format event");
        assert!(!formatted.is_all_day);
        assert_eq!(formatted.start_time, "1:00 PM");
        assert_eq!(formatted.end_time, "2:30 PM");
        assert_eq!(formatted.title, "Agency sync");
        assert_eq!(formatted.status, "confirmed");
    }

    #[test]
    fn times_follow_the_display_zone() {
        let formatted = format_event(&timed_event(), Tz::America__New_York).expect("format event");
        assert_eq!(formatted.start_time, "9:00 AM");
    }

    #[test]
    fn date_only_event_is_all_day_with_empty_times() {
        let event = GoogleCalendarEvent {
            id: Some("evt-2".to_string()),
            start: CalendarEventDateTime {
                date: Some("2026-07-11".to_string()),
                ..CalendarEventDateTime::default()
            },
            end: CalendarEventDateTime {
                date: Some("2026-07-12".to_string()),
                ..CalendarEventDateTime::default()
            },
            ..GoogleCalendarEvent::default()
        };

        let formatted = format_event(&event, Tz::UTC).expect("format event");
        assert!(formatted.is_all_day);
        assert_eq!(formatted.start_time, "");
        assert_eq!(formatted.end_time, "");
        assert_eq!(
            formatted.timing,
            EventTiming::AllDay {
                start_date: NaiveDate::from_ymd_opt(2026, 7, 11).expect("valid date"),
                end_date: NaiveDate::from_ymd_opt(2026, 7, 12).expect("valid date"),
            }
        );
    }

    #[test]
    fn missing_fields_get_defaults() {
        let mut event = timed_event();
        event.summary = None;
        event.description = None;
        event.status = None;

        let formatted = format_event(&event, Tz::UTC).expect("format event");
        assert_eq!(formatted.title, "Untitled Event");
        assert_eq!(formatted.description, "");
        assert_eq!(formatted.status, "confirmed");
    }

    #[test]
    fn provider_status_is_kept() {
        let mut event = timed_event();
        event.status = Some("tentative".to_string());
        assert_eq!(
            format_event(&event, Tz::UTC).expect("format event").status,
            "tentative"
        );
    }

    #[test]
    fn event_without_start_is_rejected() {
        let event = GoogleCalendarEvent {
            id: Some("broken".to_string()),
            ..GoogleCalendarEvent::default()
        };
        assert!(normalize_timing(&event).is_err());
    }

    #[test]
    fn parses_provider_payload_with_date_or_datetime() {
        let payload = r#"{
            "id": "abc",
            "summary": "Offsite",
            "htmlLink": "https://calendar.google.com/event?eid=abc",
            "start": {"date": "2026-07-20"},
            "end": {"date": "2026-07-21"}
        }"#;
        let event: GoogleCalendarEvent = serde_json::from_str(payload).expect("valid payload");
        let formatted = format_event(&event, Tz::UTC).expect("format event");
        assert!(formatted.is_all_day);
        assert_eq!(
            formatted.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=abc")
        );
    }

    #[test]
    fn encode_event_sets_zone_and_reminders() {
        let draft = EventDraft {
            title: " Campaign brief ".to_string(),
            description: "Kickoff".to_string(),
            start: DateTime::parse_from_rfc3339("2026-07-11T15:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
            end: DateTime::parse_from_rfc3339("2026-07-11T16:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
            attendees: vec!["a@example.com".to_string(), " ".to_string()],
        };

        let encoded = encode_event(&draft, Tz::Europe__Berlin, true);
        assert_eq!(encoded.summary.as_deref(), Some("Campaign brief"));
        assert_eq!(encoded.start.time_zone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(
            encoded.start.date_time.as_deref(),
            Some("2026-07-11T17:00:00+02:00")
        );
        assert_eq!(encoded.attendees.len(), 1);
        let reminders = encoded.reminders.expect("reminders set");
        assert!(!reminders.use_default);
        assert_eq!(reminders.overrides[0].minutes, 1440);

        let json = serde_json::to_value(encode_event(&draft, Tz::UTC, false)).expect("serialize");
        assert!(json.get("reminders").is_none());
        assert!(json.get("id").is_none());
    }
}

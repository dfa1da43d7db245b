use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Urgent,
    #[default]
    Important,
    Strategic,
    Maintenance,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Critical,
        Priority::Urgent,
        Priority::Important,
        Priority::Strategic,
        Priority::Maintenance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Urgent => "urgent",
            Self::Important => "important",
            Self::Strategic => "strategic",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "urgent" => Ok(Self::Urgent),
            "important" => Ok(Self::Important),
            "strategic" => Ok(Self::Strategic),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(format!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
    Archived,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Free-text label such as "2 weeks" or "Aug 1-2"; never parsed.
    pub deadline: String,
    pub estimated_hours: f64,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        if !self.estimated_hours.is_finite() || self.estimated_hours < 0.0 {
            return Err("task.estimated_hours must be a non-negative number".to_string());
        }
        match (self.status, self.completed_at) {
            (TaskStatus::Completed, None) => {
                Err("task.completed_at must be set when status is completed".to_string())
            }
            (TaskStatus::Active | TaskStatus::Archived, Some(_)) => {
                Err("task.completed_at must be empty unless status is completed".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default = "default_estimated_hours")]
    pub estimated_hours: f64,
    #[serde(default)]
    pub priority: Priority,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            deadline: String::new(),
            estimated_hours: default_estimated_hours(),
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = deadline.into();
        self
    }

    pub fn with_estimated_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = hours;
        self
    }
}

fn default_estimated_hours() -> f64 {
    2.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub estimated_hours: Option<f64>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub search: String,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| status != task.status) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != task.priority) {
            return false;
        }
        // Whitespace-only search matches everything; otherwise the text is a
        // literal substring, surrounding spaces included.
        if self.search.trim().is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskAnalytics {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub archived: usize,
    pub critical_active: usize,
    pub completion_rate: u32,
    pub active_estimated_hours: f64,
    pub active_by_priority: Vec<(Priority, usize)>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Coach,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn coach(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Coach,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Prioritize,
    Schedule,
    Breakdown,
    Meeting,
    Default,
}

/// Start and end of an event as the provider expressed it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventTiming {
    AllDay {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl EventTiming {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub timing: EventTiming,
    pub is_all_day: bool,
    pub start_time: String,
    pub end_time: String,
    pub attendees: Vec<String>,
    pub status: String,
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "event.title")?;
        if self.end <= self.start {
            return Err("event.end must be after event.start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: u32,
    pub end: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self { start: 9, end: 17 }
    }
}

impl WorkingHours {
    pub fn validate(&self) -> Result<(), String> {
        if self.start > 23 || self.end > 24 {
            return Err("working_hours must be within 0..=24".to_string());
        }
        if self.end <= self.start {
            return Err("working_hours.end must be after working_hours.start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotRequest {
    pub duration_minutes: u32,
    pub working_hours: WorkingHours,
}

impl Default for SlotRequest {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            working_hours: WorkingHours::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub day: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            title: "August digital campaign".to_string(),
            description: "Launch the campaign".to_string(),
            deadline: "Aug 1-2".to_string(),
            estimated_hours: 12.0,
            priority: Priority::Critical,
            status: TaskStatus::Active,
            created_at: fixed_time("2026-07-05T08:00:00Z"),
            completed_at: None,
        }
    }

    #[test]
    fn task_validate_accepts_active_task() {
        assert!(sample_task().validate().is_ok());
    }

    #[test]
    fn task_validate_rejects_empty_title() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_enforces_completed_at_pairing() {
        let mut task = sample_task();
        task.status = TaskStatus::Completed;
        assert!(task.validate().is_err());

        task.completed_at = Some(fixed_time("2026-07-06T08:00:00Z"));
        assert!(task.validate().is_ok());

        task.status = TaskStatus::Archived;
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_negative_hours() {
        let mut task = sample_task();
        task.estimated_hours = -1.0;
        assert!(task.validate().is_err());
    }

    #[test]
    fn filter_matches_search_on_title_or_description_case_insensitively() {
        let task = sample_task();
        let by_title = TaskFilter {
            search: "DIGITAL".to_string(),
            ..TaskFilter::default()
        };
        let by_description = TaskFilter {
            search: "launch".to_string(),
            ..TaskFilter::default()
        };
        let miss = TaskFilter {
            search: "website".to_string(),
            ..TaskFilter::default()
        };
        assert!(by_title.matches(&task));
        assert!(by_description.matches(&task));
        assert!(!miss.matches(&task));
    }

    #[test]
    fn filter_search_keeps_surrounding_spaces_literal() {
        let task = sample_task();
        let blank = TaskFilter {
            search: "   ".to_string(),
            ..TaskFilter::default()
        };
        let padded_miss = TaskFilter {
            search: " campaign ".to_string(),
            ..TaskFilter::default()
        };
        let padded_hit = TaskFilter {
            search: " campaign".to_string(),
            ..TaskFilter::default()
        };
        assert!(blank.matches(&task));
        assert!(!padded_miss.matches(&task));
        assert!(padded_hit.matches(&task));
    }

    #[test]
    fn filter_combines_status_and_priority() {
        let task = sample_task();
        let matching = TaskFilter {
            status: Some(TaskStatus::Active),
            priority: Some(Priority::Critical),
            search: String::new(),
        };
        let wrong_priority = TaskFilter {
            priority: Some(Priority::Urgent),
            ..matching.clone()
        };
        assert!(matching.matches(&task));
        assert!(!wrong_priority.matches(&task));
    }

    #[test]
    fn working_hours_validate_rejects_inverted_window() {
        assert!(WorkingHours::default().validate().is_ok());
        assert!(WorkingHours { start: 17, end: 9 }.validate().is_err());
    }

    #[test]
    fn event_timing_reports_all_day() {
        let all_day = EventTiming::AllDay {
            start_date: NaiveDate::from_ymd_opt(2026, 7, 11).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 12).expect("valid date"),
        };
        let timed = EventTiming::Timed {
            start: fixed_time("2026-07-11T13:00:00Z"),
            end: fixed_time("2026-07-11T14:00:00Z"),
        };
        assert!(all_day.is_all_day());
        assert!(!timed.is_all_day());
    }

    proptest! {
        #[test]
        fn priority_parse_accepts_any_casing_of_known_names(index in 0usize..5, upper in any::<bool>()) {
            let priority = Priority::ALL[index];
            let raw = if upper {
                priority.as_str().to_ascii_uppercase()
            } else {
                priority.as_str().to_string()
            };
            prop_assert_eq!(Priority::parse(&raw), Ok(priority));
        }
    }
}

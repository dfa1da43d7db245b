use crate::domain::models::WorkingHours;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const DEFAULT_CALENDAR_ID: &str = "primary";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_MEETING_MINUTES: u32 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/oauth2/callback";
const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub time_zone: Tz,
    pub calendar_id: String,
    pub gemini_model: String,
    pub working_hours: WorkingHours,
    pub meeting_duration_minutes: u32,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            working_hours: WorkingHours::default(),
            meeting_duration_minutes: DEFAULT_MEETING_MINUTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AppConfigFile {
    timezone: Option<String>,
    calendar_id: Option<String>,
    gemini_model: Option<String>,
    working_hours: Option<WorkingHours>,
    meeting_duration_minutes: Option<u32>,
    request_timeout_seconds: Option<u64>,
    log_level: Option<String>,
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Loads `app.json` from `config_dir`. A missing file means defaults.
pub fn load_dashboard_config(config_dir: &Path) -> Result<DashboardConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        return Ok(DashboardConfig::default());
    }

    let file: AppConfigFile = serde_json::from_value(read_config(&path)?)?;
    let defaults = DashboardConfig::default();

    let time_zone = match non_blank(file.timezone) {
        Some(name) => name.parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!("invalid timezone in {}: {error}", path.display()))
        })?,
        None => defaults.time_zone,
    };

    let working_hours = file.working_hours.unwrap_or(defaults.working_hours);
    working_hours
        .validate()
        .map_err(|message| InfraError::InvalidConfig(format!("{message} in {}", path.display())))?;

    let meeting_duration_minutes = file
        .meeting_duration_minutes
        .unwrap_or(defaults.meeting_duration_minutes);
    if meeting_duration_minutes == 0 {
        return Err(InfraError::InvalidConfig(format!(
            "meetingDurationMinutes must be positive in {}",
            path.display()
        )));
    }

    Ok(DashboardConfig {
        time_zone,
        calendar_id: non_blank(file.calendar_id).unwrap_or(defaults.calendar_id),
        gemini_model: non_blank(file.gemini_model).unwrap_or(defaults.gemini_model),
        working_hours,
        meeting_duration_minutes,
        request_timeout: file
            .request_timeout_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        log_level: non_blank(file.log_level).unwrap_or(defaults.log_level),
    })
}

/// Provider credentials read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub gemini_api_key: Option<String>,
    pub google: GoogleCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleCredentials {
    pub client_id: Option<String>,
    pub api_key: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl GoogleCredentials {
    /// Both the client id and the API key are needed before any calendar call.
    pub fn credentials_present(&self) -> bool {
        self.client_id.is_some() && self.api_key.is_some()
    }
}

pub fn load_credentials_from_env() -> ProviderCredentials {
    load_credentials_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_credentials_from_lookup<F>(lookup: F) -> ProviderCredentials
where
    F: Fn(&str) -> Option<String>,
{
    let redirect_uri = optional_lookup_value(
        &lookup,
        &["FOCUSDESK_GOOGLE_REDIRECT_URI", "GOOGLE_REDIRECT_URI"],
    )
    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
    let scopes = optional_lookup_value(&lookup, &["FOCUSDESK_GOOGLE_SCOPES", "GOOGLE_SCOPES"])
        .map(|raw| parse_scope_list(&raw))
        .filter(|scopes| !scopes.is_empty())
        .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(ToString::to_string).collect());

    ProviderCredentials {
        gemini_api_key: optional_lookup_value(
            &lookup,
            &["FOCUSDESK_GEMINI_API_KEY", "GEMINI_API_KEY"],
        ),
        google: GoogleCredentials {
            client_id: optional_lookup_value(
                &lookup,
                &["FOCUSDESK_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"],
            ),
            api_key: optional_lookup_value(&lookup, &["FOCUSDESK_GOOGLE_API_KEY", "GOOGLE_API_KEY"]),
            client_secret: optional_lookup_value(
                &lookup,
                &["FOCUSDESK_GOOGLE_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"],
            ),
            redirect_uri,
            scopes,
        },
    }
}

pub fn required_value(value: Option<&str>, keys: &[&str], field_name: &str) -> Result<String, InfraError> {
    value.map(ToOwned::to_owned).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {} (set one of: {})",
            field_name,
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

use crate::application::oauth::{NowProvider, OAuthConfig, OAuthManager};
use crate::domain::connection::{resolve_connection_status, ConnectionProbe, ConnectionStatus};
use crate::domain::models::{BusyInterval, CalendarEvent, EventDraft, MeetingSlot, SlotRequest};
use crate::domain::slot_finder::{busy_query_window, find_meeting_slots, local_day_start};
use crate::domain::task_store::next_id;
use crate::infrastructure::calendar_cache::CalendarCacheRepository;
use crate::infrastructure::config::GoogleCredentials;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{encode_event, format_event, GoogleCalendarEvent};
use crate::infrastructure::google_calendar_client::{GoogleCalendarClient, ListEventsRequest};
use crate::infrastructure::oauth_client::OAuthHttpClient;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

const DEFAULT_MAX_RESULTS: u32 = 50;

#[derive(Debug, Clone)]
pub struct CalendarSettings {
    pub calendar_id: String,
    pub time_zone: Tz,
    pub max_results: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: Tz::UTC,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

struct LoadedProviders<C, O, S>
where
    C: GoogleCalendarClient + ?Sized,
    O: OAuthHttpClient + ?Sized,
    S: CredentialStore,
{
    calendar_client: Arc<C>,
    oauth: OAuthManager<S, O>,
}

/// Google Calendar access for the dashboard.
///
/// Reads degrade to empty results when the provider fails; writes return
/// their error so the caller can report it.
pub struct CalendarService<C, O, S, R>
where
    C: GoogleCalendarClient + ?Sized,
    O: OAuthHttpClient + ?Sized,
    S: CredentialStore,
    R: CalendarCacheRepository,
{
    settings: CalendarSettings,
    credentials: GoogleCredentials,
    credential_store: Arc<S>,
    cache: Arc<R>,
    providers: Option<LoadedProviders<C, O, S>>,
    session_user: Mutex<Option<String>>,
    now_provider: NowProvider,
}

impl<C, O, S, R> CalendarService<C, O, S, R>
where
    C: GoogleCalendarClient + ?Sized,
    O: OAuthHttpClient + ?Sized,
    S: CredentialStore,
    R: CalendarCacheRepository,
{
    pub fn new(
        settings: CalendarSettings,
        credentials: GoogleCredentials,
        credential_store: Arc<S>,
        cache: Arc<R>,
    ) -> Self {
        Self {
            settings,
            credentials,
            credential_store,
            cache,
            providers: None,
            session_user: Mutex::new(None),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Attaches the provider clients. Returns `false` without attaching
    /// anything when the Google credentials are incomplete.
    pub fn initialize(&mut self, calendar_client: Arc<C>, oauth_client: Arc<O>) -> Result<bool, InfraError> {
        if !self.credentials.credentials_present() {
            tracing::warn!("google calendar credentials not configured");
            return Ok(false);
        }

        let oauth = OAuthManager::new(
            OAuthConfig::from_credentials(&self.credentials)?,
            Arc::clone(&self.credential_store),
            oauth_client,
        )
        .with_now_provider(Arc::clone(&self.now_provider));

        self.providers = Some(LoadedProviders {
            calendar_client,
            oauth,
        });
        tracing::info!(calendar_id = %self.settings.calendar_id, "google calendar client initialized");
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.providers.is_some()
    }

    pub fn time_zone(&self) -> Tz {
        self.settings.time_zone
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let signed_in = match self.credential_store.load_token() {
            Ok(token) => token.is_some(),
            Err(error) => {
                tracing::error!(error = %error, "failed reading stored token");
                false
            }
        };

        resolve_connection_status(&ConnectionProbe {
            credentials_present: self.credentials.credentials_present(),
            client_loaded: self.providers.is_some(),
            signed_in,
            user_name: self.session_user().unwrap_or_default(),
        })
    }

    pub fn authorization_url(&self) -> Result<String, InfraError> {
        self.loaded()?.oauth.authorization_url(&next_id("state"))
    }

    /// Completes the OAuth code flow and records the signed-in user's name.
    pub async fn sign_in(&self, authorization_code: &str) -> Result<ConnectionStatus, InfraError> {
        let session = self.loaded()?.oauth.sign_in(authorization_code).await?;
        self.set_session_user(session.user_name)?;
        tracing::info!("signed in to google calendar");
        Ok(self.connection_status())
    }

    pub fn sign_out(&self) -> Result<(), InfraError> {
        self.credential_store.delete_token()?;
        self.set_session_user(None)?;
        self.cache.clear()?;
        tracing::info!("signed out of google calendar");
        Ok(())
    }

    /// Events in `[time_min, time_max)`. Provider failures yield an empty list.
    pub async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Vec<CalendarEvent> {
        match self.fetch_events(time_min, time_max).await {
            Ok(events) => {
                if let Err(error) = self.cache.replace_all(&events) {
                    tracing::error!(error = %error, "failed caching calendar events");
                }
                events
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to fetch calendar events");
                Vec::new()
            }
        }
    }

    pub async fn todays_events(&self) -> Vec<CalendarEvent> {
        let (time_min, time_max) = day_window(self.today(), self.settings.time_zone);
        self.list_events(time_min, time_max).await
    }

    pub async fn week_events(&self) -> Vec<CalendarEvent> {
        let (time_min, time_max) = week_window(self.today(), self.settings.time_zone);
        self.list_events(time_min, time_max).await
    }

    /// Snapshot of the most recent fetch, patched by later writes.
    pub fn cached_events(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        self.cache.list_all()
    }

    pub async fn create_event(&self, draft: &EventDraft) -> Result<CalendarEvent, InfraError> {
        draft.validate().map_err(InfraError::InvalidConfig)?;
        let (calendar_client, access_token) = self.authorized().await?;

        let body = encode_event(draft, self.settings.time_zone, true);
        let created = calendar_client
            .insert_event(&access_token, &self.settings.calendar_id, &body)
            .await?;
        let event = format_event(&created, self.settings.time_zone)?;
        self.cache.upsert(&event)?;
        tracing::info!(event_id = %event.id, "calendar event created");
        Ok(event)
    }

    pub async fn update_event(&self, event_id: &str, draft: &EventDraft) -> Result<CalendarEvent, InfraError> {
        draft.validate().map_err(InfraError::InvalidConfig)?;
        let (calendar_client, access_token) = self.authorized().await?;

        let body = encode_event(draft, self.settings.time_zone, false);
        let updated = calendar_client
            .update_event(&access_token, &self.settings.calendar_id, event_id, &body)
            .await?;
        let event = format_event(&updated, self.settings.time_zone)?;
        self.cache.upsert(&event)?;
        tracing::info!(event_id = %event.id, "calendar event updated");
        Ok(event)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<(), InfraError> {
        let (calendar_client, access_token) = self.authorized().await?;
        calendar_client
            .delete_event(&access_token, &self.settings.calendar_id, event_id)
            .await?;
        self.cache.remove(event_id)?;
        tracing::info!(event_id = %event_id, "calendar event deleted");
        Ok(())
    }

    pub async fn free_busy(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, InfraError> {
        let (calendar_client, access_token) = self.authorized().await?;
        calendar_client
            .query_free_busy(
                &access_token,
                time_min,
                time_max,
                std::slice::from_ref(&self.settings.calendar_id),
            )
            .await
    }

    /// Up to five free slots over the next week. A failed free/busy query
    /// yields no suggestions.
    pub async fn find_meeting_slots(&self, request: SlotRequest) -> Vec<MeetingSlot> {
        let today = self.today();
        let (time_min, time_max) = busy_query_window(today, self.settings.time_zone);
        let busy = match self.free_busy(time_min, time_max).await {
            Ok(busy) => busy,
            Err(error) => {
                tracing::error!(error = %error, "failed to get free/busy information");
                return Vec::new();
            }
        };
        find_meeting_slots(today, self.settings.time_zone, &busy, request)
    }

    async fn fetch_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, InfraError> {
        let (calendar_client, access_token) = self.authorized().await?;
        let raw_events = calendar_client
            .list_events(
                &access_token,
                &self.settings.calendar_id,
                ListEventsRequest {
                    time_min,
                    time_max,
                    max_results: self.settings.max_results,
                },
            )
            .await?;
        Ok(self.format_all(&raw_events))
    }

    fn format_all(&self, raw_events: &[GoogleCalendarEvent]) -> Vec<CalendarEvent> {
        raw_events
            .iter()
            .filter_map(|raw| match format_event(raw, self.settings.time_zone) {
                Ok(event) => Some(event),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping malformed calendar event");
                    None
                }
            })
            .collect()
    }

    async fn authorized(&self) -> Result<(Arc<C>, String), InfraError> {
        let providers = self.loaded()?;
        let access_token = providers.oauth.access_token().await?;
        Ok((Arc::clone(&providers.calendar_client), access_token))
    }

    fn loaded(&self) -> Result<&LoadedProviders<C, O, S>, InfraError> {
        if !self.credentials.credentials_present() {
            return Err(InfraError::InvalidConfig(
                "google calendar credentials not configured".to_string(),
            ));
        }
        self.providers
            .as_ref()
            .ok_or_else(|| InfraError::Provider("google calendar client not initialized".to_string()))
    }

    fn today(&self) -> NaiveDate {
        (self.now_provider)()
            .with_timezone(&self.settings.time_zone)
            .date_naive()
    }

    fn session_user(&self) -> Result<Option<String>, InfraError> {
        self.session_user
            .lock()
            .map(|guard| guard.clone())
            .map_err(|error| InfraError::Credential(format!("session lock poisoned: {error}")))
    }

    fn set_session_user(&self, user: Option<String>) -> Result<(), InfraError> {
        let mut guard = self
            .session_user
            .lock()
            .map_err(|error| InfraError::Credential(format!("session lock poisoned: {error}")))?;
        *guard = user;
        Ok(())
    }
}

pub fn day_window(today: NaiveDate, time_zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_day_start(today, time_zone),
        local_day_start(today + Duration::days(1), time_zone),
    )
}

/// Sunday-based calendar week containing `today`.
pub fn week_window(today: NaiveDate, time_zone: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    (
        local_day_start(week_start, time_zone),
        local_day_start(week_start + Duration::days(7), time_zone),
    )
}

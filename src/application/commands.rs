use crate::application::calendar_service::{CalendarService, CalendarSettings};
use crate::application::coach::CoachService;
use crate::domain::connection::ConnectionStatus;
use crate::domain::models::{
    CalendarEvent, ChatMessage, EventDraft, MeetingSlot, SlotRequest, Task, TaskAnalytics,
    TaskDraft, TaskFilter, TaskPatch,
};
use crate::domain::response_selector::{
    task_added_message, task_updated_message, GREETING_MESSAGE, TASK_ARCHIVED_MESSAGE,
    TASK_COMPLETED_MESSAGE,
};
use crate::domain::task_store::TaskStore;
use crate::infrastructure::calendar_cache::InMemoryCalendarCacheRepository;
use crate::infrastructure::config::{DashboardConfig, ProviderCredentials};
use crate::infrastructure::credential_store::InMemoryCredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::gemini_client::{LanguageModelClient, ReqwestGeminiClient};
use crate::infrastructure::google_calendar_client::{
    GoogleCalendarClient, ReqwestGoogleCalendarClient,
};
use crate::infrastructure::oauth_client::{OAuthHttpClient, ReqwestOAuthClient};
use std::sync::{Arc, Mutex, MutexGuard};

pub type DashboardCalendar = CalendarService<
    dyn GoogleCalendarClient,
    dyn OAuthHttpClient,
    InMemoryCredentialStore,
    InMemoryCalendarCacheRepository,
>;

/// Owns everything a session mutates. Command functions take `&AppState`;
/// the runtime lock is never held across an await.
pub struct AppState {
    config: DashboardConfig,
    coach: CoachService,
    calendar: DashboardCalendar,
    runtime: Mutex<RuntimeState>,
}

#[derive(Debug)]
struct RuntimeState {
    tasks: TaskStore,
    chat: Vec<ChatMessage>,
}

impl AppState {
    /// Wires the live provider clients for whichever credentials are present.
    pub fn new(
        config: DashboardConfig,
        credentials: ProviderCredentials,
        tasks: TaskStore,
    ) -> Result<Self, InfraError> {
        let coach = match credentials.gemini_api_key.as_deref() {
            Some(api_key) => {
                let model: Arc<dyn LanguageModelClient> = Arc::new(ReqwestGeminiClient::new(
                    api_key,
                    config.gemini_model.as_str(),
                    config.request_timeout,
                )?);
                CoachService::new(Some(model))
            }
            None => {
                tracing::info!("no gemini api key; coach replies come from templates");
                CoachService::default()
            }
        };

        let mut calendar: DashboardCalendar = CalendarService::new(
            CalendarSettings {
                calendar_id: config.calendar_id.clone(),
                time_zone: config.time_zone,
                ..CalendarSettings::default()
            },
            credentials.google.clone(),
            Arc::new(InMemoryCredentialStore::default()),
            Arc::new(InMemoryCalendarCacheRepository::default()),
        );
        if let Some(api_key) = credentials.google.api_key.as_deref() {
            let calendar_client = ReqwestGoogleCalendarClient::new(api_key, config.request_timeout);
            let oauth_client = ReqwestOAuthClient::new(config.request_timeout);
            match (calendar_client, oauth_client) {
                (Ok(calendar_client), Ok(oauth_client)) => {
                    calendar.initialize(Arc::new(calendar_client), Arc::new(oauth_client))?;
                }
                (Err(error), _) | (_, Err(error)) => {
                    tracing::error!(error = %error, "failed to initialize google calendar clients");
                }
            }
        }

        Ok(Self::from_parts(config, coach, calendar, tasks))
    }

    pub fn from_parts(
        config: DashboardConfig,
        coach: CoachService,
        calendar: DashboardCalendar,
        tasks: TaskStore,
    ) -> Self {
        Self {
            config,
            coach,
            calendar,
            runtime: Mutex::new(RuntimeState {
                tasks,
                chat: vec![ChatMessage::coach(GREETING_MESSAGE)],
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn coach_is_live(&self) -> bool {
        self.coach.is_live()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn push_coach_message(state: &AppState, text: impl Into<String>) -> Result<ChatMessage, InfraError> {
    let message = ChatMessage::coach(text);
    lock_runtime(state)?.chat.push(message.clone());
    Ok(message)
}

/// Adds a task and acknowledges it in the chat. A blank title adds nothing.
pub fn add_task_impl(state: &AppState, draft: TaskDraft) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime.tasks.add(draft) else {
        return Ok(None);
    };
    runtime.chat.push(ChatMessage::coach(task_added_message(&task)));
    state.log_info("add_task", &format!("task_id={}", task.id));
    Ok(Some(task))
}

pub fn update_task_impl(
    state: &AppState,
    task_id: &str,
    patch: TaskPatch,
) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime.tasks.update(task_id, patch) else {
        return Ok(None);
    };
    runtime.chat.push(ChatMessage::coach(task_updated_message(&task)));
    state.log_info("update_task", &format!("task_id={task_id}"));
    Ok(Some(task))
}

pub fn complete_task_impl(state: &AppState, task_id: &str) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime.tasks.complete(task_id) else {
        return Ok(None);
    };
    runtime.chat.push(ChatMessage::coach(TASK_COMPLETED_MESSAGE));
    state.log_info("complete_task", &format!("task_id={task_id}"));
    Ok(Some(task))
}

pub fn archive_task_impl(state: &AppState, task_id: &str) -> Result<Option<Task>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(task) = runtime.tasks.archive(task_id) else {
        return Ok(None);
    };
    runtime.chat.push(ChatMessage::coach(TASK_ARCHIVED_MESSAGE));
    state.log_info("archive_task", &format!("task_id={task_id}"));
    Ok(Some(task))
}

pub fn delete_task_impl(state: &AppState, task_id: &str) -> Result<bool, InfraError> {
    let deleted = lock_runtime(state)?.tasks.remove(task_id);
    if deleted {
        state.log_info("delete_task", &format!("task_id={task_id}"));
    }
    Ok(deleted)
}

pub fn list_tasks_impl(state: &AppState, filter: &TaskFilter) -> Result<Vec<Task>, InfraError> {
    Ok(lock_runtime(state)?.tasks.filter(filter))
}

pub fn get_task_impl(state: &AppState, task_id: &str) -> Result<Option<Task>, InfraError> {
    Ok(lock_runtime(state)?.tasks.get(task_id).cloned())
}

pub fn task_analytics_impl(state: &AppState) -> Result<TaskAnalytics, InfraError> {
    Ok(lock_runtime(state)?.tasks.analytics())
}

pub fn chat_history_impl(state: &AppState) -> Result<Vec<ChatMessage>, InfraError> {
    Ok(lock_runtime(state)?.chat.clone())
}

/// Records the user's message and the coach's reply. Blank input is ignored.
pub async fn send_coaching_message_impl(
    state: &AppState,
    message: &str,
) -> Result<Option<ChatMessage>, InfraError> {
    let message = message.trim();
    if message.is_empty() {
        return Ok(None);
    }

    let tasks = {
        let mut runtime = lock_runtime(state)?;
        runtime.chat.push(ChatMessage::user(message));
        runtime.tasks.active()
    };

    let reply = state.coach.reply(message, &tasks).await;
    push_coach_message(state, reply).map(Some)
}

pub async fn prioritize_tasks_impl(state: &AppState) -> Result<ChatMessage, InfraError> {
    let tasks = lock_runtime(state)?.tasks.active();
    let plan = state.coach.prioritize_tasks(&tasks).await;
    push_coach_message(state, plan)
}

/// Time-blocking plan over the active tasks and the last fetched events.
pub async fn suggest_time_blocking_impl(state: &AppState) -> Result<ChatMessage, InfraError> {
    let tasks = lock_runtime(state)?.tasks.active();
    let events = state.calendar.cached_events()?;
    let plan = state.coach.suggest_time_blocking(&tasks, &events).await;
    push_coach_message(state, plan)
}

pub async fn breakdown_task_impl(
    state: &AppState,
    task_id: &str,
) -> Result<Option<ChatMessage>, InfraError> {
    let Some(task) = get_task_impl(state, task_id)? else {
        return Ok(None);
    };
    let plan = state.coach.breakdown_task(&task.title, &task.description).await;
    push_coach_message(state, plan).map(Some)
}

pub async fn suggest_meeting_time_impl(
    state: &AppState,
    purpose: &str,
    duration_minutes: u32,
    attendees: &[String],
) -> Result<ChatMessage, InfraError> {
    let plan = state
        .coach
        .suggest_meeting_time(purpose, duration_minutes, attendees)
        .await;
    push_coach_message(state, plan)
}

pub fn connection_status_impl(state: &AppState) -> ConnectionStatus {
    state.calendar.connection_status()
}

pub fn authorization_url_impl(state: &AppState) -> Result<String, InfraError> {
    state.calendar.authorization_url()
}

pub async fn sign_in_impl(state: &AppState, authorization_code: &str) -> Result<ConnectionStatus, InfraError> {
    state.calendar.sign_in(authorization_code).await
}

pub fn sign_out_impl(state: &AppState) -> Result<(), InfraError> {
    state.calendar.sign_out()
}

pub async fn todays_events_impl(state: &AppState) -> Vec<CalendarEvent> {
    state.calendar.todays_events().await
}

pub async fn week_events_impl(state: &AppState) -> Vec<CalendarEvent> {
    state.calendar.week_events().await
}

pub async fn create_event_impl(state: &AppState, draft: &EventDraft) -> Result<CalendarEvent, InfraError> {
    state.calendar.create_event(draft).await
}

pub async fn update_event_impl(
    state: &AppState,
    event_id: &str,
    draft: &EventDraft,
) -> Result<CalendarEvent, InfraError> {
    state.calendar.update_event(event_id, draft).await
}

pub async fn delete_event_impl(state: &AppState, event_id: &str) -> Result<(), InfraError> {
    state.calendar.delete_event(event_id).await
}

/// Meeting slots for `request`, or for the configured defaults.
pub async fn find_meeting_slots_impl(
    state: &AppState,
    request: Option<SlotRequest>,
) -> Result<Vec<MeetingSlot>, InfraError> {
    let request = request.unwrap_or(SlotRequest {
        duration_minutes: state.config.meeting_duration_minutes,
        working_hours: state.config.working_hours,
    });
    if request.duration_minutes == 0 {
        return Err(InfraError::InvalidConfig(
            "meeting duration must be positive".to_string(),
        ));
    }
    request
        .working_hours
        .validate()
        .map_err(InfraError::InvalidConfig)?;
    Ok(state.calendar.find_meeting_slots(request).await)
}

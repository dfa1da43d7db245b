use crate::application::commands::{
    add_task_impl, archive_task_impl, authorization_url_impl, breakdown_task_impl,
    chat_history_impl, complete_task_impl, connection_status_impl, create_event_impl,
    delete_event_impl, delete_task_impl, find_meeting_slots_impl, list_tasks_impl,
    prioritize_tasks_impl, send_coaching_message_impl, sign_in_impl, sign_out_impl,
    suggest_meeting_time_impl, suggest_time_blocking_impl, task_analytics_impl,
    todays_events_impl, update_event_impl, update_task_impl, week_events_impl, AppState,
};
use crate::domain::connection::ConnectionStatus;
use crate::domain::models::{
    CalendarEvent, ChatMessage, ChatRole, EventDraft, EventTiming, MeetingSlot, Priority,
    SlotRequest, Task, TaskDraft, TaskFilter, TaskPatch, TaskStatus, WorkingHours,
};
use crate::infrastructure::error::InfraError;
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{CustomType, InquireError, Select, Text};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "focusdesk", about = "Tasks, a productivity coach and Google Calendar in one place")]
pub struct Cli {
    /// Directory holding app.json
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show calendar connection and coach mode
    Status,
    /// Ask the coach one question
    Coach { message: Vec<String> },
    /// Print the Google sign-in URL
    AuthUrl,
    /// List calendar events
    Events {
        #[arg(long, value_enum, default_value_t = EventRange::Today)]
        range: EventRange,
        /// Authorization code from the sign-in redirect
        #[arg(long)]
        auth_code: Option<String>,
    },
    /// Suggest free meeting slots over the next week
    Slots {
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        start: Option<u32>,
        #[arg(long)]
        end: Option<u32>,
        #[arg(long)]
        auth_code: Option<String>,
    },
    /// Interactive session
    Shell {
        /// Start with the sample task list
        #[arg(long)]
        demo: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventRange {
    Today,
    Week,
}

pub async fn execute(state: &AppState, command: Commands) -> Result<(), InfraError> {
    match command {
        Commands::Status => {
            print_status(&connection_status_impl(state), state.coach_is_live());
        }
        Commands::Coach { message } => {
            let message = message.join(" ");
            match send_coaching_message_impl(state, &message).await? {
                Some(reply) => println!("{}", reply.text),
                None => println!("Nothing to ask."),
            }
        }
        Commands::AuthUrl => println!("{}", authorization_url_impl(state)?),
        Commands::Events { range, auth_code } => {
            sign_in_if_given(state, auth_code.as_deref()).await?;
            print_events(&load_events(state, range).await);
        }
        Commands::Slots {
            duration,
            start,
            end,
            auth_code,
        } => {
            sign_in_if_given(state, auth_code.as_deref()).await?;
            let request = slot_request(state, duration, start, end);
            print_slots(&find_meeting_slots_impl(state, Some(request)).await?);
        }
        Commands::Shell { .. } => run_shell(state).await,
    }
    Ok(())
}

async fn sign_in_if_given(state: &AppState, auth_code: Option<&str>) -> Result<(), InfraError> {
    if let Some(code) = auth_code {
        let status = sign_in_impl(state, code).await?;
        print_status(&status, state.coach_is_live());
    }
    Ok(())
}

async fn load_events(state: &AppState, range: EventRange) -> Vec<CalendarEvent> {
    match range {
        EventRange::Today => todays_events_impl(state).await,
        EventRange::Week => week_events_impl(state).await,
    }
}

fn slot_request(state: &AppState, duration: Option<u32>, start: Option<u32>, end: Option<u32>) -> SlotRequest {
    let config = state.config();
    SlotRequest {
        duration_minutes: duration.unwrap_or(config.meeting_duration_minutes),
        working_hours: WorkingHours {
            start: start.unwrap_or(config.working_hours.start),
            end: end.unwrap_or(config.working_hours.end),
        },
    }
}

const SHELL_HELP: &str = "Commands:
  tasks [active|completed|archived] [search]   list tasks
  add                                          add a task
  edit <n> | done <n> | archive <n> | delete <n>
  stats                                        task analytics
  ask <question> (or any other text)           talk to the coach
  history                                      chat history
  prioritize | timeblock | breakdown <n> | meeting
  status | signin <code> | signout | auth-url
  events [today|week] | event | event-edit <id> | event-delete <id>
  slots [minutes]
  help | quit";

/// Reads commands until `quit` or Ctrl-C. Errors are reported and the
/// session continues.
pub async fn run_shell(state: &AppState) {
    if let Ok(history) = chat_history_impl(state) {
        history.iter().for_each(print_chat_message);
    }
    println!("Type `help` for commands.");

    loop {
        let line = match Text::new("focusdesk>").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(error) => {
                eprintln!("input error: {error}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        if let Err(error) = dispatch(state, command, rest.trim()).await {
            eprintln!("{}", state.command_error(command, &error));
        }
    }
}

async fn dispatch(state: &AppState, command: &str, args: &str) -> Result<(), InfraError> {
    match command {
        "help" => println!("{SHELL_HELP}"),
        "tasks" => print_tasks(&list_tasks_impl(state, &parse_filter(args))?),
        "add" => {
            let Some(draft) = prompt_task_draft() else {
                return Ok(());
            };
            match add_task_impl(state, draft)? {
                Some(_) => print_last_coach_message(state)?,
                None => println!("A task needs a title."),
            }
        }
        "edit" => {
            let task = task_at(state, args)?;
            let Some(patch) = prompt_task_patch(&task) else {
                return Ok(());
            };
            if update_task_impl(state, &task.id, patch)?.is_some() {
                print_last_coach_message(state)?;
            }
        }
        "done" => {
            let task = task_at(state, args)?;
            if complete_task_impl(state, &task.id)?.is_some() {
                print_last_coach_message(state)?;
            }
        }
        "archive" => {
            let task = task_at(state, args)?;
            if archive_task_impl(state, &task.id)?.is_some() {
                print_last_coach_message(state)?;
            }
        }
        "delete" => {
            let task = task_at(state, args)?;
            if delete_task_impl(state, &task.id)? {
                println!("Deleted \"{}\".", task.title);
            }
        }
        "stats" => {
            let analytics = task_analytics_impl(state)?;
            println!(
                "{} tasks: {} active, {} completed, {} archived ({}% complete)",
                analytics.total,
                analytics.active,
                analytics.completed,
                analytics.archived,
                analytics.completion_rate
            );
            println!(
                "{} critical active, {:.1}h of active work estimated",
                analytics.critical_active, analytics.active_estimated_hours
            );
            for (priority, count) in analytics.active_by_priority {
                println!("  {:<12}{count}", priority.as_str());
            }
        }
        "history" => chat_history_impl(state)?.iter().for_each(print_chat_message),
        "prioritize" => print_chat_message(&prioritize_tasks_impl(state).await?),
        "timeblock" => print_chat_message(&suggest_time_blocking_impl(state).await?),
        "breakdown" => {
            let task = task_at(state, args)?;
            if let Some(message) = breakdown_task_impl(state, &task.id).await? {
                print_chat_message(&message);
            }
        }
        "meeting" => {
            let Some(purpose) = ask("Meeting purpose") else {
                return Ok(());
            };
            let duration = ask_minutes("Duration (minutes)", state.config().meeting_duration_minutes);
            let attendees = ask("Attendees (comma separated)")
                .map(|raw| split_list(&raw))
                .unwrap_or_default();
            print_chat_message(&suggest_meeting_time_impl(state, &purpose, duration, &attendees).await?);
        }
        "status" => print_status(&connection_status_impl(state), state.coach_is_live()),
        "auth-url" => println!("{}", authorization_url_impl(state)?),
        "signin" => print_status(&sign_in_impl(state, args).await?, state.coach_is_live()),
        "signout" => {
            sign_out_impl(state)?;
            println!("Signed out.");
        }
        "events" => {
            let range = if args == "week" {
                EventRange::Week
            } else {
                EventRange::Today
            };
            print_events(&load_events(state, range).await);
        }
        "event" => {
            let Some(draft) = prompt_event_draft(state) else {
                return Ok(());
            };
            let event = create_event_impl(state, &draft).await?;
            println!("Created event {}.", event.id);
        }
        "event-edit" => {
            let Some(draft) = prompt_event_draft(state) else {
                return Ok(());
            };
            let event = update_event_impl(state, args, &draft).await?;
            println!("Updated event {}.", event.id);
        }
        "event-delete" => {
            delete_event_impl(state, args).await?;
            println!("Deleted event {args}.");
        }
        "slots" => {
            let duration = args.parse().ok();
            let request = slot_request(state, duration, None, None);
            print_slots(&find_meeting_slots_impl(state, Some(request)).await?);
        }
        "ask" => coach(state, args).await?,
        _ => coach(state, &format!("{command} {args}")).await?,
    }
    Ok(())
}

async fn coach(state: &AppState, message: &str) -> Result<(), InfraError> {
    println!("Thinking...");
    if let Some(reply) = send_coaching_message_impl(state, message).await? {
        print_chat_message(&reply);
    }
    Ok(())
}

fn parse_filter(args: &str) -> TaskFilter {
    let mut filter = TaskFilter::default();
    let mut search = Vec::new();
    for word in args.split_whitespace() {
        if let Ok(status) = TaskStatus::parse(word) {
            filter.status = Some(status);
        } else if let Ok(priority) = Priority::parse(word) {
            filter.priority = Some(priority);
        } else {
            search.push(word);
        }
    }
    filter.search = search.join(" ");
    filter
}

/// Resolves a 1-based position in the full task list, or a task id.
fn task_at(state: &AppState, reference: &str) -> Result<Task, InfraError> {
    let tasks = list_tasks_impl(state, &TaskFilter::default())?;
    let found = match reference.parse::<usize>() {
        Ok(position) => position.checked_sub(1).and_then(|index| tasks.get(index)),
        Err(_) => tasks.iter().find(|task| task.id == reference),
    };
    found
        .cloned()
        .ok_or_else(|| InfraError::NotFound(format!("task '{reference}'")))
}

fn ask(message: &str) -> Option<String> {
    Text::new(message)
        .prompt()
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn ask_minutes(message: &str, default: u32) -> u32 {
    CustomType::<u32>::new(message)
        .with_default(default)
        .prompt()
        .unwrap_or(default)
}

fn ask_priority(current: Priority) -> Option<Priority> {
    let options: Vec<&str> = Priority::ALL.iter().map(|priority| priority.as_str()).collect();
    let starting = Priority::ALL
        .iter()
        .position(|priority| *priority == current)
        .unwrap_or_default();
    Select::new("Priority", options)
        .with_starting_cursor(starting)
        .prompt()
        .ok()
        .and_then(|value| Priority::parse(value).ok())
}

fn prompt_task_draft() -> Option<TaskDraft> {
    let title = ask("Title")?;
    let mut draft = TaskDraft::new(title);
    if let Some(description) = ask("Description") {
        draft = draft.with_description(description);
    }
    if let Some(deadline) = ask("Deadline") {
        draft = draft.with_deadline(deadline);
    }
    let hours = CustomType::<f64>::new("Estimated hours")
        .with_default(draft.estimated_hours)
        .prompt()
        .unwrap_or(draft.estimated_hours);
    let priority = ask_priority(draft.priority).unwrap_or(draft.priority);
    Some(draft.with_estimated_hours(hours).with_priority(priority))
}

fn prompt_task_patch(task: &Task) -> Option<TaskPatch> {
    let edit = |label: &str, current: &str| {
        Text::new(label)
            .with_initial_value(current)
            .prompt()
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| value != current)
    };

    let title = Text::new("Title").with_initial_value(&task.title).prompt().ok()?;
    let description = edit("Description", &task.description);
    let deadline = edit("Deadline", &task.deadline);
    let estimated_hours = CustomType::<f64>::new("Estimated hours")
        .with_default(task.estimated_hours)
        .prompt()
        .ok()
        .filter(|hours| (*hours - task.estimated_hours).abs() > f64::EPSILON);
    let priority = ask_priority(task.priority).filter(|priority| *priority != task.priority);

    Some(TaskPatch {
        title: Some(title),
        description,
        deadline,
        estimated_hours,
        priority,
    })
}

fn prompt_event_draft(state: &AppState) -> Option<EventDraft> {
    let time_zone = state.config().time_zone;
    let title = ask("Event title")?;
    let description = ask("Description").unwrap_or_default();
    let raw_start = ask("Start (YYYY-MM-DD HH:MM, local time)")?;
    let Ok(naive) = NaiveDateTime::parse_from_str(&raw_start, "%Y-%m-%d %H:%M") else {
        eprintln!("could not read start time '{raw_start}'");
        return None;
    };
    let Some(start) = time_zone.from_local_datetime(&naive).earliest() else {
        eprintln!("{raw_start} does not exist in {}", time_zone.name());
        return None;
    };
    let start = start.with_timezone(&Utc);
    let minutes = ask_minutes("Duration (minutes)", state.config().meeting_duration_minutes);
    let attendees = ask("Attendees (comma separated)")
        .map(|raw| split_list(&raw))
        .unwrap_or_default();

    Some(EventDraft {
        title,
        description,
        start,
        end: start + Duration::minutes(i64::from(minutes)),
        attendees,
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn print_last_coach_message(state: &AppState) -> Result<(), InfraError> {
    if let Some(message) = chat_history_impl(state)?.last() {
        print_chat_message(message);
    }
    Ok(())
}

fn print_chat_message(message: &ChatMessage) {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Coach => "coach",
    };
    println!("[{}] {speaker}: {}\n", message.timestamp.format("%H:%M"), message.text);
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for (index, task) in tasks.iter().enumerate() {
        let deadline = if task.deadline.is_empty() {
            String::new()
        } else {
            format!(", due {}", task.deadline)
        };
        println!(
            "{:>3}. [{}] {} ({}, {}h{deadline})",
            index + 1,
            task.status.as_str(),
            task.title,
            task.priority.as_str(),
            task.estimated_hours
        );
    }
}

fn print_status(status: &ConnectionStatus, coach_live: bool) {
    match &status.user {
        Some(user) => println!("Calendar: {} ({user}) - {}", status.status, status.message),
        None => println!("Calendar: {} - {}", status.status, status.message),
    }
    let mode = if coach_live { "live" } else { "offline templates" };
    println!("Coach: {mode}");
}

fn print_events(events: &[CalendarEvent]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    for event in events {
        let when = match &event.timing {
            EventTiming::AllDay { start_date, .. } => format!("{start_date} all day"),
            EventTiming::Timed { .. } => format!("{} - {}", event.start_time, event.end_time),
        };
        let location = if event.location.is_empty() {
            String::new()
        } else {
            format!(" @ {}", event.location)
        };
        println!("{when}  {}{location}  [{}]", event.title, event.id);
    }
}

fn print_slots(slots: &[MeetingSlot]) {
    if slots.is_empty() {
        println!("No free slots found.");
        return;
    }
    for slot in slots {
        println!("{} {}  ({})", slot.day, slot.time, slot.start.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_words_pick_status_priority_and_search() {
        let filter = parse_filter("active critical launch plan");
        assert_eq!(filter.status, Some(TaskStatus::Active));
        assert_eq!(filter.priority, Some(Priority::Critical));
        assert_eq!(filter.search, "launch plan");
    }

    #[test]
    fn attendee_lists_drop_blanks() {
        assert_eq!(split_list("a@x.com, ,b@x.com"), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn cli_parses_slot_flags() {
        let cli = Cli::parse_from(["focusdesk", "slots", "--duration", "30", "--start", "10"]);
        match cli.command {
            Commands::Slots { duration, start, end, .. } => {
                assert_eq!(duration, Some(30));
                assert_eq!(start, Some(10));
                assert_eq!(end, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn cli_parses_event_range() {
        let cli = Cli::parse_from(["focusdesk", "events", "--range", "week"]);
        assert!(matches!(
            cli.command,
            Commands::Events { range: EventRange::Week, auth_code: None }
        ));
    }
}

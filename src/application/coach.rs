use crate::domain::models::{CalendarEvent, EventTiming, Task};
use crate::domain::response_selector::{
    meeting_plan, prioritization_plan, select_response_for_tasks, task_breakdown_plan,
    time_blocking_plan, COACH_FALLBACK_MESSAGE,
};
use crate::infrastructure::gemini_client::LanguageModelClient;
use std::sync::Arc;

const COACH_CONTEXT: &str = "You are a productivity coach for a busy marketing director.

Your role is to:
- Help prioritize tasks based on deadlines and business impact
- Suggest time-blocking and scheduling
- Break down complex projects into manageable steps
- Help with meeting scheduling and workday planning

Always be concise, actionable, and specific to the user's current projects.";

/// Builds the chat prompt: coach context, the active tasks, then the question.
pub fn compose_prompt(tasks: &[Task], message: &str) -> String {
    let active: Vec<String> = tasks
        .iter()
        .filter(|task| task.is_active())
        .map(|task| {
            format!(
                "{} ({}, Due: {})",
                task.title,
                task.priority.as_str(),
                task.deadline
            )
        })
        .collect();

    let task_context = if active.is_empty() {
        String::new()
    } else {
        format!("\n\nCurrent tasks: {}", active.join(", "))
    };

    format!(
        "{COACH_CONTEXT}{task_context}\n\nUser question: {}\n\nProvide a helpful, specific response:",
        message.trim()
    )
}

fn task_lines(tasks: &[Task]) -> String {
    tasks
        .iter()
        .filter(|task| task.is_active())
        .map(|task| {
            format!(
                "{} (Priority: {}, Due: {}, Estimated: {}h)",
                task.title,
                task.priority.as_str(),
                task.deadline,
                task.estimated_hours
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn event_lines(events: &[CalendarEvent]) -> String {
    events
        .iter()
        .map(|event| match &event.timing {
            EventTiming::Timed { .. } => {
                format!("{} ({} - {})", event.title, event.start_time, event.end_time)
            }
            EventTiming::AllDay { .. } => format!("{} (all day)", event.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Coaching replies, live from the language model when one is configured and
/// from fixed templates otherwise.
#[derive(Clone, Default)]
pub struct CoachService {
    model: Option<Arc<dyn LanguageModelClient>>,
}

impl CoachService {
    pub fn new(model: Option<Arc<dyn LanguageModelClient>>) -> Self {
        Self { model }
    }

    pub fn is_live(&self) -> bool {
        self.model.is_some()
    }

    /// Never fails. A model error becomes [`COACH_FALLBACK_MESSAGE`].
    pub async fn reply(&self, message: &str, tasks: &[Task]) -> String {
        let Some(model) = &self.model else {
            return select_response_for_tasks(message, tasks);
        };

        match model.generate(&compose_prompt(tasks, message)).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(error = %error, "language model call failed; using fallback reply");
                COACH_FALLBACK_MESSAGE.to_string()
            }
        }
    }

    pub async fn prioritize_tasks(&self, tasks: &[Task]) -> String {
        let prompt = format!(
            "{COACH_CONTEXT}\n\nCurrent tasks:\n{}\n\nBased on the deadlines and business impact, \
suggest the order to work on these tasks today. Provide a numbered list with brief reasoning for each.",
            task_lines(tasks)
        );
        self.generate_or("prioritize_tasks", prompt, || prioritization_plan(tasks))
            .await
    }

    pub async fn suggest_time_blocking(&self, tasks: &[Task], events: &[CalendarEvent]) -> String {
        let prompt = format!(
            "{COACH_CONTEXT}\n\nTasks to schedule:\n{}\n\nExisting calendar events:\n{}\n\n\
Suggest a time-blocking schedule for today, considering energy levels, meeting times, and task \
complexity. Provide specific time slots.",
            task_lines(tasks),
            event_lines(events)
        );
        self.generate_or("suggest_time_blocking", prompt, || time_blocking_plan(tasks, events))
            .await
    }

    pub async fn breakdown_task(&self, title: &str, description: &str) -> String {
        let prompt = format!(
            "{COACH_CONTEXT}\n\nTask to break down: {}\nDescription: {}\n\nBreak this task into \
3-5 specific, actionable subtasks. Make them concrete and measurable.",
            title.trim(),
            description.trim()
        );
        self.generate_or("breakdown_task", prompt, || task_breakdown_plan(title, description))
            .await
    }

    pub async fn suggest_meeting_time(
        &self,
        purpose: &str,
        duration_minutes: u32,
        attendees: &[String],
    ) -> String {
        let prompt = format!(
            "{COACH_CONTEXT}\n\nMeeting purpose: {}\nDuration: {duration_minutes} minutes\n\
Attendees: {}\n\nSuggest the best time of day for this meeting and propose agenda items.",
            purpose.trim(),
            attendees.join(", ")
        );
        self.generate_or("suggest_meeting_time", prompt, || {
            meeting_plan(purpose, duration_minutes, attendees)
        })
        .await
    }

    async fn generate_or<F>(&self, operation: &str, prompt: String, offline: F) -> String
    where
        F: FnOnce() -> String,
    {
        let Some(model) = &self.model else {
            return offline();
        };
        match model.generate(&prompt).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(operation, error = %error, "language model call failed; using offline plan");
                offline()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::models::{Priority, TaskDraft, TaskStatus};
    use crate::domain::response_selector::select_response;
    use crate::domain::task_store::TaskStore;
    use crate::infrastructure::error::InfraError;
    use crate::infrastructure::logging;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct FakeLanguageModel {
        pub(crate) reply: Mutex<Option<String>>,
        pub(crate) prompts: Mutex<Vec<String>>,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeLanguageModel {
        pub(crate) fn answering(text: &str) -> Self {
            Self {
                reply: Mutex::new(Some(text.to_string())),
                ..Self::default()
            }
        }

        pub(crate) fn failing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl LanguageModelClient for FakeLanguageModel {
        async fn generate(&self, prompt: &str) -> Result<String, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("prompts").push(prompt.to_string());
            self.reply
                .lock()
                .expect("reply")
                .clone()
                .ok_or_else(|| InfraError::Provider("http 429: quota exceeded".to_string()))
        }
    }

    fn tasks() -> Vec<Task> {
        let mut store = TaskStore::new();
        store.add(
            TaskDraft::new("Launch campaign")
                .with_priority(Priority::Critical)
                .with_deadline("Aug 1"),
        );
        let done = store
            .add(TaskDraft::new("Old report").with_priority(Priority::Urgent))
            .expect("task");
        store.set_status(&done.id, TaskStatus::Completed);
        store.list().to_vec()
    }

    #[test]
    fn prompt_lists_only_active_tasks() {
        let prompt = compose_prompt(&tasks(), "  What first? ");
        assert!(prompt.contains("Current tasks: Launch campaign (critical, Due: Aug 1)"));
        assert!(!prompt.contains("Old report"));
        assert!(prompt.ends_with("User question: What first?\n\nProvide a helpful, specific response:"));
    }

    #[test]
    fn prompt_without_tasks_has_no_task_section() {
        let prompt = compose_prompt(&[], "hello");
        assert!(!prompt.contains("Current tasks"));
    }

    #[tokio::test]
    async fn offline_reply_uses_keyword_templates() {
        let coach = CoachService::default();
        assert!(!coach.is_live());
        assert_eq!(
            coach.reply("let's schedule a sync", &[]).await,
            select_response("let's schedule a sync")
        );
        assert!(coach.reply("help me prioritize", &tasks()).await.contains("Launch campaign"));
    }

    #[tokio::test]
    async fn live_reply_returns_model_text() {
        let model = Arc::new(FakeLanguageModel::answering("Start with the launch."));
        let coach = CoachService::new(Some(model.clone()));

        assert_eq!(coach.reply("what now?", &tasks()).await, "Start with the launch.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert!(model.prompts.lock().expect("prompts")[0].contains("User question: what now?"));
    }

    #[tokio::test]
    async fn failed_model_call_yields_fixed_fallback() {
        logging::init_test();
        let coach = CoachService::new(Some(Arc::new(FakeLanguageModel::failing())));
        assert_eq!(coach.reply("prioritize please", &tasks()).await, COACH_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn auxiliary_operations_fall_back_to_offline_plans() {
        let coach = CoachService::new(Some(Arc::new(FakeLanguageModel::failing())));

        assert!(coach.prioritize_tasks(&tasks()).await.contains("Launch campaign"));
        assert!(coach
            .breakdown_task("Website refresh", "")
            .await
            .contains("Breaking down: Website refresh"));
        assert!(coach
            .suggest_time_blocking(&tasks(), &[])
            .await
            .contains("Optimized Schedule"));
        assert!(coach
            .suggest_meeting_time("Kickoff", 30, &[])
            .await
            .contains("Meeting Optimization"));
    }

    #[tokio::test]
    async fn auxiliary_prompts_carry_their_inputs() {
        let model = Arc::new(FakeLanguageModel::answering("ok"));
        let coach = CoachService::new(Some(model.clone()));

        coach
            .suggest_meeting_time("Quarterly review", 45, &["ana@example.com".to_string()])
            .await;
        coach.prioritize_tasks(&tasks()).await;

        let prompts = model.prompts.lock().expect("prompts");
        assert!(prompts[0].contains("Duration: 45 minutes"));
        assert!(prompts[0].contains("ana@example.com"));
        assert!(prompts[1].contains("Launch campaign (Priority: critical, Due: Aug 1, Estimated: 2h)"));
    }
}

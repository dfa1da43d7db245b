//! Offline coach replies.
//!
//! Free text is classified into an [`Intent`] by an ordered keyword table and
//! each intent maps to one fixed reply. The same templates back the coach when
//! no language model is configured.

use crate::domain::models::{CalendarEvent, Intent, Priority, Task};

/// Evaluated top to bottom; the first rule with a matching keyword wins.
/// "schedule" is tested before "meeting", so "schedule a meeting" is a
/// scheduling request.
const INTENT_RULES: &[(&[&str], Intent)] = &[
    (&["prioritize", "priority"], Intent::Prioritize),
    (&["schedule", "time", "calendar"], Intent::Schedule),
    (&["break", "breakdown"], Intent::Breakdown),
    (&["meeting"], Intent::Meeting),
];

pub const GREETING_MESSAGE: &str = "Hello! I'm your productivity coach. I know your current \
projects and deadlines. How can I help you plan your day?";

pub const COACH_FALLBACK_MESSAGE: &str = "I'm having trouble connecting to the AI service right \
now. In the meantime, I recommend focusing on your highest-priority active task and blocking \
out an uninterrupted hour for it before checking messages.";

const PRIORITIZE_TEMPLATE: &str = "**Task Prioritization for Today**

Based on your current projects and deadlines:

1. **August digital campaign** (Critical) - start immediately
2. **November event planning** (Urgent) - schedule a 2-hour block today
3. **Sales office customer journey** (Critical, longer runway) - begin the research phase
4. **Focus groups preparation** (Important) - can wait until next week

**Recommendation:** block 3 hours this morning for the campaign, then 2 hours this afternoon for event planning.";

const SCHEDULE_TEMPLATE: &str = "**Schedule Optimization**

Suggested time blocks for today:
- **9:00-12:00:** deep work on your most critical project
- **13:00-14:00:** meetings and collaboration
- **14:00-16:00:** focused work on urgent items
- **16:00-17:00:** email and admin

**Tip:** keep creative work in the morning while energy is highest.";

const BREAKDOWN_TEMPLATE: &str = "**Task Breakdown**

Large projects go faster in small, concrete steps:

**Digital campaign**
1. Define audience and messaging (2h)
2. Build content calendar and assets (4h)
3. Set up tracking and analytics (2h)
4. Launch and monitor (4h)

**Customer journey**
1. Research current touchpoints (3h)
2. Map pain points and opportunities (2h)
3. Design the improved flow (3h)

Tell me which project you want broken down further.";

const MEETING_TEMPLATE: &str = "**Meeting Scheduling**

Good meeting windows this week:
- **Tuesday 10:00:** strategy sessions
- **Wednesday 14:00:** client meetings
- **Thursday 11:00:** team collaboration

By meeting type:
- Creative sessions: 9:00-11:00
- Stakeholder updates: 14:00-16:00
- Planning: 10:00-12:00

What kind of meeting do you want to schedule?";

const DEFAULT_TEMPLATE: &str = "I can help you with:

- **Task prioritization** - \"Help me prioritize my tasks\"
- **Schedule optimization** - \"Optimize my workday\"
- **Project breakdown** - \"Break down the campaign\"
- **Meeting scheduling** - \"When should I hold the team meeting?\"
- **Progress tracking** - \"How am I doing on my deadlines?\"

What would you like help with today?";

pub fn classify_intent(message: &str) -> Intent {
    let lowered = message.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Default)
}

pub fn template_for(intent: Intent) -> &'static str {
    match intent {
        Intent::Prioritize => PRIORITIZE_TEMPLATE,
        Intent::Schedule => SCHEDULE_TEMPLATE,
        Intent::Breakdown => BREAKDOWN_TEMPLATE,
        Intent::Meeting => MEETING_TEMPLATE,
        Intent::Default => DEFAULT_TEMPLATE,
    }
}

pub fn select_response(message: &str) -> &'static str {
    template_for(classify_intent(message))
}

/// Like [`select_response`], but a prioritization request names the caller's
/// own critical and urgent tasks.
pub fn select_response_for_tasks(message: &str, tasks: &[Task]) -> String {
    match classify_intent(message) {
        Intent::Prioritize => prioritization_plan(tasks),
        intent => template_for(intent).to_string(),
    }
}

pub fn prioritization_plan(tasks: &[Task]) -> String {
    let mut critical = active_titles(tasks, Priority::Critical);
    let mut urgent = active_titles(tasks, Priority::Urgent);
    let first_critical = critical.next().unwrap_or("August digital campaign");
    let first_urgent = urgent.next().unwrap_or("November event planning");
    let second_critical = critical.next().unwrap_or("Sales office customer journey");

    format!(
        "**Recommended Task Order**

1. **{first_critical}** - critical deadline approaching
2. **{first_urgent}** - urgent, needs attention today
3. **{second_critical}** - critical but on a longer timeline
4. **Focus groups preparation** - important but flexible

**Focus on the top two tasks today for the biggest impact.**"
    )
}

pub fn time_blocking_plan(_tasks: &[Task], _events: &[CalendarEvent]) -> String {
    "**Optimized Schedule for Today**

**Morning (high energy):**
- 9:00-11:00: campaign development (2h)
- 11:00-11:15: break

**Late morning:**
- 11:15-12:30: event planning (1.25h)
- 12:30-13:30: lunch

**Afternoon:**
- 13:30-14:30: scheduled meetings
- 14:30-16:00: customer journey research (1.5h)
- 16:00-17:00: email and admin

**Total focused work: 4.75 hours**"
        .to_string()
}

pub fn task_breakdown_plan(title: &str, _description: &str) -> String {
    let title = title.trim();
    format!(
        "**Breaking down: {title}**

**Actionable subtasks:**
1. **Research and analysis** (2h) - gather requirements and context
2. **Strategy** (2h) - define approach and key messages
3. **Content creation** (3h) - produce materials and assets
4. **Implementation planning** (1h) - timeline and owners
5. **Review** (1h) - quality check and stakeholder feedback

**Total estimated time: 9 hours.** Spread it across 3-4 days."
    )
}

pub fn meeting_plan(_purpose: &str, _duration_minutes: u32, _attendees: &[String]) -> String {
    "**Meeting Optimization**

**Recommended time:** Tuesday or Wednesday, 10:00-11:00
**Why:** high energy and mid-week momentum suit decisions.

**Suggested agenda:**
1. **Opening** (5 min) - purpose and objectives
2. **Discussion** (40 min) - core topics and decisions
3. **Action items** (10 min) - next steps and owners
4. **Wrap-up** (5 min) - summary and follow-up

Send the agenda a day ahead."
        .to_string()
}

/// Coach acknowledgement appended after a task is added.
pub fn task_added_message(task: &Task) -> String {
    let when = if task.priority == Priority::Critical {
        "immediately"
    } else {
        "in your next planning session"
    };
    format!(
        "Added \"{}\" to your task list. I recommend picking up this {} task {when}.",
        task.title,
        task.priority.as_str()
    )
}

pub fn task_updated_message(task: &Task) -> String {
    format!("Task updated. The changes to \"{}\" have been saved.", task.title)
}

pub const TASK_ARCHIVED_MESSAGE: &str =
    "Task archived. Keeping the active list short keeps it useful.";

pub const TASK_COMPLETED_MESSAGE: &str =
    "Task completed. Nice progress, keep the momentum going!";

fn active_titles(tasks: &[Task], priority: Priority) -> impl Iterator<Item = &str> {
    tasks
        .iter()
        .filter(move |task| task.is_active() && task.priority == priority)
        .map(|task| task.title.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskDraft;
    use crate::domain::task_store::TaskStore;
    use proptest::prelude::*;

    #[test]
    fn classifies_prioritize_regardless_of_case() {
        assert_eq!(classify_intent("Please prioritize my day"), Intent::Prioritize);
        assert_eq!(classify_intent("PRIORITIZE"), Intent::Prioritize);
        assert_eq!(classify_intent("what is top priority?"), Intent::Prioritize);
    }

    #[test]
    fn schedule_outranks_meeting() {
        assert_eq!(classify_intent("let's schedule a sync"), Intent::Schedule);
        assert_eq!(classify_intent("schedule meeting with sales"), Intent::Schedule);
        assert_eq!(classify_intent("book a meeting"), Intent::Meeting);
    }

    #[test]
    fn substring_matching_is_literal() {
        // "sometimes" contains "time"; "breakfast" contains "break".
        assert_eq!(classify_intent("sometimes I stall"), Intent::Schedule);
        assert_eq!(classify_intent("after breakfast"), Intent::Breakdown);
        assert_eq!(classify_intent("hello there"), Intent::Default);
        assert_eq!(classify_intent(""), Intent::Default);
    }

    #[test]
    fn priority_beats_every_later_rule() {
        assert_eq!(
            classify_intent("priority meeting on my calendar"),
            Intent::Prioritize
        );
    }

    #[test]
    fn select_response_returns_intent_template() {
        assert_eq!(select_response("help me prioritize"), PRIORITIZE_TEMPLATE);
        assert_eq!(select_response("calendar"), SCHEDULE_TEMPLATE);
        assert_eq!(select_response("breakdown please"), BREAKDOWN_TEMPLATE);
        assert_eq!(select_response("meeting"), MEETING_TEMPLATE);
        assert_eq!(select_response("hi"), DEFAULT_TEMPLATE);
    }

    #[test]
    fn task_aware_plan_uses_first_active_titles() {
        let mut store = TaskStore::new();
        store.add(TaskDraft::new("Board deck").with_priority(Priority::Critical));
        store.add(TaskDraft::new("Vendor call").with_priority(Priority::Urgent));
        store.add(TaskDraft::new("Budget review").with_priority(Priority::Critical));

        let reply = select_response_for_tasks("prioritize", store.list());
        assert!(reply.contains("1. **Board deck**"));
        assert!(reply.contains("2. **Vendor call**"));
        assert!(reply.contains("3. **Budget review**"));

        let other = select_response_for_tasks("meeting", store.list());
        assert_eq!(other, MEETING_TEMPLATE);
    }

    #[test]
    fn task_aware_plan_falls_back_to_default_titles() {
        let reply = prioritization_plan(&[]);
        assert!(reply.contains("August digital campaign"));
        assert!(reply.contains("November event planning"));
    }

    proptest! {
        #[test]
        fn classification_ignores_case(message in "[a-zA-Z ]{0,40}") {
            prop_assert_eq!(
                classify_intent(&message),
                classify_intent(&message.to_uppercase())
            );
            prop_assert_eq!(select_response(&message), select_response(&message));
        }
    }
}

use crate::domain::models::{
    Priority, Task, TaskAnalytics, TaskDraft, TaskFilter, TaskPatch, TaskStatus,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// In-memory task list. Insertion order is kept; every mutation goes through
/// a method here so the `completed_at` pairing stays intact.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_tasks() -> Self {
        let mut store = Self::new();
        for draft in demo_drafts() {
            store.add(draft);
        }
        store
    }

    pub fn add(&mut self, draft: TaskDraft) -> Option<Task> {
        self.add_at(draft, Utc::now())
    }

    fn add_at(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Option<Task> {
        let title = draft.title.trim();
        if title.is_empty() {
            return None;
        }

        let task = Task {
            id: next_id("tsk"),
            title: title.to_string(),
            description: draft.description.trim().to_string(),
            deadline: draft.deadline.trim().to_string(),
            estimated_hours: sanitize_hours(draft.estimated_hours),
            priority: draft.priority,
            status: TaskStatus::Active,
            created_at: now,
            completed_at: None,
        };
        self.tasks.push(task.clone());
        Some(task)
    }

    pub fn update(&mut self, task_id: &str, patch: TaskPatch) -> Option<Task> {
        if patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return None;
        }

        let task = self.find_mut(task_id)?;
        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            task.description = description.trim().to_string();
        }
        if let Some(deadline) = patch.deadline {
            task.deadline = deadline.trim().to_string();
        }
        if let Some(hours) = patch.estimated_hours {
            task.estimated_hours = sanitize_hours(hours);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        Some(task.clone())
    }

    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) -> Option<Task> {
        self.set_status_at(task_id, status, Utc::now())
    }

    fn set_status_at(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Option<Task> {
        let task = self.find_mut(task_id)?;
        task.status = status;
        task.completed_at = match status {
            TaskStatus::Completed => Some(now),
            TaskStatus::Active | TaskStatus::Archived => None,
        };
        Some(task.clone())
    }

    pub fn complete(&mut self, task_id: &str) -> Option<Task> {
        self.set_status(task_id, TaskStatus::Completed)
    }

    pub fn archive(&mut self, task_id: &str) -> Option<Task> {
        self.set_status(task_id, TaskStatus::Archived)
    }

    pub fn remove(&mut self, task_id: &str) -> bool {
        let task_id = task_id.trim();
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        self.tasks.len() != before
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        let task_id = task_id.trim();
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn active(&self) -> Vec<Task> {
        self.tasks.iter().filter(|task| task.is_active()).cloned().collect()
    }

    pub fn filter(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn analytics(&self) -> TaskAnalytics {
        let count = |status: TaskStatus| self.tasks.iter().filter(|task| task.status == status).count();
        let total = self.tasks.len();
        let active = count(TaskStatus::Active);
        let completed = count(TaskStatus::Completed);
        let archived = count(TaskStatus::Archived);

        let completion_rate = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };

        let active_tasks = self.tasks.iter().filter(|task| task.is_active());
        let active_estimated_hours = active_tasks.clone().map(|task| task.estimated_hours).sum();
        let critical_active = active_tasks
            .clone()
            .filter(|task| task.priority == Priority::Critical)
            .count();
        let active_by_priority = Priority::ALL
            .iter()
            .map(|priority| {
                let n = active_tasks
                    .clone()
                    .filter(|task| task.priority == *priority)
                    .count();
                (*priority, n)
            })
            .collect();

        TaskAnalytics {
            total,
            active,
            completed,
            archived,
            critical_active,
            completion_rate,
            active_estimated_hours,
            active_by_priority,
        }
    }

    fn find_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        let task_id = task_id.trim();
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }
}

fn sanitize_hours(hours: f64) -> f64 {
    if hours.is_finite() && hours > 0.0 { hours } else { 0.0 }
}

fn demo_drafts() -> Vec<TaskDraft> {
    vec![
        TaskDraft::new("Sales office customer journey")
            .with_description("Map the complete customer journey for the sales office experience")
            .with_deadline("2 weeks")
            .with_estimated_hours(8.0)
            .with_priority(Priority::Critical),
        TaskDraft::new("August digital campaign")
            .with_description("Launch the digital marketing campaign for August")
            .with_deadline("Aug 1-2")
            .with_estimated_hours(12.0)
            .with_priority(Priority::Critical),
        TaskDraft::new("November event planning")
            .with_description("Plan logistics and programme for the November event")
            .with_deadline("ASAP")
            .with_estimated_hours(6.0)
            .with_priority(Priority::Urgent),
        TaskDraft::new("Cinematic video production")
            .with_description("Coordinate the production of the brand video")
            .with_deadline("End of month")
            .with_estimated_hours(10.0)
            .with_priority(Priority::Important),
        TaskDraft::new("Focus groups preparation")
            .with_description("Prepare questions and recruit participants")
            .with_deadline("July-August")
            .with_estimated_hours(4.0)
            .with_priority(Priority::Important),
        TaskDraft::new("Social media activation")
            .with_description("Keep channels active with a weekly content plan")
            .with_deadline("Ongoing")
            .with_estimated_hours(3.0)
            .with_priority(Priority::Strategic),
        TaskDraft::new("Website enhancements")
            .with_description("Collect and schedule small website fixes")
            .with_deadline("TBD")
            .with_estimated_hours(5.0)
            .with_priority(Priority::Maintenance),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn store_with(titles: &[(&str, Priority)]) -> TaskStore {
        let mut store = TaskStore::new();
        for (title, priority) in titles {
            store
                .add(TaskDraft::new(*title).with_priority(*priority))
                .expect("task added");
        }
        store
    }

    #[test]
    fn add_rejects_blank_title_without_touching_store() {
        let mut store = store_with(&[("Existing", Priority::Urgent)]);
        let before = store.list().to_vec();

        assert!(store.add(TaskDraft::new("")).is_none());
        assert!(store.add(TaskDraft::new("   \t")).is_none());
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let mut store = TaskStore::new();
        let task = store
            .add(
                TaskDraft::new("Quarterly plan")
                    .with_description("keep me")
                    .with_deadline("Friday"),
            )
            .expect("task added");

        let updated = store
            .update(
                &task.id,
                TaskPatch {
                    title: Some("Renamed".to_string()),
                    priority: Some(Priority::Critical),
                    ..TaskPatch::default()
                },
            )
            .expect("task updated");

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, Priority::Critical);
        assert_eq!(updated.description, "keep me");
        assert_eq!(updated.deadline, "Friday");
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn update_is_noop_for_unknown_id_or_blank_title() {
        let mut store = store_with(&[("Keep", Priority::Important)]);
        let id = store.list()[0].id.clone();

        assert!(store.update("missing", TaskPatch::default()).is_none());
        let blank = TaskPatch {
            title: Some("  ".to_string()),
            ..TaskPatch::default()
        };
        assert!(store.update(&id, blank).is_none());
        assert_eq!(store.list()[0].title, "Keep");
    }

    #[test]
    fn set_status_pairs_completed_at_with_completed() {
        let mut store = store_with(&[("Ship it", Priority::Urgent)]);
        let id = store.list()[0].id.clone();

        let completed = store.complete(&id).expect("completed");
        assert_eq!(completed.status, TaskStatus::Completed);
        assert!(completed.completed_at.is_some());

        let reopened = store.set_status(&id, TaskStatus::Active).expect("reopened");
        assert_eq!(reopened.status, TaskStatus::Active);
        assert!(reopened.completed_at.is_none());

        store.complete(&id).expect("completed again");
        let archived = store.archive(&id).expect("archived");
        assert!(archived.completed_at.is_none());
        assert!(archived.validate().is_ok());
    }

    #[test]
    fn remove_deletes_and_reports() {
        let mut store = store_with(&[("a", Priority::Urgent), ("b", Priority::Urgent)]);
        let id = store.list()[0].id.clone();
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "b");
    }

    #[test]
    fn filter_preserves_insertion_order() {
        let mut store = store_with(&[
            ("Plan campaign", Priority::Critical),
            ("Email vendors", Priority::Maintenance),
            ("Campaign review", Priority::Critical),
        ]);
        let id = store.list()[2].id.clone();
        store.complete(&id);

        let all_campaign = store.filter(&TaskFilter {
            search: "campaign".to_string(),
            ..TaskFilter::default()
        });
        let titles: Vec<_> = all_campaign.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, vec!["Plan campaign", "Campaign review"]);

        let active_critical = store.filter(&TaskFilter {
            status: Some(TaskStatus::Active),
            priority: Some(Priority::Critical),
            search: String::new(),
        });
        assert_eq!(active_critical.len(), 1);
        assert_eq!(active_critical[0].title, "Plan campaign");
    }

    #[test]
    fn analytics_summarises_status_and_priority() {
        let mut store = TaskStore::new();
        let a = store
            .add(TaskDraft::new("a").with_priority(Priority::Critical).with_estimated_hours(3.0))
            .expect("a");
        store
            .add(TaskDraft::new("b").with_priority(Priority::Critical).with_estimated_hours(1.5))
            .expect("b");
        let c = store
            .add(TaskDraft::new("c").with_priority(Priority::Urgent))
            .expect("c");
        store.complete(&a.id);
        store.archive(&c.id);

        let analytics = store.analytics();
        assert_eq!(analytics.total, 3);
        assert_eq!(analytics.active, 1);
        assert_eq!(analytics.completed, 1);
        assert_eq!(analytics.archived, 1);
        assert_eq!(analytics.critical_active, 1);
        assert_eq!(analytics.completion_rate, 33);
        assert_eq!(analytics.active_estimated_hours, 1.5);
        assert_eq!(analytics.active_by_priority[0], (Priority::Critical, 1));
        assert_eq!(analytics.active_by_priority[1], (Priority::Urgent, 0));
    }

    #[test]
    fn analytics_on_empty_store_reports_zero_rate() {
        assert_eq!(TaskStore::new().analytics().completion_rate, 0);
    }

    #[test]
    fn demo_tasks_are_active_and_valid() {
        let store = TaskStore::with_demo_tasks();
        assert_eq!(store.len(), 7);
        assert!(store.list().iter().all(|task| task.is_active()));
        assert!(store.list().iter().all(|task| task.validate().is_ok()));
    }

    proptest! {
        #[test]
        fn add_yields_active_task_with_unique_id(titles in prop::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,24}", 1..20)) {
            let mut store = TaskStore::new();
            let mut seen = HashSet::new();
            for title in &titles {
                let task = store.add(TaskDraft::new(title.clone())).expect("non-empty title");
                prop_assert_eq!(task.status, TaskStatus::Active);
                prop_assert!(task.completed_at.is_none());
                prop_assert!(seen.insert(task.id.clone()));
            }
            prop_assert_eq!(store.len(), titles.len());
        }
    }
}

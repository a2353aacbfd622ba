use crate::application::NowProvider;
use crate::domain::date::DateKey;
use crate::domain::models::{Task, validate_hhmm, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::record_store::{Filter, OrderBy, RecordStore};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

const TASKS_TABLE: &str = "daily_tasks";

/// One entry of the day template a fresh date is seeded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlot {
    pub time_slot: String,
    pub title: String,
    pub duration_minutes: Option<u32>,
}

impl TemplateSlot {
    fn new(time_slot: &str, title: &str, duration_minutes: u32) -> Self {
        Self {
            time_slot: time_slot.to_string(),
            title: title.to_string(),
            duration_minutes: Some(duration_minutes),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_hhmm(&self.time_slot, "template.time_slot")?;
        validate_non_empty(&self.title, "template.title")
    }
}

/// The default 12-block workday. Already-seeded dates keep whatever template
/// was current when they were first viewed.
pub fn default_template() -> Vec<TemplateSlot> {
    vec![
        TemplateSlot::new("06:00", "Wake up & Hydrate", 15),
        TemplateSlot::new("06:15", "Exercise/Movement", 60),
        TemplateSlot::new("07:15", "Learning", 45),
        TemplateSlot::new("09:00", "Work Focus - Priority 1", 120),
        TemplateSlot::new("11:00", "Work Focus - Priority 2", 120),
        TemplateSlot::new("13:00", "Lunch Break", 60),
        TemplateSlot::new("14:00", "Work Focus - Priority 3", 120),
        TemplateSlot::new("16:00", "Administrative Tasks", 60),
        TemplateSlot::new("17:00", "Wrap up & Planning", 30),
        TemplateSlot::new("18:30", "Personal Projects", 90),
        TemplateSlot::new("20:00", "Reading/Growth", 60),
        TemplateSlot::new("21:30", "Tomorrow's Planning", 30),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnsureDayResult {
    /// Tasks already existed for the date; nothing was written.
    Existing(Vec<Task>),
    /// The date was seeded from the template by this call.
    Seeded(Vec<Task>),
}

impl EnsureDayResult {
    pub fn tasks(&self) -> &[Task] {
        match self {
            EnsureDayResult::Existing(tasks) | EnsureDayResult::Seeded(tasks) => tasks,
        }
    }

    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            EnsureDayResult::Existing(tasks) | EnsureDayResult::Seeded(tasks) => tasks,
        }
    }

    pub fn was_seeded(&self) -> bool {
        matches!(self, EnsureDayResult::Seeded(_))
    }
}

/// Completed/total counts for the day header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayProgress {
    pub completed: usize,
    pub total: usize,
}

impl DayProgress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|task| task.completed).count(),
            total: tasks.len(),
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Seeds a (user, date) task list exactly once and owns the task mutations
/// the day view issues. The existence check and the insert are separate store
/// calls; a race between them is tolerated as a best-effort duplicate guard,
/// not a hard constraint.
pub struct TaskSeeder<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    template: Vec<TemplateSlot>,
    now_provider: NowProvider,
}

impl<S> TaskSeeder<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            template: default_template(),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_template(mut self, template: Vec<TemplateSlot>) -> Self {
        self.template = template;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Returns the ordered task list for the date, creating it from the
    /// template if and only if no tasks exist yet.
    pub async fn ensure_day(
        &self,
        user_id: &str,
        date: DateKey,
    ) -> Result<EnsureDayResult, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        for slot in &self.template {
            slot.validate().map_err(CoreError::Validation)?;
        }

        let existing = self
            .store
            .select(
                TASKS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("task_date", date.to_string()),
                ],
                Some(&OrderBy::asc("sort_order")),
            )
            .await?;
        if !existing.is_empty() {
            return Ok(EnsureDayResult::Existing(decode_tasks(existing)?));
        }

        let payload: Vec<Value> = self
            .template
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                json!({
                    "user_id": user_id,
                    "task_date": date.to_string(),
                    "time_slot": slot.time_slot,
                    "title": slot.title,
                    "description": "",
                    "completed": false,
                    "duration_minutes": slot.duration_minutes,
                    "sort_order": index,
                })
            })
            .collect();
        let inserted = self.store.insert(TASKS_TABLE, payload).await?;
        log::debug!("seeded {} tasks for user {user_id} on {date}", inserted.len());

        let mut tasks = decode_tasks(inserted)?;
        tasks.sort_by_key(|task| task.sort_order);
        Ok(EnsureDayResult::Seeded(tasks))
    }

    /// Flips the completion flag, stamping or clearing `completed_at`. The
    /// returned entity reflects the change only because the store accepted it.
    pub async fn toggle_completion(&self, task: &Task) -> Result<Task, CoreError> {
        let completed = !task.completed;
        let completed_at = completed.then(|| (self.now_provider)());
        self.store
            .update(
                TASKS_TABLE,
                &[Filter::eq("id", task.id.clone())],
                json!({
                    "completed": completed,
                    "completed_at": completed_at,
                }),
            )
            .await?;

        let mut updated = task.clone();
        updated.completed = completed;
        updated.completed_at = completed_at;
        Ok(updated)
    }

    pub async fn rename(&self, task: &Task, title: &str) -> Result<Task, CoreError> {
        validate_non_empty(title, "task.title").map_err(CoreError::Validation)?;
        self.store
            .update(
                TASKS_TABLE,
                &[Filter::eq("id", task.id.clone())],
                json!({"title": title}),
            )
            .await?;

        let mut updated = task.clone();
        updated.title = title.to_string();
        Ok(updated)
    }
}

fn decode_tasks(rows: Vec<Value>) -> Result<Vec<Task>, CoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(CoreError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::record_store::InMemoryRecordStore;
    use chrono::DateTime;
    use proptest::prelude::*;

    fn day(value: &str) -> DateKey {
        DateKey::parse(value).expect("valid date")
    }

    fn fixed_now() -> NowProvider {
        Arc::new(|| {
            DateTime::parse_from_rfc3339("2024-05-01T07:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc)
        })
    }

    #[tokio::test]
    async fn first_view_seeds_the_full_template_in_order() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeder = TaskSeeder::new(Arc::clone(&store));

        let result = seeder
            .ensure_day("user-1", day("2024-05-01"))
            .await
            .expect("ensure day");

        assert!(result.was_seeded());
        let tasks = result.into_tasks();
        assert_eq!(tasks.len(), 12);
        assert!(tasks.iter().all(|task| !task.completed));
        assert!(
            tasks
                .windows(2)
                .all(|pair| pair[0].sort_order < pair[1].sort_order)
        );
        assert_eq!(tasks[0].time_slot, "06:00");
        assert_eq!(tasks[0].title, "Wake up & Hydrate");
        assert_eq!(tasks[11].title, "Tomorrow's Planning");
    }

    #[tokio::test]
    async fn second_view_does_not_duplicate_the_template() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeder = TaskSeeder::new(Arc::clone(&store));
        let date = day("2024-05-01");

        let first = seeder.ensure_day("user-1", date).await.expect("first view");
        let second = seeder.ensure_day("user-1", date).await.expect("second view");

        assert!(first.was_seeded());
        assert!(!second.was_seeded());
        assert_eq!(second.tasks().len(), first.tasks().len());
        assert_eq!(store.row_count(TASKS_TABLE), 12);
    }

    #[tokio::test]
    async fn template_changes_never_rewrite_seeded_dates() {
        let store = Arc::new(InMemoryRecordStore::new());
        let date = day("2024-05-01");
        TaskSeeder::new(Arc::clone(&store))
            .ensure_day("user-1", date)
            .await
            .expect("seed with default template");

        let trimmed = vec![TemplateSlot::new("08:00", "Single block", 240)];
        let result = TaskSeeder::new(Arc::clone(&store))
            .with_template(trimmed)
            .ensure_day("user-1", date)
            .await
            .expect("re-view with new template");

        assert!(!result.was_seeded());
        assert_eq!(result.tasks().len(), 12);
        assert_eq!(store.row_count(TASKS_TABLE), 12);
    }

    #[tokio::test]
    async fn dates_are_seeded_independently_per_user_and_day() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeder = TaskSeeder::new(Arc::clone(&store));

        seeder
            .ensure_day("user-1", day("2024-05-01"))
            .await
            .expect("user one");
        seeder
            .ensure_day("user-1", day("2024-05-02"))
            .await
            .expect("next day");
        seeder
            .ensure_day("user-2", day("2024-05-01"))
            .await
            .expect("user two");

        assert_eq!(store.row_count(TASKS_TABLE), 36);
    }

    #[tokio::test]
    async fn toggle_completion_stamps_and_clears_completed_at() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeder = TaskSeeder::new(Arc::clone(&store)).with_now_provider(fixed_now());
        let tasks = seeder
            .ensure_day("user-1", day("2024-05-01"))
            .await
            .expect("seed")
            .into_tasks();

        let done = seeder
            .toggle_completion(&tasks[0])
            .await
            .expect("toggle on");
        assert!(done.completed);
        assert_eq!(
            done.completed_at.map(|at| at.to_rfc3339()),
            Some("2024-05-01T07:00:00+00:00".to_string())
        );

        let undone = seeder.toggle_completion(&done).await.expect("toggle off");
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());

        let stored = store
            .select(TASKS_TABLE, &[Filter::eq("id", done.id.clone())], None)
            .await
            .expect("read back");
        assert_eq!(stored[0]["completed"], false);
    }

    #[tokio::test]
    async fn rename_rejects_blank_titles_before_writing() {
        let store = Arc::new(InMemoryRecordStore::new());
        let seeder = TaskSeeder::new(Arc::clone(&store));
        let tasks = seeder
            .ensure_day("user-1", day("2024-05-01"))
            .await
            .expect("seed")
            .into_tasks();

        let rejected = seeder.rename(&tasks[0], "   ").await;
        assert!(matches!(rejected, Err(CoreError::Validation(_))));

        let renamed = seeder
            .rename(&tasks[0], "Deep work sprint")
            .await
            .expect("rename");
        assert_eq!(renamed.title, "Deep work sprint");
        let stored = store
            .select(TASKS_TABLE, &[Filter::eq("id", renamed.id.clone())], None)
            .await
            .expect("read back");
        assert_eq!(stored[0]["title"], "Deep work sprint");
    }

    #[test]
    fn day_progress_counts_and_percentage() {
        assert_eq!(DayProgress::of(&[]).percentage(), 0.0);

        let mut tasks = sample_tasks();
        tasks[0].completed = true;
        tasks[2].completed = true;
        let progress = DayProgress::of(&tasks);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 4);
        assert!((progress.percentage() - 50.0).abs() < f64::EPSILON);
    }

    fn sample_tasks() -> Vec<Task> {
        (0..4)
            .map(|index| Task {
                id: format!("task-{index}"),
                user_id: "user-1".to_string(),
                task_date: day("2024-05-01"),
                time_slot: "06:00".to_string(),
                title: format!("Block {index}"),
                description: String::new(),
                completed: false,
                completed_at: None,
                duration_minutes: None,
                sort_order: index,
            })
            .collect()
    }

    // Seeding stays idempotent for any date the user navigates to.
    proptest! {
        #[test]
        fn ensure_day_is_idempotent_for_arbitrary_dates(offset in 0i64..3650) {
            let runtime = tokio::runtime::Runtime::new().expect("runtime");
            runtime.block_on(async move {
                let base = day("2020-01-01");
                let date = DateKey::new(base.date() + chrono::Duration::days(offset));
                let store = Arc::new(InMemoryRecordStore::new());
                let seeder = TaskSeeder::new(Arc::clone(&store));

                let first = seeder.ensure_day("user-1", date).await.expect("first");
                let second = seeder.ensure_day("user-1", date).await.expect("second");

                assert!(first.was_seeded());
                assert_eq!(second.tasks().len(), 12);
                assert_eq!(store.row_count(TASKS_TABLE), 12);
            });
        }
    }
}

use crate::domain::date::DateKey;
use crate::domain::models::{Goal, Habit, Task, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::insight_generator::GeneratorContext;
use crate::infrastructure::record_store::{Filter, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TASKS_TABLE: &str = "daily_tasks";
const GOALS_TABLE: &str = "goals";
const HABITS_TABLE: &str = "habits";
const COMPLETIONS_TABLE: &str = "habit_completions";

/// Aggregated view of a day the insight generator consumes; also persisted
/// verbatim as the insight's context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub today_completed: usize,
    pub today_total: usize,
    pub week_completed: usize,
    pub active_goals: usize,
    pub longest_streak: u32,
    pub habits_today: usize,
    pub total_habits: usize,
}

impl DailyStats {
    pub fn completion_rate(&self) -> f64 {
        if self.today_total == 0 {
            0.0
        } else {
            self.today_completed as f64 / self.today_total as f64 * 100.0
        }
    }

    pub fn habit_rate(&self) -> f64 {
        if self.total_habits == 0 {
            0.0
        } else {
            self.habits_today as f64 / self.total_habits as f64 * 100.0
        }
    }

    pub fn generator_context(&self) -> GeneratorContext {
        GeneratorContext {
            completion_rate: Some(self.completion_rate()),
            current_streak: Some(self.longest_streak),
        }
    }
}

/// Folds the five reads of the insights screen into one snapshot.
pub struct StatsService<S>
where
    S: RecordStore,
{
    store: Arc<S>,
}

impl<S> StatsService<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn daily_snapshot(
        &self,
        user_id: &str,
        today: DateKey,
    ) -> Result<DailyStats, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        let week_start = today.week_start();

        let today_tasks = self
            .store
            .select(
                TASKS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("task_date", today.to_string()),
                ],
                None,
            )
            .await?;
        let week_tasks = self
            .store
            .select(
                TASKS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::gte("task_date", week_start.to_string()),
                ],
                None,
            )
            .await?;
        let goals = self
            .store
            .select(
                GOALS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("status", "active"),
                ],
                None,
            )
            .await?;
        let habits = self
            .store
            .select(
                HABITS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("is_active", true),
                ],
                None,
            )
            .await?;
        let completions_today = self
            .store
            .select(
                COMPLETIONS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("completion_date", today.to_string()),
                ],
                None,
            )
            .await?;

        let today_tasks: Vec<Task> = decode(today_tasks)?;
        let week_tasks: Vec<Task> = decode(week_tasks)?;
        let goals: Vec<Goal> = decode(goals)?;
        let habits: Vec<Habit> = decode(habits)?;

        Ok(DailyStats {
            today_completed: today_tasks.iter().filter(|task| task.completed).count(),
            today_total: today_tasks.len(),
            week_completed: week_tasks.iter().filter(|task| task.completed).count(),
            active_goals: goals.len(),
            longest_streak: habits
                .iter()
                .map(|habit| habit.current_streak)
                .max()
                .unwrap_or(0),
            habits_today: completions_today.len(),
            total_habits: habits.len(),
        })
    }
}

fn decode<T>(rows: Vec<serde_json::Value>) -> Result<Vec<T>, CoreError>
where
    T: serde::de::DeserializeOwned,
{
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(CoreError::from))
        .collect()
}

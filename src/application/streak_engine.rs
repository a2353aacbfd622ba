use crate::application::NowProvider;
use crate::domain::date::DateKey;
use crate::domain::models::{Habit, HabitCompletion, validate_non_empty};
use crate::infrastructure::error::{ConsistencyWarning, CoreError};
use crate::infrastructure::record_store::{Filter, OrderBy, RecordStore};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

const HABITS_TABLE: &str = "habits";
const COMPLETIONS_TABLE: &str = "habit_completions";
const DEFAULT_CATEGORY: &str = "general";
const DEFAULT_FREQUENCY: &str = "daily";

/// Result of one toggle transition. `habit` carries the counters as the store
/// accepted them; when the counter update failed after the completion write
/// succeeded, the counters are unchanged and `warning` names the divergence.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub habit: Habit,
    /// Whether a completion row exists for the toggled date after this call.
    pub completed: bool,
    pub warning: Option<ConsistencyWarning>,
}

/// State machine over a habit's completion row for a date and its
/// (current_streak, best_streak) counter pair. The counters are cached
/// derived values: each toggle applies ±1 for the toggled date, it never
/// recomputes from the full completion history.
pub struct StreakEngine<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    now_provider: NowProvider,
}

impl<S> StreakEngine<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Flips the completion state of `habit` for `date` and moves the streak
    /// counters with it: on adds one (best follows), off subtracts one
    /// (floored at zero, best untouched).
    pub async fn toggle(&self, habit: &Habit, date: DateKey) -> Result<ToggleOutcome, CoreError> {
        habit.validate().map_err(CoreError::Validation)?;
        if !habit.is_active {
            return Err(CoreError::Validation(format!(
                "habit {} is archived and cannot be toggled",
                habit.id
            )));
        }

        match self.completion_for(habit, date).await? {
            Some(completion) => {
                self.store
                    .delete(
                        COMPLETIONS_TABLE,
                        &[Filter::eq("id", completion.id.clone())],
                    )
                    .await?;
                let next_current = habit.current_streak.saturating_sub(1);
                self.apply_counters(habit, next_current, habit.best_streak, false)
                    .await
            }
            None => {
                self.store
                    .insert(
                        COMPLETIONS_TABLE,
                        vec![json!({
                            "habit_id": habit.id,
                            "user_id": habit.user_id,
                            "completion_date": date.to_string(),
                        })],
                    )
                    .await?;
                let next_current = habit.current_streak + 1;
                let next_best = habit.best_streak.max(next_current);
                self.apply_counters(habit, next_current, next_best, true)
                    .await
            }
        }
    }

    /// Creates an active habit with zeroed counters. Blank names are rejected
    /// before any store call; a blank category falls back to "general".
    pub async fn create_habit(
        &self,
        user_id: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<Habit, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        validate_non_empty(name, "habit.name").map_err(CoreError::Validation)?;
        let category = category
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        let inserted = self
            .store
            .insert(
                HABITS_TABLE,
                vec![json!({
                    "user_id": user_id,
                    "name": name,
                    "category": category,
                    "frequency": DEFAULT_FREQUENCY,
                    "is_active": true,
                    "current_streak": 0,
                    "best_streak": 0,
                    "created_at": (self.now_provider)(),
                })],
            )
            .await?;
        let row = inserted.into_iter().next().ok_or_else(|| {
            CoreError::Transient("habit insert returned no rows".to_string())
        })?;
        Ok(serde_json::from_value(row)?)
    }

    /// Soft delete: the habit keeps its rows and history but leaves the
    /// active set.
    pub async fn archive_habit(&self, habit: &Habit) -> Result<Habit, CoreError> {
        self.store
            .update(
                HABITS_TABLE,
                &[Filter::eq("id", habit.id.clone())],
                json!({"is_active": false}),
            )
            .await?;

        let mut archived = habit.clone();
        archived.is_active = false;
        Ok(archived)
    }

    /// Active habits, newest first.
    pub async fn active_habits(&self, user_id: &str) -> Result<Vec<Habit>, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        let rows = self
            .store
            .select(
                HABITS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("is_active", true),
                ],
                Some(&OrderBy::desc("created_at")),
            )
            .await?;
        decode_habits(rows)
    }

    /// The day's completion rows keyed by habit id; the habits screen marks
    /// its checkboxes from this map.
    pub async fn completions_for_date(
        &self,
        user_id: &str,
        date: DateKey,
    ) -> Result<HashMap<String, HabitCompletion>, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        let rows = self
            .store
            .select(
                COMPLETIONS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("completion_date", date.to_string()),
                ],
                None,
            )
            .await?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let completion: HabitCompletion = serde_json::from_value(row)?;
            map.insert(completion.habit_id.clone(), completion);
        }
        Ok(map)
    }

    async fn completion_for(
        &self,
        habit: &Habit,
        date: DateKey,
    ) -> Result<Option<HabitCompletion>, CoreError> {
        let rows = self
            .store
            .select(
                COMPLETIONS_TABLE,
                &[
                    Filter::eq("habit_id", habit.id.clone()),
                    Filter::eq("completion_date", date.to_string()),
                ],
                None,
            )
            .await?;
        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .transpose()
    }

    /// The completion write already succeeded when this runs. A transient
    /// failure here therefore must not fail the toggle; it is downgraded to a
    /// warning and the returned habit keeps the counters the store still
    /// holds, so the divergence stays observable.
    async fn apply_counters(
        &self,
        habit: &Habit,
        current: u32,
        best: u32,
        completed: bool,
    ) -> Result<ToggleOutcome, CoreError> {
        let update = self
            .store
            .update(
                HABITS_TABLE,
                &[Filter::eq("id", habit.id.clone())],
                json!({
                    "current_streak": current,
                    "best_streak": best,
                }),
            )
            .await;

        match update {
            Ok(()) => {
                let mut updated = habit.clone();
                updated.current_streak = current;
                updated.best_streak = best;
                Ok(ToggleOutcome {
                    habit: updated,
                    completed,
                    warning: None,
                })
            }
            Err(error) if error.is_transient() => {
                let warning = ConsistencyWarning {
                    habit_id: habit.id.clone(),
                    completion_present: completed,
                    recorded_streak: habit.current_streak,
                };
                log::warn!("{warning}; completion persisted but counters did not: {error}");
                Ok(ToggleOutcome {
                    habit: habit.clone(),
                    completed,
                    warning: Some(warning),
                })
            }
            Err(error) => Err(error),
        }
    }
}

fn decode_habits(rows: Vec<Value>) -> Result<Vec<Habit>, CoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(CoreError::from))
        .collect()
}

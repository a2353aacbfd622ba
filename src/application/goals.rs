use crate::application::NowProvider;
use crate::domain::date::DateKey;
use crate::domain::models::{Goal, GoalStatus, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::record_store::{Filter, OrderBy, RecordStore};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const GOALS_TABLE: &str = "goals";

/// 90-day goal operations: create, clamped progress adjustment, archive.
pub struct GoalService<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    now_provider: NowProvider,
}

impl<S> GoalService<S>
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

    /// Active goals, primary goal first.
    pub async fn active_goals(&self, user_id: &str) -> Result<Vec<Goal>, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        let rows = self
            .store
            .select(
                GOALS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("status", "active"),
                ],
                Some(&OrderBy::desc("is_primary")),
            )
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .collect()
    }

    pub async fn create_goal(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
        category: &str,
        is_primary: bool,
        target_date: DateKey,
    ) -> Result<Goal, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        validate_non_empty(title, "goal.title").map_err(CoreError::Validation)?;
        validate_non_empty(category, "goal.category").map_err(CoreError::Validation)?;

        let inserted = self
            .store
            .insert(
                GOALS_TABLE,
                vec![json!({
                    "user_id": user_id,
                    "title": title,
                    "description": description,
                    "category": category,
                    "is_primary": is_primary,
                    "progress_percentage": 0,
                    "target_date": target_date.to_string(),
                    "status": "active",
                    "created_at": (self.now_provider)(),
                })],
            )
            .await?;
        let row = inserted
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Transient("goal insert returned no rows".to_string()))?;
        Ok(serde_json::from_value(row)?)
    }

    /// Sets the progress bar, clamped into [0, 100].
    pub async fn set_progress(&self, goal: &Goal, progress: i32) -> Result<Goal, CoreError> {
        let clamped = progress.clamp(0, 100);
        self.store
            .update(
                GOALS_TABLE,
                &[Filter::eq("id", goal.id.clone())],
                json!({"progress_percentage": clamped}),
            )
            .await?;

        let mut updated = goal.clone();
        updated.progress_percentage = clamped;
        Ok(updated)
    }

    pub async fn archive(&self, goal: &Goal) -> Result<Goal, CoreError> {
        self.store
            .update(
                GOALS_TABLE,
                &[Filter::eq("id", goal.id.clone())],
                json!({"status": "archived"}),
            )
            .await?;

        let mut archived = goal.clone();
        archived.status = GoalStatus::Archived;
        Ok(archived)
    }

    pub fn days_remaining(&self, goal: &Goal) -> i64 {
        DateKey::from_datetime((self.now_provider)()).days_until(goal.target_date)
    }
}

use crate::application::NowProvider;
use crate::domain::date::DateKey;
use crate::domain::models::{WeeklyPlan, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::record_store::{Filter, RecordStore};
use chrono::Utc;
use std::sync::Arc;

const WEEKLY_PLANS_TABLE: &str = "weekly_plans";
const CONFLICT_KEY: [&str; 2] = ["user_id", "week_start_date"];

/// Read-or-blank-default load and idempotent composite-key upsert of the one
/// plan row per (user, Monday).
pub struct WeeklyPlanService<S>
where
    S: RecordStore,
{
    store: Arc<S>,
    now_provider: NowProvider,
}

impl<S> WeeklyPlanService<S>
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

    /// A week with no saved plan loads as an all-blank plan, not an error.
    pub async fn load(&self, user_id: &str, week_start: DateKey) -> Result<WeeklyPlan, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        if !week_start.is_week_start() {
            return Err(CoreError::Validation(
                "weekly_plan.week_start_date must be a Monday".to_string(),
            ));
        }

        let rows = self
            .store
            .select(
                WEEKLY_PLANS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("week_start_date", week_start.to_string()),
                ],
                None,
            )
            .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Ok(WeeklyPlan::blank(user_id, week_start)),
        }
    }

    /// Creates or fully replaces the plan's text fields and stamps
    /// `updated_at`. Saving identical fields twice leaves exactly one row.
    pub async fn save(&self, plan: &WeeklyPlan) -> Result<WeeklyPlan, CoreError> {
        plan.validate().map_err(CoreError::Validation)?;

        let mut stamped = plan.clone();
        stamped.updated_at = Some((self.now_provider)());
        let row = serde_json::to_value(&stamped)?;
        self.store
            .upsert(WEEKLY_PLANS_TABLE, row, &CONFLICT_KEY)
            .await?;
        Ok(stamped)
    }
}

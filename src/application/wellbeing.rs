use crate::domain::date::DateKey;
use crate::domain::models::{GratitudeEntry, HealthMetric, MoodEntry, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::record_store::{Filter, RecordStore};
use std::sync::Arc;

const MOOD_TABLE: &str = "mood_entries";
const GRATITUDE_TABLE: &str = "gratitude_entries";
const HEALTH_TABLE: &str = "health_metrics";
const ENTRY_CONFLICT_KEY: [&str; 2] = ["user_id", "entry_date"];
const METRIC_CONFLICT_KEY: [&str; 2] = ["user_id", "metric_date"];

/// The day's mood and gratitude rows, either of which may not exist yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayWellbeing {
    pub mood: Option<MoodEntry>,
    pub gratitude: Option<GratitudeEntry>,
}

/// Last-write-wins keyed upserts for the wellbeing entries: one row per
/// (user, date) per kind, a second save replaces the first, no history.
pub struct WellbeingService<S>
where
    S: RecordStore,
{
    store: Arc<S>,
}

impl<S> WellbeingService<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn load_day(&self, user_id: &str, date: DateKey) -> Result<DayWellbeing, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        Ok(DayWellbeing {
            mood: self.mood_for(user_id, date).await?,
            gratitude: self.gratitude_for(user_id, date).await?,
        })
    }

    pub async fn save_mood(
        &self,
        user_id: &str,
        date: DateKey,
        mood_score: u8,
        energy_level: u8,
    ) -> Result<MoodEntry, CoreError> {
        let entry = MoodEntry {
            user_id: user_id.to_string(),
            entry_date: date,
            mood_score,
            energy_level,
        };
        entry.validate().map_err(CoreError::Validation)?;

        self.store
            .upsert(
                MOOD_TABLE,
                serde_json::to_value(&entry)?,
                &ENTRY_CONFLICT_KEY,
            )
            .await?;
        Ok(entry)
    }

    /// Blank lines are dropped before the write; the entry snapshots the
    /// day's mood score when one has been logged.
    pub async fn save_gratitude(
        &self,
        user_id: &str,
        date: DateKey,
        entries: &[String],
    ) -> Result<GratitudeEntry, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        let kept: Vec<String> = entries
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        let mood_correlation = self
            .mood_for(user_id, date)
            .await?
            .map(|mood| mood.mood_score);
        let entry = GratitudeEntry {
            user_id: user_id.to_string(),
            entry_date: date,
            entries: kept,
            mood_correlation,
        };

        self.store
            .upsert(
                GRATITUDE_TABLE,
                serde_json::to_value(&entry)?,
                &ENTRY_CONFLICT_KEY,
            )
            .await?;
        Ok(entry)
    }

    pub async fn save_health(
        &self,
        user_id: &str,
        date: DateKey,
        sleep_hours: Option<f64>,
        water_intake_ml: Option<u32>,
    ) -> Result<HealthMetric, CoreError> {
        let metric = HealthMetric {
            user_id: user_id.to_string(),
            metric_date: date,
            sleep_hours,
            water_intake_ml,
        };
        metric.validate().map_err(CoreError::Validation)?;

        self.store
            .upsert(
                HEALTH_TABLE,
                serde_json::to_value(&metric)?,
                &METRIC_CONFLICT_KEY,
            )
            .await?;
        Ok(metric)
    }

    async fn mood_for(&self, user_id: &str, date: DateKey) -> Result<Option<MoodEntry>, CoreError> {
        let rows = self
            .store
            .select(
                MOOD_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("entry_date", date.to_string()),
                ],
                None,
            )
            .await?;
        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .transpose()
    }

    async fn gratitude_for(
        &self,
        user_id: &str,
        date: DateKey,
    ) -> Result<Option<GratitudeEntry>, CoreError> {
        let rows = self
            .store
            .select(
                GRATITUDE_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("entry_date", date.to_string()),
                ],
                None,
            )
            .await?;
        rows.into_iter()
            .next()
            .map(|row| serde_json::from_value(row).map_err(CoreError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::record_store::InMemoryRecordStore;

    fn day(value: &str) -> DateKey {
        DateKey::parse(value).expect("valid date")
    }

    #[tokio::test]
    async fn second_mood_save_replaces_the_first() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));
        let date = day("2024-05-01");

        service
            .save_mood("user-1", date, 4, 5)
            .await
            .expect("first save");
        service
            .save_mood("user-1", date, 8, 7)
            .await
            .expect("second save");

        assert_eq!(store.row_count(MOOD_TABLE), 1);
        let loaded = service.load_day("user-1", date).await.expect("load day");
        let mood = loaded.mood.expect("mood present");
        assert_eq!(mood.mood_score, 8);
        assert_eq!(mood.energy_level, 7);
    }

    #[tokio::test]
    async fn out_of_range_scores_never_reach_the_store() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));

        let rejected = service.save_mood("user-1", day("2024-05-01"), 0, 5).await;
        assert!(matches!(rejected, Err(CoreError::Validation(_))));
        let rejected = service.save_mood("user-1", day("2024-05-01"), 5, 11).await;
        assert!(matches!(rejected, Err(CoreError::Validation(_))));
        assert_eq!(store.row_count(MOOD_TABLE), 0);
    }

    #[tokio::test]
    async fn gratitude_filters_blanks_and_correlates_mood() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));
        let date = day("2024-05-01");

        service
            .save_mood("user-1", date, 6, 6)
            .await
            .expect("save mood");
        let entry = service
            .save_gratitude(
                "user-1",
                date,
                &[
                    "Family dinner".to_string(),
                    "   ".to_string(),
                    "Shipped the feature".to_string(),
                ],
            )
            .await
            .expect("save gratitude");

        assert_eq!(entry.entries.len(), 2);
        assert_eq!(entry.mood_correlation, Some(6));
    }

    #[tokio::test]
    async fn gratitude_without_mood_has_no_correlation() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));

        let entry = service
            .save_gratitude("user-1", day("2024-05-01"), &["Sunshine".to_string()])
            .await
            .expect("save gratitude");
        assert_eq!(entry.mood_correlation, None);
        assert_eq!(store.row_count(GRATITUDE_TABLE), 1);
    }

    #[tokio::test]
    async fn health_metrics_upsert_by_date_and_validate_sleep() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));
        let date = day("2024-05-01");

        service
            .save_health("user-1", date, Some(7.5), Some(2000))
            .await
            .expect("first save");
        service
            .save_health("user-1", date, Some(6.0), None)
            .await
            .expect("second save");
        assert_eq!(store.row_count(HEALTH_TABLE), 1);

        let rejected = service
            .save_health("user-1", date, Some(25.0), None)
            .await;
        assert!(matches!(rejected, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn days_are_isolated() {
        let store = Arc::new(InMemoryRecordStore::new());
        let service = WellbeingService::new(Arc::clone(&store));

        service
            .save_mood("user-1", day("2024-05-01"), 6, 6)
            .await
            .expect("save");
        let next_day = service
            .load_day("user-1", day("2024-05-02"))
            .await
            .expect("load next day");
        assert!(next_day.mood.is_none());
        assert!(next_day.gratitude.is_none());
    }
}

use crate::application::NowProvider;
use crate::application::stats::DailyStats;
use crate::domain::date::DateKey;
use crate::domain::models::{AiInsight, validate_non_empty};
use crate::infrastructure::error::CoreError;
use crate::infrastructure::insight_generator::{InsightGenerator, daily_motivation_prompt};
use crate::infrastructure::record_store::{Filter, OrderBy, RecordStore};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const INSIGHTS_TABLE: &str = "ai_insights";

/// The one insight type the cache manages today.
pub const DAILY_MOTIVATION: &str = "daily_motivation";

#[derive(Debug, Clone, PartialEq)]
pub enum InsightOutcome {
    /// A same-day insight already existed; the generator was not invoked.
    Cached(AiInsight),
    /// No same-day insight existed; the generator ran and the result was
    /// persisted.
    Generated(AiInsight),
}

impl InsightOutcome {
    pub fn insight(&self) -> &AiInsight {
        match self {
            InsightOutcome::Cached(insight) | InsightOutcome::Generated(insight) => insight,
        }
    }

    pub fn into_insight(self) -> AiInsight {
        match self {
            InsightOutcome::Cached(insight) | InsightOutcome::Generated(insight) => insight,
        }
    }

    pub fn was_generated(&self) -> bool {
        matches!(self, InsightOutcome::Generated(_))
    }
}

/// Caps generation at one `daily_motivation` insight per (user, date) unless
/// the user explicitly regenerates. History accumulates; rows are never
/// deleted.
pub struct InsightCache<S, G>
where
    S: RecordStore,
    G: InsightGenerator,
{
    store: Arc<S>,
    generator: Arc<G>,
    now_provider: NowProvider,
}

impl<S, G> InsightCache<S, G>
where
    S: RecordStore,
    G: InsightGenerator,
{
    pub fn new(store: Arc<S>, generator: Arc<G>) -> Self {
        Self {
            store,
            generator,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Returns the freshest insight generated on or after the start of
    /// `date`, generating and persisting one only when none exists.
    pub async fn get_or_generate(
        &self,
        user_id: &str,
        date: DateKey,
        stats: &DailyStats,
    ) -> Result<InsightOutcome, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;

        let rows = self
            .store
            .select(
                INSIGHTS_TABLE,
                &[
                    Filter::eq("user_id", user_id),
                    Filter::eq("insight_type", DAILY_MOTIVATION),
                    Filter::gte("generated_at", date.to_string()),
                ],
                Some(&OrderBy::desc("generated_at")),
            )
            .await?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(InsightOutcome::Cached(serde_json::from_value(row)?));
        }

        let insight = self.generate_and_persist(user_id, stats).await?;
        Ok(InsightOutcome::Generated(insight))
    }

    /// Skips the cache lookup entirely: always invokes the generator and
    /// appends a new row.
    pub async fn regenerate(
        &self,
        user_id: &str,
        stats: &DailyStats,
    ) -> Result<AiInsight, CoreError> {
        validate_non_empty(user_id, "user_id").map_err(CoreError::Validation)?;
        self.generate_and_persist(user_id, stats).await
    }

    async fn generate_and_persist(
        &self,
        user_id: &str,
        stats: &DailyStats,
    ) -> Result<AiInsight, CoreError> {
        let prompt = daily_motivation_prompt(
            stats.today_completed,
            stats.today_total,
            stats.active_goals,
            stats.longest_streak,
        );
        let content = self
            .generator
            .generate(&prompt, &stats.generator_context())
            .await?;

        let inserted = self
            .store
            .insert(
                INSIGHTS_TABLE,
                vec![json!({
                    "user_id": user_id,
                    "insight_type": DAILY_MOTIVATION,
                    "content": content,
                    "generated_at": (self.now_provider)(),
                    "context": {"stats": stats},
                })],
            )
            .await?;
        let row = inserted
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Transient("insight insert returned no rows".to_string()))?;
        Ok(serde_json::from_value(row)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::insight_generator::GeneratorContext;
    use crate::infrastructure::record_store::InMemoryRecordStore;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(value: &str) -> DateKey {
        DateKey::parse(value).expect("valid date")
    }

    fn fixed_now() -> NowProvider {
        Arc::new(|| {
            DateTime::parse_from_rfc3339("2024-05-01T08:30:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc)
        })
    }

    #[derive(Debug, Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InsightGenerator for CountingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _context: &GeneratorContext,
        ) -> Result<String, CoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(CoreError::Transient("generator unreachable".to_string()));
            }
            Ok(format!("Great job! (take {call})"))
        }
    }

    fn cache(
        store: &Arc<InMemoryRecordStore>,
        generator: &Arc<CountingGenerator>,
    ) -> InsightCache<InMemoryRecordStore, CountingGenerator> {
        InsightCache::new(Arc::clone(store), Arc::clone(generator)).with_now_provider(fixed_now())
    }

    #[tokio::test]
    async fn same_day_lookups_invoke_the_generator_at_most_once() {
        let store = Arc::new(InMemoryRecordStore::new());
        let generator = Arc::new(CountingGenerator::default());
        let cache = cache(&store, &generator);
        let stats = DailyStats::default();

        let first = cache
            .get_or_generate("user-1", day("2024-05-01"), &stats)
            .await
            .expect("first call");
        assert!(first.was_generated());
        assert_eq!(first.insight().content, "Great job! (take 1)");
        assert_eq!(store.row_count(INSIGHTS_TABLE), 1);

        let second = cache
            .get_or_generate("user-1", day("2024-05-01"), &stats)
            .await
            .expect("second call");
        assert!(!second.was_generated());
        assert_eq!(second.insight().content, "Great job! (take 1)");
        assert_eq!(generator.call_count(), 1);
        assert_eq!(store.row_count(INSIGHTS_TABLE), 1);
    }

    #[tokio::test]
    async fn stale_insights_do_not_satisfy_a_new_day() {
        let store = Arc::new(InMemoryRecordStore::new());
        let generator = Arc::new(CountingGenerator::default());
        let cache = cache(&store, &generator);
        let stats = DailyStats::default();

        store
            .insert(
                INSIGHTS_TABLE,
                vec![json!({
                    "user_id": "user-1",
                    "insight_type": DAILY_MOTIVATION,
                    "content": "Yesterday's push",
                    "generated_at": "2024-04-30T21:00:00Z",
                    "context": {},
                })],
            )
            .await
            .expect("seed stale insight");

        let outcome = cache
            .get_or_generate("user-1", day("2024-05-01"), &stats)
            .await
            .expect("lookup");
        assert!(outcome.was_generated());
        assert_eq!(generator.call_count(), 1);
        assert_eq!(store.row_count(INSIGHTS_TABLE), 2);
    }

    #[tokio::test]
    async fn regenerate_always_invokes_and_appends_history() {
        let store = Arc::new(InMemoryRecordStore::new());
        let generator = Arc::new(CountingGenerator::default());
        let cache = cache(&store, &generator);
        let stats = DailyStats::default();

        cache
            .get_or_generate("user-1", day("2024-05-01"), &stats)
            .await
            .expect("initial generation");
        let regenerated = cache
            .regenerate("user-1", &stats)
            .await
            .expect("regenerate");

        assert_eq!(regenerated.content, "Great job! (take 2)");
        assert_eq!(generator.call_count(), 2);
        assert_eq!(store.row_count(INSIGHTS_TABLE), 2);
    }

    #[tokio::test]
    async fn persisted_context_carries_the_stats_snapshot() {
        let store = Arc::new(InMemoryRecordStore::new());
        let generator = Arc::new(CountingGenerator::default());
        let cache = cache(&store, &generator);
        let stats = DailyStats {
            today_completed: 9,
            today_total: 12,
            active_goals: 2,
            longest_streak: 5,
            ..DailyStats::default()
        };

        let outcome = cache
            .get_or_generate("user-1", day("2024-05-01"), &stats)
            .await
            .expect("generate");
        let context = &outcome.insight().context;
        assert_eq!(context["stats"]["today_completed"], 9);
        assert_eq!(context["stats"]["longest_streak"], 5);
    }

    #[tokio::test]
    async fn generator_failure_persists_nothing() {
        let store = Arc::new(InMemoryRecordStore::new());
        let generator = Arc::new(CountingGenerator::failing());
        let cache = cache(&store, &generator);

        let failed = cache
            .get_or_generate("user-1", day("2024-05-01"), &DailyStats::default())
            .await;
        assert!(matches!(failed, Err(CoreError::Transient(_))));
        assert_eq!(store.row_count(INSIGHTS_TABLE), 0);
    }
}

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::NowProvider;
pub use application::goals::GoalService;
pub use application::insight_cache::{DAILY_MOTIVATION, InsightCache, InsightOutcome};
pub use application::session::{Session, SessionManager};
pub use application::stats::{DailyStats, StatsService};
pub use application::streak_engine::{StreakEngine, ToggleOutcome};
pub use application::task_seeder::{
    DayProgress, EnsureDayResult, TaskSeeder, TemplateSlot, default_template,
};
pub use application::view::{InFlightGate, InFlightPermit, ViewVersion};
pub use application::weekly_plan::WeeklyPlanService;
pub use application::wellbeing::{DayWellbeing, WellbeingService};
pub use domain::date::DateKey;
pub use domain::models::{
    AiInsight, Goal, GoalStatus, GratitudeEntry, Habit, HabitCompletion, HealthMetric, MoodEntry,
    SessionToken, Task, ThemeMode, WeeklyPlan,
};
pub use infrastructure::credential_store::{
    CredentialStore, InMemoryCredentialStore, KeyringCredentialStore,
};
pub use infrastructure::error::{ConsistencyWarning, CoreError};
pub use infrastructure::insight_generator::{
    GeneratorContext, InsightGenerator, OpenRouterGenerator, daily_motivation_prompt,
    fallback_message, goal_advice_prompt, weekly_review_prompt,
};
pub use infrastructure::postgrest::{PostgrestConfig, PostgrestRecordStore};
pub use infrastructure::record_store::{
    Filter, FilterOp, InMemoryRecordStore, OrderBy, RecordStore,
};

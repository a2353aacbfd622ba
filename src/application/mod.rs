pub mod goals;
pub mod insight_cache;
pub mod session;
pub mod stats;
pub mod streak_engine;
pub mod task_seeder;
pub mod view;
pub mod weekly_plan;
pub mod wellbeing;

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Injectable clock shared by the application services; tests pin it.
pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

use crate::domain::date::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row in `daily_tasks`. One list of these exists per (user, date), seeded
/// from the default template the first time the date is viewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub task_date: DateKey,
    pub time_slot: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub sort_order: i32,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.user_id, "task.user_id")?;
        validate_non_empty(&self.title, "task.title")?;
        validate_hhmm(&self.time_slot, "task.time_slot")?;
        if self.sort_order < 0 {
            return Err("task.sort_order must be >= 0".to_string());
        }
        Ok(())
    }
}

/// Row in `habits`. The streak counters are cached derived values maintained
/// by the streak engine, not recomputed from completion history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    pub is_active: bool,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    pub created_at: DateTime<Utc>,
}

fn default_frequency() -> String {
    "daily".to_string()
}

impl Habit {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "habit.id")?;
        validate_non_empty(&self.user_id, "habit.user_id")?;
        validate_non_empty(&self.name, "habit.name")?;
        if self.best_streak < self.current_streak {
            return Err("habit.best_streak must be >= habit.current_streak".to_string());
        }
        Ok(())
    }
}

/// Row in `habit_completions`. At most one exists per (habit, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitCompletion {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completion_date: DateKey,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

/// Row in `goals`. 90-day goals; progress is user-adjusted, clamped to [0,100].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub is_primary: bool,
    #[serde(default)]
    pub progress_percentage: i32,
    pub target_date: DateKey,
    pub status: GoalStatus,
}

impl Goal {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "goal.id")?;
        validate_non_empty(&self.user_id, "goal.user_id")?;
        validate_non_empty(&self.title, "goal.title")?;
        validate_non_empty(&self.category, "goal.category")?;
        if !(0..=100).contains(&self.progress_percentage) {
            return Err("goal.progress_percentage must be within 0..=100".to_string());
        }
        Ok(())
    }
}

/// Row in `weekly_plans`. Exactly one per (user, week_start_date); the key is
/// always a Monday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyPlan {
    pub user_id: String,
    pub week_start_date: DateKey,
    #[serde(default)]
    pub week_theme: String,
    #[serde(default)]
    pub focus_area: String,
    #[serde(default)]
    pub monday_plan: String,
    #[serde(default)]
    pub tuesday_plan: String,
    #[serde(default)]
    pub wednesday_plan: String,
    #[serde(default)]
    pub thursday_plan: String,
    #[serde(default)]
    pub friday_plan: String,
    #[serde(default)]
    pub saturday_plan: String,
    #[serde(default)]
    pub sunday_plan: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WeeklyPlan {
    /// The read path returns this when no row exists for the displayed week.
    pub fn blank(user_id: impl Into<String>, week_start_date: DateKey) -> Self {
        Self {
            user_id: user_id.into(),
            week_start_date,
            week_theme: String::new(),
            focus_area: String::new(),
            monday_plan: String::new(),
            tuesday_plan: String::new(),
            wednesday_plan: String::new(),
            thursday_plan: String::new(),
            friday_plan: String::new(),
            saturday_plan: String::new(),
            sunday_plan: String::new(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "weekly_plan.user_id")?;
        if !self.week_start_date.is_week_start() {
            return Err("weekly_plan.week_start_date must be a Monday".to_string());
        }
        Ok(())
    }
}

/// Row in `mood_entries`, keyed (user_id, entry_date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodEntry {
    pub user_id: String,
    pub entry_date: DateKey,
    pub mood_score: u8,
    pub energy_level: u8,
}

impl MoodEntry {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "mood.user_id")?;
        validate_score(self.mood_score, "mood.mood_score")?;
        validate_score(self.energy_level, "mood.energy_level")
    }
}

/// Row in `gratitude_entries`, keyed (user_id, entry_date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GratitudeEntry {
    pub user_id: String,
    pub entry_date: DateKey,
    pub entries: Vec<String>,
    #[serde(default)]
    pub mood_correlation: Option<u8>,
}

/// Row in `health_metrics`, keyed (user_id, metric_date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthMetric {
    pub user_id: String,
    pub metric_date: DateKey,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub water_intake_ml: Option<u32>,
}

impl HealthMetric {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "health.user_id")?;
        if let Some(hours) = self.sleep_hours {
            if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
                return Err("health.sleep_hours must be within 0..=24".to_string());
            }
        }
        Ok(())
    }
}

/// Row in `ai_insights`. Append-only history; the freshest same-day row per
/// (user, insight_type) is the active insight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsight {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub insight_type: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub context: serde_json::Value,
}

/// Bearer session issued at sign-in and held until sign-out. Persisted through
/// the credential store, never through the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
            && !self.user_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    Auto,
}

impl ThemeMode {
    /// Resolves `Auto` against the platform hint; `Light`/`Dark` are fixed.
    pub fn effective(self, system_prefers_dark: bool) -> ThemeMode {
        match self {
            ThemeMode::Auto if system_prefers_dark => ThemeMode::Dark,
            ThemeMode::Auto => ThemeMode::Light,
            fixed => fixed,
        }
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    let Some(minute_str) = split.next() else {
        return Err(format!("{field_name} must be HH:MM"));
    };
    if split.next().is_some() {
        return Err(format!("{field_name} must be HH:MM"));
    }

    let hour = hour_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    let minute = minute_str
        .parse::<u8>()
        .map_err(|_| format!("{field_name} must be HH:MM"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("{field_name} must be HH:MM"));
    }
    Ok(())
}

fn validate_score(value: u8, field_name: &str) -> Result<(), String> {
    if !(1..=10).contains(&value) {
        return Err(format!("{field_name} must be within 1..=10"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_task() -> Task {
        Task {
            id: "task-1".to_string(),
            user_id: "user-1".to_string(),
            task_date: DateKey::parse("2024-05-01").expect("valid date"),
            time_slot: "06:00".to_string(),
            title: "Wake up & Hydrate".to_string(),
            description: String::new(),
            completed: false,
            completed_at: None,
            duration_minutes: Some(15),
            sort_order: 0,
        }
    }

    fn sample_habit() -> Habit {
        Habit {
            id: "habit-1".to_string(),
            user_id: "user-1".to_string(),
            name: "Morning run".to_string(),
            category: "health".to_string(),
            frequency: "daily".to_string(),
            is_active: true,
            current_streak: 3,
            best_streak: 5,
            created_at: fixed_time("2024-04-01T08:00:00Z"),
        }
    }

    #[test]
    fn task_validate_rejects_blank_title_and_bad_slot() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert!(task.validate().is_err());

        let mut task = sample_task();
        task.time_slot = "6am".to_string();
        assert!(task.validate().is_err());

        assert!(sample_task().validate().is_ok());
    }

    #[test]
    fn habit_validate_enforces_streak_ordering() {
        assert!(sample_habit().validate().is_ok());

        let mut habit = sample_habit();
        habit.best_streak = 2;
        habit.current_streak = 3;
        assert!(habit.validate().is_err());
    }

    #[test]
    fn goal_validate_bounds_progress() {
        let mut goal = Goal {
            id: "goal-1".to_string(),
            user_id: "user-1".to_string(),
            title: "Ship the course".to_string(),
            description: String::new(),
            category: "career".to_string(),
            is_primary: true,
            progress_percentage: 40,
            target_date: DateKey::parse("2024-07-30").expect("valid date"),
            status: GoalStatus::Active,
        };
        assert!(goal.validate().is_ok());
        goal.progress_percentage = 101;
        assert!(goal.validate().is_err());
    }

    #[test]
    fn weekly_plan_blank_is_all_empty_and_requires_monday() {
        let monday = DateKey::parse("2024-04-29").expect("valid date");
        let plan = WeeklyPlan::blank("user-1", monday);
        assert!(plan.validate().is_ok());
        assert!(plan.week_theme.is_empty());
        assert!(plan.sunday_plan.is_empty());
        assert!(plan.updated_at.is_none());

        let wednesday = DateKey::parse("2024-05-01").expect("valid date");
        assert!(WeeklyPlan::blank("user-1", wednesday).validate().is_err());
    }

    #[test]
    fn mood_scores_are_bounded() {
        let entry = MoodEntry {
            user_id: "user-1".to_string(),
            entry_date: DateKey::parse("2024-05-01").expect("valid date"),
            mood_score: 7,
            energy_level: 5,
        };
        assert!(entry.validate().is_ok());

        let mut bad = entry.clone();
        bad.mood_score = 0;
        assert!(bad.validate().is_err());
        let mut bad = entry;
        bad.energy_level = 11;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn session_token_validity_uses_leeway() {
        let token = SessionToken {
            user_id: "user-1".to_string(),
            access_token: "jwt".to_string(),
            refresh_token: None,
            expires_at: fixed_time("2024-05-01T10:00:00Z"),
        };
        assert!(token.is_valid_at(fixed_time("2024-05-01T09:58:00Z"), 60));
        assert!(!token.is_valid_at(fixed_time("2024-05-01T09:59:30Z"), 60));
        assert!(!token.is_valid_at(fixed_time("2024-05-01T10:01:00Z"), 60));
    }

    #[test]
    fn theme_auto_resolves_against_system_hint() {
        assert_eq!(ThemeMode::Auto.effective(true), ThemeMode::Dark);
        assert_eq!(ThemeMode::Auto.effective(false), ThemeMode::Light);
        assert_eq!(ThemeMode::Light.effective(true), ThemeMode::Light);
    }

    #[test]
    fn rows_serialize_with_store_column_names() {
        let task_json = serde_json::to_value(sample_task()).expect("serialize task");
        assert_eq!(task_json["task_date"], "2024-05-01");
        assert_eq!(task_json["time_slot"], "06:00");
        assert_eq!(task_json["sort_order"], 0);

        let habit_json = serde_json::to_value(sample_habit()).expect("serialize habit");
        assert_eq!(habit_json["current_streak"], 3);
        assert_eq!(habit_json["best_streak"], 5);
        assert_eq!(habit_json["frequency"], "daily");
    }
}

use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";
const PLACEHOLDER_KEY: &str = "your_openrouter_api_key_here";
const REFERER: &str = "https://lifeos.app";
const APP_TITLE: &str = "Life OS";

const SYSTEM_PROMPT: &str = "You are a motivational life coach and productivity expert helping 9-5 professionals optimize their lives.\n\
Be encouraging, specific, and actionable. Keep responses concise (2-3 sentences).\n\
Focus on practical advice and positive reinforcement.";

const FALLBACK_MESSAGES: [&str; 8] = [
    "Every step forward, no matter how small, is progress. Keep going!",
    "Your consistency today builds the success of tomorrow. Stay focused!",
    "The fact that you're here shows you're committed to growth. That's powerful!",
    "Small daily improvements lead to stunning long-term results. You've got this!",
    "Your future self will thank you for the work you're putting in today.",
    "Excellence is not an act, but a habit. You're building that habit right now.",
    "The only way to do great work is to love what you do. Keep pursuing your goals!",
    "Success is the sum of small efforts repeated day in and day out.",
];

/// Stats the fallback selector weighs when the remote generator is
/// unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeneratorContext {
    pub completion_rate: Option<f64>,
    pub current_streak: Option<u32>,
}

/// External motivational-text generator boundary.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, context: &GeneratorContext)
    -> Result<String, CoreError>;
}

/// Picks the local fallback line: tailored messages for strong completion or
/// long streaks, otherwise a pseudo-random entry from the fixed set.
pub fn fallback_message(context: &GeneratorContext, seed: u64) -> String {
    if context.completion_rate.is_some_and(|rate| rate > 70.0) {
        return "Outstanding progress today! Your dedication is truly inspiring. Keep this momentum going!".to_string();
    }
    if let Some(streak) = context.current_streak.filter(|streak| *streak > 7) {
        return format!(
            "{streak} days strong! Your consistency is remarkable. This is how champions are made!"
        );
    }
    FALLBACK_MESSAGES[(seed % FALLBACK_MESSAGES.len() as u64) as usize].to_string()
}

pub fn daily_motivation_prompt(
    completed_tasks: usize,
    total_tasks: usize,
    active_goals: usize,
    longest_streak: u32,
) -> String {
    let completion_rate = if total_tasks > 0 {
        completed_tasks as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };
    format!(
        "Generate a brief, motivational message for a professional who:\n\
         - Completed {completed_tasks} out of {total_tasks} tasks today ({completion_rate:.0}% completion rate)\n\
         - Has {active_goals} active 90-day goals\n\
         - Has a longest habit streak of {longest_streak} days\n\n\
         Keep it encouraging, specific to their progress, and actionable. Max 2-3 sentences."
    )
}

pub fn weekly_review_prompt(
    tasks_completed: usize,
    goals_progress: i32,
    habits_completed: usize,
) -> String {
    format!(
        "Generate a weekly review message for a professional who this week:\n\
         - Completed {tasks_completed} tasks\n\
         - Made {goals_progress}% average progress on goals\n\
         - Completed {habits_completed} habit check-ins\n\n\
         Provide 2-3 sentences of encouragement and one actionable suggestion for next week."
    )
}

pub fn goal_advice_prompt(title: &str, category: &str, progress: i32, days_remaining: i64) -> String {
    format!(
        "Give advice for someone working on this {category} goal: \"{title}\"\n\
         Current progress: {progress}%\n\
         Days remaining: {days_remaining}\n\n\
         Provide 2-3 sentences of specific, actionable advice to help them succeed."
    )
}

/// Remote generator over the OpenRouter chat-completions API. Misconfiguration
/// and remote failures both degrade to the local fallback set; this client
/// never surfaces an error to its caller.
#[derive(Debug, Clone)]
pub struct OpenRouterGenerator {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenRouterGenerator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: OPENROUTER_API_URL.to_string(),
            model: MODEL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn usable_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
    }

    fn fallback(&self, context: &GeneratorContext) -> String {
        let seed = Utc::now().timestamp_micros().unsigned_abs();
        fallback_message(context, seed)
    }

    async fn request_completion(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> Result<Option<String>, CoreError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: 150,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                CoreError::Transient(format!("network error while generating insight: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            CoreError::Transient(format!("failed reading generator response: {error}"))
        })?;
        if !status.is_success() {
            return Err(CoreError::Transient(format!(
                "generator api error: http {}",
                status.as_u16()
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty()))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl InsightGenerator for OpenRouterGenerator {
    async fn generate(
        &self,
        prompt: &str,
        context: &GeneratorContext,
    ) -> Result<String, CoreError> {
        let Some(api_key) = self.usable_key() else {
            log::debug!("insight generator unconfigured; using local fallback");
            return Ok(self.fallback(context));
        };

        match self.request_completion(api_key, prompt).await {
            Ok(Some(content)) => Ok(content),
            Ok(None) => Ok(self.fallback(context)),
            Err(error) => {
                log::warn!("insight generation failed, falling back locally: {error}");
                Ok(self.fallback(context))
            }
        }
    }
}

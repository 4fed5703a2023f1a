use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScoutError};

pub const DEFAULT_RANKING_URL: &str = "https://news.naver.com/main/ranking/popularDay.naver";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime settings for the pipeline. Everything except the API key has a default.
#[derive(Clone)]
pub struct ScoutConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub ranking_url: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub model_timeout: Duration,
    /// How many items the selector asks the model to flag.
    pub pick_count: usize,
    /// How many leading titles are shown to the selector.
    pub pick_window: usize,
    pub max_presses: usize,
    pub items_per_press: usize,
    /// Character budget for text sent to the summarizer.
    pub summary_budget: usize,
    pub max_attempts: usize,
    pub retry_step: Duration,
}

impl std::fmt::Debug for ScoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoutConfig")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("ranking_url", &self.ranking_url)
            .field("cache_ttl", &self.cache_ttl)
            .field("pick_count", &self.pick_count)
            .field("pick_window", &self.pick_window)
            .field("summary_budget", &self.summary_budget)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            ranking_url: DEFAULT_RANKING_URL.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            referer: None,
            cache_ttl: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(60),
            pick_count: 5,
            pick_window: 50,
            max_presses: 10,
            items_per_press: 5,
            summary_budget: 2000,
            max_attempts: 3,
            retry_step: Duration::from_millis(2000),
        }
    }
}

impl ScoutConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first if a `.env` file should apply.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("GOOGLE_API_KEY"),
            model: get("SCOUT_MODEL").unwrap_or(defaults.model),
            api_base: get("SCOUT_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            ranking_url: get("SCOUT_RANKING_URL").unwrap_or(defaults.ranking_url),
            user_agent: get("SCOUT_USER_AGENT").unwrap_or(defaults.user_agent),
            referer: get("SCOUT_REFERER"),
            cache_ttl: parse_or(&get, "SCOUT_CACHE_TTL_SECS", 600).map(Duration::from_secs)?,
            fetch_timeout: parse_or(&get, "SCOUT_FETCH_TIMEOUT_SECS", 10).map(Duration::from_secs)?,
            model_timeout: parse_or(&get, "SCOUT_MODEL_TIMEOUT_SECS", 60).map(Duration::from_secs)?,
            pick_count: parse_or(&get, "SCOUT_PICK_COUNT", defaults.pick_count)?,
            pick_window: parse_or(&get, "SCOUT_PICK_WINDOW", defaults.pick_window)?,
            max_presses: defaults.max_presses,
            items_per_press: defaults.items_per_press,
            summary_budget: parse_or(&get, "SCOUT_SUMMARY_BUDGET", defaults.summary_budget)?,
            max_attempts: parse_or(&get, "SCOUT_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_step: parse_or(&get, "SCOUT_RETRY_STEP_MS", 2000).map(Duration::from_millis)?,
        })
    }

    pub fn model_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ScoutError::InvalidConfig { key, value: raw }),
        None => Ok(default),
    }
}

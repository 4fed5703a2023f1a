pub mod ai;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod scraper;
pub mod selection;
pub mod session;
pub mod utils;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use config::ScoutConfig;
pub use dashboard::Dashboard;
pub use error::{FailureKind, Result, ScoutError};

/// Label prefix for items the selector flagged.
pub const HIGHLIGHT_MARKER: &str = "🔥 [S급 유력]";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewsItem {
    /// Zero-based position in the de-duplicated list.
    pub rank: usize,
    pub title: String,
    pub source_name: Option<String>,
    pub link: String,
    pub is_highlighted: bool,
}

impl NewsItem {
    pub fn new(rank: usize, title: String, link: String) -> Self {
        Self {
            rank,
            title,
            source_name: None,
            link,
            is_highlighted: false,
        }
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Button text: `[press] title`, marked when highlighted.
    pub fn label(&self) -> String {
        let title = if self.is_highlighted {
            format!("{} {}", HIGHLIGHT_MARKER, self.title)
        } else {
            self.title.clone()
        };
        match &self.source_name {
            Some(press) => format!("[{}] {}", press, title),
            None => title,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArticleBody {
    pub source_link: String,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

impl ArticleBody {
    pub fn new(source_link: String, text: String) -> Self {
        Self {
            source_link,
            text,
            fetched_at: Utc::now(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisResult {
    pub related_title: String,
    pub summary_text: String,
    pub raw_model_reply: String,
}

impl AnalysisResult {
    pub fn from_reply(related_title: impl Into<String>, reply: String) -> Self {
        Self {
            related_title: related_title.into(),
            summary_text: reply.trim().to_string(),
            raw_model_reply: reply,
        }
    }
}

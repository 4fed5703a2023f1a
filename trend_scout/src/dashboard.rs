use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::ai::{GeminiClient, GenerativeModel, InlineImage, RetryingModel};
use crate::analysis::{self, ANALYSIS_UNAVAILABLE, BODY_UNAVAILABLE};
use crate::cache::TtlCache;
use crate::config::ScoutConfig;
use crate::error::{FailureKind, Result, ScoutError};
use crate::extract::Extractor;
use crate::scraper::{HttpFetcher, Lister, PageFetcher};
use crate::selection::{self, Selection};
use crate::{AnalysisResult, ArticleBody, NewsItem};

/// Either a value or the tagged reason it is missing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ready { value: T },
    Failed { kind: FailureKind, message: String },
}

impl<T> Outcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ready { value } => Some(value),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            Outcome::Ready { .. } => None,
            Outcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ready { value },
            Err(e) => Outcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// The ranked list together with the selector's flags. Cached as one unit so
/// the flags never outlive the list they were computed for.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub items: Vec<NewsItem>,
    pub selection: Selection,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    pub item: NewsItem,
    pub body: Outcome<ArticleBody>,
    /// `None` when there was no body to analyse.
    pub analysis: Option<Outcome<AnalysisResult>>,
}

pub struct Dashboard {
    config: ScoutConfig,
    lister: Lister,
    extractor: Extractor,
    model: Option<Arc<dyn GenerativeModel>>,
    board: TtlCache<Board>,
}

impl Dashboard {
    pub fn new(
        config: ScoutConfig,
        fetcher: Arc<dyn PageFetcher>,
        model: Option<Arc<dyn GenerativeModel>>,
    ) -> Result<Self> {
        Ok(Self {
            lister: Lister::new(fetcher.clone(), &config)?,
            extractor: Extractor::new(fetcher),
            board: TtlCache::new(config.cache_ttl),
            model,
            config,
        })
    }

    /// Wires the HTTP fetcher and, when a key is configured, the Gemini client
    /// behind the rate-limit retry.
    pub fn from_config(config: ScoutConfig) -> Result<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config)?);
        let model: Option<Arc<dyn GenerativeModel>> = match GeminiClient::from_config(&config) {
            Ok(client) => Some(Arc::new(RetryingModel::new(
                client,
                config.retry_step,
                config.max_attempts,
            ))),
            Err(ScoutError::ConfigMissing) => {
                warn!("GOOGLE_API_KEY missing; model-backed features are disabled");
                None
            }
            Err(e) => return Err(e),
        };
        Self::new(config, fetcher, model)
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    pub fn model_enabled(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.model_name())
    }

    /// Banner shown once when the model cannot be used.
    pub fn startup_notice(&self) -> Option<&'static str> {
        if self.model_enabled() {
            None
        } else {
            Some("GOOGLE_API_KEY가 설정되지 않았습니다. 뉴스 목록만 사용할 수 있습니다.")
        }
    }

    fn model(&self) -> Result<&dyn GenerativeModel> {
        self.model.as_deref().ok_or(ScoutError::ConfigMissing)
    }

    /// Ranked list with flags, served from cache inside the TTL. Failures are not cached.
    pub async fn board(&self) -> Result<Board> {
        if let Some(board) = self.board.get() {
            debug!("Serving ranked board from cache");
            return Ok(board);
        }
        let board = self.build_board().await?;
        self.board.put(board.clone());
        Ok(board)
    }

    /// Drops the cached board, flags included, and fetches again.
    pub async fn refresh(&self) -> Result<Board> {
        info!("Ranked board refresh requested");
        self.board.clear();
        self.board().await
    }

    #[instrument(level = "info", skip(self))]
    async fn build_board(&self) -> Result<Board> {
        let mut items = self.lister.fetch().await?;

        let selection = match self.model.as_deref() {
            Some(model) => {
                selection::select(model, &items, self.config.pick_window, self.config.pick_count)
                    .await
            }
            None => Selection::failed(FailureKind::ConfigMissing),
        };
        selection.apply(&mut items);

        Ok(Board {
            items,
            selection,
            fetched_at: Utc::now(),
        })
    }

    /// A click on the list: look the item up, extract its body, analyse it.
    ///
    /// The rank is resolved only against the cached board, never a fresh
    /// fetch. When `rendered_at` is given it must match that board's
    /// `fetched_at`, so a rank always names the button the user saw.
    pub async fn open_item(
        &self,
        rank: usize,
        rendered_at: Option<DateTime<Utc>>,
    ) -> Result<ItemDetail> {
        let board = self.board.get().ok_or(ScoutError::BoardExpired)?;
        if rendered_at.is_some_and(|at| at != board.fetched_at) {
            return Err(ScoutError::BoardExpired);
        }
        let item = board
            .items
            .into_iter()
            .find(|item| item.rank == rank)
            .ok_or(ScoutError::UnknownItem(rank))?;
        Ok(self.open(item).await)
    }

    #[instrument(level = "info", skip_all, fields(rank = item.rank, link = %item.link))]
    pub async fn open(&self, item: NewsItem) -> ItemDetail {
        let body = self.extractor.extract(&item.link).await;

        let analysis = match &body {
            Ok(body) => {
                let result = match self.model() {
                    Ok(model) => {
                        analysis::analyze_article(model, &item, body, self.config.summary_budget)
                            .await
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    warn!(error = %e, "Article analysis unavailable");
                }
                Some(Outcome::from(result))
            }
            Err(e) => {
                warn!(error = %e, "Article body unavailable; skipping analysis");
                None
            }
        };

        ItemDetail {
            item,
            body: Outcome::from(body),
            analysis,
        }
    }

    pub async fn analyze_text(&self, label: &str, text: &str) -> Result<AnalysisResult> {
        analysis::analyze_text(self.model()?, label, text, self.config.summary_budget).await
    }

    pub async fn analyze_images(
        &self,
        images: &[InlineImage],
        note: Option<&str>,
    ) -> Result<AnalysisResult> {
        analysis::analyze_images(self.model()?, images, note).await
    }

    /// Fetch-then-summarize each link in turn and collect the results in one
    /// buffer. A failing link leaves a sentinel line and the loop moves on.
    #[instrument(level = "info", skip_all, fields(links = links.len()))]
    pub async fn digest(&self, links: &[String]) -> Result<String> {
        let model = self.model()?;
        let mut buffer = String::new();

        for (i, link) in links.iter().enumerate() {
            buffer.push_str(&format!("## {}. {}\n", i + 1, link));
            match self.extractor.extract(link).await {
                Ok(body) => {
                    match analysis::analyze_text(model, link, &body.text, self.config.summary_budget)
                        .await
                    {
                        Ok(result) => buffer.push_str(&result.summary_text),
                        Err(e) => {
                            warn!(link = %link, error = %e, "Digest summary failed");
                            buffer.push_str(ANALYSIS_UNAVAILABLE);
                        }
                    }
                }
                Err(e) => {
                    warn!(link = %link, error = %e, "Digest fetch failed");
                    buffer.push_str(BODY_UNAVAILABLE);
                }
            }
            buffer.push_str("\n\n");
        }

        Ok(buffer.trim_end().to_string())
    }
}

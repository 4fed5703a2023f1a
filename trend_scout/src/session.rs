use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{ANALYSIS_UNAVAILABLE, BODY_UNAVAILABLE};
use crate::dashboard::{Board, ItemDetail, Outcome};
use crate::error::{FailureKind, Result};
use crate::{AnalysisResult, ArticleBody, NewsItem};

pub const LIST_UNAVAILABLE: &str = "뉴스를 불러올 수 없습니다";
pub const VERDICT_BANNER: &str = "🎯 AI 판정: 이 소재는 유튜브 황금 키워드입니다!";
pub const DETAIL_PLACEHOLDER: &str = "👈 왼쪽 리스트에서 🔥 표시된 뉴스부터 클릭해 보세요!";
pub const SELECTION_UNAVAILABLE: &str = "AI 추천을 불러오지 못했습니다. 목록은 그대로 사용할 수 있습니다.";

/// One button in the list panel.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub rank: usize,
    pub title: String,
    pub source_name: Option<String>,
    pub link: String,
    pub highlighted: bool,
    pub label: String,
}

impl From<&NewsItem> for ItemView {
    fn from(item: &NewsItem) -> Self {
        Self {
            rank: item.rank,
            title: item.title.clone(),
            source_name: item.source_name.clone(),
            link: item.link.clone(),
            highlighted: item.is_highlighted,
            label: item.label(),
        }
    }
}

/// The list panel. A failed fetch renders as an empty list with a notice, never an error page.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub items: Vec<ItemView>,
    pub notice: Option<String>,
    pub failure: Option<FailureKind>,
    pub selection_notice: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl BoardView {
    pub fn from_result(result: Result<Board>) -> Self {
        match result {
            Ok(board) => Self {
                items: board.items.iter().map(ItemView::from).collect(),
                notice: None,
                failure: None,
                selection_notice: board
                    .selection
                    .failure
                    .filter(|kind| *kind != FailureKind::ConfigMissing)
                    .map(|_| SELECTION_UNAVAILABLE.to_string()),
                fetched_at: Some(board.fetched_at),
            },
            Err(e) => Self {
                items: Vec::new(),
                notice: Some(LIST_UNAVAILABLE.to_string()),
                failure: Some(e.kind()),
                selection_notice: None,
                fetched_at: None,
            },
        }
    }
}

/// The detail panel.
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    pub title: Option<String>,
    pub link: Option<String>,
    pub banner: Option<&'static str>,
    pub body: String,
    pub analysis: String,
    pub failure: Option<FailureKind>,
}

impl DetailView {
    pub fn placeholder() -> Self {
        Self {
            title: None,
            link: None,
            banner: None,
            body: String::new(),
            analysis: DETAIL_PLACEHOLDER.to_string(),
            failure: None,
        }
    }
}

/// Per-session state: the last opened item and the most recent analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionView {
    pub item: Option<NewsItem>,
    pub body: Option<Outcome<ArticleBody>>,
    pub analysis: Option<Outcome<AnalysisResult>>,
}

impl SessionView {
    /// Replaces the whole view; nothing from the previous item survives.
    pub fn open(&mut self, detail: ItemDetail) {
        self.item = Some(detail.item);
        self.body = Some(detail.body);
        self.analysis = detail.analysis;
    }

    /// Stores a free-text or image analysis as the latest result. It has no
    /// article of its own, so the previously opened item is dropped.
    pub fn record_analysis(&mut self, result: Outcome<AnalysisResult>) {
        self.item = None;
        self.body = None;
        self.analysis = Some(result);
    }

    fn analysis_text(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .and_then(Outcome::value)
            .map(|result| result.summary_text.as_str())
            .filter(|text| !text.trim().is_empty())
    }

    /// Text fed into a script draft as reference material: the last analysis,
    /// or the last article body when there is none.
    pub fn draft_context(&self) -> Option<&str> {
        self.analysis_text().or_else(|| {
            self.body
                .as_ref()
                .and_then(Outcome::value)
                .map(|body| body.text.as_str())
        })
    }

    pub fn detail(&self) -> DetailView {
        let Some(item) = &self.item else {
            let mut view = DetailView::placeholder();
            if let Some(result) = self.analysis.as_ref().and_then(Outcome::value) {
                view.title = Some(result.related_title.clone());
                view.analysis = result.summary_text.clone();
            }
            return view;
        };

        let body = match self.body.as_ref().and_then(Outcome::value) {
            Some(body) => body.text.clone(),
            None => BODY_UNAVAILABLE.to_string(),
        };
        let analysis = match self.analysis.as_ref().and_then(Outcome::value) {
            Some(result) => result.summary_text.clone(),
            None => ANALYSIS_UNAVAILABLE.to_string(),
        };
        let failure = self
            .body
            .as_ref()
            .and_then(Outcome::failure)
            .or_else(|| self.analysis.as_ref().and_then(Outcome::failure));

        DetailView {
            title: Some(item.title.clone()),
            link: Some(item.link.clone()),
            banner: item.is_highlighted.then_some(VERDICT_BANNER),
            body,
            analysis,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoutError;
    use crate::selection::Selection;

    fn item(highlighted: bool) -> NewsItem {
        let mut item = NewsItem::new(0, "A".to_string(), "https://n.news.naver.com/a".to_string())
            .with_source("연합뉴스");
        item.is_highlighted = highlighted;
        item
    }

    fn detail(highlighted: bool, reply: Result<String>) -> ItemDetail {
        ItemDetail {
            item: item(highlighted),
            body: Outcome::Ready {
                value: ArticleBody::new("https://n.news.naver.com/a".to_string(), "본문".to_string()),
            },
            analysis: Some(Outcome::from(reply.map(|r| AnalysisResult::from_reply("A", r)))),
        }
    }

    #[test]
    fn test_failed_fetch_renders_notice() {
        let view = BoardView::from_result(Err(ScoutError::UpstreamStatus {
            url: "u".to_string(),
            status: 503,
        }));
        assert!(view.items.is_empty());
        assert_eq!(view.notice.as_deref(), Some(LIST_UNAVAILABLE));
        assert_eq!(view.failure, Some(FailureKind::UpstreamStatus));
    }

    #[test]
    fn test_board_view_labels() {
        let board = Board {
            items: vec![item(true)],
            selection: Selection::failed(FailureKind::RateLimited),
            fetched_at: Utc::now(),
        };
        let view = BoardView::from_result(Ok(board));
        assert_eq!(view.items[0].label, "[연합뉴스] 🔥 [S급 유력] A");
        assert_eq!(view.selection_notice.as_deref(), Some(SELECTION_UNAVAILABLE));
    }

    #[test]
    fn test_empty_session_shows_placeholder() {
        let view = SessionView::default().detail();
        assert_eq!(view.analysis, DETAIL_PLACEHOLDER);
        assert!(view.title.is_none());
    }

    #[test]
    fn test_highlighted_item_gets_banner() {
        let mut session = SessionView::default();
        session.open(detail(true, Ok("등급: S".to_string())));
        let view = session.detail();
        assert_eq!(view.banner, Some(VERDICT_BANNER));
        assert_eq!(view.body, "본문");
        assert_eq!(view.analysis, "등급: S");
        assert_eq!(session.draft_context(), Some("등급: S"));
    }

    #[test]
    fn test_failed_analysis_shows_sentinel() {
        let mut session = SessionView::default();
        session.open(detail(false, Err(ScoutError::RateLimited)));
        let view = session.detail();
        assert!(view.banner.is_none());
        assert_eq!(view.analysis, ANALYSIS_UNAVAILABLE);
        assert_eq!(view.failure, Some(FailureKind::RateLimited));
        assert_eq!(session.draft_context(), Some("본문"));
    }

    #[test]
    fn test_free_text_analysis_without_item() {
        let mut session = SessionView::default();
        assert!(session.draft_context().is_none());
        session.record_analysis(Outcome::Ready {
            value: AnalysisResult::from_reply("메모", "메모 요약".to_string()),
        });
        assert_eq!(session.detail().analysis, "메모 요약");
        assert_eq!(session.draft_context(), Some("메모 요약"));
    }

    #[test]
    fn test_free_text_analysis_replaces_opened_item() {
        let mut session = SessionView::default();
        session.open(detail(true, Ok("등급: S".to_string())));
        session.record_analysis(Outcome::Ready {
            value: AnalysisResult::from_reply("직접 입력", "메모 요약".to_string()),
        });

        let view = session.detail();
        assert_eq!(view.title.as_deref(), Some("직접 입력"));
        assert!(view.link.is_none());
        assert!(view.banner.is_none());
        assert!(view.body.is_empty());
        assert_eq!(view.analysis, "메모 요약");
        assert_eq!(session.draft_context(), Some("메모 요약"));
    }

    #[test]
    fn test_opening_replaces_previous_item() {
        let mut session = SessionView::default();
        session.open(detail(true, Ok("첫 분석".to_string())));
        session.open(ItemDetail {
            item: item(false),
            body: Outcome::from(Err::<ArticleBody, _>(ScoutError::NoContent("u".to_string()))),
            analysis: None,
        });
        let view = session.detail();
        assert_eq!(view.body, BODY_UNAVAILABLE);
        assert_eq!(view.analysis, ANALYSIS_UNAVAILABLE);
        assert_eq!(view.failure, Some(FailureKind::NoContent));
    }
}

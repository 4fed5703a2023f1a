use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScoutError};
use crate::scraper::PageFetcher;
use crate::ArticleBody;

/// Content containers tried in order; the first one present wins.
pub const CONTENT_SELECTORS: &[&str] = &[
    "#dic_area",
    "#newsct_article",
    "#articleBodyContents",
    "#articeBody",
    "article",
];

static PROBES: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| (*s, Selector::parse(s).unwrap()))
        .collect()
});

static NOISE: Lazy<Selector> = Lazy::new(|| Selector::parse("script, style").unwrap());

/// Text of the first matching content container, with blank lines squeezed.
/// `None` when no container matched or the match was empty.
pub fn extract_body_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    for (name, selector) in PROBES.iter() {
        let Some(container) = doc.select(selector).next() else {
            continue;
        };
        let text = element_text(container);
        if text.is_empty() {
            debug!(selector = name, "Content container matched but was empty");
            continue;
        }
        debug!(selector = name, chars = text.chars().count(), "Content container matched");
        return Some(text);
    }

    None
}

fn element_text(container: ElementRef) -> String {
    let skipped: Vec<_> = container.select(&NOISE).map(|el| el.id()).collect();

    let mut raw = String::new();
    for node in container.descendants() {
        if node.ancestors().any(|a| skipped.contains(&a.id())) {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            raw.push_str(text);
        } else if let Some(el) = node.value().as_element() {
            if el.name() == "br" || el.name() == "p" {
                raw.push('\n');
            }
        }
    }

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Extractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> Result<ArticleBody> {
        let html = self.fetcher.fetch(url).await?;
        match extract_body_text(&html) {
            Some(text) => {
                info!(chars = text.chars().count(), "Article body extracted");
                Ok(ArticleBody::new(url.to_string(), text))
            }
            None => {
                warn!("No known content container on article page");
                Err(ScoutError::NoContent(url.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::tests::StubFetcher;

    #[test]
    fn test_first_container_wins() {
        let html = r#"
            <div id="dic_area">본문 A</div>
            <div id="newsct_article">본문 B</div>
        "#;
        assert_eq!(extract_body_text(html).as_deref(), Some("본문 A"));
    }

    #[test]
    fn test_falls_back_to_second_container() {
        let html = r#"<html><body><div id="newsct_article"><p>둘째 컨테이너</p></div></body></html>"#;
        assert_eq!(extract_body_text(html).as_deref(), Some("둘째 컨테이너"));
    }

    #[test]
    fn test_empty_container_is_skipped() {
        let html = r#"
            <div id="dic_area">   </div>
            <div id="articleBodyContents">셋째</div>
        "#;
        assert_eq!(extract_body_text(html).as_deref(), Some("셋째"));
    }

    #[test]
    fn test_scripts_and_line_breaks() {
        let html = r#"<div id="dic_area">첫 줄<br>둘째   줄<script>var x = 1;</script><br><br>셋째 줄</div>"#;
        assert_eq!(extract_body_text(html).as_deref(), Some("첫 줄\n둘째 줄\n셋째 줄"));
    }

    #[test]
    fn test_no_container() {
        assert!(extract_body_text("<html><body><p>menu</p></body></html>").is_none());
    }

    #[tokio::test]
    async fn test_extractor_reports_missing_content() {
        let fetcher = StubFetcher::default().with_page("https://n.news.naver.com/1", "<p>x</p>");
        let extractor = Extractor::new(Arc::new(fetcher));
        let err = extractor.extract("https://n.news.naver.com/1").await.unwrap_err();
        assert_eq!(err.kind(), crate::FailureKind::NoContent);
    }

    #[tokio::test]
    async fn test_extractor_returns_body() {
        let fetcher = StubFetcher::default()
            .with_page("https://n.news.naver.com/2", r#"<div id="newsct_article">내용</div>"#);
        let extractor = Extractor::new(Arc::new(fetcher));
        let body = extractor.extract("https://n.news.naver.com/2").await.unwrap();
        assert_eq!(body.text, "내용");
        assert_eq!(body.source_link, "https://n.news.naver.com/2");
    }
}

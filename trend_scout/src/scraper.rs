use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::NewsItem;

static RANKING_BOX: Lazy<Selector> = Lazy::new(|| Selector::parse(".rankingnews_box").unwrap());
static PRESS_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".rankingnews_name").unwrap());
static RANKING_ENTRY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".rankingnews_list li").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Source of raw HTML. The HTTP implementation is swapped for stubs in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScoutConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("SCOUT_USER_AGENT", &config.user_agent)?);
        if let Some(referer) = &config.referer {
            headers.insert(REFERER, header_value("SCOUT_REFERER", referer)?);
        }

        Ok(Self {
            client: Client::builder()
                .timeout(config.fetch_timeout)
                .default_headers(headers)
                .build()?,
        })
    }
}

fn header_value(key: &'static str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| ScoutError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching page");
        let res = self.client.get(url).send().await?;

        if !res.status().is_success() {
            warn!(url, status = %res.status(), "Upstream page returned an error status");
            return Err(ScoutError::UpstreamStatus {
                url: url.to_string(),
                status: res.status().as_u16(),
            });
        }

        Ok(res.text().await?)
    }
}

/// One `<li>` of a ranking box before de-duplication.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub press: Option<String>,
    pub title: String,
    pub link: String,
}

/// Walks the press boxes of the ranking page in document order.
///
/// Returns an error only when the page carries no ranking boxes at all, which
/// means the layout changed or a block page was served.
pub fn parse_ranking(
    html: &str,
    base_url: &Url,
    max_presses: usize,
    items_per_press: usize,
) -> Result<Vec<RankingEntry>> {
    let doc = Html::parse_document(html);
    let boxes: Vec<ElementRef> = doc.select(&RANKING_BOX).take(max_presses).collect();

    if boxes.is_empty() {
        return Err(ScoutError::parse("ranking page", "no .rankingnews_box element"));
    }

    let mut entries = Vec::new();
    for ranking_box in boxes {
        let press = ranking_box
            .select(&PRESS_NAME)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|name| !name.is_empty());

        for li in ranking_box.select(&RANKING_ENTRY).take(items_per_press) {
            let Some(anchor) = li.select(&ANCHOR).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let title = collapse_whitespace(&anchor.text().collect::<String>());
            if title.is_empty() {
                continue;
            }
            let link = match base_url.join(href) {
                Ok(link) => link.to_string(),
                Err(e) => {
                    debug!(href, error = %e, "Skipping unresolvable ranking link");
                    continue;
                }
            };
            entries.push(RankingEntry {
                press: press.clone(),
                title,
                link,
            });
        }
    }

    Ok(entries)
}

/// Drops repeated titles (exact, case-sensitive) keeping the first occurrence,
/// then numbers the survivors in encounter order.
pub fn dedupe_by_title(entries: Vec<RankingEntry>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.title.clone()))
        .enumerate()
        .map(|(rank, entry)| {
            let item = NewsItem::new(rank, entry.title, entry.link);
            match entry.press {
                Some(press) => item.with_source(press),
                None => item,
            }
        })
        .collect()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetches and parses the ranking page. Holds no cache of its own.
pub struct Lister {
    fetcher: Arc<dyn PageFetcher>,
    ranking_url: Url,
    max_presses: usize,
    items_per_press: usize,
}

impl Lister {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ScoutConfig) -> Result<Self> {
        let ranking_url = Url::parse(&config.ranking_url).map_err(|_| ScoutError::InvalidConfig {
            key: "SCOUT_RANKING_URL",
            value: config.ranking_url.clone(),
        })?;

        Ok(Self {
            fetcher,
            ranking_url,
            max_presses: config.max_presses,
            items_per_press: config.items_per_press,
        })
    }

    #[instrument(level = "info", skip_all, fields(url = %self.ranking_url))]
    pub async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let html = self.fetcher.fetch(self.ranking_url.as_str()).await?;
        let entries = parse_ranking(&html, &self.ranking_url, self.max_presses, self.items_per_press)?;
        let raw = entries.len();
        let items = dedupe_by_title(entries);
        info!(raw, unique = items.len(), "Ranking list fetched");
        Ok(items)
    }
}

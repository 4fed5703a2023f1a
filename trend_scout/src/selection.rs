use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ai::GenerativeModel;
use crate::error::{FailureKind, Result, ScoutError};
use crate::NewsItem;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([\d\s,]*\d[\d\s,]*)\]").unwrap());

/// Prompt asking the model for the `pick_count` most clickable titles, by index.
pub fn build_pick_prompt(items: &[NewsItem], pick_count: usize) -> String {
    let titles = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i, item.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "너는 구독자 100만 유튜브 채널의 기획자야. 다음 뉴스 중 일반 시청자가 가장 많이 클릭할 \
         소재(S급) {count}개를 골라 번호만 써줘. 다른 설명 없이 [1, 5, 10] 처럼 대괄호 안에 \
         쉼표로 구분해서 답해.\n{titles}",
        count = pick_count,
        titles = titles
    )
}

/// Reads a pick list out of a free-text reply.
///
/// Accepted shapes, tried in order:
/// 1. a bracketed integer list anywhere in the reply: `[1, 5, 10]`
/// 2. comma or newline separated bare integers: `1, 5, 10`
/// 3. titles quoted back verbatim, matched as substrings of the reply
///
/// Indices outside `0..titles.len()` are dropped; duplicates keep their first
/// position. An empty result is a parse error.
pub fn parse_picks(reply: &str, titles: &[&str]) -> Result<Vec<usize>> {
    let candidates = bracketed_indices(reply)
        .or_else(|| bare_indices(reply))
        .unwrap_or_else(|| title_matches(reply, titles));

    let mut seen = BTreeSet::new();
    let picks: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| i < titles.len())
        .filter(|&i| seen.insert(i))
        .collect();

    if picks.is_empty() {
        return Err(ScoutError::parse("pick list", truncate_for_log(reply, 120)));
    }
    Ok(picks)
}

fn bracketed_indices(reply: &str) -> Option<Vec<usize>> {
    let caps = BRACKETED.captures(reply)?;
    let indices: Vec<usize> = caps[1]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|tok| tok.parse().ok())
        .collect();
    (!indices.is_empty()).then_some(indices)
}

fn bare_indices(reply: &str) -> Option<Vec<usize>> {
    let indices: Vec<usize> = reply
        .split(|c: char| c == ',' || c == '\n')
        .map(|seg| seg.trim().trim_end_matches(['.', '번']))
        .filter(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|seg| seg.parse().ok())
        .collect();
    (!indices.is_empty()).then_some(indices)
}

fn title_matches(reply: &str, titles: &[&str]) -> Vec<usize> {
    titles
        .iter()
        .enumerate()
        .filter(|(_, title)| !title.is_empty() && reply.contains(*title))
        .map(|(i, _)| i)
        .collect()
}

fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

/// Outcome of one selector run. A failure leaves the set empty but keeps the reason.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    pub picks: BTreeSet<usize>,
    pub failure: Option<FailureKind>,
}

impl Selection {
    pub fn failed(kind: FailureKind) -> Self {
        Self {
            picks: BTreeSet::new(),
            failure: Some(kind),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.picks.contains(&index)
    }

    /// Sets `is_highlighted` on every item, clearing stale flags.
    pub fn apply(&self, items: &mut [NewsItem]) {
        for (i, item) in items.iter_mut().enumerate() {
            item.is_highlighted = self.contains(i);
        }
    }
}

/// Runs the selector over the first `window` items. Never returns an error:
/// any failure degrades to an empty selection tagged with its kind.
#[instrument(level = "info", skip_all, fields(items = items.len(), window, pick_count))]
pub async fn select(
    model: &dyn GenerativeModel,
    items: &[NewsItem],
    window: usize,
    pick_count: usize,
) -> Selection {
    let shown = &items[..items.len().min(window)];
    if shown.is_empty() {
        return Selection::default();
    }

    let prompt = build_pick_prompt(shown, pick_count);
    let reply = match model.generate(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Selector call failed; no items flagged");
            return Selection::failed(e.kind());
        }
    };

    let titles: Vec<&str> = shown.iter().map(|item| item.title.as_str()).collect();
    match parse_picks(&reply, &titles) {
        Ok(picks) => {
            let picks: BTreeSet<usize> = picks.into_iter().take(pick_count.max(1)).collect();
            info!(?picks, "Selector flagged items");
            Selection {
                picks,
                failure: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Selector reply unparsable; no items flagged");
            Selection::failed(e.kind())
        }
    }
}

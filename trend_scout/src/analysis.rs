use tracing::{info, instrument};

use crate::ai::{GenerativeModel, InlineImage};
use crate::error::Result;
use crate::{AnalysisResult, ArticleBody, NewsItem};

pub const BODY_UNAVAILABLE: &str = "본문을 가져올 수 없습니다.";
pub const ANALYSIS_UNAVAILABLE: &str = "분석 결과를 가져올 수 없습니다.";

/// Cuts `text` to at most `budget` characters on a char boundary.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_analysis_prompt(title: &str, body: &str, budget: usize) -> String {
    format!(
        "너는 유튜브 시사 채널의 메인 작가야. 다음 뉴스를 분석해.\n\
         제목: {title}\n\
         본문: {body}\n\n\
         1. 소재 등급 판정 (S, A, B) 및 근거\n\
         2. 핵심 내용 3줄 요약과 키워드 5개\n\
         3. 타겟 감정 분석 (분노/공감/충격 %)\n\
         4. 클릭을 부르는 제목 3가지\n\
         5. 0~25초 훅을 포함한 대본 구성안\n\
         6. 썸네일 구도 레퍼런스 및 문구",
        title = title,
        body = truncate_chars(body, budget)
    )
}

pub fn build_text_prompt(text: &str, budget: usize) -> String {
    format!(
        "너는 유튜브 시사 채널의 메인 작가야. 아래 자료를 읽고 핵심 내용 3줄 요약, \
         키워드 5개, 영상 소재로서의 등급(S, A, B)과 그 근거를 정리해.\n\n{}",
        truncate_chars(text, budget)
    )
}

pub fn build_vision_prompt(note: Option<&str>) -> String {
    let mut prompt = String::from(
        "첨부한 이미지를 분석해. 썸네일이라면 구도, 문구, 색감이 클릭을 부르는지 평가하고 \
         개선안 3가지를 제시해. 캡처 자료라면 핵심 내용을 요약해.",
    );
    if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
        prompt.push_str("\n\n참고 메모: ");
        prompt.push_str(note);
    }
    prompt
}

/// Summarizer on an extracted article. The reply is kept verbatim.
#[instrument(level = "info", skip_all, fields(title = %item.title))]
pub async fn analyze_article(
    model: &dyn GenerativeModel,
    item: &NewsItem,
    body: &ArticleBody,
    budget: usize,
) -> Result<AnalysisResult> {
    let prompt = build_analysis_prompt(&item.title, &body.text, budget);
    let reply = model.generate(&prompt).await?;
    info!(reply_chars = reply.chars().count(), "Article analysed");
    Ok(AnalysisResult::from_reply(item.title.clone(), reply))
}

/// Summarizer on user-supplied free text.
#[instrument(level = "info", skip_all)]
pub async fn analyze_text(
    model: &dyn GenerativeModel,
    label: &str,
    text: &str,
    budget: usize,
) -> Result<AnalysisResult> {
    let reply = model.generate(&build_text_prompt(text, budget)).await?;
    Ok(AnalysisResult::from_reply(label, reply))
}

#[instrument(level = "info", skip_all, fields(images = images.len()))]
pub async fn analyze_images(
    model: &dyn GenerativeModel,
    images: &[InlineImage],
    note: Option<&str>,
) -> Result<AnalysisResult> {
    let reply = model
        .generate_with_images(&build_vision_prompt(note), images)
        .await?;
    Ok(AnalysisResult::from_reply("이미지 분석", reply))
}

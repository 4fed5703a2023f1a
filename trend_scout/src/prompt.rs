use serde::{Deserialize, Serialize};
use thiserror::Error;

const PERSONA_BLOCK: &str = "\
[역할]
너는 구독자 100만 시사·이슈 유튜브 채널의 메인 작가다.

[문체 규칙]
- 첫 0~25초 안에 시청자가 이탈하지 못하게 만드는 강한 훅으로 시작한다.
- 문장은 짧고 단정적으로, 구어체로 쓴다.
- 사실과 의견을 구분하고, 확인되지 않은 내용은 단정하지 않는다.
- 중간중간 시청자에게 질문을 던져 댓글 참여를 유도한다.

[출력 형식]
1. 클릭을 부르는 제목 후보 3개
2. 썸네일 문구 2개
3. 3,500자 분량의 대본 (훅 → 배경 → 핵심 쟁점 → 반전/전망 → 마무리)";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("제목을 입력해주세요.")]
    MissingTitle,

    #[error("핵심 팩트를 입력해주세요.")]
    MissingFacts,
}

/// Hand-typed fields for the script prompt. Only `title` and `facts` are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub facts: String,
    #[serde(default)]
    pub benchmark: String,
    #[serde(default)]
    pub sentiment: String,
}

impl PromptDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingTitle);
        }
        if self.facts.trim().is_empty() {
            return Err(DraftError::MissingFacts);
        }
        Ok(())
    }

    /// Interpolates the fields into one copyable instruction. Field values are
    /// inserted as typed; `context` is appended as reference material when given.
    pub fn build(&self, context: Option<&str>) -> Result<String, DraftError> {
        self.validate()?;

        let mut out = String::with_capacity(PERSONA_BLOCK.len() + self.facts.len() + 256);
        out.push_str(PERSONA_BLOCK);
        out.push_str("\n\n[영상 제목]\n");
        out.push_str(&self.title);
        out.push_str("\n\n[핵심 팩트]\n");
        out.push_str(&self.facts);

        if !self.benchmark.trim().is_empty() {
            out.push_str("\n\n[벤치마킹 레퍼런스]\n");
            out.push_str(&self.benchmark);
        }
        if !self.sentiment.trim().is_empty() {
            out.push_str("\n\n[시청자 여론/댓글 반응]\n");
            out.push_str(&self.sentiment);
        }
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            out.push_str("\n\n[참고 자료]\n");
            out.push_str(context);
        }

        out.push_str("\n\n위 자료를 바탕으로 출력 형식에 맞춰 작성해줘.");
        Ok(out)
    }
}

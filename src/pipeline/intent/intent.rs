use std::sync::Arc;

use crate::pipeline::llm::{ChatModel, LlmError, Message};

pub const SYSTEM_PERSONA: &str = "You are an SEO consultant.";

const INTENT_TEMPLATE: &str = "\
This summary comes from one of the top-ranked results for a search keyword.
Because it ranks near the top, we can assume its content satisfies the search intent.
From this content, infer the original searcher's intent. Specifically:

Intent type: which of the four classes Know, Go, Do, Buy it falls into
Attributes: what kind of person the searcher is (age group, business or individual, family structure, life stage, etc.)
Content type: classify as article, service, e-commerce, or other
Explicit needs: needs the intended reader already has in mind while reading
Latent needs: needs the reader is not aware of but that could surface given some trigger
Situation: in what situation and for what purpose the search was made
Dissatisfaction points: also explain what the searcher may find unsatisfying about this site

The original search keyword is \"{keyword}\".
Please answer in {language}. Let's think step by step.
{summary}";

pub fn intent_prompt(keyword: &str, summary: &str, language: &str) -> Vec<Message> {
    let human = INTENT_TEMPLATE
        .replace("{keyword}", keyword)
        .replace("{language}", language)
        .replace("{summary}", summary);
    vec![Message::system(SYSTEM_PERSONA), Message::user(human)]
}

/// Asks the model what the searcher wanted. The reply is kept verbatim.
#[derive(Clone)]
pub struct IntentInferencer {
    model: Arc<dyn ChatModel>,
    language: String,
}

impl IntentInferencer {
    pub fn new(model: Arc<dyn ChatModel>, language: impl Into<String>) -> Self {
        Self {
            model,
            language: language.into(),
        }
    }

    pub async fn infer_intent(&self, keyword: &str, summary: &str) -> Result<String, LlmError> {
        let messages = intent_prompt(keyword, summary, &self.language);
        self.model.complete(&messages).await
    }
}

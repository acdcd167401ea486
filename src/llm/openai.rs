use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::llm::parser::parse_verdict;
use crate::llm::prompts::{judge_system_prompt, judge_user_prompt, text_block, ANALYZER_SYSTEM_PROMPT};
use crate::llm::provider::{AnalysisEngine, JudgeEngine};
use crate::models::{Article, ExtractedContent, Verdict};

/// Chat-completions client for OpenAI and API-compatible gateways. One
/// instance per model; the same type serves as judge and analyzer.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    judge_prompt: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl OpenAiProvider {
    pub fn new(config: &EngineConfig, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            judge_prompt: judge_system_prompt(
                &config.research_prefer,
                &config.research_not_prefer,
                &config.translation_language,
            ),
        })
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request_body = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LLMApi(format!(
                "{} returned {}: {}",
                self.model, status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMApi(format!("Failed to parse completion: {}", e)))?;

        if let Some(error) = result.error {
            return Err(Error::LLMApi(error.message));
        }

        let text = result
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(Error::LLMApi(format!("Empty response from {}", self.model)));
        }

        Ok(text)
    }
}

fn analysis_parts(content: &ExtractedContent) -> Vec<ContentPart> {
    let texts = content.texts.iter().map(|t| ContentPart::Text { text: text_block(t) });
    let figures = content.figures.iter().map(|f| ContentPart::ImageUrl {
        image_url: ImageUrl { url: f.data_url() },
    });
    texts.chain(figures).collect()
}

#[async_trait]
impl JudgeEngine for OpenAiProvider {
    async fn judge(&self, article: &Article) -> Result<Verdict> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(self.judge_prompt.clone()),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Text(judge_user_prompt(article)?),
            },
        ];

        let text = self.complete(messages).await?;
        parse_verdict(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnalysisEngine for OpenAiProvider {
    async fn analyze(&self, content: &ExtractedContent) -> Result<String> {
        tracing::debug!(
            "Sending {} text segments and {} figures to {}",
            content.texts.len(),
            content.figures.len(),
            self.model
        );

        let messages = vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(ANALYZER_SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(analysis_parts(content)),
            },
        ];

        self.complete(messages).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

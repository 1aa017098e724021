use std::env;

use async_trait::async_trait;
use quiz_core::model::GeneratedQuestionSet;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::QuestionGenerator;
use crate::error::GenerationError;

const SYSTEM_PROMPT: &str = "You are a helpful assistant specialized in creating educational \
multiple-choice questions. Ensure questions are clear, concise and accurate. \
Write in the same language as the topic you are given.";

const CHOICES_PER_QUESTION: usize = 4;

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    /// Read `QUIZ_AI_*` variables. `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Instruction sent as the user message.
#[must_use]
pub fn build_user_prompt(topic: &str, count: u8) -> String {
    format!(
        r#"Generate {count} multiple-choice questions based on the prompt "{topic}".
Each question must include:
- A clear question statement
- {CHOICES_PER_QUESTION} answer options
- Exactly one option marked as correct
- An explanation
Respond with a single JSON object shaped like this:
{{
    "title": "Short title",
    "description": "Short description",
    "questions": [
        {{
            "text": "...",
            "choices": [
                {{"text": "choice text", "is_correct": true}}
            ],
            "explanation": "..."
        }}
    ]
}}"#
    )
}

/// `QuestionGenerator` backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl ChatCompletionGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl QuestionGenerator for ChatCompletionGenerator {
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
    ) -> Result<GeneratedQuestionSet, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(prompt, count),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 1.3,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        parse_generated(&content)
    }

    fn model_name(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.model.as_str())
    }
}

/// Parse message content, tolerating a fenced code block around the JSON.
fn parse_generated(content: &str) -> Result<GeneratedQuestionSet, GenerationError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(json.trim()).map_err(|e| GenerationError::Malformed(e.to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "title": "Rust traits",
        "description": "dispatch and coherence",
        "questions": [
            {
                "text": "Which keyword declares a trait?",
                "choices": [
                    {"text": "trait", "is_correct": true},
                    {"text": "impl", "is_correct": false}
                ],
                "explanation": "Traits are declared with `trait`."
            }
        ]
    }"#;

    #[test]
    fn parses_plain_json_content() {
        let set = parse_generated(PAYLOAD).unwrap();
        assert_eq!(set.title, "Rust traits");
        assert_eq!(set.questions.len(), 1);
        assert_eq!(set.questions[0].correct_index(), Some(0));
    }

    #[test]
    fn parses_fenced_json_content() {
        let fenced = format!("```json\n{PAYLOAD}\n```");
        assert_eq!(parse_generated(&fenced).unwrap().title, "Rust traits");
    }

    #[test]
    fn rejects_non_json_content() {
        let err = parse_generated("Sure! Here are your questions.").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn prompt_mentions_topic_and_count() {
        let prompt = build_user_prompt("borrow checker", 7);
        assert!(prompt.contains("Generate 7 multiple-choice questions"));
        assert!(prompt.contains("\"borrow checker\""));
    }

    #[test]
    fn request_serializes_response_format_type() {
        let value = serde_json::to_value(ResponseFormat {
            kind: "json_object",
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "type": "json_object" }));
    }

    #[tokio::test]
    async fn disabled_generator_refuses() {
        let generator = ChatCompletionGenerator::new(None);
        assert!(!generator.enabled());
        assert!(generator.model_name().is_none());
        let err = generator.generate("anything at all", 3).await.unwrap_err();
        assert!(matches!(err, GenerationError::Disabled));
    }
}

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::OpenAiConfig;
use crate::specialist::Specialist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// One model invocation: a system instruction and a user payload.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message {
                role: Role::System,
                content: self.system.clone(),
            },
            Message {
                role: Role::User,
                content: self.user.clone(),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub token_count: Option<u32>,
}

/// Hosted language model boundary: prompt in, text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ModelRequest) -> Result<Completion>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Chat-completions client for OpenAI and API-compatible servers.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn with_config(config: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiClient {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: &ModelRequest) -> Result<Completion> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat completion API error ({}): {}", status, body));
        }

        let payload: ChatCompletionResponse = response.json().await?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(Completion {
            text,
            token_count: payload.usage.map(|usage| usage.total_tokens),
        })
    }
}

/// Single-turn prompted completion that never fails.
///
/// Transport, quota and timeout errors are logged and replaced with the
/// calling specialist's canned fallback text.
#[derive(Clone)]
pub struct Completer {
    model: Arc<dyn ChatModel>,
    model_name: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Completer {
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>, temperature: f32) -> Self {
        Completer {
            model,
            model_name: model_name.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn from_config(model: Arc<dyn ChatModel>, config: &OpenAiConfig) -> Self {
        Completer::new(model, config.model.clone(), config.temperature).with_max_tokens(config.max_tokens)
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub async fn complete(&self, specialist: Specialist, system: &str, user: &str) -> String {
        self.complete_with_usage(specialist, system, user).await.text
    }

    pub async fn complete_with_usage(
        &self,
        specialist: Specialist,
        system: &str,
        user: &str,
    ) -> Completion {
        let request = ModelRequest {
            system: with_brevity(system, specialist.word_limit()),
            user: user.to_string(),
            model: self.model_name.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        log::debug!("[{}] prompt: {}", specialist, preview(user, 80));

        match self.model.chat(&request).await {
            Ok(completion) => {
                let text = completion.text.trim().to_string();
                log::debug!(
                    "[{}] response ({} chars, {:?} tokens)",
                    specialist,
                    text.len(),
                    completion.token_count
                );
                Completion {
                    text,
                    token_count: completion.token_count,
                }
            }
            Err(e) => {
                log::warn!("[{}] model call failed, using fallback: {:#}", specialist, e);
                Completion {
                    text: specialist.fallback_text(user),
                    token_count: None,
                }
            }
        }
    }
}

fn with_brevity(system: &str, word_limit: Option<u32>) -> String {
    match word_limit {
        Some(limit) => format!("{}\nRespond in ≤{} words.", system, limit),
        None => system.to_string(),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn trims_model_output() {
        let model = ScriptedModel::new(|_| Ok("  hello there \n".to_string()));
        let completer = Completer::new(Arc::new(model), "gpt-4o", 0.7);

        let text = completer
            .complete(Specialist::StageStrategist, "system", "user")
            .await;
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn empty_output_is_valid() {
        let model = ScriptedModel::new(|_| Ok(String::new()));
        let completer = Completer::new(Arc::new(model), "gpt-4o", 0.7);

        let text = completer
            .complete(Specialist::PricingStrategist, "system", "user")
            .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn failure_returns_specialist_fallback() {
        let model = ScriptedModel::new(|_| Err(anyhow!("quota exceeded")));
        let completer = Completer::new(Arc::new(model), "gpt-4o", 0.7);

        let pricing = completer
            .complete(Specialist::PricingStrategist, "system", "user")
            .await;
        assert_eq!(pricing, fallback::PRICING_STRATEGY);

        let stage = completer
            .complete(Specialist::StageStrategist, "system", "stage: qualification")
            .await;
        assert!(stage.contains("fit and buying intent"));

        let judge = completer
            .complete(Specialist::CustomerSimulator, "system", "user")
            .await;
        assert_eq!(judge, fallback::GENERIC_ERROR);
    }

    #[tokio::test]
    async fn brevity_directive_is_appended_for_limited_specialists() {
        let model = Arc::new(ScriptedModel::new(|_| Ok("ok".to_string())));
        let completer = Completer::new(model.clone(), "gpt-4o", 0.7);

        completer
            .complete(Specialist::RebuttalWriter, "Write a rebuttal.", "user")
            .await;
        completer
            .complete(Specialist::StageStrategist, "Plan the stage.", "user")
            .await;

        let requests = model.requests();
        assert_eq!(requests[0].system, "Write a rebuttal.\nRespond in ≤50 words.");
        assert_eq!(requests[1].system, "Plan the stage.");
        assert_eq!(requests[0].model, "gpt-4o");
    }

    #[test]
    fn messages_keep_system_first() {
        let request = ModelRequest {
            system: "sys".to_string(),
            user: "usr".to_string(),
            model: "m".to_string(),
            temperature: 0.2,
            max_tokens: None,
        };
        let messages = request.messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "usr");
    }

    #[test]
    fn chat_response_without_usage_parses() {
        let payload: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        )
        .unwrap();
        assert!(payload.usage.is_none());
        assert_eq!(payload.choices[0].message.content.as_deref(), Some("hi"));
    }
}

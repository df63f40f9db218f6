//! OpenAI-style chat completions with function calling.
//!
//! The image travels as a `data:` URL inside a single user message, next to
//! the prompt text. The structured stage forces the classification tool via
//! `tool_choice`; the free-text stage sends the same message without tools.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ChatTransport, FinishReason, ToolDefinition, ToolInvocation, ToolReply};
use crate::{error::ProviderError, models::ProviderRequest};

const MAX_COMPLETION_TOKENS: u32 = 300;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

pub struct OpenAiTransport {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTransport {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn messages(request: &ProviderRequest) -> Value {
        json!([{
            "role": "user",
            "content": [
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": request.image.data_url(),
                        "detail": request.detail.as_str(),
                    }
                }
            ]
        }])
    }

    async fn send(&self, body: Value) -> Result<Choice, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: "OpenAI",
                status,
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl ChatTransport for OpenAiTransport {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn call_with_tool(
        &self,
        request: &ProviderRequest,
        tool: &ToolDefinition,
    ) -> Result<ToolReply, ProviderError> {
        debug!(model = %self.model, tool = %tool.name, detail = %request.detail, "Sending function-call request");

        let body = json!({
            "model": self.model,
            "max_completion_tokens": MAX_COMPLETION_TOKENS,
            "messages": Self::messages(request),
            "tools": [{
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }],
            "tool_choice": { "type": "function", "function": { "name": tool.name } },
        });

        let choice = self.send(body).await?;
        let finish = FinishReason::from_wire(choice.finish_reason.as_deref().unwrap_or("stop"));
        let calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                name: call.function.name,
                arguments: Value::String(call.function.arguments),
            })
            .collect();

        Ok(ToolReply { finish, calls })
    }

    async fn call_for_text(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        debug!(model = %self.model, detail = %request.detail, "Sending free-text request");

        let body = json!({
            "model": self.model,
            "max_completion_tokens": MAX_COMPLETION_TOKENS,
            "messages": Self::messages(request),
        });

        let choice = self.send(body).await?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

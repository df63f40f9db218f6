//! Ollama `/api/chat` with tool calling.
//!
//! Ollama takes images as raw base64 on a message's `images` field, so the
//! request is a system message (the prompt), a user instruction, and a user
//! message carrying the image. There is no detail setting on this endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ChatTransport, FinishReason, ToolDefinition, ToolInvocation, ToolReply};
use crate::{error::ProviderError, models::ProviderRequest};

const USER_INSTRUCTION: &str = "Classify this screenshot and suggest a filename for it.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
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
    arguments: Value,
}

pub struct OllamaTransport {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaTransport {
    pub fn new(client: Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    fn messages(request: &ProviderRequest) -> Value {
        json!([
            { "role": "system", "content": request.prompt },
            { "role": "user", "content": USER_INSTRUCTION },
            { "role": "user", "content": "", "images": [request.image.base64] },
        ])
    }

    async fn send(&self, body: Value) -> Result<ChatResponse, ProviderError> {
        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: "Ollama",
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatTransport for OllamaTransport {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn call_with_tool(
        &self,
        request: &ProviderRequest,
        tool: &ToolDefinition,
    ) -> Result<ToolReply, ProviderError> {
        debug!(model = %self.model, tool = %tool.name, "Sending tool-call request");

        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": Self::messages(request),
            "tools": [{
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            }],
        });

        let response = self.send(body).await?;
        // Older servers omit done_reason on completed replies
        let finish = FinishReason::from_wire(response.done_reason.as_deref().unwrap_or("stop"));
        let calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ToolReply { finish, calls })
    }

    async fn call_for_text(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        debug!(model = %self.model, "Sending free-text request");

        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": Self::messages(request),
        });

        let response = self.send(body).await?;
        Ok(response.message.content)
    }
}

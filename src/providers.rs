pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    error::ProviderError,
    extractor::extract_record,
    models::{ClassificationResult, DetailLevel, ImageData, ProviderRequest},
    prompt::build_prompt,
    validator::validate_record,
};

pub use ollama::OllamaTransport;
pub use openai::OpenAiTransport;

/// Name of the single function the model is asked to call.
pub const TOOL_NAME: &str = "name_screenshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Ollama,
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o-mini",
            Provider::Ollama => "llava",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Ollama => write!(f, "Ollama"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The `{category?, filename}` function the structured stage asks for.
pub fn classification_tool() -> ToolDefinition {
    let mut parameters = schemars::schema_for!(ClassificationResult).to_value();
    if let Some(object) = parameters.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }

    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Record the category and suggested filename for the screenshot".to_string(),
        parameters,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolUse,
    Other(String),
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" => FinishReason::Stop,
            "tool_calls" | "function_call" | "tool_use" => FinishReason::ToolUse,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    /// Either a JSON-encoded string (OpenAI) or an inline object (Ollama).
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolReply {
    pub finish: FinishReason,
    pub calls: Vec<ToolInvocation>,
}

/// Wire-level adapter for one chat endpoint. It only shapes requests and
/// decodes replies; deciding what a reply means is done by `RenameProvider`.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn call_with_tool(
        &self,
        request: &ProviderRequest,
        tool: &ToolDefinition,
    ) -> Result<ToolReply, ProviderError>;

    async fn call_for_text(&self, request: &ProviderRequest) -> Result<String, ProviderError>;
}

/// Anything that can turn an image into a classification. Never fails:
/// "could not classify" is `ClassificationResult::unknown()`.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: ImageData, detail: DetailLevel) -> ClassificationResult;
}

/// Why the structured stage did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallthrough {
    FinishReason(String),
    NoToolCall,
    WrongTool(String),
    UnparsableArguments,
    Rejected,
}

impl fmt::Display for Fallthrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallthrough::FinishReason(reason) => write!(f, "model finished with '{}'", reason),
            Fallthrough::NoToolCall => write!(f, "model did not call the tool"),
            Fallthrough::WrongTool(name) => write!(f, "model called unknown tool '{}'", name),
            Fallthrough::UnparsableArguments => write!(f, "tool arguments were not valid JSON"),
            Fallthrough::Rejected => write!(f, "tool arguments failed validation"),
        }
    }
}

pub fn resolve_tool_reply(reply: &ToolReply) -> Result<ClassificationResult, Fallthrough> {
    if let FinishReason::Other(reason) = &reply.finish {
        return Err(Fallthrough::FinishReason(reason.clone()));
    }

    let call = reply.calls.first().ok_or(Fallthrough::NoToolCall)?;
    if call.name != TOOL_NAME {
        return Err(Fallthrough::WrongTool(call.name.clone()));
    }

    let arguments = match &call.arguments {
        Value::String(raw) => {
            serde_json::from_str(raw).map_err(|_| Fallthrough::UnparsableArguments)?
        }
        Value::Object(_) => call.arguments.clone(),
        _ => return Err(Fallthrough::UnparsableArguments),
    };

    validate_record(&arguments).ok_or(Fallthrough::Rejected)
}

pub fn resolve_text_reply(text: &str) -> Option<ClassificationResult> {
    if text.trim().is_empty() {
        debug!("Free-text reply was empty");
        return None;
    }
    extract_record(text).and_then(|record| validate_record(&record))
}

/// Structured call first, free-text call second, sentinel last.
pub struct RenameProvider {
    transport: Box<dyn ChatTransport>,
    prompt: String,
    call_timeout: Duration,
    tool: ToolDefinition,
}

impl RenameProvider {
    pub fn new(
        transport: impl ChatTransport + 'static,
        base_prompt: &str,
        categories: &BTreeMap<String, String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            prompt: build_prompt(base_prompt, categories),
            call_timeout,
            tool: classification_tool(),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
        }
    }

    async fn structured_stage(&self, request: &ProviderRequest) -> Option<ClassificationResult> {
        let reply = match self
            .bounded(self.transport.call_with_tool(request, &self.tool))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(provider = self.transport.name(), error = %e, "Structured call failed, retrying as free text");
                return None;
            }
        };

        match resolve_tool_reply(&reply) {
            Ok(result) => Some(result),
            Err(reason) => {
                warn!(provider = self.transport.name(), %reason, "Structured call unusable, retrying as free text");
                None
            }
        }
    }

    async fn free_text_stage(&self, request: &ProviderRequest) -> Option<ClassificationResult> {
        let text = match self.bounded(self.transport.call_for_text(request)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = self.transport.name(), error = %e, "Free-text call failed");
                return None;
            }
        };

        let result = resolve_text_reply(&text);
        if result.is_none() {
            debug!(provider = self.transport.name(), reply = %text, "No usable record in free-text reply");
        }
        result
    }
}

#[async_trait]
impl Classifier for RenameProvider {
    async fn classify(&self, image: ImageData, detail: DetailLevel) -> ClassificationResult {
        let request = ProviderRequest {
            image,
            detail,
            prompt: self.prompt.clone(),
        };

        if let Some(result) = self.structured_stage(&request).await {
            return result;
        }
        if let Some(result) = self.free_text_stage(&request).await {
            return result;
        }

        warn!(provider = self.transport.name(), "Both call stages failed to classify the image");
        ClassificationResult::unknown()
    }
}

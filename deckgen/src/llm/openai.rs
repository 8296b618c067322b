//! Blocking OpenAI-compatible chat-completions client.
//!
//! One client serves all three collaborator roles: free-text planning,
//! schema-constrained deck writing (`response_format: json_schema`, strict),
//! and vision critique over data-URL image parts.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::io::config::LlmConfig;
use crate::llm::{LlmError, ResponseSchema, StructuredCompletion, TextCompletion, VisionCritique};

/// Cap on error-body text carried into feedback and logs.
const ERROR_BODY_LIMIT: usize = 2_000;

pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let raw = std::env::var(&config.api_key_env)
            .with_context(|| format!("read environment variable {}", config.api_key_env))?;
        let api_key = clean_api_key(&raw);
        if api_key.is_empty() {
            bail!("{} is set but empty", config.api_key_env);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.call_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    #[instrument(skip_all, fields(model = %self.model, structured = response_format.is_some()))]
    fn send(
        &self,
        messages: Vec<ChatMessage>,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Service {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Malformed(format!("completion envelope: {e}")))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyCompletion)?
            .message;
        if let Some(refusal) = message.refusal
            && !refusal.is_empty()
        {
            return Err(LlmError::Malformed(format!("completion refused: {refusal}")));
        }
        let content = message.content.ok_or(LlmError::EmptyCompletion)?;
        if content.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

impl TextCompletion for OpenAiClient {
    fn complete_text(&self, system: &str, user: &str) -> Result<String, LlmError> {
        self.send(
            vec![
                ChatMessage::system(system.to_string()),
                ChatMessage::user(user.to_string()),
            ],
            None,
        )
    }
}

impl StructuredCompletion for OpenAiClient {
    fn complete_structured(
        &self,
        system: &str,
        user: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, LlmError> {
        let content = self.send(
            vec![
                ChatMessage::system(system.to_string()),
                ChatMessage::user(user.to_string()),
            ],
            Some(ResponseFormat::json_schema(schema)),
        )?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| LlmError::Malformed(format!("structured content: {e}")))?;
        validate_against(schema, &value)?;
        Ok(value)
    }
}

impl VisionCritique for OpenAiClient {
    #[instrument(skip_all, fields(images = images.len()))]
    fn critique_images(&self, instruction: &str, images: &[PathBuf]) -> Result<String, LlmError> {
        let mut parts = vec![ContentPart::Text {
            text: instruction.to_string(),
        }];
        for path in images {
            let data = fs::read(path)
                .map_err(|e| LlmError::Transport(format!("read image {}: {e}", path.display())))?;
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/png;base64,{}", STANDARD.encode(&data)),
                },
            });
        }
        self.send(
            vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            }],
            None,
        )
    }
}

/// Validate `value` against the response schema, joining violations.
fn validate_against(schema: &ResponseSchema, value: &Value) -> Result<(), LlmError> {
    let compiled = jsonschema::validator_for(&schema.schema)
        .map_err(|e| LlmError::Malformed(format!("invalid response schema: {e}")))?;
    if compiled.is_valid(value) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(LlmError::Malformed(format!(
        "schema violations: {}",
        messages.join("; ")
    )))
}

/// Strip whitespace and stray quoting from an API key pasted into an env var.
/// Keys copied from chat apps routinely arrive wrapped in straight or smart
/// quotes.
fn clean_api_key(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .trim()
        .to_string()
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &text[..end])
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

impl ChatMessage {
    fn system(text: String) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text),
        }
    }

    fn user(text: String) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

impl ResponseFormat {
    fn json_schema(schema: &ResponseSchema) -> Self {
        Self {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: schema.name.clone(),
                strict: true,
                schema: schema.schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

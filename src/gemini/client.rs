use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gemini::prompt::PromptParts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-request generation knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Successful generation outcome.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Failure of a single generate or list-models call.
#[derive(Debug)]
pub enum GenerateFailure {
    /// Provider signalled a rate-limit/quota condition.
    Quota { model: String, message: String },
    /// Provider rejected the request for any other reason.
    Rejected {
        model: String,
        status: StatusCode,
        message: String,
    },
    /// The request never produced a provider response.
    Request { source: reqwest::Error },
    /// Response parsed but carried no text candidates.
    Empty { model: String },
}

impl GenerateFailure {
    /// True for the one failure class that warrants a same-model retry.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Quota { .. })
    }
}

impl fmt::Display for GenerateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quota { model, message } => {
                write!(f, "{model} is rate limited: {message}")
            }
            Self::Rejected {
                model,
                status,
                message,
            } => write!(f, "{model} rejected the request ({status}): {message}"),
            Self::Request { source } => write!(f, "request failed: {source}"),
            Self::Empty { model } => {
                write!(f, "{model} response did not contain any text")
            }
        }
    }
}

impl std::error::Error for GenerateFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            _ => None,
        }
    }
}

/// Seam between the invocation engine and the HTTP client.
pub trait GenerateBackend {
    /// Submits prompt parts to one named model.
    async fn generate(
        &self,
        model: &str,
        parts: &PromptParts,
        options: GenerateOptions,
    ) -> Result<GenerateReply, GenerateFailure>;

    /// Lists the model names this credential can call `generateContent` on.
    async fn list_models(&self) -> Result<Vec<String>, GenerateFailure>;
}

/// Generative Language API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }
}

impl GenerateBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        parts: &PromptParts,
        options: GenerateOptions,
    ) -> Result<GenerateReply, GenerateFailure> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url,
            qualified(model),
            self.api_key
        );

        let mut request = self
            .client
            .post(&url)
            .json(&GenerateContentRequest::from_parts(parts, options));
        if let Some(timeout_secs) = options.timeout_secs {
            request = request.timeout(Duration::from_secs(timeout_secs));
        }

        let response = request
            .send()
            .await
            .map_err(|source| GenerateFailure::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(model, status, &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|source| GenerateFailure::Request { source })?;

        let usage = body.usage_metadata.map(|usage| Usage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        });
        let text = body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts.unwrap_or_default())
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GenerateFailure::Empty {
                model: model.to_string(),
            });
        }

        Ok(GenerateReply { text, usage })
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerateFailure> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| GenerateFailure::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure("models", status, &body));
        }

        let body: ModelsResponse = response
            .json()
            .await
            .map_err(|source| GenerateFailure::Request { source })?;

        Ok(body
            .models
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| {
                entry
                    .supported_generation_methods
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|entry| entry.name)
            .collect())
    }
}

/// Renders the wire request as JSON, for `--dry-run` and `--save`.
pub fn request_body(parts: &PromptParts, options: GenerateOptions) -> Value {
    serde_json::to_value(GenerateContentRequest::from_parts(parts, options))
        .unwrap_or(Value::Null)
}

/// Ensures the `models/` prefix the REST paths expect.
fn qualified(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Maps an error response to the retry taxonomy: HTTP 429 and the
/// `RESOURCE_EXHAUSTED` status marker are quota signals, everything else
/// is a plain rejection.
fn classify_failure(model: &str, status: StatusCode, body: &str) -> GenerateFailure {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let detail = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                detail
            } else {
                format!("{status_text}: {detail}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    let quota = status == StatusCode::TOO_MANY_REQUESTS || message.contains("RESOURCE_EXHAUSTED");
    if quota {
        GenerateFailure::Quota {
            model: model.to_string(),
            message,
        }
    } else {
        GenerateFailure::Rejected {
            model: model.to_string(),
            status,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn from_parts(parts: &PromptParts, options: GenerateOptions) -> Self {
        let mut wire_parts = Vec::new();
        if !parts.text.trim().is_empty() {
            wire_parts.push(WirePart::Text {
                text: parts.text.clone(),
            });
        }
        if let Some(image) = &parts.image {
            wire_parts.push(WirePart::Inline {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: BASE64_STANDARD.encode(&image.data),
                },
            });
        }

        let generation_config =
            if options.temperature.is_some() || options.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: options.temperature,
                    max_output_tokens: options.max_output_tokens,
                })
            } else {
                None
            };

        Self {
            contents: vec![Content {
                role: "user",
                parts: wire_parts,
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Option<Vec<ModelEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    supported_generation_methods: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

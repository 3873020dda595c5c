//! Gemini vision provider implementation.
//!
//! Sends the prompt and the image as inline data to Gemini's
//! `generateContent` endpoint. The API key travels per call so that a
//! request-supplied key can override the configured one.

use super::{FinishReason, ProviderError, ProviderResponse, VisionProvider};
use crate::config::GeminiSettings;
use crate::services::image::DecodedImage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Model id, with or without the `models/` prefix.
    pub model: String,
    /// Base URL up to and including the API version, e.g. `.../v1beta`.
    pub api_base: String,
    pub timeout: Duration,
}

impl From<&GeminiSettings> for GeminiConfig {
    fn from(settings: &GeminiSettings) -> Self {
        Self {
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Gemini multimodal provider.
pub struct GeminiVisionProvider {
    model: String,
    api_base: String,
    client: Client,
}

impl GeminiVisionProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        let model = config
            .model
            .trim()
            .trim_start_matches("models/")
            .to_string();
        if model.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini model name is empty".to_string(),
            ));
        }

        Ok(Self {
            model,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build the API URL for the given method.
    fn api_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, method)
    }

    fn build_request(prompt: &str, image: &DecodedImage) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.to_string(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl VisionProvider for GeminiVisionProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        image: &DecodedImage,
        api_key: &SecretString,
    ) -> Result<ProviderResponse, ProviderError> {
        if api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not provided".to_string(),
            ));
        }

        let request = Self::build_request(prompt, image);
        let url = self.api_url("generateContent");

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            image_bytes = image.size(),
            mime_type = image.mime_type,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited);
            }

            let message = format!(
                "Gemini API error {}: {}",
                status,
                api_error_message(&error_text)
            );
            if status == StatusCode::BAD_REQUEST {
                return Err(ProviderError::InvalidRequest(message));
            }
            return Err(ProviderError::ApiError(message));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        parse_response(api_response)
    }
}

/// Prefer the `error.message` field of a Gemini error body over the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn parse_response(api_response: GenerateContentResponse) -> Result<ProviderResponse, ProviderError> {
    let Some(candidate) = api_response.candidates.first() else {
        if let Some(reason) = api_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
            return Err(ProviderError::ContentFiltered);
        }
        return Err(ProviderError::EmptyResponse);
    };

    let finish_reason = FinishReason::from_api(candidate.finish_reason.as_deref());
    if finish_reason == FinishReason::ContentFilter {
        return Err(ProviderError::ContentFiltered);
    }

    // Long answers may be split across several text parts.
    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let usage = api_response.usage_metadata.unwrap_or_default();

    Ok(ProviderResponse {
        text,
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
        finish_reason,
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use serde_json::json;

    fn sample_image() -> DecodedImage {
        DecodedImage {
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            mime_type: "image/png",
            bytes: vec![1, 2, 3],
        }
    }

    fn provider(model: &str, api_base: &str) -> GeminiVisionProvider {
        GeminiVisionProvider::new(GeminiConfig {
            model: model.to_string(),
            api_base: api_base.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn models_prefix_is_stripped_from_url() {
        let p = provider("models/gemini-1.5-pro-latest", "https://example.test/v1beta/");
        assert_eq!(p.model(), "gemini-1.5-pro-latest");
        assert_eq!(
            p.api_url("generateContent"),
            "https://example.test/v1beta/models/gemini-1.5-pro-latest:generateContent"
        );
    }

    #[test]
    fn empty_model_is_rejected() {
        let result = GeminiVisionProvider::new(GeminiConfig {
            model: "models/".to_string(),
            api_base: "https://example.test".to_string(),
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn request_puts_prompt_before_inline_image() {
        let body = serde_json::to_value(GeminiVisionProvider::build_request(
            "describe",
            &sample_image(),
        ))
        .unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "describe" },
                        { "inline_data": { "mime_type": "image/png", "data": "AQID" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn text_parts_are_concatenated() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "## Ans" }, { "text": "wer" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15 }
        }))
        .unwrap();

        let parsed = parse_response(response).unwrap();
        assert_eq!(parsed.text, "## Answer");
        assert_eq!(parsed.input_tokens, 12);
        assert_eq!(parsed.output_tokens, 3);
        assert_eq!(parsed.finish_reason, FinishReason::Complete);
    }

    #[test]
    fn unknown_parts_do_not_break_parsing() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "functionCall": { "name": "x" } }, { "text": "ok" }] }
            }]
        }))
        .unwrap();

        assert_eq!(parse_response(response).unwrap().text, "ok");
    }

    #[test]
    fn safety_stop_is_content_filtered() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(matches!(
            parse_response(response),
            Err(ProviderError::ContentFiltered)
        ));

        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(matches!(
            parse_response(response),
            Err(ProviderError::ContentFiltered)
        ));
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            parse_response(response),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn api_error_message_prefers_structured_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("upstream exploded"), "upstream exploded");
    }

    #[tokio::test]
    async fn blank_api_key_fails_without_network() {
        let p = provider("gemini-1.5-pro-latest", "http://127.0.0.1:9");
        let result = p
            .generate("p", &sample_image(), &SecretString::new(String::new()))
            .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}

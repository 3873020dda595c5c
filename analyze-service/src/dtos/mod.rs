//! Request and response bodies for the HTTP API.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 image, optionally as a `data:` URL. Required; checked after parsing
    /// so that a missing field gets its own error message. An explicit `null`
    /// counts as missing.
    #[serde(default)]
    pub image: Option<String>,

    /// Overrides the configured Gemini key for this request only.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

impl AnalyzeRequest {
    /// Parse a raw body, distinguishing non-JSON, empty and mis-shaped payloads.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::bad_request("Empty request data"));
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(format!("Request must be JSON: {}", e)))?;

        let map = match value {
            serde_json::Value::Null => return Err(AppError::bad_request("Empty request data")),
            serde_json::Value::Object(map) if map.is_empty() => {
                return Err(AppError::bad_request("Empty request data"));
            }
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(AppError::bad_request(
                    "Invalid request body: expected a JSON object",
                ));
            }
        };

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e)))
    }
}

#[async_trait]
impl<S> FromRequest<S> for AnalyzeRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(AppError::bad_request("Request must be JSON"));
        }

        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(rejection.body_text())
            } else {
                AppError::bad_request(format!("Failed to read request body: {}", rejection))
            }
        })?;

        Self::from_json_bytes(&body)
    }
}

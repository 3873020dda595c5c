//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderResponse, VisionProvider};
use crate::services::image::DecodedImage;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Outcome {
    Text(String),
    Fail(String),
}

/// Records what it was called with and answers with a canned result.
pub struct MockVisionProvider {
    outcome: Outcome,
    calls: AtomicUsize,
    last_api_key: Mutex<Option<String>>,
    last_prompt: Mutex<Option<String>>,
    last_mime_type: Mutex<Option<String>>,
}

impl MockVisionProvider {
    /// Provider that always answers with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Text(text.into()))
    }

    /// Provider whose calls always fail with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Fail(message.into()))
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_api_key: Mutex::new(None),
            last_prompt: Mutex::new(None),
            last_mime_type: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.last_api_key.lock().ok().and_then(|k| k.clone())
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    pub fn last_mime_type(&self) -> Option<String> {
        self.last_mime_type.lock().ok().and_then(|m| m.clone())
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-vision"
    }

    async fn generate(
        &self,
        prompt: &str,
        image: &DecodedImage,
        api_key: &SecretString,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut key) = self.last_api_key.lock() {
            *key = Some(api_key.expose_secret().clone());
        }
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if let Ok(mut mime) = self.last_mime_type.lock() {
            *mime = Some(image.mime_type.to_string());
        }

        match &self.outcome {
            Outcome::Text(text) => Ok(ProviderResponse {
                text: text.clone(),
                input_tokens: prompt.len() as i32 / 4,
                output_tokens: text.len() as i32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            Outcome::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }
}

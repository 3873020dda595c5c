use crate::dtos::{AnalyzeRequest, AnalyzeResponse};
use crate::services::decode_base64_image;
use crate::startup::AppState;
use axum::{extract::State, Json};
use secrecy::{ExposeSecret, SecretString};
use service_core::error::AppError;

const PREVIEW_CHARS: usize = 100;

/// A non-blank key in the request wins over the configured default.
fn resolve_api_key<'a>(
    request_key: Option<&'a SecretString>,
    default_key: Option<&'a SecretString>,
) -> Option<&'a SecretString> {
    request_key
        .filter(|k| !k.expose_secret().trim().is_empty())
        .or(default_key)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}

/// `POST /analyze`: validate, decode, ask the provider, relay its text.
///
/// Validation short-circuits in order (image present, key resolvable), so a
/// rejected request never reaches the decoder or the provider.
#[tracing::instrument(name = "analyze_image", skip_all)]
pub async fn analyze_image(
    State(state): State<AppState>,
    request: AnalyzeRequest,
) -> Result<Json<AnalyzeResponse>, AppError> {
    tracing::info!("Received request to /analyze");

    let AnalyzeRequest { image, api_key } = request;

    let image = image.ok_or_else(|| AppError::bad_request("Image data is required"))?;

    let api_key = resolve_api_key(api_key.as_ref(), state.config.gemini.api_key.as_ref())
        .ok_or_else(|| AppError::bad_request("API key is required"))?;

    let image = tokio::task::spawn_blocking(move || decode_base64_image(&image))
        .await
        .map_err(|e| anyhow::anyhow!("Image decoding task failed: {}", e))?
        .map_err(|e| AppError::UnprocessableImage(e.to_string()))?;

    tracing::info!(
        format = ?image.format,
        width = image.width,
        height = image.height,
        bytes = image.size(),
        "Successfully decoded image"
    );

    let prompt = state.config.prompt_style.text();

    tracing::info!(
        provider = state.provider.name(),
        model = state.provider.model(),
        prompt_style = %state.config.prompt_style,
        "Sending request to provider"
    );

    let result = state
        .provider
        .generate(prompt, &image, api_key)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    tracing::info!(
        input_tokens = result.input_tokens,
        output_tokens = result.output_tokens,
        finish_reason = ?result.finish_reason,
        preview = %preview(&result.text),
        "Received response from provider"
    );

    Ok(Json(AnalyzeResponse {
        response: result.text,
    }))
}

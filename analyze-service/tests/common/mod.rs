#![allow(dead_code)]

use analyze_service::config::AnalyzeConfig;
use analyze_service::services::providers::mock::MockVisionProvider;
use analyze_service::startup::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use secrecy::SecretString;
use std::io::Cursor;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const CONFIGURED_KEY: &str = "configured-test-key";

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockVisionProvider>,
}

impl TestApp {
    /// Router backed by a mock provider answering `answer`.
    pub fn with_answer(answer: &str, configured_key: Option<&str>) -> Self {
        Self::with_provider(MockVisionProvider::new(answer), configured_key)
    }

    pub fn with_provider(provider: MockVisionProvider, configured_key: Option<&str>) -> Self {
        let mut config = AnalyzeConfig::default();
        config.gemini.api_key = configured_key.map(|k| SecretString::new(k.to_string()));
        Self::with_config(provider, config)
    }

    pub fn with_config(provider: MockVisionProvider, config: AnalyzeConfig) -> Self {
        let provider = Arc::new(provider);
        let router = build_router(AppState::new(config, provider.clone()));
        Self { router, provider }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        read_json(response).await
    }
}

pub async fn read_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn encoded_image(format: ImageOutputFormat) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    general_purpose::STANDARD.encode(buf)
}

pub fn png_base64() -> String {
    encoded_image(ImageOutputFormat::Png)
}

pub fn jpeg_base64() -> String {
    encoded_image(ImageOutputFormat::Jpeg(85))
}

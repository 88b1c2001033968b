use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::ImageEditService;
use crate::media::EncodedMedia;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Edited images are always handed back as PNG.
pub const EDITED_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
}

pub struct GeminiImageClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiImageClient {
    pub fn new(http: GeminiHttpClient, model: String) -> Self {
        Self { http, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ImageEditService for GeminiImageClient {
    async fn transform_image(&self, image: &EncodedMedia, instruction: &str) -> Result<EncodedMedia> {
        if instruction.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "instruction must not be empty".to_string(),
            ));
        }
        image.ensure_present("image")?;

        tracing::debug!(
            "Transforming {} image with {} ({} chars of instruction)",
            image.mime_type(),
            self.model,
            instruction.len()
        );

        let request = ImageRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData::from(image),
                    },
                    Part::Text {
                        text: instruction.to_string(),
                    },
                ],
            }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        };

        let response: GenerateContentResponse =
            self.http.generate_content(&self.model, &request).await?;

        let image_data = response
            .first_parts()
            .iter()
            .find_map(|p| match p {
                Part::InlineData { inline_data } if !inline_data.data.is_empty() => {
                    Some(inline_data)
                }
                _ => None,
            })
            .ok_or(Error::NoImageReturned)?;

        tracing::debug!(
            "Gemini returned image with mime_type: {}",
            image_data.mime_type
        );

        Ok(EncodedMedia::from_base64(
            image_data.data.clone(),
            EDITED_IMAGE_MIME,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamKind;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

    fn make_client(server: &MockServer) -> GeminiImageClient {
        let http = GeminiHttpClient::new("key".to_string(), Duration::from_secs(5))
            .with_base_url(server.uri());
        GeminiImageClient::new(http, DEFAULT_MODEL.to_string())
    }

    fn room() -> EncodedMedia {
        EncodedMedia::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    #[tokio::test]
    async fn test_transform_image_returns_first_inline_part() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": room().data() } },
                        { "text": "Add a cat wearing sunglasses" }
                    ]
                }],
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here is your cat." },
                            { "inlineData": { "mimeType": "image/webp", "data": "iVBORw==" } },
                            { "inlineData": { "mimeType": "image/png", "data": "second" } }
                        ]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let edited = make_client(&server)
            .transform_image(&room(), "Add a cat wearing sunglasses")
            .await
            .unwrap();

        assert_eq!(edited.data(), "iVBORw==");
        assert_eq!(edited.mime_type(), EDITED_IMAGE_MIME);
    }

    #[tokio::test]
    async fn test_text_only_response_is_no_image_returned() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I can't edit that." }] }
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .transform_image(&room(), "make it blue")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoImageReturned));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_no_image_returned() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .transform_image(&room(), "make it blue")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoImageReturned));
    }

    #[tokio::test]
    async fn test_quota_error_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = make_client(&server)
            .transform_image(&room(), "make it blue")
            .await
            .unwrap_err();
        match err {
            Error::Upstream(e) => {
                assert_eq!(e.kind, UpstreamKind::RateLimited);
                assert_eq!(e.message, "quota exceeded");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preconditions_fail_without_network() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = make_client(&server);

        let err = client.transform_image(&room(), "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let empty = EncodedMedia::from_bytes(&[], "image/png");
        let err = client.transform_image(&empty, "make it blue").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}

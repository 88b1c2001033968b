use super::client::GeminiHttpClient;
use super::types::{InlineData, Operation};
use crate::error::UpstreamError;
use crate::video::{GenerationJob, OperationBackend, VideoRequest};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
    image: VeoImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoImage {
    inline_data: InlineData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    aspect_ratio: String,
    resolution: String,
    number_of_videos: u32,
}

impl From<&VideoRequest> for VeoRequest {
    fn from(request: &VideoRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: request.prompt.clone(),
                image: VeoImage {
                    inline_data: InlineData::from(&request.image),
                },
            }],
            parameters: VeoParameters {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                resolution: request.resolution.as_str().to_string(),
                number_of_videos: 1,
            },
        }
    }
}

/// Veo backend: one HTTP exchange per submit, refresh or download.
pub struct GeminiVideoClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiVideoClient {
    pub fn new(http: GeminiHttpClient, model: String) -> Self {
        Self { http, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_job(operation: Operation) -> GenerationJob {
        let filtered = operation.filtered_count();
        if filtered > 0 {
            tracing::warn!(
                "{} generated video(s) were removed by the safety filter for {}",
                filtered,
                operation.name
            );
        }

        let error = operation.error.as_ref().map(|e| {
            e.message
                .clone()
                .unwrap_or_else(|| format!("operation failed with code {}", e.code.unwrap_or(0)))
        });

        GenerationJob {
            result_uri: operation.video_uri().map(str::to_string),
            done: operation.done,
            error,
            name: operation.name,
        }
    }
}

#[async_trait]
impl OperationBackend for GeminiVideoClient {
    async fn submit(&self, request: &VideoRequest) -> Result<GenerationJob, UpstreamError> {
        tracing::info!(
            "Submitting {} {} video request to {}",
            request.aspect_ratio,
            request.resolution,
            self.model
        );
        let operation = self
            .http
            .predict_long_running(&self.model, &VeoRequest::from(request))
            .await?;
        Ok(Self::to_job(operation))
    }

    async fn refresh(&self, job: &GenerationJob) -> Result<GenerationJob, UpstreamError> {
        let operation = self.http.get_operation(&job.name).await?;
        Ok(Self::to_job(operation))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, UpstreamError> {
        self.http.download(uri).await
    }
}

use super::types::Operation;
use crate::error::{UpstreamError, UpstreamKind};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const DOWNLOAD_TIMEOUT_FACTOR: u32 = 3;

type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Lightweight Gemini REST client shared by the image, video and chat modules.
///
/// Holds the connection pool and credential; the model is chosen per call so one
/// instance can serve every model tier.
#[derive(Clone)]
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn send_json<Resp: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> UpstreamResult<Resp> {
        let response = request
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                UpstreamError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Gemini API error (status {}): {}", status, body);
            return Err(UpstreamError::from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            UpstreamError::new(
                UpstreamKind::Malformed,
                format!("Failed to parse Gemini response: {}", e),
            )
        })
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        url: String,
        request: &Req,
    ) -> UpstreamResult<Resp> {
        tracing::debug!("POST {}", url);
        self.send_json(self.client.post(&url).json(request)).await
    }

    /// Calls Gemini's `generateContent` endpoint for image and chat requests.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> UpstreamResult<Resp> {
        self.post(self.model_url(model, "generateContent"), request)
            .await
    }

    /// Starts a long-running prediction (video generation) and returns its operation.
    pub async fn predict_long_running<Req: Serialize>(
        &self,
        model: &str,
        request: &Req,
    ) -> UpstreamResult<Operation> {
        self.post(self.model_url(model, "predictLongRunning"), request)
            .await
    }

    /// Re-fetches an operation by its resource name (`models/.../operations/...`).
    pub async fn get_operation(&self, name: &str) -> UpstreamResult<Operation> {
        let url = format!("{}/v1beta/{}", self.base_url, name.trim_start_matches('/'));
        tracing::debug!("GET {}", url);
        self.send_json(self.client.get(&url)).await
    }

    /// Fetches a generated file. The API key must also travel as the `key`
    /// query parameter for file download links.
    pub async fn download(&self, uri: &str) -> UpstreamResult<Vec<u8>> {
        let separator = if uri.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", uri, separator, self.api_key);

        // Video files are large; allow well beyond a JSON round trip.
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout * DOWNLOAD_TIMEOUT_FACTOR)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to download {}: {}", uri, e);
                UpstreamError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Download failed (status {}): {}", status, body);
            let mut err = UpstreamError::from_response(status.as_u16(), &body);
            if err.message.is_empty() {
                err.message = status
                    .canonical_reason()
                    .unwrap_or("download failed")
                    .to_string();
            }
            return Err(err);
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> GeminiHttpClient {
        GeminiHttpClient::new("test-key".to_string(), Duration::from_secs(5))
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_generate_content_strips_models_prefix() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server);
        let body: serde_json::Value = client
            .generate_content("models/gemini-2.5-flash", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1beta/models/veo/operations/abc"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "code": 404,
                    "message": "Requested entity was not found.",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .get_operation("models/veo/operations/abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, UpstreamKind::EntityNotFound);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "Requested entity was not found.");
    }

    #[tokio::test]
    async fn test_malformed_json_is_malformed_kind() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"candidates\":["))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_content::<_, serde_json::Value>("m", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Malformed);
    }

    #[tokio::test]
    async fn test_download_appends_key_query_param() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/video.mp4"))
            .and(query_param("alt", "media"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let uri = format!("{}/files/video.mp4?alt=media", server.uri());
        let bytes = make_client(&server).download(&uri).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_stalled_download_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 16])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = GeminiHttpClient::new("test-key".to_string(), Duration::from_millis(100))
            .with_base_url(server.uri());
        let uri = format!("{}/files/video.mp4", server.uri());

        let started = std::time::Instant::now();
        let err = client.download(&uri).await.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Transport);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_download_failure_uses_status_reason() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let uri = format!("{}/files/video.mp4", server.uri());
        let err = make_client(&server).download(&uri).await.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::AuthInvalid);
        assert_eq!(err.message, "Forbidden");
    }
}

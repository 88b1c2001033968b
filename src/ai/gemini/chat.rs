use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::ChatService;
use crate::error::{UpstreamError, UpstreamKind};
use crate::models::ChatTurn;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

pub struct GeminiChatClient {
    http: GeminiHttpClient,
}

impl GeminiChatClient {
    pub fn new(http: GeminiHttpClient) -> Self {
        Self { http }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let text: String = response
            .first_parts()
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl ChatService for GeminiChatClient {
    async fn complete(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        history: &[ChatTurn],
    ) -> Result<String> {
        let request = ChatRequest {
            system_instruction: system_instruction.map(|s| Content::text(None, s)),
            contents: history
                .iter()
                .map(|turn| Content::text(Some(turn.role.as_str()), turn.text.clone()))
                .collect(),
        };

        tracing::debug!("Sending {} chat turns to {}", history.len(), model);

        let response: GenerateContentResponse = self.http.generate_content(model, &request).await?;

        Self::extract_text(&response).ok_or_else(|| {
            UpstreamError::new(UpstreamKind::Malformed, "No text in Gemini chat response").into()
        })
    }
}

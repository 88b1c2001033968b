//! Shared Gemini payload types used across chat, image, and video modules.

use crate::media::EncodedMedia;
use serde::{Deserialize, Serialize};

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

/// Untagged union of text and inline media content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Parts this crate does not consume (thoughts, function calls, ...).
    Other(serde_json::Value),
}

/// Base64 inline payload used for image requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl From<&EncodedMedia> for InlineData {
    fn from(media: &EncodedMedia) -> Self {
        Self {
            mime_type: media.mime_type().to_string(),
            data: media.data().to_string(),
        }
    }
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate completion item returned by Gemini.
#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateContentResponse {
    /// Parts of the first candidate, empty when the model returned none.
    pub fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .map(|c| c.content.parts.as_slice())
            .unwrap_or_default()
    }
}

/// Long-running operation as returned by `predictLongRunning` and operation polls.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OperationResponse>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    pub rai_media_filtered_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoFile {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Operation {
    /// URI of the first generated video, if the operation produced one.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .iter()
            .find_map(|s| s.video.as_ref()?.uri.as_deref())
    }

    pub fn filtered_count(&self) -> u32 {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .and_then(|g| g.rai_media_filtered_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_decode_text_inline_and_unknown() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "AA==" } },
                        { "thoughtSignature": "xyz" }
                    ]
                }
            }]
        }))
        .unwrap();

        let parts = response.first_parts();
        assert!(matches!(&parts[0], Part::Text { text } if text == "here you go"));
        assert!(matches!(&parts[1], Part::InlineData { inline_data } if inline_data.data == "AA=="));
        assert!(matches!(&parts[2], Part::Other(_)));
    }

    #[test]
    fn test_candidate_without_content() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(response.first_parts().is_empty());
    }

    #[test]
    fn test_operation_video_uri() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "name": "models/veo/operations/1",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{ "video": { "uri": "https://files/v1" } }]
                }
            }
        }))
        .unwrap();
        assert_eq!(op.video_uri(), Some("https://files/v1"));

        let pending: Operation =
            serde_json::from_value(serde_json::json!({ "name": "models/veo/operations/1" }))
                .unwrap();
        assert!(!pending.done);
        assert_eq!(pending.video_uri(), None);
    }
}

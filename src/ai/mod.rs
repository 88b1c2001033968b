//! Generative AI service integration
//!
//! Each capability (image editing, chat completion, image-to-video) sits behind
//! its own trait so the studio can run against Gemini or the in-memory mocks.

pub mod gemini;
pub mod mock;

pub use mock::{MockChatClient, MockImageEditClient, MockOperationBackend, MockVideoClient};

use crate::media::EncodedMedia;
use crate::models::ChatTurn;
use crate::video::{ProgressSender, VideoRequest, VideoResource};
use crate::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ImageEditService: Send + Sync {
    /// Apply a natural-language instruction to an image and return the result.
    async fn transform_image(&self, image: &EncodedMedia, instruction: &str) -> Result<EncodedMedia>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Produce the model's next reply for `history`, which ends with a user turn.
    async fn complete(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        history: &[ChatTurn],
    ) -> Result<String>;
}

#[async_trait]
pub trait VideoGenerationService: Send + Sync {
    async fn generate_video(
        &self,
        request: &VideoRequest,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<VideoResource>;
}

//! Studio orchestration for the image-editor, interior-designer, video and chat flows.

use crate::ai::gemini::{GeminiChatClient, GeminiHttpClient, GeminiImageClient, GeminiVideoClient};
use crate::ai::{ChatService, ImageEditService, VideoGenerationService};
use crate::media::EncodedMedia;
use crate::models::{ChatModel, Config, DEFAULT_CHAT_MODEL, DEFAULT_PRO_CHAT_MODEL};
use crate::prompts;
use crate::session::{open_session, ChatSession};
use crate::video::{PollerSettings, ProgressSender, VideoGenerator, VideoRequest, VideoResource};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-request timeout for Gemini calls. Image edits routinely take tens of seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Style label of a design session before any restyle.
pub const ORIGINAL_STYLE: &str = "Original";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignStyle {
    MidCenturyModern,
    Scandinavian,
    Traditional,
    Bohemian,
    Industrial,
    Minimalist,
}

impl DesignStyle {
    pub const ALL: [DesignStyle; 6] = [
        Self::MidCenturyModern,
        Self::Scandinavian,
        Self::Traditional,
        Self::Bohemian,
        Self::Industrial,
        Self::Minimalist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MidCenturyModern => "Mid-Century Modern",
            Self::Scandinavian => "Scandinavian",
            Self::Traditional => "Traditional",
            Self::Bohemian => "Bohemian",
            Self::Industrial => "Industrial",
            Self::Minimalist => "Minimalist",
        }
    }
}

impl fmt::Display for DesignStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DesignStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalize = |v: &str| -> String {
            v.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect()
        };
        let wanted = normalize(s);

        Self::ALL
            .into_iter()
            .find(|style| normalize(style.name()) == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|style| style.name()).collect();
                Error::InvalidRequest(format!(
                    "Unknown design style '{}'. Expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// State of one interior-design flow: the uploaded room, the latest rendering
/// and the assistant conversation about it.
#[derive(Debug, Clone)]
pub struct DesignSession {
    original: EncodedMedia,
    current: EncodedMedia,
    style: String,
    chat: ChatSession,
}

impl DesignSession {
    pub fn original(&self) -> &EncodedMedia {
        &self.original
    }

    pub fn current(&self) -> &EncodedMedia {
        &self.current
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }
}

/// Model ids the studio binds chat sessions to.
#[derive(Debug, Clone)]
pub struct StudioOptions {
    pub chat_model: String,
    pub pro_chat_model: String,
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            pro_chat_model: DEFAULT_PRO_CHAT_MODEL.to_string(),
        }
    }
}

impl From<&Config> for StudioOptions {
    fn from(config: &Config) -> Self {
        Self {
            chat_model: config.chat_model_id(ChatModel::Flash).to_string(),
            pro_chat_model: config.chat_model_id(ChatModel::Pro).to_string(),
        }
    }
}

/// Injectable service bundle used to construct [`Studio`] in tests/harnesses.
pub struct StudioServices {
    pub image: Box<dyn ImageEditService>,
    pub video: Box<dyn VideoGenerationService>,
    pub chat: Box<dyn ChatService>,
}

/// What is needed to rebuild the Gemini clients under a new key.
struct GeminiBinding {
    config: Config,
    http_client: reqwest::Client,
}

pub struct Studio {
    image: Box<dyn ImageEditService>,
    video: Box<dyn VideoGenerationService>,
    chat: Box<dyn ChatService>,
    options: StudioOptions,
    gemini: Option<GeminiBinding>,
}

impl Studio {
    /// Build a studio from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: StudioServices, options: StudioOptions) -> Self {
        Self {
            image: services.image,
            video: services.video,
            chat: services.chat,
            options,
            gemini: None,
        }
    }

    /// Construct a Gemini-backed studio from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across all Gemini clients.
        let http_client = reqwest::Client::new();
        let services = Self::gemini_services(config, &config.api_key, &http_client)?;

        let mut studio = Self::with_services(services, StudioOptions::from(config));
        studio.gemini = Some(GeminiBinding {
            config: config.clone(),
            http_client,
        });
        Ok(studio)
    }

    fn gemini_services(
        config: &Config,
        api_key: &str,
        http_client: &reqwest::Client,
    ) -> Result<StudioServices> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key must not be empty".to_string()));
        }

        let mut http =
            GeminiHttpClient::new_with_client(api_key.to_string(), REQUEST_TIMEOUT, http_client.clone());
        if let Some(base_url) = &config.base_url {
            http = http.with_base_url(base_url.clone());
        }

        info!("Image model: {}", config.image_model);
        info!("Video model: {}", config.video_model);
        info!(
            "Chat models: {} / {}",
            config.chat_model, config.pro_chat_model
        );

        let settings = PollerSettings {
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
            poll_retries: config.poll_retries,
            ..PollerSettings::default()
        };

        Ok(StudioServices {
            image: Box::new(GeminiImageClient::new(http.clone(), config.image_model.clone())),
            video: Box::new(VideoGenerator::new(
                GeminiVideoClient::new(http.clone(), config.video_model.clone()),
                settings,
            )),
            chat: Box::new(GeminiChatClient::new(http)),
        })
    }

    /// Replace the API key used by every Gemini client.
    ///
    /// Sessions opened earlier keep their transcripts and continue against the
    /// new credential.
    pub fn rotate_credentials(&mut self, api_key: &str) -> Result<()> {
        let binding = self.gemini.as_ref().ok_or_else(|| {
            Error::Config("credential rotation requires a Gemini-backed studio".to_string())
        })?;

        let services = Self::gemini_services(&binding.config, api_key, &binding.http_client)?;
        self.image = services.image;
        self.video = services.video;
        self.chat = services.chat;

        if let Some(binding) = self.gemini.as_mut() {
            binding.config.api_key = api_key.to_string();
        }
        info!("Rotated Gemini credentials");
        Ok(())
    }

    pub async fn edit_image(&self, image: &EncodedMedia, instruction: &str) -> Result<EncodedMedia> {
        info!("Editing image");
        self.image.transform_image(image, instruction).await
    }

    /// Begin a design flow for an uploaded room photo.
    pub fn start_design(&self, image: EncodedMedia) -> Result<DesignSession> {
        image.ensure_present("room image")?;

        let chat = open_session(
            ChatModel::Pro,
            self.model_id(ChatModel::Pro),
            Some(prompts::DESIGNER_SYSTEM.to_string()),
        );

        Ok(DesignSession {
            current: image.clone(),
            original: image,
            style: ORIGINAL_STYLE.to_string(),
            chat,
        })
    }

    /// Restyle the original upload. The session is untouched on failure.
    pub async fn restyle(&self, session: &mut DesignSession, style: DesignStyle) -> Result<()> {
        info!("Restyling room as {}", style);
        let prompt = prompts::render(prompts::RESTYLE, &[("style", style.name())]);

        let styled = self
            .image
            .transform_image(&session.original, &prompt)
            .await
            .map_err(|e| {
                warn!("Restyle to {} failed: {}", style, e);
                e
            })?;

        session.current = styled;
        session.style = style.name().to_string();
        Ok(())
    }

    /// Apply a follow-up change to the current design and return the
    /// assistant's acknowledgement.
    ///
    /// The image is updated as soon as the edit succeeds; a failure of the
    /// acknowledgement turn is still returned as an error.
    pub async fn refine(&self, session: &mut DesignSession, change: &str) -> Result<String> {
        if change.trim().is_empty() {
            return Err(Error::InvalidRequest("change must not be empty".to_string()));
        }

        let prompt = prompts::render(
            prompts::REFINE,
            &[("style", session.style.as_str()), ("change", change)],
        );
        let refined = self.image.transform_image(&session.current, &prompt).await?;
        session.current = refined;

        let ack = prompts::render(prompts::REFINE_ACK, &[("change", change)]);
        session.chat.send_turn(self.chat.as_ref(), &ack).await
    }

    pub async fn generate_video(
        &self,
        request: &VideoRequest,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<VideoResource> {
        info!(
            "Generating {} video from {} image",
            request.aspect_ratio,
            request.image.mime_type()
        );
        self.video.generate_video(request, progress, cancel).await
    }

    pub fn open_chat(&self, model: ChatModel, system_instruction: Option<String>) -> ChatSession {
        open_session(model, self.model_id(model), system_instruction)
    }

    pub async fn chat(&self, session: &mut ChatSession, text: &str) -> Result<String> {
        session.send_turn(self.chat.as_ref(), text).await
    }

    fn model_id(&self, model: ChatModel) -> &str {
        match model {
            ChatModel::Flash => &self.options.chat_model,
            ChatModel::Pro => &self.options.pro_chat_model,
        }
    }
}

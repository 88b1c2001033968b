//! Image-to-video generation
//!
//! Video jobs are long-running operations on the provider side: a submission
//! returns an operation handle that [`poller::VideoGenerator`] re-queries until it
//! reports completion, then the finished file is downloaded to a local
//! temporary file.

pub mod poller;

pub use poller::{OperationBackend, PollerSettings, VideoGenerator};

use crate::media::EncodedMedia;
use crate::models::{AspectRatio, Resolution};
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub image: EncodedMedia,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

impl VideoRequest {
    pub fn new(image: EncodedMedia, prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            aspect_ratio,
            resolution: Resolution::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt must not be empty".to_string()));
        }
        self.image.ensure_present("source image")
    }
}

/// Provider-side state of a submitted generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub name: String,
    pub done: bool,
    pub result_uri: Option<String>,
    pub error: Option<String>,
}

impl GenerationJob {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            result_uri: None,
            error: None,
        }
    }

    pub fn completed(name: impl Into<String>, result_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            result_uri: Some(result_uri.into()),
            error: None,
        }
    }
}

/// Phase notifications emitted while a video job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Submitting,
    Submitted { operation: String },
    Checking { attempt: u32 },
    Completed,
    Downloading,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitting => f.write_str("Starting video generation..."),
            Self::Submitted { .. } => f.write_str(
                "Operation initiated. Waiting for completion... This can take a few minutes.",
            ),
            Self::Checking { attempt } => {
                write!(f, "Checking operation status... (check {})", attempt)
            }
            Self::Completed => f.write_str("Video generation complete!"),
            Self::Downloading => f.write_str("Fetching video..."),
        }
    }
}

/// Write half of a progress channel. Sends never fail: a dropped receiver just
/// means nobody is watching any more.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<Progress>>,
}

impl ProgressSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, progress: Progress) {
        tracing::debug!("Video progress: {}", progress);
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }
}

/// A downloaded video held in a temporary file.
///
/// The file is deleted when the resource is dropped unless it was persisted.
#[derive(Debug)]
pub struct VideoResource {
    file: NamedTempFile,
    source_uri: String,
    mime_type: String,
    size: u64,
}

impl VideoResource {
    pub async fn from_bytes(bytes: &[u8], source_uri: impl Into<String>) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("genai-studio-")
            .suffix(".mp4")
            .tempfile()?;

        let mut out = tokio::fs::File::from_std(file.as_file().try_clone()?);
        out.write_all(bytes).await?;
        out.flush().await?;

        Ok(Self {
            file,
            source_uri: source_uri.into(),
            mime_type: crate::media::mime::detect_mime(bytes)
                .unwrap_or("video/mp4")
                .to_string(),
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Keep the video at `dest`, releasing the temporary handle.
    pub fn persist(self, dest: &Path) -> Result<PathBuf> {
        match self.file.persist(dest) {
            Ok(_) => Ok(dest.to_path_buf()),
            // Rename fails across filesystems; fall back to copying.
            Err(e) => {
                std::fs::copy(e.file.path(), dest)?;
                Ok(dest.to_path_buf())
            }
        }
    }
}

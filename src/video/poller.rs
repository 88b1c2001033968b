//! Submit-then-poll client for long-running video operations.

use super::{GenerationJob, Progress, ProgressSender, VideoRequest, VideoResource};
use crate::error::UpstreamError;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Provider operations the poller drives. Implementations perform exactly one
/// network exchange per call and never retry on their own.
#[async_trait]
pub trait OperationBackend: Send + Sync {
    async fn submit(&self, request: &VideoRequest) -> std::result::Result<GenerationJob, UpstreamError>;
    async fn refresh(&self, job: &GenerationJob) -> std::result::Result<GenerationJob, UpstreamError>;
    async fn download(&self, uri: &str) -> std::result::Result<Vec<u8>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Fixed delay between status checks.
    pub poll_interval: Duration,
    /// Overall budget from submission acknowledgement to completion.
    pub max_wait: Duration,
    /// Extra attempts for a status check that failed transiently.
    pub poll_retries: usize,
    pub retry_delay: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(600),
            poll_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct VideoGenerator<B> {
    backend: B,
    settings: PollerSettings,
}

impl<B: OperationBackend> VideoGenerator<B> {
    pub fn new(backend: B, settings: PollerSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn generate(
        &self,
        request: &VideoRequest,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<VideoResource> {
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        progress.emit(Progress::Submitting);
        let mut job = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("video submission abandoned by caller");
                return Err(Error::Cancelled);
            }
            submitted = self.backend.submit(request) => submitted.map_err(|e| {
                error!("Video submission failed: {}", e);
                Error::Submission(e)
            })?,
        };
        info!(operation = %job.name, "submitted video generation request");
        progress.emit(Progress::Submitted {
            operation: job.name.clone(),
        });

        let started = Instant::now();
        // The budget covers interval waits and in-flight status checks alike.
        let deadline = tokio::time::sleep_until(started + self.settings.max_wait);
        tokio::pin!(deadline);
        let mut checks: u32 = 0;

        while !job.done {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&job)),
                _ = &mut deadline => return Err(self.timed_out(&job, checks)),
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            checks += 1;
            progress.emit(Progress::Checking { attempt: checks });

            job = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&job)),
                _ = &mut deadline => return Err(self.timed_out(&job, checks)),
                refreshed = self.check_status(&job) => refreshed?,
            };

            debug!(
                operation = %job.name,
                done = job.done,
                elapsed_secs = started.elapsed().as_secs(),
                "polled video generation"
            );
        }

        progress.emit(Progress::Completed);
        info!(operation = %job.name, checks, "video generation finished");

        if let Some(message) = job.error {
            error!(operation = %job.name, "video generation failed: {}", message);
            return Err(Error::JobFailed(message));
        }
        let uri = job.result_uri.ok_or_else(|| {
            error!(operation = %job.name, "operation finished without a video URI");
            Error::NoResultUri
        })?;

        progress.emit(Progress::Downloading);
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            downloaded = self.backend.download(&uri) => downloaded.map_err(|e| {
                error!("Failed to fetch video: {}", e);
                Error::Download(e)
            })?,
        };
        info!("Downloaded video ({} bytes)", bytes.len());

        VideoResource::from_bytes(&bytes, uri).await
    }

    /// One status check, retried in place while the failure looks transient.
    async fn check_status(&self, job: &GenerationJob) -> Result<GenerationJob> {
        let strategy = FixedInterval::new(self.settings.retry_delay).take(self.settings.poll_retries);

        RetryIf::spawn(
            strategy,
            || self.backend.refresh(job),
            |e: &UpstreamError| {
                let transient = e.is_transient();
                if transient {
                    warn!(operation = %job.name, "Status check failed: {}. Will retry...", e);
                }
                transient
            },
        )
        .await
        .map_err(|e| {
            error!(operation = %job.name, "Status check failed: {}", e);
            Error::PollingTransport(e)
        })
    }

    fn timed_out(&self, job: &GenerationJob, checks: u32) -> Error {
        warn!(
            operation = %job.name,
            checks,
            "video generation exceeded {:?}",
            self.settings.max_wait
        );
        Error::PollingTimeout(self.settings.max_wait)
    }

    fn cancelled(&self, job: &GenerationJob) -> Error {
        // Nothing is sent upstream; the provider keeps running the job.
        info!(operation = %job.name, "video generation abandoned by caller");
        Error::Cancelled
    }
}

#[async_trait]
impl<B: OperationBackend> crate::ai::VideoGenerationService for VideoGenerator<B> {
    async fn generate_video(
        &self,
        request: &VideoRequest,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<VideoResource> {
        self.generate(request, progress, cancel).await
    }
}

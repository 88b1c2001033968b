use super::{ChatService, ImageEditService, VideoGenerationService};
use crate::error::{UpstreamError, UpstreamKind};
use crate::media::EncodedMedia;
use crate::models::ChatTurn;
use crate::video::{
    GenerationJob, OperationBackend, Progress, ProgressSender, VideoRequest, VideoResource,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// Tiny valid PNG returned when no image response is configured
const DEFAULT_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Clone)]
pub struct MockImageEditClient {
    image_responses: Arc<Mutex<Vec<EncodedMedia>>>,
    instructions: Arc<Mutex<Vec<String>>>,
    inputs: Arc<Mutex<Vec<EncodedMedia>>>,
    failure: Arc<Mutex<Option<UpstreamKind>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageEditClient {
    pub fn new() -> Self {
        Self {
            image_responses: Arc::new(Mutex::new(Vec::new())),
            instructions: Arc::new(Mutex::new(Vec::new())),
            inputs: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_response(self, response: EncodedMedia) -> Self {
        self.image_responses.lock().unwrap().push(response);
        self
    }

    /// Make every subsequent call fail with an upstream error of `kind`.
    pub fn failing_with(self, kind: UpstreamKind) -> Self {
        self.set_failure(Some(kind));
        self
    }

    pub fn set_failure(&self, kind: Option<UpstreamKind>) {
        *self.failure.lock().unwrap() = kind;
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<EncodedMedia> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockImageEditClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageEditService for MockImageEditClient {
    async fn transform_image(&self, image: &EncodedMedia, instruction: &str) -> Result<EncodedMedia> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        self.instructions.lock().unwrap().push(instruction.to_string());
        self.inputs.lock().unwrap().push(image.clone());

        if let Some(kind) = *self.failure.lock().unwrap() {
            return Err(UpstreamError::new(kind, "mock image edit failure").into());
        }

        let responses = self.image_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(EncodedMedia::from_bytes(DEFAULT_PNG, "image/png"))
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

/// Arguments captured from one `complete` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<ChatTurn>,
}

#[derive(Clone)]
pub struct MockChatClient {
    replies: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<ChatCall>>>,
    failure: Arc<Mutex<Option<UpstreamKind>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_reply(self, reply: String) -> Self {
        self.replies.lock().unwrap().push(reply);
        self
    }

    pub fn failing_with(self, kind: UpstreamKind) -> Self {
        self.set_failure(Some(kind));
        self
    }

    pub fn set_failure(&self, kind: Option<UpstreamKind>) {
        *self.failure.lock().unwrap() = kind;
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn complete(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        history: &[ChatTurn],
    ) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(ChatCall {
            model: model.to_string(),
            system_instruction: system_instruction.map(str::to_string),
            history: history.to_vec(),
        });
        let count = calls.len();

        if let Some(kind) = *self.failure.lock().unwrap() {
            return Err(UpstreamError::new(kind, "mock chat failure").into());
        }

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            // Default mock response
            let last = history.last().map(|t| t.text.as_str()).unwrap_or_default();
            Ok(format!("Mock reply to: {}", last))
        } else {
            Ok(replies[(count - 1) % replies.len()].clone())
        }
    }
}

/// One call observed by [`MockOperationBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    Submit,
    Refresh,
    Download,
}

#[derive(Debug)]
struct BackendScript {
    done_on_submit: bool,
    pending_checks: u32,
    result_uri: Option<String>,
    job_error: Option<String>,
    video_bytes: Vec<u8>,
    submit_error: Option<UpstreamError>,
    download_error: Option<UpstreamError>,
    refresh_failures: u32,
    refresh_failure_kind: UpstreamKind,
    submit_delay: Duration,
    refresh_delay: Duration,
    successful_refreshes: u32,
    calls: Vec<BackendCall>,
}

/// Scripted long-running operation: stays pending for a fixed number of
/// successful status checks, then finishes with the configured outcome.
#[derive(Clone)]
pub struct MockOperationBackend {
    script: Arc<Mutex<BackendScript>>,
}

pub const MOCK_OPERATION_NAME: &str = "operations/mock-1";

impl MockOperationBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(BackendScript {
                done_on_submit: false,
                pending_checks: 0,
                result_uri: None,
                job_error: None,
                video_bytes: b"mock video".to_vec(),
                submit_error: None,
                download_error: None,
                refresh_failures: 0,
                refresh_failure_kind: UpstreamKind::Transport,
                submit_delay: Duration::ZERO,
                refresh_delay: Duration::ZERO,
                successful_refreshes: 0,
                calls: Vec::new(),
            })),
        }
    }

    pub fn with_pending_checks(self, checks: u32) -> Self {
        self.script.lock().unwrap().pending_checks = checks;
        self
    }

    pub fn with_done_on_submit(self) -> Self {
        self.script.lock().unwrap().done_on_submit = true;
        self
    }

    pub fn with_result_uri(self, uri: &str) -> Self {
        self.script.lock().unwrap().result_uri = Some(uri.to_string());
        self
    }

    pub fn with_job_error(self, message: &str) -> Self {
        self.script.lock().unwrap().job_error = Some(message.to_string());
        self
    }

    pub fn with_video_bytes(self, bytes: Vec<u8>) -> Self {
        self.script.lock().unwrap().video_bytes = bytes;
        self
    }

    pub fn with_submit_error(self, error: UpstreamError) -> Self {
        self.script.lock().unwrap().submit_error = Some(error);
        self
    }

    pub fn with_download_error(self, error: UpstreamError) -> Self {
        self.script.lock().unwrap().download_error = Some(error);
        self
    }

    /// Fail the next `count` status checks before following the script.
    pub fn with_refresh_failures(self, count: u32, kind: UpstreamKind) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.refresh_failures = count;
            script.refresh_failure_kind = kind;
        }
        self
    }

    /// Simulate a slow provider answering the submission.
    pub fn with_submit_delay(self, delay: Duration) -> Self {
        self.script.lock().unwrap().submit_delay = delay;
        self
    }

    /// Simulate a status check that hangs for `delay` before answering.
    pub fn with_refresh_delay(self, delay: Duration) -> Self {
        self.script.lock().unwrap().refresh_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.calls()
            .into_iter()
            .filter(|c| *c == BackendCall::Refresh)
            .count()
    }

    fn finished(script: &BackendScript) -> GenerationJob {
        GenerationJob {
            name: MOCK_OPERATION_NAME.to_string(),
            done: true,
            result_uri: script.result_uri.clone(),
            error: script.job_error.clone(),
        }
    }
}

impl Default for MockOperationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationBackend for MockOperationBackend {
    async fn submit(&self, _request: &VideoRequest) -> std::result::Result<GenerationJob, UpstreamError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(BackendCall::Submit);
            script.submit_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let script = self.script.lock().unwrap();

        if let Some(e) = &script.submit_error {
            return Err(e.clone());
        }
        if script.done_on_submit {
            Ok(Self::finished(&script))
        } else {
            Ok(GenerationJob::pending(MOCK_OPERATION_NAME))
        }
    }

    async fn refresh(&self, job: &GenerationJob) -> std::result::Result<GenerationJob, UpstreamError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(BackendCall::Refresh);
            script.refresh_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock().unwrap();

        if script.refresh_failures > 0 {
            script.refresh_failures -= 1;
            return Err(UpstreamError::new(
                script.refresh_failure_kind,
                "mock status check failure",
            ));
        }

        script.successful_refreshes += 1;
        if script.successful_refreshes <= script.pending_checks {
            Ok(GenerationJob::pending(job.name.clone()))
        } else {
            Ok(Self::finished(&script))
        }
    }

    async fn download(&self, _uri: &str) -> std::result::Result<Vec<u8>, UpstreamError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(BackendCall::Download);

        match &script.download_error {
            Some(e) => Err(e.clone()),
            None => Ok(script.video_bytes.clone()),
        }
    }
}

/// Video service double that completes immediately without a polling loop.
#[derive(Clone)]
pub struct MockVideoClient {
    requests: Arc<Mutex<Vec<VideoRequest>>>,
    video_bytes: Arc<Mutex<Vec<u8>>>,
    failure: Arc<Mutex<Option<UpstreamKind>>>,
}

impl MockVideoClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            video_bytes: Arc::new(Mutex::new(b"mock video".to_vec())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_video_bytes(self, bytes: Vec<u8>) -> Self {
        *self.video_bytes.lock().unwrap() = bytes;
        self
    }

    /// Fail submissions with an upstream error of `kind`.
    pub fn failing_with(self, kind: UpstreamKind) -> Self {
        *self.failure.lock().unwrap() = Some(kind);
        self
    }

    pub fn requests(&self) -> Vec<VideoRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockVideoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoGenerationService for MockVideoClient {
    async fn generate_video(
        &self,
        request: &VideoRequest,
        progress: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<VideoResource> {
        request.validate()?;
        self.requests.lock().unwrap().push(request.clone());

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        progress.emit(Progress::Submitting);
        if let Some(kind) = *self.failure.lock().unwrap() {
            return Err(Error::Submission(UpstreamError::new(
                kind,
                "mock video submission failure",
            )));
        }
        progress.emit(Progress::Submitted {
            operation: MOCK_OPERATION_NAME.to_string(),
        });
        progress.emit(Progress::Completed);
        progress.emit(Progress::Downloading);

        let bytes = self.video_bytes.lock().unwrap().clone();
        VideoResource::from_bytes(&bytes, "mock://video/1").await
    }
}

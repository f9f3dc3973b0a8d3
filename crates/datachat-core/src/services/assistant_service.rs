use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Role;

/// Errors returned by the hosted assistant service.
///
/// Messages carry the service's own error text unchanged so they can be
/// shown to the user verbatim.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error code: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

pub type AssistantResult<T> = Result<T, AssistantError>;

/// Incremental event received while a run streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallStarted { id: Option<String> },
    ToolCallDelta(ToolCallFragment),
    ToolCallDone,
    ImageFileDone { file_id: String },
    /// The run stopped without completing (failed, expired, cancelled or
    /// incomplete). Whatever streamed before it is still part of the turn.
    RunEnded { status: String, message: String },
}

/// Incremental payload of a code-interpreter call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCallFragment {
    Code(String),
    Output(String),
}

/// Stream of run events, consumed to exhaustion by the conversation driver
pub type RunEventStream = BoxStream<'static, AssistantResult<StreamEvent>>;

#[derive(Clone, Debug, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub filename: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ThreadHandle {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageHandle {
    pub id: String,
}

/// What an uploaded file is intended for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilePurpose::Assistants => "assistants",
        }
    }
}

/// Operations consumed from the hosted assistant service.
///
/// Everything is addressed by opaque ids; callers never depend on transport
/// details.
#[async_trait]
pub trait AssistantService: Send + Sync {
    async fn retrieve_assistant(&self, assistant_id: &str) -> AssistantResult<Assistant>;

    async fn create_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        purpose: FilePurpose,
    ) -> AssistantResult<UploadedFile>;

    /// Replace the code-interpreter file list of the assistant
    async fn update_code_interpreter_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> AssistantResult<Assistant>;

    async fn create_thread(&self) -> AssistantResult<ThreadHandle>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> AssistantResult<MessageHandle>;

    async fn stream_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        temperature: f32,
    ) -> AssistantResult<RunEventStream>;

    async fn file_content(&self, file_id: &str) -> AssistantResult<Vec<u8>>;
}

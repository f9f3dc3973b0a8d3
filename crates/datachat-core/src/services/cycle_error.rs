use thiserror::Error;

use super::assistant_service::AssistantError;
use crate::dataset::DatasetError;

/// A failure that halts the current interaction cycle.
///
/// One variant per call site; the display text is what the user sees in the
/// error banner, with the underlying error appended verbatim.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to retrieve assistant: {0}")]
    RetrieveAssistant(#[source] AssistantError),

    #[error("Failed to prepare dataset: {0}")]
    Dataset(#[source] DatasetError),

    #[error("Failed to upload file: {0}")]
    UploadFile(#[source] AssistantError),

    #[error("Failed to update assistant with file resources: {0}")]
    UpdateAssistant(#[source] AssistantError),

    #[error("Failed to create thread: {0}")]
    CreateThread(#[source] AssistantError),

    #[error("Failed to create message in thread: {0}")]
    CreateMessage(#[source] AssistantError),

    #[error("Failed to run assistant stream: {0}")]
    RunStream(#[source] AssistantError),
}

pub mod assistant_service;
pub mod conversation_driver;
pub mod cycle_error;
pub mod dataset_uploader;
pub mod image_service;
pub mod openai_client;
pub mod run_events;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assistant_service::{
    Assistant, AssistantError, AssistantResult, AssistantService, FilePurpose, MessageHandle,
    RunEventStream, StreamEvent, ThreadHandle, ToolCallFragment, UploadedFile,
};
pub use conversation_driver::ConversationDriver;
pub use cycle_error::CycleError;
pub use dataset_uploader::DatasetUploader;
pub use openai_client::OpenAiAssistantClient;
pub use run_events::RunEventDecoder;

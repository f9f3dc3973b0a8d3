use std::sync::Arc;

use tracing::info;

use super::assistant_service::{AssistantService, FilePurpose, UploadedFile};
use super::cycle_error::CycleError;
use crate::dataset::Dataset;

/// Publishes the current dataset snapshot to the assistant.
///
/// Every call uploads a new file and points the code-interpreter tool at it
/// alone; earlier uploads are left in the file store but no longer attached.
pub struct DatasetUploader {
    service: Arc<dyn AssistantService>,
    assistant_id: String,
    file_name: String,
}

impl DatasetUploader {
    pub fn new(service: Arc<dyn AssistantService>, assistant_id: &str, file_name: &str) -> Self {
        Self {
            service,
            assistant_id: assistant_id.to_string(),
            file_name: file_name.to_string(),
        }
    }

    pub async fn upload(&self, dataset: &Dataset) -> Result<UploadedFile, CycleError> {
        let csv = dataset.to_csv().map_err(CycleError::Dataset)?;

        let file = self
            .service
            .create_file(&self.file_name, csv, FilePurpose::Assistants)
            .await
            .map_err(CycleError::UploadFile)?;

        self.service
            .update_code_interpreter_files(&self.assistant_id, std::slice::from_ref(&file.id))
            .await
            .map_err(CycleError::UpdateAssistant)?;

        info!(
            assistant_id = %self.assistant_id,
            file_id = %file.id,
            rows = dataset.len(),
            "Attached dataset to assistant"
        );
        Ok(file)
    }
}

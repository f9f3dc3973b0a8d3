use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};

use crate::config::{AppConfig, ConfigError, Secrets};
use crate::dataset::FilteredDataset;
use crate::models::SessionState;
use crate::services::{
    AssistantService, ConversationDriver, CycleError, DatasetUploader, UploadedFile,
};
use crate::views::{ChatSurface, render_history};

/// What a completed cycle did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleOutcome {
    pub uploaded: UploadedFile,
    pub submitted: bool,
}

/// Runs one interaction cycle: the equivalent of a full page render.
///
/// Each cycle re-publishes the dataset, makes sure the session thread exists,
/// replays the history and then handles the pending input, if any. The first
/// failure is shown on the surface and ends the cycle.
pub struct PageController {
    service: Arc<dyn AssistantService>,
    assistant_id: String,
    dataset: FilteredDataset,
    uploader: DatasetUploader,
    driver: ConversationDriver,
}

impl PageController {
    pub fn new(
        service: Arc<dyn AssistantService>,
        assistant_id: &str,
        dataset: FilteredDataset,
        config: &AppConfig,
    ) -> Self {
        Self {
            uploader: DatasetUploader::new(service.clone(), assistant_id, &config.upload_file_name),
            driver: ConversationDriver::new(service.clone(), assistant_id),
            service,
            assistant_id: assistant_id.to_string(),
            dataset,
        }
    }

    /// Build a controller once secrets are resolved.
    ///
    /// `make_service` is only invoked when both secrets are present, so a
    /// missing credential stops startup before any client exists.
    pub fn bootstrap<F>(
        secrets: Result<Secrets, ConfigError>,
        dataset: FilteredDataset,
        config: &AppConfig,
        make_service: F,
    ) -> anyhow::Result<Self>
    where
        F: FnOnce(&Secrets) -> anyhow::Result<Arc<dyn AssistantService>>,
    {
        let secrets = secrets?;
        let service = make_service(&secrets)?;
        Ok(Self::new(service, secrets.assistant_id(), dataset, config))
    }

    pub async fn run_cycle(
        &self,
        state: &mut SessionState,
        surface: &mut dyn ChatSurface,
        input: Option<&str>,
    ) -> Result<CycleOutcome, CycleError> {
        let span = info_span!("cycle", session_id = %state.session_id(), submitted = input.is_some());
        let result = self
            .run_cycle_inner(state, surface, input)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            error!(error = %e, "Interaction cycle halted");
            surface.render_error(&e.to_string());
        }
        result
    }

    async fn run_cycle_inner(
        &self,
        state: &mut SessionState,
        surface: &mut dyn ChatSurface,
        input: Option<&str>,
    ) -> Result<CycleOutcome, CycleError> {
        surface.clear();

        let assistant = self
            .service
            .retrieve_assistant(&self.assistant_id)
            .await
            .map_err(CycleError::RetrieveAssistant)?;
        info!(
            assistant_id = %assistant.id,
            name = ?assistant.name,
            model = ?assistant.model,
            "Assistant retrieved"
        );

        let snapshot = self.dataset.current().map_err(CycleError::Dataset)?;
        let uploaded = self.uploader.upload(&snapshot).await?;

        let thread_id = state
            .ensure_thread(self.service.as_ref())
            .await
            .map_err(CycleError::CreateThread)?
            .to_string();

        render_history(state.history(), surface);

        let submitted = match input.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => {
                self.driver.submit(state, &thread_id, surface, text).await?;
                true
            }
            None => false,
        };

        Ok(CycleOutcome {
            uploaded,
            submitted,
        })
    }
}

/// Shared test helpers for service, model and controller unit tests.
///
/// Provides `ScriptedAssistant`, an in-memory implementation of
/// [`AssistantService`] that records every call and replays scripted run
/// streams.
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::assistant_service::{
    Assistant, AssistantError, AssistantResult, AssistantService, FilePurpose, MessageHandle,
    RunEventStream, StreamEvent, ThreadHandle, UploadedFile,
};
use crate::models::Role;

/// Snapshot of the calls made against a [`ScriptedAssistant`]
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    pub retrieve_assistant: usize,
    pub create_file: usize,
    pub create_thread: usize,
    pub uploaded: Vec<Vec<u8>>,
    pub attached_files: Vec<Vec<String>>,
    pub messages: Vec<String>,
    pub temperatures: Vec<f32>,
    pub file_content: Vec<String>,
}

impl CallLog {
    pub fn total(&self) -> usize {
        self.retrieve_assistant
            + self.create_file
            + self.create_thread
            + self.attached_files.len()
            + self.messages.len()
            + self.temperatures.len()
            + self.file_content.len()
    }
}

#[derive(Default)]
struct Failures {
    retrieve_assistant: Option<String>,
    create_file: Option<String>,
    update_assistant: Option<String>,
    create_thread: Option<String>,
    create_message: Option<String>,
    stream_run: Option<String>,
}

/// In-memory mock of [`AssistantService`] for unit tests.
#[derive(Default)]
pub struct ScriptedAssistant {
    log: Mutex<CallLog>,
    runs: Mutex<VecDeque<Vec<AssistantResult<StreamEvent>>>>,
    files: HashMap<String, Vec<u8>>,
    failures: Failures,
}

fn api_error(message: &str) -> AssistantError {
    AssistantError::Api {
        status: 500,
        message: message.to_string(),
    }
}

fn fail_with(failure: &Option<String>) -> AssistantResult<()> {
    match failure {
        Some(message) => Err(api_error(message)),
        None => Ok(()),
    }
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file_id: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(file_id.to_string(), bytes);
        self
    }

    pub fn fail_retrieve_assistant(mut self, message: &str) -> Self {
        self.failures.retrieve_assistant = Some(message.to_string());
        self
    }

    pub fn fail_create_file(mut self, message: &str) -> Self {
        self.failures.create_file = Some(message.to_string());
        self
    }

    pub fn fail_update_assistant(mut self, message: &str) -> Self {
        self.failures.update_assistant = Some(message.to_string());
        self
    }

    pub fn fail_create_thread(mut self, message: &str) -> Self {
        self.failures.create_thread = Some(message.to_string());
        self
    }

    pub fn fail_create_message(mut self, message: &str) -> Self {
        self.failures.create_message = Some(message.to_string());
        self
    }

    pub fn fail_stream_run(mut self, message: &str) -> Self {
        self.failures.stream_run = Some(message.to_string());
        self
    }

    /// Queue the events of the next run; runs are replayed in order
    pub fn push_run(&self, events: Vec<AssistantResult<StreamEvent>>) {
        self.runs.lock().push_back(events);
    }

    pub fn calls(&self) -> CallLog {
        self.log.lock().clone()
    }
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    async fn retrieve_assistant(&self, assistant_id: &str) -> AssistantResult<Assistant> {
        self.log.lock().retrieve_assistant += 1;
        fail_with(&self.failures.retrieve_assistant)?;
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: Some("Data analyst".to_string()),
            model: None,
        })
    }

    async fn create_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        _purpose: FilePurpose,
    ) -> AssistantResult<UploadedFile> {
        let mut log = self.log.lock();
        log.create_file += 1;
        fail_with(&self.failures.create_file)?;
        let len = bytes.len() as u64;
        log.uploaded.push(bytes);
        Ok(UploadedFile {
            id: format!("file-{}", log.create_file),
            bytes: len,
            filename: file_name.to_string(),
        })
    }

    async fn update_code_interpreter_files(
        &self,
        assistant_id: &str,
        file_ids: &[String],
    ) -> AssistantResult<Assistant> {
        fail_with(&self.failures.update_assistant)?;
        self.log.lock().attached_files.push(file_ids.to_vec());
        Ok(Assistant {
            id: assistant_id.to_string(),
            name: None,
            model: None,
        })
    }

    async fn create_thread(&self) -> AssistantResult<ThreadHandle> {
        let mut log = self.log.lock();
        log.create_thread += 1;
        fail_with(&self.failures.create_thread)?;
        Ok(ThreadHandle {
            id: format!("thread_{}", log.create_thread),
        })
    }

    async fn create_message(
        &self,
        _thread_id: &str,
        _role: Role,
        content: &str,
    ) -> AssistantResult<MessageHandle> {
        fail_with(&self.failures.create_message)?;
        let mut log = self.log.lock();
        log.messages.push(content.to_string());
        Ok(MessageHandle {
            id: format!("msg_{}", log.messages.len()),
        })
    }

    async fn stream_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
        temperature: f32,
    ) -> AssistantResult<RunEventStream> {
        fail_with(&self.failures.stream_run)?;
        self.log.lock().temperatures.push(temperature);
        let events = self.runs.lock().pop_front().unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn file_content(&self, file_id: &str) -> AssistantResult<Vec<u8>> {
        self.log.lock().file_content.push(file_id.to_string());
        self.files.get(file_id).cloned().ok_or_else(|| AssistantError::Api {
            status: 404,
            message: format!("No such File object: {}", file_id),
        })
    }
}

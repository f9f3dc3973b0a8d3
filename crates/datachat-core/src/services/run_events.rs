//! Decoding of the Assistants API run stream.
//!
//! The service sends server-sent events named after the object that changed
//! (`thread.message.delta`, `thread.run.step.delta`, ...). `RunEventDecoder`
//! turns them into the flat [`StreamEvent`] sequence the sink consumes and
//! synthesizes tool-call start/done boundaries from the per-step indices.
//! Runs that stop early are reported as events; only `error` events fail the
//! stream.

use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::assistant_service::{AssistantError, AssistantResult, StreamEvent, ToolCallFragment};

#[derive(Debug, Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
}

#[derive(Debug, Default, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    content: Vec<MessageContentDelta>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContentDelta {
    Text {
        #[serde(default)]
        text: Option<TextDelta>,
    },
    ImageFile {
        #[serde(default)]
        image_file: Option<ImageFileRef>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageFileRef {
    #[serde(default)]
    file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunStepDeltaEvent {
    id: String,
    delta: RunStepDelta,
}

#[derive(Debug, Default, Deserialize)]
struct RunStepDelta {
    #[serde(default)]
    step_details: Option<StepDetailsDelta>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StepDetailsDelta {
    ToolCalls {
        #[serde(default)]
        tool_calls: Vec<ToolCallDelta>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    code_interpreter: Option<CodeInterpreterDelta>,
}

#[derive(Debug, Deserialize)]
struct CodeInterpreterDelta {
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    outputs: Vec<CodeInterpreterOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CodeInterpreterOutput {
    Logs {
        #[serde(default)]
        logs: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RunStepEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunEvent {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    last_error: Option<ApiErrorBody>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEvent {
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(default)]
    message: Option<String>,
}

/// Tool call currently open, identified by its run step and index within it
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenToolCall {
    step_id: String,
    index: usize,
}

/// Stateful translator from raw SSE events to [`StreamEvent`]s
#[derive(Debug, Default)]
pub struct RunEventDecoder {
    current_tool_call: Option<OpenToolCall>,
    finished: bool,
}

impl RunEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the terminal `done` event has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode one SSE event into zero or more stream events.
    pub fn feed(&mut self, event: &str, data: &str) -> AssistantResult<Vec<StreamEvent>> {
        trace!(event = %event, data = %data, "Run stream event");

        if event == "done" || data == "[DONE]" {
            self.finished = true;
            return Ok(self.close_tool_call().into_iter().collect());
        }

        match event {
            "thread.message.delta" => {
                let parsed: MessageDeltaEvent = serde_json::from_str(data)?;
                Ok(Self::message_delta(parsed.delta))
            }
            "thread.run.step.delta" => {
                let parsed: RunStepDeltaEvent = serde_json::from_str(data)?;
                Ok(self.step_delta(parsed))
            }
            "thread.run.step.completed" | "thread.run.step.failed" | "thread.run.step.cancelled"
            | "thread.run.step.expired" => {
                let parsed: RunStepEvent = serde_json::from_str(data)?;
                let belongs_to_step = self
                    .current_tool_call
                    .as_ref()
                    .is_some_and(|open| open.step_id == parsed.id);
                if belongs_to_step {
                    Ok(self.close_tool_call().into_iter().collect())
                } else {
                    Ok(Vec::new())
                }
            }
            "thread.run.failed" | "thread.run.expired" | "thread.run.cancelled"
            | "thread.run.incomplete" => {
                let run: RunEvent = serde_json::from_str(data)?;
                let mut events: Vec<StreamEvent> = self.close_tool_call().into_iter().collect();
                events.push(Self::run_ended(event, run));
                Ok(events)
            }
            "error" => Err(Self::stream_error(data)),
            other => {
                debug!(event = %other, "Ignoring run stream event");
                Ok(Vec::new())
            }
        }
    }

    fn message_delta(delta: MessageDelta) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for part in delta.content {
            match part {
                MessageContentDelta::Text { text } => {
                    if let Some(value) = text.and_then(|t| t.value)
                        && !value.is_empty()
                    {
                        events.push(StreamEvent::TextDelta(value));
                    }
                }
                MessageContentDelta::ImageFile { image_file } => {
                    match image_file.and_then(|f| f.file_id) {
                        Some(file_id) => events.push(StreamEvent::ImageFileDone { file_id }),
                        None => warn!("Image content delta without a file id"),
                    }
                }
                MessageContentDelta::Other => {}
            }
        }
        events
    }

    fn step_delta(&mut self, step: RunStepDeltaEvent) -> Vec<StreamEvent> {
        let Some(StepDetailsDelta::ToolCalls { tool_calls }) = step.delta.step_details else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for call in tool_calls {
            let key = OpenToolCall {
                step_id: step.id.clone(),
                index: call.index,
            };
            if self.current_tool_call.as_ref() != Some(&key) {
                events.extend(self.close_tool_call());
                self.current_tool_call = Some(key);
                events.push(StreamEvent::ToolCallStarted { id: call.id.clone() });
            }

            if let Some(interpreter) = call.code_interpreter {
                if let Some(input) = interpreter.input
                    && !input.is_empty()
                {
                    events.push(StreamEvent::ToolCallDelta(ToolCallFragment::Code(input)));
                }
                for output in interpreter.outputs {
                    match output {
                        CodeInterpreterOutput::Logs { logs } => {
                            events.push(StreamEvent::ToolCallDelta(ToolCallFragment::Output(logs)));
                        }
                        CodeInterpreterOutput::Other => {
                            debug!("Ignoring non-log code interpreter output");
                        }
                    }
                }
            }
        }
        events
    }

    fn close_tool_call(&mut self) -> Option<StreamEvent> {
        self.current_tool_call.take().map(|_| StreamEvent::ToolCallDone)
    }

    fn run_ended(event: &str, run: RunEvent) -> StreamEvent {
        let status = run
            .status
            .unwrap_or_else(|| event.trim_start_matches("thread.run.").to_string());
        let message = run
            .last_error
            .and_then(|e| match (e.code, e.message) {
                (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
                (None, Some(message)) => Some(message),
                (Some(code), None) => Some(code),
                (None, None) => None,
            })
            .or_else(|| run.incomplete_details.and_then(|d| d.reason))
            .unwrap_or_else(|| "no details provided".to_string());
        warn!(status = %status, message = %message, "Run ended without completing");
        StreamEvent::RunEnded { status, message }
    }

    fn stream_error(data: &str) -> AssistantError {
        let message = serde_json::from_str::<ErrorEvent>(data)
            .ok()
            .and_then(|e| e.error.and_then(|inner| inner.message).or(e.message))
            .unwrap_or_else(|| data.to_string());
        AssistantError::Stream(message)
    }
}

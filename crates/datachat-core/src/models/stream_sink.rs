use tracing::{debug, warn};

use super::chat_turn::{ChatTurn, Role};
use crate::services::image_service::fetch_png;
use crate::services::{AssistantService, StreamEvent, ToolCallFragment};
use crate::views::{BlockHandle, BlockKind, ChatSurface};

const CODE_BLOCK_TITLE: &str = "Assistant is coding...";
const OUTPUT_BLOCK_TITLE: &str = "Code Output";

/// Lifecycle of one assistant turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkStatus {
    Idle,
    Streaming,
    Done,
}

/// Accumulates the events of a single streamed run and draws them live.
///
/// Each rendered element kind gets one placeholder block, created on the
/// first event of that kind and overwritten with the whole buffer on every
/// later event. Buffers live until `finish`; a finished tool call only
/// collapses its block.
pub struct StreamingEventSink {
    assistant_message: String,
    code_input: String,
    code_output: String,
    tool_call_active: bool,
    content_block: Option<BlockHandle>,
    code_block: Option<BlockHandle>,
    output_block: Option<BlockHandle>,
    images_rendered: usize,
    status: SinkStatus,
}

impl StreamingEventSink {
    pub fn new() -> Self {
        Self {
            assistant_message: String::new(),
            code_input: String::new(),
            code_output: String::new(),
            tool_call_active: false,
            content_block: None,
            code_block: None,
            output_block: None,
            images_rendered: 0,
            status: SinkStatus::Idle,
        }
    }

    pub fn status(&self) -> SinkStatus {
        self.status
    }

    pub fn is_tool_call_active(&self) -> bool {
        self.tool_call_active
    }

    pub fn text(&self) -> &str {
        &self.assistant_message
    }

    pub fn code(&self) -> &str {
        &self.code_input
    }

    pub fn output(&self) -> &str {
        &self.code_output
    }

    pub fn images_rendered(&self) -> usize {
        self.images_rendered
    }

    /// Dispatch one event. Only image handling can fail, and that failure
    /// is reported on the surface without interrupting the stream.
    pub async fn handle(
        &mut self,
        event: StreamEvent,
        surface: &mut dyn ChatSurface,
        files: &dyn AssistantService,
    ) {
        if self.status == SinkStatus::Done {
            warn!(event = ?event, "Event received after the turn was finished");
            return;
        }
        self.status = SinkStatus::Streaming;

        match event {
            StreamEvent::TextDelta(text) => self.on_text_delta(&text, surface),
            StreamEvent::ToolCallStarted { id } => self.on_tool_call_created(id.as_deref(), surface),
            StreamEvent::ToolCallDelta(fragment) => self.on_tool_call_delta(fragment, surface),
            StreamEvent::ToolCallDone => self.on_tool_call_done(surface),
            StreamEvent::ImageFileDone { file_id } => {
                self.on_image_file_done(&file_id, surface, files).await
            }
            StreamEvent::RunEnded { status, message } => {
                self.on_run_ended(&status, &message, surface)
            }
        }
    }

    fn on_text_delta(&mut self, text: &str, surface: &mut dyn ChatSurface) {
        if text.is_empty() {
            return;
        }
        self.assistant_message.push_str(text);

        let handle = *self
            .content_block
            .get_or_insert_with(|| surface.open_block(Role::Assistant, BlockKind::Markdown));
        surface.update_block(handle, &self.assistant_message);
    }

    fn on_tool_call_created(&mut self, id: Option<&str>, surface: &mut dyn ChatSurface) {
        debug!(tool_call_id = ?id, "Tool call started");
        self.tool_call_active = true;

        if self.code_block.is_none() {
            self.code_block = Some(surface.open_block(
                Role::Assistant,
                BlockKind::collapsible_code(Some("python"), CODE_BLOCK_TITLE),
            ));
        }
        self.code_input.clear();
    }

    fn on_tool_call_delta(&mut self, fragment: ToolCallFragment, surface: &mut dyn ChatSurface) {
        match fragment {
            ToolCallFragment::Code(code) => {
                self.code_input.push_str(&code);
                let handle = *self.code_block.get_or_insert_with(|| {
                    surface.open_block(
                        Role::Assistant,
                        BlockKind::collapsible_code(Some("python"), CODE_BLOCK_TITLE),
                    )
                });
                surface.update_block(handle, &self.code_input);
            }
            ToolCallFragment::Output(logs) => {
                let handle = *self.output_block.get_or_insert_with(|| {
                    surface.open_block(
                        Role::Assistant,
                        BlockKind::collapsible_code(None, OUTPUT_BLOCK_TITLE),
                    )
                });
                self.code_output.push_str(&logs);
                surface.update_block(handle, &self.code_output);
            }
        }
    }

    fn on_tool_call_done(&mut self, surface: &mut dyn ChatSurface) {
        self.tool_call_active = false;
        if let Some(handle) = self.code_block {
            surface.collapse_block(handle);
        }
    }

    async fn on_image_file_done(
        &mut self,
        file_id: &str,
        surface: &mut dyn ChatSurface,
        files: &dyn AssistantService,
    ) {
        match fetch_png(files, file_id).await {
            Ok(image) => {
                surface.render_image(Role::Assistant, &image);
                self.images_rendered += 1;
            }
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "Failed to process image file");
                surface.render_error(&format!("Failed to process image file: {}", e));
            }
        }
    }

    fn on_run_ended(&mut self, status: &str, message: &str, surface: &mut dyn ChatSurface) {
        self.tool_call_active = false;
        if let Some(handle) = self.code_block {
            surface.collapse_block(handle);
        }
        surface.render_error(&format!("Run {}: {}", status, message));
    }

    /// Close the turn and hand back what was accumulated; later events are
    /// ignored. Images were drawn directly and are not part of the turn.
    pub fn finish(&mut self) -> ChatTurn {
        self.status = SinkStatus::Done;
        debug!(
            text_len = self.assistant_message.len(),
            code_len = self.code_input.len(),
            output_len = self.code_output.len(),
            images = self.images_rendered,
            "Assistant turn finished"
        );
        ChatTurn::assistant(
            std::mem::take(&mut self.assistant_message),
            std::mem::take(&mut self.code_input),
            std::mem::take(&mut self.code_output),
        )
    }
}

impl Default for StreamingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

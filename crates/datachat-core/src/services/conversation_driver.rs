use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};

use super::assistant_service::AssistantService;
use super::cycle_error::CycleError;
use crate::config::app_config::RUN_TEMPERATURE;
use crate::models::{ChatTurn, Role, SessionState, StreamingEventSink};
use crate::views::{ChatSurface, render_turn};

/// Sends user input on the session thread and streams the reply back
pub struct ConversationDriver {
    service: Arc<dyn AssistantService>,
    assistant_id: String,
}

impl ConversationDriver {
    pub fn new(service: Arc<dyn AssistantService>, assistant_id: &str) -> Self {
        Self {
            service,
            assistant_id: assistant_id.to_string(),
        }
    }

    /// Handle one user submission.
    ///
    /// The user turn is appended before anything is sent and stays in the
    /// history even if a later step fails. The assistant turn is appended
    /// only after the run stream has been consumed to the end.
    pub async fn submit(
        &self,
        state: &mut SessionState,
        thread_id: &str,
        surface: &mut dyn ChatSurface,
        user_text: &str,
    ) -> Result<(), CycleError> {
        let user_turn = ChatTurn::user(user_text);
        render_turn(&user_turn, surface);
        state.push(user_turn);

        self.service
            .create_message(thread_id, Role::User, user_text)
            .await
            .map_err(CycleError::CreateMessage)?;

        let mut stream = self
            .service
            .stream_run(thread_id, &self.assistant_id, RUN_TEMPERATURE)
            .await
            .map_err(CycleError::RunStream)?;

        let mut sink = StreamingEventSink::new();
        let mut events = 0usize;
        while let Some(event) = stream.next().await {
            let event = event.map_err(CycleError::RunStream)?;
            events += 1;
            sink.handle(event, surface, self.service.as_ref()).await;
        }
        debug!(thread_id = %thread_id, events, "Run stream exhausted");

        let turn = sink.finish();
        info!(
            session_id = %state.session_id(),
            has_code = turn.code.is_some(),
            has_output = turn.output.is_some(),
            "Assistant turn completed"
        );
        state.push(turn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_helpers::ScriptedAssistant;
    use crate::services::{AssistantError, StreamEvent, ToolCallFragment};
    use crate::views::BlockList;

    fn driver(service: &Arc<ScriptedAssistant>) -> ConversationDriver {
        ConversationDriver::new(service.clone(), "asst_1")
    }

    #[tokio::test]
    async fn test_each_submission_appends_two_turns() {
        let service = Arc::new(ScriptedAssistant::new());
        for reply in ["one", "two", "three"] {
            service.push_run(vec![Ok(StreamEvent::TextDelta(reply.into()))]);
        }
        let mut state = SessionState::new();
        let mut surface = BlockList::new();

        for (n, question) in ["a", "b", "c"].iter().enumerate() {
            driver(&service)
                .submit(&mut state, "thread_1", &mut surface, question)
                .await
                .unwrap();
            assert_eq!(state.len(), 2 * (n + 1));
        }

        assert_eq!(state.history()[0].role, Role::User);
        assert_eq!(state.history()[5].content.as_deref(), Some("three"));
        assert_eq!(service.calls().temperatures, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_tool_call_run_produces_code_and_output_fields() {
        let service = Arc::new(ScriptedAssistant::new());
        service.push_run(vec![
            Ok(StreamEvent::ToolCallStarted { id: None }),
            Ok(StreamEvent::ToolCallDelta(ToolCallFragment::Code("import pandas".into()))),
            Ok(StreamEvent::ToolCallDelta(ToolCallFragment::Output("42".into()))),
            Ok(StreamEvent::ToolCallDone),
            Ok(StreamEvent::TextDelta("Done".into())),
        ]);
        let mut state = SessionState::new();
        let mut surface = BlockList::new();

        driver(&service)
            .submit(&mut state, "thread_1", &mut surface, "analyze")
            .await
            .unwrap();

        let turn = &state.history()[1];
        assert_eq!(turn.content.as_deref(), Some("Done"));
        assert_eq!(turn.code.as_deref(), Some("import pandas"));
        assert_eq!(turn.output.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_message_failure_keeps_user_turn_and_skips_run() {
        let service = Arc::new(ScriptedAssistant::new().fail_create_message("thread not found"));
        let mut state = SessionState::new();
        let mut surface = BlockList::new();

        let err = driver(&service)
            .submit(&mut state, "thread_1", &mut surface, "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, CycleError::CreateMessage(_)));
        assert_eq!(state.len(), 1);
        assert_eq!(state.history()[0].role, Role::User);
        assert!(service.calls().temperatures.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_run_still_records_partial_answer() {
        let service = Arc::new(ScriptedAssistant::new());
        service.push_run(vec![
            Ok(StreamEvent::TextDelta("Partial answer".into())),
            Ok(StreamEvent::RunEnded {
                status: "incomplete".into(),
                message: "max_completion_tokens".into(),
            }),
        ]);
        let mut state = SessionState::new();
        let mut surface = BlockList::new();

        driver(&service)
            .submit(&mut state, "thread_1", &mut surface, "summarize")
            .await
            .unwrap();

        assert_eq!(state.len(), 2);
        assert_eq!(state.history()[1].content.as_deref(), Some("Partial answer"));
        let errors: Vec<_> = surface.errors().collect();
        assert_eq!(errors, vec!["Run incomplete: max_completion_tokens"]);
    }

    #[tokio::test]
    async fn test_transport_failure_mid_stream_discards_assistant_turn() {
        let service = Arc::new(ScriptedAssistant::new());
        service.push_run(vec![
            Ok(StreamEvent::TextDelta("partial".into())),
            Err(AssistantError::Stream("connection reset".into())),
        ]);
        let mut state = SessionState::new();
        let mut surface = BlockList::new();

        let err = driver(&service)
            .submit(&mut state, "thread_1", &mut surface, "hello")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to run assistant stream: Stream error: connection reset"
        );
        assert_eq!(state.len(), 1);
    }
}

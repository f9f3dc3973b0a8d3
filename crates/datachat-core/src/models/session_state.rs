use tracing::{debug, info};
use uuid::Uuid;

use super::chat_turn::ChatTurn;
use crate::services::{AssistantResult, AssistantService};

/// Per-session state that survives across interaction cycles.
///
/// Holds the server-side thread handle (created lazily, then reused for the
/// whole session) and the append-only chat history. Dropping the value ends
/// the session.
pub struct SessionState {
    session_id: Uuid,
    thread_id: Option<String>,
    chat_history: Vec<ChatTurn>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            thread_id: None,
            chat_history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Return the session's thread id, creating the thread on first use
    pub async fn ensure_thread(&mut self, service: &dyn AssistantService) -> AssistantResult<&str> {
        if self.thread_id.is_none() {
            let thread = service.create_thread().await?;
            info!(session_id = %self.session_id, thread_id = %thread.id, "Created conversation thread");
            self.thread_id = Some(thread.id);
        }

        Ok(self.thread_id.as_deref().unwrap_or_default())
    }

    pub fn push(&mut self, turn: ChatTurn) {
        debug!(
            session_id = %self.session_id,
            role = turn.role.as_str(),
            index = self.chat_history.len(),
            "Appending chat turn"
        );
        self.chat_history.push(turn);
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.chat_history
    }

    pub fn len(&self) -> usize {
        self.chat_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chat_history.is_empty()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_helpers::ScriptedAssistant;

    #[tokio::test]
    async fn test_thread_is_created_once_and_reused() {
        let service = ScriptedAssistant::new();
        let mut state = SessionState::new();

        let first = state.ensure_thread(&service).await.unwrap().to_string();
        let second = state.ensure_thread(&service).await.unwrap().to_string();

        assert_eq!(first, second);
        assert_eq!(service.calls().create_thread, 1);
    }

    #[tokio::test]
    async fn test_failed_thread_creation_leaves_state_untouched() {
        let service = ScriptedAssistant::new().fail_create_thread("quota exceeded");
        let mut state = SessionState::new();

        let err = state.ensure_thread(&service).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(state.thread_id().is_none());
    }

    #[test]
    fn test_history_preserves_insertion_order() {
        let mut state = SessionState::new();
        state.push(ChatTurn::user("first"));
        state.push(ChatTurn::assistant("second".into(), String::new(), String::new()));

        let contents: Vec<_> = state
            .history()
            .iter()
            .map(|t| t.content.as_deref().unwrap())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}

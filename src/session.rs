//! Multi-turn chat sessions
//!
//! A session owns its transcript; the provider is stateless, so every turn
//! re-sends the full history together with the system instruction.

use crate::ai::ChatService;
use crate::models::{ChatModel, ChatTurn};
use crate::{Error, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    model: ChatModel,
    model_id: String,
    system_instruction: Option<String>,
    transcript: Vec<ChatTurn>,
}

/// Open a session bound to one model tier. No network call is made.
pub fn open_session(
    model: ChatModel,
    model_id: impl Into<String>,
    system_instruction: Option<String>,
) -> ChatSession {
    let session = ChatSession {
        id: Uuid::new_v4(),
        model,
        model_id: model_id.into(),
        system_instruction,
        transcript: Vec::new(),
    };
    tracing::debug!("Opened chat session {} on {}", session.id, session.model_id);
    session
}

impl ChatSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> ChatModel {
        self.model
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Send one user message and return the model's reply.
    ///
    /// The transcript only grows when the exchange succeeds; a failed turn
    /// leaves it exactly as it was.
    pub async fn send_turn(&mut self, service: &dyn ChatService, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidRequest("message must not be empty".to_string()));
        }

        let mut history = self.transcript.clone();
        history.push(ChatTurn::user(text));

        let reply = service
            .complete(&self.model_id, self.system_instruction.as_deref(), &history)
            .await
            .map_err(|e| {
                tracing::error!("Chat turn failed in session {}: {}", self.id, e);
                e
            })?;

        history.push(ChatTurn::model(reply.clone()));
        self.transcript = history;

        Ok(reply)
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockChatClient;
    use crate::error::UpstreamKind;
    use crate::models::Role;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_turns_alternate_user_and_model() {
        let client = MockChatClient::new();
        let mut session = open_session(ChatModel::Flash, "gemini-2.5-flash", None);

        for i in 0..3 {
            session
                .send_turn(&client, &format!("message {}", i))
                .await
                .unwrap();
        }

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 6);
        for (i, turn) in transcript.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Model };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(transcript[4].text, "message 2");
        assert_eq!(transcript[5].text, "Mock reply to: message 2");
    }

    #[tokio::test]
    async fn test_each_turn_sends_full_history_and_system_instruction() {
        let client = MockChatClient::new()
            .with_reply("first".to_string())
            .with_reply("second".to_string());
        let mut session = open_session(
            ChatModel::Pro,
            "gemini-2.5-pro",
            Some("Be helpful.".to_string()),
        );

        session.send_turn(&client, "a").await.unwrap();
        session.send_turn(&client, "b").await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[1].model, "gemini-2.5-pro");
        assert_eq!(calls[1].system_instruction.as_deref(), Some("Be helpful."));
        assert_eq!(
            calls[1].history,
            vec![
                ChatTurn::user("a"),
                ChatTurn::model("first"),
                ChatTurn::user("b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_transcript_unchanged() {
        let client = MockChatClient::new();
        let mut session = open_session(ChatModel::Flash, "gemini-2.5-flash", None);
        session.send_turn(&client, "hello").await.unwrap();

        client.set_failure(Some(UpstreamKind::Server));
        let err = session.send_turn(&client, "again").await.unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_a_call() {
        let client = MockChatClient::new();
        let mut session = open_session(ChatModel::Flash, "gemini-2.5-flash", None);

        let err = session.send_turn(&client, "   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(client.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_transcript_but_keeps_identity() {
        let client = MockChatClient::new();
        let mut session = open_session(ChatModel::Flash, "gemini-2.5-flash", None);
        let id = session.id();
        session.send_turn(&client, "hi").await.unwrap();

        session.reset();
        assert!(session.transcript().is_empty());
        assert_eq!(session.id(), id);
    }
}

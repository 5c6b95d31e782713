//! Chat history storage
//!
//! Ordered turns of one session plus its opaque backend id.

use crate::classifier::{self, SessionState};
use crate::models::{ChatSession, ChatTurn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub session_id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            title: String::new(),
            updated_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn from_session(session: ChatSession) -> Self {
        Self {
            session_id: session.id,
            title: session.title,
            updated_at: session.updated_at,
            turns: session.turns,
        }
    }

    /// Append a turn
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    /// Replace every turn with the backend's copy
    pub fn replace_all(&mut self, turns: Vec<ChatTurn>) {
        self.turns = turns;
        self.updated_at = Utc::now();
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn state(&self) -> SessionState {
        SessionState::of(&self.turns)
    }

    /// Whether the next user message answers a pending interruption
    pub fn next_is_interruption_response(&self) -> bool {
        classifier::classify(&self.turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_state() {
        let mut history = ChatHistory::new("66f0c0ffee");
        assert!(history.is_empty());
        assert_eq!(history.state(), SessionState::Idle);

        history.push(ChatTurn::user("What is 80TTA?"));
        history.push(ChatTurn::interruption("Are you over 60?", "call-3"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns().len(), 2);
        assert_eq!(history.state(), SessionState::AwaitingResponse);
        assert!(history.next_is_interruption_response());

        history.push(ChatTurn::user("No"));
        assert!(!history.next_is_interruption_response());
    }

    #[test]
    fn test_replace_all() {
        let mut history = ChatHistory::new("66f0c0ffee");
        history.push(ChatTurn::user("stale"));

        history.replace_all(vec![
            ChatTurn::assistant("Welcome back"),
            ChatTurn::interruption("Which property status?", "call-4"),
        ]);

        assert_eq!(history.len(), 2);
        assert_eq!(history.last().and_then(|t| t.tool_call_id.as_deref()), Some("call-4"));
        assert_eq!(history.turns()[0].content, "Welcome back");
    }
}

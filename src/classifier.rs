//! Conversation Turn Classifier
//!
//! Decides whether an outgoing user message is:
//! - a fresh query, or
//! - the reply to an assistant interruption (an assistant turn carrying a
//!   pending tool-call id)
//!
//! Only the last turn of the history matters. A tool-call id further back is
//! stale: the user turn that followed it already answered it.

use crate::models::{ChatRole, ChatTurn};
use serde::{Deserialize, Serialize};

/// Per-session interruption state, re-derived from the last turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingResponse,
}

impl SessionState {
    /// State of a session whose history ends with `history`'s last turn.
    pub fn of(history: &[ChatTurn]) -> Self {
        history
            .last()
            .map(|turn| Self::Idle.after(turn))
            .unwrap_or_default()
    }

    /// Transition taken when `turn` is appended.
    ///
    /// Any user turn closes an interruption, whatever it says. An assistant
    /// turn opens one iff it carries a tool-call id.
    pub fn after(self, turn: &ChatTurn) -> Self {
        match turn.role {
            ChatRole::User => SessionState::Idle,
            ChatRole::Assistant if turn.tool_call_id.is_some() => SessionState::AwaitingResponse,
            ChatRole::Assistant => SessionState::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Query,
    InterruptionResponse,
}

/// Turn classifier
pub struct TurnClassifier;

impl TurnClassifier {
    /// Classify the next user message against the current history
    pub fn classify(history: &[ChatTurn]) -> TurnKind {
        match SessionState::of(history) {
            SessionState::AwaitingResponse => TurnKind::InterruptionResponse,
            SessionState::Idle => TurnKind::Query,
        }
    }
}

/// `true` iff the next user message answers a pending interruption.
pub fn classify(history: &[ChatTurn]) -> bool {
    TurnClassifier::classify(history) == TurnKind::InterruptionResponse
}

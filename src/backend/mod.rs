//! Backend collaborator traits and response contracts
//!
//! The tax calculation and chat backends are reached through these traits.
//! Responses are decoded strictly: a missing or mistyped key is a contract
//! violation, never a silent default.

pub mod http;

use crate::error::ClientError;
use crate::models::{ChatSession, ChatSessionSummary, ChatTurn, SessionContext};
use crate::payload::SubmitTaxRequest;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use http::HttpBackend;

/// Submits a completed tax profile
#[async_trait::async_trait]
pub trait TaxBackend: Send + Sync {
    async fn submit_profile(
        &self,
        ctx: &SessionContext,
        request: &SubmitTaxRequest,
    ) -> Result<TaxSubmission>;
}

/// Chat session operations
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(
        &self,
        ctx: &SessionContext,
        session_id: &str,
        request: &SendMessageRequest,
    ) -> Result<ChatReply>;

    async fn fetch_session(&self, ctx: &SessionContext, session_id: &str) -> Result<ChatSession>;

    async fn list_sessions(&self, ctx: &SessionContext) -> Result<Vec<ChatSessionSummary>>;
}

//
// ================= Requests =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(rename = "isInterruptionResponse")]
    pub is_interruption_response: bool,
}

//
// ================= Responses =================
//

/// Outcome of a profile submission
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxSubmission {
    /// The backend opened a chat session to continue in.
    SessionStarted {
        session_id: String,
        initial_reply: String,
        turns: Vec<ChatTurn>,
    },
    /// The backend answered inline with a verdict text.
    Verdict { text: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    /// Backend copy of the whole session, when it sends one.
    pub turns: Option<Vec<ChatTurn>>,
}

pub fn parse_submission(body: Value) -> Result<TaxSubmission> {
    if let Some(session_id) = body.get("session_id") {
        let session_id = session_id
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| contract("session_id must be a non-empty string"))?
            .to_string();

        let initial_reply = optional_str(&body, "initial_bot_response")?.unwrap_or_default();
        let turns = match body.get("chat_history") {
            Some(history) => decode(history.clone(), "chat_history")?,
            None => Vec::new(),
        };

        return Ok(TaxSubmission::SessionStarted {
            session_id,
            initial_reply,
            turns,
        });
    }

    match optional_str(&body, "data")? {
        Some(text) => Ok(TaxSubmission::Verdict { text }),
        None => Err(contract(
            "submission response has neither session_id nor a verdict",
        )),
    }
}

pub fn parse_chat_reply(body: Value) -> Result<ChatReply> {
    let reply = optional_str(&body, "bot_response")?
        .ok_or_else(|| contract("send_message response is missing bot_response"))?;

    let turns = match body.get("updated_chat_history") {
        Some(Value::Null) | None => None,
        Some(history) => Some(decode(history.clone(), "updated_chat_history")?),
    };

    Ok(ChatReply { reply, turns })
}

pub fn parse_session(body: Value) -> Result<ChatSession> {
    decode(body, "chat session")
}

pub fn parse_session_list(body: Value) -> Result<Vec<ChatSessionSummary>> {
    decode(body, "chat session list")
}

fn optional_str(body: &Value, key: &str) -> Result<Option<String>> {
    match body.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(contract(&format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| contract(&format!("malformed {}: {}", what, e)))
}

fn contract(message: &str) -> ClientError {
    ClientError::ContractViolation(message.to_string())
}

//! HTTP implementation of the backend traits
//!
//! Uses a long-lived reqwest::Client for connection pooling. Requests carry
//! no timeout and are never retried; a slow backend simply keeps the caller
//! waiting.

use super::{
    parse_chat_reply, parse_session, parse_session_list, parse_submission, ChatBackend,
    ChatReply, SendMessageRequest, TaxBackend, TaxSubmission,
};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{ChatSession, ChatSessionSummary, SessionContext};
use crate::payload::SubmitTaxRequest;
use crate::Result;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

const USER_ID_HEADER: &str = "X-User-ID";
const START_SESSION_PATH: &str = "/chat/chats/start_new_tax_session";
const SESSIONS_PATH: &str = "/chat/chats";

/// Client for the tax and chat backend
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.backend_base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, ctx: &SessionContext, path: &str) -> Result<Value> {
        let request = self.client.get(self.url(path));
        self.send(ctx, path, request).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        ctx: &SessionContext,
        path: &str,
        body: &B,
    ) -> Result<Value> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(ctx, path, request).await
    }

    async fn send(
        &self,
        ctx: &SessionContext,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Value> {
        debug!(path = path, user_id = %ctx.user_id, "Calling backend");

        let response = request
            .header(USER_ID_HEADER, &ctx.user_id)
            .send()
            .await
            .map_err(|e| {
                error!("Backend request failed for {}: {}", path, e);
                ClientError::Transport(format!("request to {} failed: {}", path, e))
            })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::SessionNotFound(path.to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Backend returned {} for {}: {}", status, path, error_text);
            return Err(ClientError::Transport(format!(
                "backend returned {} for {}: {}",
                status, path, error_text
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            ClientError::ContractViolation(format!("invalid JSON from {}: {}", path, e))
        })
    }
}

#[async_trait::async_trait]
impl TaxBackend for HttpBackend {
    async fn submit_profile(
        &self,
        ctx: &SessionContext,
        request: &SubmitTaxRequest,
    ) -> Result<TaxSubmission> {
        info!(user_id = %ctx.user_id, "Submitting tax profile");
        let body = self.post_json(ctx, START_SESSION_PATH, request).await?;
        parse_submission(body)
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(
        &self,
        ctx: &SessionContext,
        session_id: &str,
        request: &SendMessageRequest,
    ) -> Result<ChatReply> {
        let path = format!("{}/{}/send_message", SESSIONS_PATH, session_id);
        info!(
            session_id = session_id,
            interruption_response = request.is_interruption_response,
            "Sending chat message"
        );
        let body = self.post_json(ctx, &path, request).await?;
        parse_chat_reply(body)
    }

    async fn fetch_session(&self, ctx: &SessionContext, session_id: &str) -> Result<ChatSession> {
        let path = format!("{}/{}", SESSIONS_PATH, session_id);
        let body = self.get_json(ctx, &path).await?;
        parse_session(body)
    }

    async fn list_sessions(&self, ctx: &SessionContext) -> Result<Vec<ChatSessionSummary>> {
        let body = self.get_json(ctx, SESSIONS_PATH).await?;
        parse_session_list(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let backend = HttpBackend::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8000");
        assert_eq!(
            backend.url(START_SESSION_PATH),
            "http://127.0.0.1:8000/chat/chats/start_new_tax_session"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
        let ctx = SessionContext::new("user-1");

        let err = backend.list_sessions(&ctx).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}

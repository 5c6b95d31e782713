//! Tax advisor - request assembly between the core and its collaborators
//!
//! SUBMIT: DRAFT → NORMALIZE → VALIDATE → PAYLOAD → TaxBackend
//! CHAT:   HISTORY → CLASSIFY → SendMessageRequest → ChatBackend → HISTORY
//!
//! Every call ends in a tagged outcome; failures never touch local state.

use crate::backend::{ChatBackend, SendMessageRequest, TaxBackend, TaxSubmission};
use crate::classifier::SessionState;
use crate::error::ClientError;
use crate::models::{ChatSessionSummary, ChatTurn, SessionContext, TaxProfile, TaxProfileDraft};
use crate::normalizer::TaxNormalizer;
use crate::payload::SubmitTaxRequest;
use crate::session::ChatHistory;
use crate::validation::FieldViolation;
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Submitted {
        profile: TaxProfile,
        submission: TaxSubmission,
    },
    ValidationFailed {
        violations: Vec<FieldViolation>,
    },
    TransportError {
        reason: String,
    },
    ContractViolation {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatOutcome {
    Replied {
        reply: String,
        was_interruption_response: bool,
        state: SessionState,
    },
    TransportError {
        reason: String,
    },
    ContractViolation {
        reason: String,
    },
}

/// Collaborator failure, split by whether the backend spoke the contract
enum Failure {
    Transport(String),
    Contract(String),
}

impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        if err.is_contract_violation() {
            Failure::Contract(err.to_string())
        } else {
            Failure::Transport(err.to_string())
        }
    }
}

/// Coordinates the normalizer, classifier and backend collaborators
pub struct TaxAdvisor {
    normalizer: TaxNormalizer,
    tax_backend: Arc<dyn TaxBackend>,
    chat_backend: Arc<dyn ChatBackend>,
}

impl TaxAdvisor {
    pub fn new(
        normalizer: TaxNormalizer,
        tax_backend: Arc<dyn TaxBackend>,
        chat_backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            normalizer,
            tax_backend,
            chat_backend,
        }
    }

    pub fn normalizer(&self) -> &TaxNormalizer {
        &self.normalizer
    }

    /// Normalize a draft and submit it once
    pub async fn submit_profile(
        &self,
        ctx: &SessionContext,
        draft: &TaxProfileDraft,
    ) -> SubmissionOutcome {
        self.submit_normalized(ctx, self.normalizer.normalize(draft)).await
    }

    /// Same as `submit_profile` for loosely typed form input
    pub async fn submit_value(&self, ctx: &SessionContext, raw: &Value) -> SubmissionOutcome {
        self.submit_normalized(ctx, self.normalizer.normalize_value(raw)).await
    }

    async fn submit_normalized(
        &self,
        ctx: &SessionContext,
        normalized: std::result::Result<TaxProfile, Vec<FieldViolation>>,
    ) -> SubmissionOutcome {
        let start_time = Instant::now();

        let profile = match normalized {
            Ok(profile) => profile,
            Err(violations) => {
                return SubmissionOutcome::ValidationFailed { violations };
            }
        };

        let request = SubmitTaxRequest::new(&profile);

        match self.tax_backend.submit_profile(ctx, &request).await {
            Ok(submission) => {
                info!(
                    user_id = %ctx.user_id,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Tax profile submitted"
                );
                SubmissionOutcome::Submitted {
                    profile,
                    submission,
                }
            }
            Err(err) => {
                warn!(user_id = %ctx.user_id, "Tax profile submission failed: {}", err);
                match Failure::from(err) {
                    Failure::Transport(reason) => SubmissionOutcome::TransportError { reason },
                    Failure::Contract(reason) => SubmissionOutcome::ContractViolation { reason },
                }
            }
        }
    }

    /// Classify and send one user message, then bring `history` up to date
    pub async fn send_message(
        &self,
        ctx: &SessionContext,
        history: &mut ChatHistory,
        message: &str,
    ) -> ChatOutcome {
        let is_interruption_response = history.next_is_interruption_response();
        let request = SendMessageRequest {
            message: message.to_string(),
            is_interruption_response,
        };

        let reply = match self
            .chat_backend
            .send_message(ctx, &history.session_id, &request)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(session_id = %history.session_id, "Chat message failed: {}", err);
                return match Failure::from(err) {
                    Failure::Transport(reason) => ChatOutcome::TransportError { reason },
                    Failure::Contract(reason) => ChatOutcome::ContractViolation { reason },
                };
            }
        };

        match reply.turns {
            Some(turns) => history.replace_all(turns),
            None => {
                history.push(ChatTurn::user(message));
                history.push(ChatTurn::assistant(reply.reply.clone()));
            }
        }

        let state = history.state();
        info!(
            session_id = %history.session_id,
            interruption_response = is_interruption_response,
            state = ?state,
            "Chat reply received"
        );

        ChatOutcome::Replied {
            reply: reply.reply,
            was_interruption_response: is_interruption_response,
            state,
        }
    }

    /// Fetch a session and mirror it locally
    pub async fn load_session(
        &self,
        ctx: &SessionContext,
        session_id: &str,
    ) -> Result<ChatHistory> {
        let session = self.chat_backend.fetch_session(ctx, session_id).await?;
        Ok(ChatHistory::from_session(session))
    }

    pub async fn list_sessions(&self, ctx: &SessionContext) -> Result<Vec<ChatSessionSummary>> {
        self.chat_backend.list_sessions(ctx).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::ChatReply;
    use crate::models::{ChatSession, InvestmentBreakdown};
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    #[derive(Clone, Copy)]
    pub(crate) enum Mode {
        Healthy,
        Down,
        BadShape,
    }

    /// Scripted backend for both traits
    pub(crate) struct MockBackend {
        mode: Mode,
        /// Reply with a full updated history that ends in an interruption.
        interrupt_next: bool,
        pub(crate) sent: Mutex<Vec<SendMessageRequest>>,
        pub(crate) submitted: Mutex<Vec<SubmitTaxRequest>>,
    }

    impl MockBackend {
        pub(crate) fn new(mode: Mode) -> Self {
            Self {
                mode,
                interrupt_next: false,
                sent: Mutex::new(Vec::new()),
                submitted: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn interrupting() -> Self {
            Self {
                interrupt_next: true,
                ..Self::new(Mode::Healthy)
            }
        }

        fn check(&self) -> Result<()> {
            match self.mode {
                Mode::Healthy => Ok(()),
                Mode::Down => Err(ClientError::Transport("connection refused".to_string())),
                Mode::BadShape => Err(ClientError::ContractViolation(
                    "submission response has neither session_id nor a verdict".to_string(),
                )),
            }
        }
    }

    #[async_trait::async_trait]
    impl TaxBackend for MockBackend {
        async fn submit_profile(
            &self,
            _ctx: &SessionContext,
            request: &SubmitTaxRequest,
        ) -> Result<TaxSubmission> {
            self.check()?;
            self.submitted.lock().unwrap().push(request.clone());
            Ok(TaxSubmission::SessionStarted {
                session_id: "sess-1".to_string(),
                initial_reply: "Your deductions look good".to_string(),
                turns: vec![ChatTurn::assistant("Your deductions look good")],
            })
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for MockBackend {
        async fn send_message(
            &self,
            _ctx: &SessionContext,
            _session_id: &str,
            request: &SendMessageRequest,
        ) -> Result<ChatReply> {
            self.check()?;
            self.sent.lock().unwrap().push(request.clone());

            if self.interrupt_next {
                let question = "How old is your mother?";
                Ok(ChatReply {
                    reply: question.to_string(),
                    turns: Some(vec![
                        ChatTurn::user(request.message.clone()),
                        ChatTurn::interruption(question, "call-11"),
                    ]),
                })
            } else {
                Ok(ChatReply {
                    reply: format!("echo: {}", request.message),
                    turns: None,
                })
            }
        }

        async fn fetch_session(
            &self,
            _ctx: &SessionContext,
            session_id: &str,
        ) -> Result<ChatSession> {
            self.check()?;
            Ok(ChatSession {
                id: session_id.to_string(),
                title: "Tax Chat".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                turns: vec![ChatTurn::interruption("Which regime?", "call-2")],
            })
        }

        async fn list_sessions(&self, _ctx: &SessionContext) -> Result<Vec<ChatSessionSummary>> {
            self.check()?;
            Ok(vec![])
        }
    }

    fn advisor(backend: Arc<MockBackend>) -> TaxAdvisor {
        TaxAdvisor::new(TaxNormalizer::default(), backend.clone(), backend)
    }

    fn draft() -> TaxProfileDraft {
        TaxProfileDraft {
            salary: Some(1_500_000.0),
            age: Some(45),
            investments: InvestmentBreakdown {
                epf: 70_000.0,
                elss: 30_000.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_profile_sends_aggregate() {
        let backend = Arc::new(MockBackend::new(Mode::Healthy));
        let ctx = SessionContext::new("user-1");

        let outcome = advisor(backend.clone()).submit_profile(&ctx, &draft()).await;
        assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));

        let submitted = backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].profile.investments.section_80c, 100_000.0);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_backend() {
        let backend = Arc::new(MockBackend::new(Mode::Healthy));
        let ctx = SessionContext::new("user-1");
        let bad = TaxProfileDraft {
            salary: Some(-1.0),
            is_disabled: true,
            ..draft()
        };

        match advisor(backend.clone()).submit_profile(&ctx, &bad).await {
            SubmissionOutcome::ValidationFailed { violations } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_form_never_reaches_backend() {
        let backend = Arc::new(MockBackend::new(Mode::Healthy));
        let ctx = SessionContext::new("user-1");
        let raw = serde_json::json!({ "salary": "ten lakh", "age": 40 });

        match advisor(backend.clone()).submit_value(&ctx, &raw).await {
            SubmissionOutcome::ValidationFailed { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "salary");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submission_failures_are_distinguished() {
        let ctx = SessionContext::new("user-1");

        let down = advisor(Arc::new(MockBackend::new(Mode::Down)));
        assert!(matches!(
            down.submit_profile(&ctx, &draft()).await,
            SubmissionOutcome::TransportError { .. }
        ));

        let bad_shape = advisor(Arc::new(MockBackend::new(Mode::BadShape)));
        assert!(matches!(
            bad_shape.submit_profile(&ctx, &draft()).await,
            SubmissionOutcome::ContractViolation { .. }
        ));
    }

    #[tokio::test]
    async fn test_reply_to_interruption_is_flagged() {
        let backend = Arc::new(MockBackend::new(Mode::Healthy));
        let advisor = advisor(backend.clone());
        let ctx = SessionContext::new("user-1").with_session("sess-1");

        let mut history = assert_ok!(advisor.load_session(&ctx, "sess-1").await);
        assert_eq!(history.state(), SessionState::AwaitingResponse);

        let outcome = advisor.send_message(&ctx, &mut history, "old regime").await;
        assert!(matches!(
            outcome,
            ChatOutcome::Replied { was_interruption_response: true, state: SessionState::Idle, .. }
        ));

        let follow_up = advisor.send_message(&ctx, &mut history, "and 80G?").await;
        assert!(matches!(
            follow_up,
            ChatOutcome::Replied { was_interruption_response: false, .. }
        ));

        let sent = backend.sent.lock().unwrap();
        assert!(sent[0].is_interruption_response);
        assert!(!sent[1].is_interruption_response);
        assert_eq!(history.len(), 5);
    }

    #[tokio::test]
    async fn test_updated_history_sets_next_marker() {
        let advisor = advisor(Arc::new(MockBackend::interrupting()));
        let ctx = SessionContext::new("user-1");
        let mut history = ChatHistory::new("sess-2");

        let outcome = advisor.send_message(&ctx, &mut history, "compute 80D").await;
        assert!(matches!(
            outcome,
            ChatOutcome::Replied { state: SessionState::AwaitingResponse, .. }
        ));
        assert!(history.next_is_interruption_response());
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let advisor = advisor(Arc::new(MockBackend::new(Mode::Down)));
        let ctx = SessionContext::new("user-1");
        let mut history = ChatHistory::new("sess-3");
        history.push(ChatTurn::interruption("Age?", "call-1"));

        let outcome = advisor.send_message(&ctx, &mut history, "61").await;
        assert!(matches!(outcome, ChatOutcome::TransportError { .. }));
        assert_eq!(history.len(), 1);
        assert!(history.next_is_interruption_response());
    }
}

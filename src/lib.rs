//! Tax Advisor Client
//!
//! Client core for a conversational Indian income-tax advisor:
//! - Normalizes a raw tax profile draft (80C aggregation, parents' age,
//!   senior citizen status) and validates it before submission
//! - Builds the canonical request payload the tax backend expects
//! - Classifies each outgoing chat message as a fresh query or a reply to
//!   a pending interruption
//! - Renders the markdown subset the assistant answers in
//!
//! SUBMIT: DRAFT → NORMALIZE → VALIDATE → PAYLOAD → BACKEND
//! CHAT:   HISTORY → CLASSIFY → BACKEND → HISTORY

pub mod advisor;
pub mod api;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod markdown;
pub mod models;
pub mod normalizer;
pub mod payload;
pub mod session;
pub mod validation;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use advisor::{ChatOutcome, SubmissionOutcome, TaxAdvisor};
pub use classifier::{classify, SessionState, TurnClassifier, TurnKind};
pub use normalizer::TaxNormalizer;
pub use payload::{to_request_payload, CanonicalRequest, SubmitTaxRequest};

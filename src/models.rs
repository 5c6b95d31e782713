//! Core data models for the tax advisor client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    SelfOccupied,
    LetOut,
    DeemedLetOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisabilityKind {
    Normal,
    Severe,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    #[default]
    Old,
    New,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

//
// ================= Tax Profile =================
//

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Disability {
    pub is_disabled: bool,
    pub kind: Option<DisabilityKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OtherIncome {
    pub savings_interest: f64,
    pub fixed_deposit_interest: f64,
}

/// Itemised Section 80C investments as entered on the form.
/// Only their aggregate ever leaves the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InvestmentBreakdown {
    pub epf: f64,
    pub ppf: f64,
    pub lic: f64,
    pub elss: f64,
    pub home_loan_principal: f64,
    pub other: f64,
}

impl InvestmentBreakdown {
    pub fn total(&self) -> f64 {
        crate::normalizer::aggregate_80c(
            self.epf,
            self.ppf,
            self.lic,
            self.elss,
            self.home_loan_principal,
            self.other,
        )
    }
}

/// Backend-ready tax facts.
///
/// `is_senior_citizen`, `investments_80c` and `parents_age` are derived and
/// can only change through their source setters.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaxProfile {
    pub salary: f64,
    age: u32,
    is_senior_citizen: bool,
    investments_80c: f64,
    pub nps_contribution: f64,
    pub health_insurance_self: f64,
    pub health_insurance_parents: f64,
    pub medical_expenses: f64,
    parents_age: u32,
    pub housing_loan_interest: f64,
    pub property_status: PropertyStatus,
    pub donation_amount: f64,
    pub education_loan_interest: f64,
    pub disability: Disability,
    pub other_income: OtherIncome,
    pub tax_regime: TaxRegime,
}

impl TaxProfile {
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn is_senior_citizen(&self) -> bool {
        self.is_senior_citizen
    }

    pub fn investments_80c(&self) -> f64 {
        self.investments_80c
    }

    pub fn parents_age(&self) -> u32 {
        self.parents_age
    }

    /// Set the age and re-derive senior citizen status.
    pub fn set_age(&mut self, age: u32) {
        self.age = age;
        self.is_senior_citizen = crate::normalizer::derive_senior_citizen(age);
    }

    /// Replace the 80C aggregate with the total of an itemised breakdown.
    pub fn set_investments(&mut self, breakdown: &InvestmentBreakdown) {
        self.investments_80c = breakdown.total();
    }

    pub fn set_parent_ages(&mut self, father: Option<u32>, mother: Option<u32>) {
        self.parents_age = crate::normalizer::derive_parents_age(father, mother);
    }

    /// Restore derived values that arrived already aggregated on the wire.
    pub(crate) fn restore_aggregates(&mut self, investments_80c: f64, parents_age: u32) {
        self.investments_80c = investments_80c;
        self.parents_age = parents_age;
    }
}

/// Raw calculator form input. Derived fields have no representation here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaxProfileDraft {
    pub salary: Option<f64>,
    pub age: Option<u32>,
    pub investments: InvestmentBreakdown,
    pub nps_contribution: Option<f64>,
    pub health_insurance_self: Option<f64>,
    pub health_insurance_parents: Option<f64>,
    pub medical_expenses: Option<f64>,
    pub father_age: Option<u32>,
    pub mother_age: Option<u32>,
    pub housing_loan_interest: Option<f64>,
    pub property_status: Option<PropertyStatus>,
    pub donation_amount: Option<f64>,
    pub education_loan_interest: Option<f64>,
    pub is_disabled: bool,
    pub disability_kind: Option<DisabilityKind>,
    pub savings_interest: Option<f64>,
    pub fixed_deposit_interest: Option<f64>,
    pub tax_regime: Option<TaxRegime>,
}

//
// ================= Chat =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: String,
    pub role: ChatRole,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Set only on an assistant turn that is blocked on user input.
    #[serde(default, alias = "toolCallId")]
    pub tool_call_id: Option<String>,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// An assistant turn waiting on the user for a specific answer.
    pub fn interruption(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::assistant(content)
        }
    }

    pub fn is_pending_interruption(&self) -> bool {
        self.role == ChatRole::Assistant && self.tool_call_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "chat_history")]
    pub turns: Vec<ChatTurn>,
}

//
// ================= Context =================
//

/// Caller identity and active session, passed explicitly to every
/// collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub session_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Accepts RFC 3339 or a naive ISO timestamp, which is taken as UTC.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyStatus::SelfOccupied => "self_occupied",
            PropertyStatus::LetOut => "let_out",
            PropertyStatus::DeemedLetOut => "deemed_let_out",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

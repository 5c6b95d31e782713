//! Field validation for tax profiles
//!
//! Rules-based checks run after derivation. Every failing rule is reported,
//! so a caller can render one message per field.

use crate::models::TaxProfile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Statutory ceiling on the Section 80C aggregate.
pub const SECTION_80C_LIMIT: f64 = 150_000.0;

/// Ceiling on the additional NPS deduction under Section 80CCD(1B).
pub const SECTION_80CCD1B_LIMIT: f64 = 50_000.0;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    WrongType { expected: &'static str },
    NotFinite,
    Negative,
    AboveMaximum { max: f64 },
    OutOfRange { min: u32, max: u32 },
    DisabilityKindRequired,
    DisabilityKindUnexpected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, kind: ViolationKind) -> Self {
        let message = describe(field, &kind);
        Self {
            field,
            kind,
            message,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn describe(field: &str, kind: &ViolationKind) -> String {
    match kind {
        ViolationKind::Missing => format!("{} is required", field),
        ViolationKind::WrongType { expected } => format!("{} must be {}", field, expected),
        ViolationKind::NotFinite => format!("{} must be a number", field),
        ViolationKind::Negative => format!("{} cannot be negative", field),
        ViolationKind::AboveMaximum { max } => {
            format!("{} cannot exceed {}", field, max)
        }
        ViolationKind::OutOfRange { min, max } => {
            format!("{} must be between {} and {}", field, min, max)
        }
        ViolationKind::DisabilityKindRequired => {
            "disability type is required when a disability is declared".to_string()
        }
        ViolationKind::DisabilityKindUnexpected => {
            "disability type is only allowed when a disability is declared".to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub violations: Vec<FieldViolation>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violation_for(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

/// Trait for a single field rule
pub trait ValidationRule: Send + Sync {
    fn field(&self) -> &'static str;

    fn check(&self, profile: &TaxProfile) -> Option<ViolationKind>;
}

/// Validation engine that applies every registered rule
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, profile: &TaxProfile) -> ValidationResult {
        let violations: Vec<FieldViolation> = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.check(profile)
                    .map(|kind| FieldViolation::new(rule.field(), kind))
            })
            .collect();

        debug!(
            rule_count = self.rules.len(),
            violation_count = violations.len(),
            "Profile validation completed"
        );

        ValidationResult {
            violations,
            validated_at: Utc::now(),
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Rules =================
//

/// Non-negative monetary amount with an optional ceiling.
pub struct AmountRule {
    field: &'static str,
    read: fn(&TaxProfile) -> f64,
    max: Option<f64>,
}

impl AmountRule {
    pub fn new(field: &'static str, read: fn(&TaxProfile) -> f64) -> Self {
        Self {
            field,
            read,
            max: None,
        }
    }

    pub fn capped(field: &'static str, read: fn(&TaxProfile) -> f64, max: f64) -> Self {
        Self {
            field,
            read,
            max: Some(max),
        }
    }
}

impl ValidationRule for AmountRule {
    fn field(&self) -> &'static str {
        self.field
    }

    fn check(&self, profile: &TaxProfile) -> Option<ViolationKind> {
        let value = (self.read)(profile);

        if !value.is_finite() {
            return Some(ViolationKind::NotFinite);
        }
        if value < 0.0 {
            return Some(ViolationKind::Negative);
        }
        match self.max {
            Some(max) if value > max => Some(ViolationKind::AboveMaximum { max }),
            _ => None,
        }
    }
}

pub struct AgeRule;

impl ValidationRule for AgeRule {
    fn field(&self) -> &'static str {
        "age"
    }

    fn check(&self, profile: &TaxProfile) -> Option<ViolationKind> {
        if (MIN_AGE..=MAX_AGE).contains(&profile.age()) {
            None
        } else {
            Some(ViolationKind::OutOfRange {
                min: MIN_AGE,
                max: MAX_AGE,
            })
        }
    }
}

/// A disability kind is required iff a disability is declared.
pub struct DisabilityRule;

impl ValidationRule for DisabilityRule {
    fn field(&self) -> &'static str {
        "disability.kind"
    }

    fn check(&self, profile: &TaxProfile) -> Option<ViolationKind> {
        match (profile.disability.is_disabled, profile.disability.kind) {
            (true, None) => Some(ViolationKind::DisabilityKindRequired),
            (false, Some(_)) => Some(ViolationKind::DisabilityKindUnexpected),
            _ => None,
        }
    }
}

/// Create a validation engine covering every field of a tax profile
pub fn create_default_validation_engine() -> ValidationEngine {
    let mut engine = ValidationEngine::new();

    engine.add_rule(Box::new(AmountRule::new("salary", |p| p.salary)));
    engine.add_rule(Box::new(AgeRule));
    engine.add_rule(Box::new(AmountRule::capped(
        "investments_80c",
        |p| p.investments_80c(),
        SECTION_80C_LIMIT,
    )));
    engine.add_rule(Box::new(AmountRule::capped(
        "nps_contribution",
        |p| p.nps_contribution,
        SECTION_80CCD1B_LIMIT,
    )));
    engine.add_rule(Box::new(AmountRule::new("health_insurance_self", |p| {
        p.health_insurance_self
    })));
    engine.add_rule(Box::new(AmountRule::new("health_insurance_parents", |p| {
        p.health_insurance_parents
    })));
    engine.add_rule(Box::new(AmountRule::new("medical_expenses", |p| {
        p.medical_expenses
    })));
    engine.add_rule(Box::new(AmountRule::new("housing_loan_interest", |p| {
        p.housing_loan_interest
    })));
    engine.add_rule(Box::new(AmountRule::new("donation_amount", |p| {
        p.donation_amount
    })));
    engine.add_rule(Box::new(AmountRule::new("education_loan_interest", |p| {
        p.education_loan_interest
    })));
    engine.add_rule(Box::new(DisabilityRule));
    engine.add_rule(Box::new(AmountRule::new("other_income.savings_interest", |p| {
        p.other_income.savings_interest
    })));
    engine.add_rule(Box::new(AmountRule::new(
        "other_income.fixed_deposit_interest",
        |p| p.other_income.fixed_deposit_interest,
    )));

    engine
}

//
// ================= Tests =================
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisabilityKind, InvestmentBreakdown};

    fn valid_profile() -> TaxProfile {
        let mut profile = TaxProfile::default();
        profile.salary = 1_200_000.0;
        profile.set_age(35);
        profile
    }

    #[test]
    fn test_valid_profile_passes() {
        let engine = create_default_validation_engine();
        let result = engine.validate(&valid_profile());
        assert!(result.is_valid(), "{:?}", result.violations);
    }

    #[test]
    fn test_reports_every_violation_in_one_pass() {
        let engine = create_default_validation_engine();
        let mut profile = valid_profile();
        profile.salary = -1.0;
        profile.disability.is_disabled = true;

        let result = engine.validate(&profile);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(
            result.violation_for("salary").map(|v| &v.kind),
            Some(&ViolationKind::Negative)
        );
        assert_eq!(
            result.violation_for("disability.kind").map(|v| &v.kind),
            Some(&ViolationKind::DisabilityKindRequired)
        );
    }

    #[test]
    fn test_80c_ceiling_applies_to_aggregate() {
        let engine = create_default_validation_engine();
        let mut profile = valid_profile();
        profile.set_investments(&InvestmentBreakdown {
            epf: 100_000.0,
            ppf: 60_000.0,
            ..Default::default()
        });

        let result = engine.validate(&profile);
        assert_eq!(
            result.violation_for("investments_80c").map(|v| &v.kind),
            Some(&ViolationKind::AboveMaximum {
                max: SECTION_80C_LIMIT
            })
        );

        profile.set_investments(&InvestmentBreakdown {
            epf: 100_000.0,
            ppf: 50_000.0,
            ..Default::default()
        });
        assert!(engine.validate(&profile).is_valid());
    }

    #[test]
    fn test_age_bounds() {
        let engine = create_default_validation_engine();
        let mut profile = valid_profile();

        for (age, ok) in [(17, false), (18, true), (100, true), (101, false)] {
            profile.set_age(age);
            assert_eq!(engine.validate(&profile).is_valid(), ok, "age {}", age);
        }
    }

    #[test]
    fn test_nan_amount_is_rejected() {
        let engine = create_default_validation_engine();
        let mut profile = valid_profile();
        profile.medical_expenses = f64::NAN;

        let result = engine.validate(&profile);
        assert_eq!(
            result.violation_for("medical_expenses").map(|v| &v.kind),
            Some(&ViolationKind::NotFinite)
        );
    }

    #[test]
    fn test_disability_kind_without_disability() {
        let engine = create_default_validation_engine();
        let mut profile = valid_profile();
        profile.disability.kind = Some(DisabilityKind::Severe);

        let result = engine.validate(&profile);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(
            result.violations[0].kind,
            ViolationKind::DisabilityKindUnexpected
        );
    }

    #[test]
    fn test_violation_message() {
        let violation = FieldViolation::new(
            "nps_contribution",
            ViolationKind::AboveMaximum { max: 50_000.0 },
        );
        assert_eq!(
            violation.to_string(),
            "nps_contribution: nps_contribution cannot exceed 50000"
        );

        let wrong = FieldViolation::new(
            "father_age",
            ViolationKind::WrongType {
                expected: "a whole number",
            },
        );
        assert_eq!(wrong.message, "father_age must be a whole number");
    }
}

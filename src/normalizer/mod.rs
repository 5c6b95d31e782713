//! Tax profile normalizer
//!
//! Turns raw calculator input into a `TaxProfile`:
//! DRAFT → DERIVE (senior status, 80C aggregate, parents' age) → VALIDATE
//!
//! Validation bounds apply to derived values, so derivation always runs first.

pub mod intake;

use crate::models::{Disability, OtherIncome, TaxProfile, TaxProfileDraft};
use crate::validation::{
    create_default_validation_engine, FieldViolation, ValidationEngine, ValidationResult,
    ViolationKind,
};
use serde_json::Value;
use tracing::{debug, info};

pub const SENIOR_CITIZEN_AGE: u32 = 60;

/// `true` from the 60th birthday onwards.
pub fn derive_senior_citizen(age: u32) -> bool {
    age >= SENIOR_CITIZEN_AGE
}

/// Sum the six Section 80C categories.
///
/// The result is the exact sum rounded once, so it does not depend on the
/// order of the inputs and no fraction of a rupee is dropped. The statutory
/// ceiling is a validation bound and is not applied here. A non-finite input
/// yields NaN.
pub fn aggregate_80c(
    epf: f64,
    ppf: f64,
    lic: f64,
    elss: f64,
    home_loan_principal: f64,
    other: f64,
) -> f64 {
    let parts = [epf, ppf, lic, elss, home_loan_principal, other];

    if parts.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }

    exact_sum(&parts)
}

/// Correctly rounded sum of finite values.
///
/// Keeps a list of non-overlapping partial sums (Shewchuk), then rounds the
/// exact total half-to-even. Overflow yields an infinity.
fn exact_sum(values: &[f64]) -> f64 {
    let mut partials: Vec<f64> = Vec::with_capacity(values.len());

    for &value in values {
        let mut x = value;
        let mut kept = 0;

        for j in 0..partials.len() {
            let mut y = partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            if !hi.is_finite() {
                return hi;
            }
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }

        partials.truncate(kept);
        partials.push(x);
    }

    let Some(mut n) = partials.len().checked_sub(1) else {
        return 0.0;
    };
    let mut hi = partials[n];
    let mut lo = 0.0;

    while n > 0 {
        let x = hi;
        n -= 1;
        let y = partials[n];
        hi = x + y;
        lo = y - (hi - x);
        if lo != 0.0 {
            break;
        }
    }

    // Round half-to-even on the exact remainder below `hi`.
    if n > 0 && ((lo < 0.0 && partials[n - 1] < 0.0) || (lo > 0.0 && partials[n - 1] > 0.0)) {
        let y = lo * 2.0;
        let x = hi + y;
        if y == x - hi {
            hi = x;
        }
    }

    hi
}

/// Floored average of both parents' ages, or whichever one was supplied.
/// An age of zero counts as not supplied.
pub fn derive_parents_age(father: Option<u32>, mother: Option<u32>) -> u32 {
    let supplied = |age: Option<u32>| age.filter(|a| *a > 0);

    match (supplied(father), supplied(mother)) {
        (Some(f), Some(m)) => ((u64::from(f) + u64::from(m)) / 2) as u32,
        (Some(age), None) | (None, Some(age)) => age,
        (None, None) => 0,
    }
}

/// Normalizer that derives and validates tax profiles
pub struct TaxNormalizer {
    engine: ValidationEngine,
}

impl TaxNormalizer {
    pub fn new(engine: ValidationEngine) -> Self {
        Self { engine }
    }

    /// Build a profile from a draft, applying every derivation.
    ///
    /// Derivations read only draft fields, so this single pass is already
    /// the fixed point.
    pub fn build(&self, draft: &TaxProfileDraft) -> TaxProfile {
        let mut profile = TaxProfile::default();
        profile.salary = draft.salary.unwrap_or_default();
        profile.nps_contribution = draft.nps_contribution.unwrap_or_default();
        profile.health_insurance_self = draft.health_insurance_self.unwrap_or_default();
        profile.health_insurance_parents = draft.health_insurance_parents.unwrap_or_default();
        profile.medical_expenses = draft.medical_expenses.unwrap_or_default();
        profile.housing_loan_interest = draft.housing_loan_interest.unwrap_or_default();
        profile.property_status = draft.property_status.unwrap_or_default();
        profile.donation_amount = draft.donation_amount.unwrap_or_default();
        profile.education_loan_interest = draft.education_loan_interest.unwrap_or_default();
        profile.disability = Disability {
            is_disabled: draft.is_disabled,
            kind: draft.disability_kind.filter(|_| draft.is_disabled),
        };
        profile.other_income = OtherIncome {
            savings_interest: draft.savings_interest.unwrap_or_default(),
            fixed_deposit_interest: draft.fixed_deposit_interest.unwrap_or_default(),
        };
        profile.tax_regime = draft.tax_regime.unwrap_or_default();

        profile.set_age(draft.age.unwrap_or_default());
        profile.set_investments(&draft.investments);
        profile.set_parent_ages(draft.father_age, draft.mother_age);

        debug!(
            age = profile.age(),
            senior = profile.is_senior_citizen(),
            investments_80c = profile.investments_80c(),
            parents_age = profile.parents_age(),
            "Derived profile fields"
        );

        profile
    }

    pub fn validate(&self, profile: &TaxProfile) -> ValidationResult {
        self.engine.validate(profile)
    }

    /// Derive, then validate. Returns every violation when the draft is not
    /// submittable.
    pub fn normalize(&self, draft: &TaxProfileDraft) -> Result<TaxProfile, Vec<FieldViolation>> {
        let (profile, violations) = self.check(draft);
        finish(profile, violations)
    }

    /// Normalize loosely typed form input.
    ///
    /// Unreadable fields are reported alongside the derived-value violations.
    /// A field that could not be read is not reported a second time as
    /// missing or out of range.
    pub fn normalize_value(&self, raw: &Value) -> Result<TaxProfile, Vec<FieldViolation>> {
        let (draft, mut violations) = intake::parse_draft(raw);
        let (profile, checked) = self.check(&draft);

        let unreadable: Vec<&'static str> = violations.iter().map(|v| v.field).collect();
        violations.extend(
            checked
                .into_iter()
                .filter(|v| !unreadable.contains(&v.field)),
        );

        finish(profile, violations)
    }

    fn check(&self, draft: &TaxProfileDraft) -> (TaxProfile, Vec<FieldViolation>) {
        let profile = self.build(draft);

        let mut violations = breakdown_violations(draft);
        for violation in self.validate(&profile).violations {
            if violation.field == "age" && draft.age.is_none() {
                violations.push(FieldViolation::new("age", ViolationKind::Missing));
            } else {
                violations.push(violation);
            }
        }

        (profile, violations)
    }
}

fn finish(
    profile: TaxProfile,
    violations: Vec<FieldViolation>,
) -> Result<TaxProfile, Vec<FieldViolation>> {
    if violations.is_empty() {
        info!(
            salary = profile.salary,
            investments_80c = profile.investments_80c(),
            "Tax profile normalized"
        );
        Ok(profile)
    } else {
        info!(violation_count = violations.len(), "Tax profile rejected");
        Err(violations)
    }
}

impl Default for TaxNormalizer {
    fn default() -> Self {
        Self::new(create_default_validation_engine())
    }
}

/// Itemised 80C entries never reach the profile, so they are checked here.
fn breakdown_violations(draft: &TaxProfileDraft) -> Vec<FieldViolation> {
    let items = &draft.investments;
    let entries: [(&'static str, f64); 6] = [
        ("investments.epf", items.epf),
        ("investments.ppf", items.ppf),
        ("investments.lic", items.lic),
        ("investments.elss", items.elss),
        ("investments.home_loan_principal", items.home_loan_principal),
        ("investments.other", items.other),
    ];

    entries
        .into_iter()
        .filter_map(|(field, value)| {
            if !value.is_finite() {
                Some(FieldViolation::new(field, ViolationKind::NotFinite))
            } else if value < 0.0 {
                Some(FieldViolation::new(field, ViolationKind::Negative))
            } else {
                None
            }
        })
        .collect()
}

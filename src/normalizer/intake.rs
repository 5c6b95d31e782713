//! Lenient draft intake
//!
//! Form input arrives as loosely typed JSON. Each known field is read on its
//! own so a bad value becomes a `FieldViolation` for that field instead of
//! aborting the whole draft. Fields that fail to read are left unset.

use crate::models::{InvestmentBreakdown, TaxProfileDraft};
use crate::validation::{FieldViolation, ViolationKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const A_NUMBER: &str = "a number";
const A_WHOLE_NUMBER: &str = "a whole number";
const AN_OBJECT: &str = "an object";
const A_BOOLEAN: &str = "true or false";

/// Read a draft out of raw JSON, collecting a violation per unreadable field.
pub fn parse_draft(raw: &Value) -> (TaxProfileDraft, Vec<FieldViolation>) {
    let mut reader = Reader::default();

    let Some(fields) = raw.as_object() else {
        reader.reject("profile", ViolationKind::WrongType { expected: AN_OBJECT });
        return (TaxProfileDraft::default(), reader.violations);
    };

    let draft = TaxProfileDraft {
        salary: reader.amount(fields, "salary"),
        age: reader.whole(fields, "age"),
        investments: reader.investments(fields),
        nps_contribution: reader.amount(fields, "nps_contribution"),
        health_insurance_self: reader.amount(fields, "health_insurance_self"),
        health_insurance_parents: reader.amount(fields, "health_insurance_parents"),
        medical_expenses: reader.amount(fields, "medical_expenses"),
        father_age: reader.whole(fields, "father_age"),
        mother_age: reader.whole(fields, "mother_age"),
        housing_loan_interest: reader.amount(fields, "housing_loan_interest"),
        property_status: reader.choice(
            fields,
            "property_status",
            "one of self_occupied, let_out, deemed_let_out",
        ),
        donation_amount: reader.amount(fields, "donation_amount"),
        education_loan_interest: reader.amount(fields, "education_loan_interest"),
        is_disabled: reader.flag(fields, "is_disabled"),
        disability_kind: reader.choice(fields, "disability_kind", "one of normal, severe"),
        savings_interest: reader.amount(fields, "savings_interest"),
        fixed_deposit_interest: reader.amount(fields, "fixed_deposit_interest"),
        tax_regime: reader.choice(fields, "tax_regime", "one of old, new"),
    };

    (draft, reader.violations)
}

#[derive(Default)]
struct Reader {
    violations: Vec<FieldViolation>,
}

impl Reader {
    fn reject(&mut self, field: &'static str, kind: ViolationKind) {
        self.violations.push(FieldViolation::new(field, kind));
    }

    fn amount(&mut self, fields: &Map<String, Value>, field: &'static str) -> Option<f64> {
        match present(fields, field)? {
            Value::Number(n) => n.as_f64(),
            _ => {
                self.reject(field, ViolationKind::WrongType { expected: A_NUMBER });
                None
            }
        }
    }

    /// Ages: whole, non-negative and within `u32`.
    fn whole(&mut self, fields: &Map<String, Value>, field: &'static str) -> Option<u32> {
        let value = present(fields, field)?;

        let Some(n) = value.as_f64() else {
            self.reject(field, ViolationKind::WrongType { expected: A_WHOLE_NUMBER });
            return None;
        };

        if n < 0.0 {
            self.reject(field, ViolationKind::Negative);
            None
        } else if n.fract() != 0.0 {
            self.reject(field, ViolationKind::WrongType { expected: A_WHOLE_NUMBER });
            None
        } else if n > f64::from(u32::MAX) {
            self.reject(field, ViolationKind::AboveMaximum { max: f64::from(u32::MAX) });
            None
        } else {
            Some(n as u32)
        }
    }

    /// Accepts a JSON boolean or the backend's `"true"` / `"false"` strings.
    fn flag(&mut self, fields: &Map<String, Value>, field: &'static str) -> bool {
        match present(fields, field) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(_) => {
                self.reject(field, ViolationKind::WrongType { expected: A_BOOLEAN });
                false
            }
        }
    }

    fn choice<T: DeserializeOwned>(
        &mut self,
        fields: &Map<String, Value>,
        field: &'static str,
        expected: &'static str,
    ) -> Option<T> {
        let value = present(fields, field)?;
        match serde_json::from_value(value.clone()) {
            Ok(choice) => Some(choice),
            Err(_) => {
                self.reject(field, ViolationKind::WrongType { expected });
                None
            }
        }
    }

    fn investments(&mut self, fields: &Map<String, Value>) -> InvestmentBreakdown {
        let Some(value) = present(fields, "investments") else {
            return InvestmentBreakdown::default();
        };
        let Some(items) = value.as_object() else {
            self.reject("investments", ViolationKind::WrongType { expected: AN_OBJECT });
            return InvestmentBreakdown::default();
        };

        InvestmentBreakdown {
            epf: self.amount(items, "investments.epf").unwrap_or_default(),
            ppf: self.amount(items, "investments.ppf").unwrap_or_default(),
            lic: self.amount(items, "investments.lic").unwrap_or_default(),
            elss: self.amount(items, "investments.elss").unwrap_or_default(),
            home_loan_principal: self
                .amount(items, "investments.home_loan_principal")
                .unwrap_or_default(),
            other: self.amount(items, "investments.other").unwrap_or_default(),
        }
    }
}

/// Look up a field, treating JSON `null` as absent. Nested investment items
/// are keyed by the part after the `investments.` prefix.
fn present<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    let key = field.strip_prefix("investments.").unwrap_or(field);
    fields.get(key).filter(|v| !v.is_null())
}

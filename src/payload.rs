//! Canonical request contract for the tax calculation backend
//!
//! Key names and nesting are fixed by the backend and must only change
//! together with it.

use crate::error::ClientError;
use crate::models::{
    Disability, DisabilityKind, OtherIncome, PropertyStatus, TaxProfile, TaxRegime,
};
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalInvestments {
    #[serde(rename = "80C_investments")]
    pub section_80c: f64,
    pub nps_contribution: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CanonicalDisabilityType {
    #[serde(rename = "normal_disability")]
    Normal,
    #[serde(rename = "severe_disability")]
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalDisability {
    /// Sent as the string `"true"` / `"false"`.
    #[serde(with = "bool_string")]
    pub is_disabled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CanonicalDisabilityType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalOtherIncome {
    pub interest_from_savings: f64,
    pub fixed_deposit_interest: f64,
}

/// The `user_details` object the backend calculation graph consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalRequest {
    pub salary: f64,
    #[serde(alias = "user_age")]
    pub age_self: u32,
    pub is_senior_citizen: bool,
    pub investments: CanonicalInvestments,
    pub health_insurance_premium: f64,
    pub parents_health_insurance_premium: f64,
    pub medical_expenses: f64,
    pub parents_age: u32,
    pub housing_loan_interest: f64,
    pub property_status: PropertyStatus,
    pub donation_amount: f64,
    pub education_loan_interest: f64,
    pub disability_details: CanonicalDisability,
    pub other_income: CanonicalOtherIncome,
    #[serde(default)]
    pub tax_regime: TaxRegime,
}

/// Submission envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitTaxRequest {
    #[serde(rename = "user_details")]
    pub profile: CanonicalRequest,
}

impl SubmitTaxRequest {
    pub fn new(profile: &TaxProfile) -> Self {
        Self {
            profile: to_request_payload(profile),
        }
    }
}

/// Map a validated profile onto the backend's field names.
pub fn to_request_payload(profile: &TaxProfile) -> CanonicalRequest {
    CanonicalRequest {
        salary: profile.salary,
        age_self: profile.age(),
        is_senior_citizen: profile.is_senior_citizen(),
        investments: CanonicalInvestments {
            section_80c: profile.investments_80c(),
            nps_contribution: profile.nps_contribution,
        },
        health_insurance_premium: profile.health_insurance_self,
        parents_health_insurance_premium: profile.health_insurance_parents,
        medical_expenses: profile.medical_expenses,
        parents_age: profile.parents_age(),
        housing_loan_interest: profile.housing_loan_interest,
        property_status: profile.property_status,
        donation_amount: profile.donation_amount,
        education_loan_interest: profile.education_loan_interest,
        disability_details: CanonicalDisability {
            is_disabled: profile.disability.is_disabled,
            kind: profile.disability.kind.map(|kind| match kind {
                DisabilityKind::Normal => CanonicalDisabilityType::Normal,
                DisabilityKind::Severe => CanonicalDisabilityType::Severe,
            }),
        },
        other_income: CanonicalOtherIncome {
            interest_from_savings: profile.other_income.savings_interest,
            fixed_deposit_interest: profile.other_income.fixed_deposit_interest,
        },
        tax_regime: profile.tax_regime,
    }
}

impl From<&TaxProfile> for CanonicalRequest {
    fn from(profile: &TaxProfile) -> Self {
        to_request_payload(profile)
    }
}

impl TryFrom<CanonicalRequest> for TaxProfile {
    type Error = ClientError;

    /// Rebuild a profile from its wire form. Senior status is re-derived
    /// and must agree with the transmitted flag.
    fn try_from(request: CanonicalRequest) -> Result<Self> {
        let mut profile = TaxProfile::default();
        profile.set_age(request.age_self);

        if profile.is_senior_citizen() != request.is_senior_citizen {
            return Err(ClientError::ContractViolation(format!(
                "is_senior_citizen={} disagrees with age_self={}",
                request.is_senior_citizen, request.age_self
            )));
        }

        profile.restore_aggregates(request.investments.section_80c, request.parents_age);
        profile.salary = request.salary;
        profile.nps_contribution = request.investments.nps_contribution;
        profile.health_insurance_self = request.health_insurance_premium;
        profile.health_insurance_parents = request.parents_health_insurance_premium;
        profile.medical_expenses = request.medical_expenses;
        profile.housing_loan_interest = request.housing_loan_interest;
        profile.property_status = request.property_status;
        profile.donation_amount = request.donation_amount;
        profile.education_loan_interest = request.education_loan_interest;
        profile.disability = Disability {
            is_disabled: request.disability_details.is_disabled,
            kind: request.disability_details.kind.map(|kind| match kind {
                CanonicalDisabilityType::Normal => DisabilityKind::Normal,
                CanonicalDisabilityType::Severe => DisabilityKind::Severe,
            }),
        };
        profile.other_income = OtherIncome {
            savings_interest: request.other_income.interest_from_savings,
            fixed_deposit_interest: request.other_income.fixed_deposit_interest,
        };
        profile.tax_regime = request.tax_regime;

        Ok(profile)
    }
}

mod bool_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(de::Error::custom(format!(
                "expected \"true\" or \"false\", got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestmentBreakdown, TaxProfileDraft};
    use crate::normalizer::TaxNormalizer;
    use serde_json::json;

    fn sample_profile() -> TaxProfile {
        let draft = TaxProfileDraft {
            salary: Some(1_234_567.89),
            age: Some(63),
            investments: InvestmentBreakdown {
                epf: 45_000.10,
                ppf: 20_000.33,
                lic: 12_345.67,
                ..Default::default()
            },
            nps_contribution: Some(50_000.0),
            health_insurance_self: Some(31_000.5),
            health_insurance_parents: Some(0.07),
            medical_expenses: Some(4_999.99),
            father_age: Some(90),
            mother_age: Some(87),
            housing_loan_interest: Some(210_000.0),
            property_status: Some(PropertyStatus::LetOut),
            donation_amount: Some(2_500.0),
            education_loan_interest: Some(18_000.25),
            is_disabled: true,
            disability_kind: Some(DisabilityKind::Severe),
            savings_interest: Some(9_876.54),
            fixed_deposit_interest: Some(60_000.01),
            tax_regime: Some(TaxRegime::New),
        };
        TaxNormalizer::default().normalize(&draft).unwrap()
    }

    #[test]
    fn test_wire_field_names() {
        let request = SubmitTaxRequest::new(&sample_profile());
        let value = serde_json::to_value(&request).unwrap();
        let details = &value["user_details"];

        assert_eq!(details["age_self"], json!(63));
        assert_eq!(details["is_senior_citizen"], json!(true));
        assert_eq!(details["investments"]["80C_investments"], json!(77_346.1));
        assert_eq!(details["parents_age"], json!(88));
        assert_eq!(details["property_status"], json!("let_out"));
        assert_eq!(details["disability_details"]["is_disabled"], json!("true"));
        assert_eq!(details["disability_details"]["type"], json!("severe_disability"));
        assert_eq!(details["other_income"]["interest_from_savings"], json!(9_876.54));
        assert_eq!(details["tax_regime"], json!("new"));
    }

    #[test]
    fn test_profile_survives_wire_round_trip() {
        let profile = sample_profile();
        let text = serde_json::to_string(&to_request_payload(&profile)).unwrap();
        let decoded: CanonicalRequest = serde_json::from_str(&text).unwrap();
        let restored = TaxProfile::try_from(decoded).unwrap();

        assert_eq!(restored, profile);
        assert_eq!(restored.salary.to_bits(), profile.salary.to_bits());
        assert_eq!(
            restored.investments_80c().to_bits(),
            profile.investments_80c().to_bits()
        );
    }

    #[test]
    fn test_accepts_user_age_alias() {
        let mut value = serde_json::to_value(to_request_payload(&sample_profile())).unwrap();
        let age = value["age_self"].take();
        value.as_object_mut().unwrap().remove("age_self");
        value["user_age"] = age;

        let decoded: CanonicalRequest = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.age_self, 63);
    }

    #[test]
    fn test_inconsistent_senior_flag_is_rejected() {
        let mut request = to_request_payload(&sample_profile());
        request.is_senior_citizen = false;

        let err = TaxProfile::try_from(request).unwrap_err();
        assert!(err.is_contract_violation());
    }
}

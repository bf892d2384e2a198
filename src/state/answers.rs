//! Accumulated journey answers and the merge-based patch applied by the
//! state store.
//!
//! Each field is written by exactly one step's response processor, but any
//! field may be overwritten later through edit/rewind. Patches are shallow
//! and last-write-wins; a `None` patch field leaves the current value
//! untouched.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::i18n::Language;

/// Product line being purchased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Health,
    Motor,
    Life,
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Health => write!(f, "health"),
            Self::Motor => write!(f, "motor"),
            Self::Life => write!(f, "life"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Salaried,
    Business,
    Professional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Car,
    Bike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycMethod {
    AadhaarOtp,
    Offline,
}

/// A rider the user picked, stored by id and cover; the premium is always
/// recomputed from the pricing table, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRider {
    pub id: String,
    pub cover: Decimal,
}

// ── Answer groups ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileAnswers {
    pub name: Option<String>,
    pub language: Option<Language>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub nominee_name: Option<String>,
    pub nominee_relation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthAnswers {
    pub members: Option<Vec<String>>,
    pub sum_insured: Option<Decimal>,
    pub conditions: Option<Vec<String>>,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotorAnswers {
    pub vehicle_kind: Option<VehicleKind>,
    pub registration: Option<String>,
    pub make: Option<String>,
    pub year: Option<i32>,
    pub idv: Option<Decimal>,
    pub addons: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifeAnswers {
    pub smoker: Option<bool>,
    pub annual_income: Option<Decimal>,
    pub cover: Option<Decimal>,
    pub term_years: Option<u32>,
    pub plan: Option<String>,
    pub riders: Option<Vec<SelectedRider>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KycAnswers {
    pub method: Option<KycMethod>,
    pub aadhaar_last4: Option<String>,
    pub otp_attempts: u8,
    pub verified: Option<bool>,
    pub pan: Option<String>,
    pub selfie_document: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeAnswers {
    pub employment: Option<EmploymentType>,
    pub epfo_mobile: Option<String>,
    pub epfo_otp_attempts: u8,
    pub epfo_verified: Option<bool>,
    pub epfo_timed_out: Option<bool>,
    pub gstin: Option<String>,
    pub gstin_attempts: u8,
    pub gst_verified: Option<bool>,
    pub itr_document: Option<String>,
    pub aa_bank: Option<String>,
    pub aa_linked: Option<bool>,
    pub income_document: Option<String>,
    /// Which method ultimately satisfied the verification.
    pub verified_via: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalAnswers {
    pub height_cm: Option<u32>,
    pub weight_kg: Option<u32>,
    pub tobacco: Option<bool>,
    pub alcohol: Option<String>,
    pub conditions: Option<Vec<String>>,
    pub condition_details: Option<String>,
    pub medications: Option<String>,
    pub family_history: Option<Vec<String>>,
    pub mer_required: Option<bool>,
    pub call_date: Option<NaiveDate>,
    pub call_slot: Option<String>,
    pub call_confirmed: Option<bool>,
}

impl MedicalAnswers {
    /// Body-mass index from the recorded height/weight, if both present.
    pub fn bmi(&self) -> Option<f64> {
        let height_m = self.height_cm? as f64 / 100.0;
        let weight = self.weight_kg? as f64;
        if height_m <= 0.0 {
            return None;
        }
        Some(weight / (height_m * height_m))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentAnswers {
    pub method: Option<String>,
    pub attempts: u8,
    pub paid: Option<bool>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicingAnswers {
    pub claim_type: Option<String>,
    pub claim_date: Option<NaiveDate>,
    pub claim_description: Option<String>,
    pub claim_documents: Option<Vec<String>>,
    pub claim_reference: Option<String>,
    pub edit_field: Option<String>,
    pub edit_value: Option<String>,
    pub edit_otp_attempts: u8,
    pub faq_topic: Option<String>,
}

/// Everything the user has answered so far, grouped by concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answers {
    pub product: Option<Product>,
    pub profile: ProfileAnswers,
    pub health: HealthAnswers,
    pub motor: MotorAnswers,
    pub life: LifeAnswers,
    pub kyc: KycAnswers,
    pub income: IncomeAnswers,
    pub medical: MedicalAnswers,
    pub payment: PaymentAnswers,
    pub servicing: ServicingAnswers,
}

/// Flat, shallow patch produced by response processors. A `Some` field
/// overwrites the corresponding answer; attempt counters are written as
/// absolute values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswersPatch {
    pub product: Option<Product>,

    pub name: Option<String>,
    pub language: Option<Language>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub nominee_name: Option<String>,
    pub nominee_relation: Option<String>,

    pub members: Option<Vec<String>>,
    pub sum_insured: Option<Decimal>,
    pub health_conditions: Option<Vec<String>>,
    pub health_plan: Option<String>,

    pub vehicle_kind: Option<VehicleKind>,
    pub registration: Option<String>,
    pub make: Option<String>,
    pub year: Option<i32>,
    pub idv: Option<Decimal>,
    pub addons: Option<Vec<String>>,

    pub smoker: Option<bool>,
    pub annual_income: Option<Decimal>,
    pub cover: Option<Decimal>,
    pub term_years: Option<u32>,
    pub life_plan: Option<String>,
    pub riders: Option<Vec<SelectedRider>>,

    pub kyc_method: Option<KycMethod>,
    pub aadhaar_last4: Option<String>,
    pub kyc_otp_attempts: Option<u8>,
    pub kyc_verified: Option<bool>,
    pub pan: Option<String>,
    pub selfie_document: Option<String>,

    pub employment: Option<EmploymentType>,
    pub epfo_mobile: Option<String>,
    pub epfo_otp_attempts: Option<u8>,
    pub epfo_verified: Option<bool>,
    pub epfo_timed_out: Option<bool>,
    pub gstin: Option<String>,
    pub gstin_attempts: Option<u8>,
    pub gst_verified: Option<bool>,
    pub itr_document: Option<String>,
    pub aa_bank: Option<String>,
    pub aa_linked: Option<bool>,
    pub income_document: Option<String>,
    pub income_verified_via: Option<String>,

    pub height_cm: Option<u32>,
    pub weight_kg: Option<u32>,
    pub tobacco: Option<bool>,
    pub alcohol: Option<String>,
    pub med_conditions: Option<Vec<String>>,
    pub condition_details: Option<String>,
    pub medications: Option<String>,
    pub family_history: Option<Vec<String>>,
    pub mer_required: Option<bool>,
    pub call_date: Option<NaiveDate>,
    pub call_slot: Option<String>,
    pub call_confirmed: Option<bool>,

    pub payment_method: Option<String>,
    pub payment_attempts: Option<u8>,
    pub paid: Option<bool>,
    pub payment_reference: Option<String>,

    pub claim_type: Option<String>,
    pub claim_date: Option<NaiveDate>,
    pub claim_description: Option<String>,
    pub claim_documents: Option<Vec<String>>,
    pub claim_reference: Option<String>,
    pub edit_field: Option<String>,
    pub edit_value: Option<String>,
    pub edit_otp_attempts: Option<u8>,
    pub faq_topic: Option<String>,
}

macro_rules! merge_field {
    ($patch:ident . $src:ident => $dst:expr) => {
        if $patch.$src.is_some() {
            $dst = $patch.$src;
        }
    };
}

impl Answers {
    /// Shallow-merge a patch; last write wins per field.
    pub fn merge(&mut self, patch: AnswersPatch) {
        merge_field!(patch.product => self.product);

        merge_field!(patch.name => self.profile.name);
        merge_field!(patch.language => self.profile.language);
        merge_field!(patch.age => self.profile.age);
        merge_field!(patch.gender => self.profile.gender);
        merge_field!(patch.pincode => self.profile.pincode);
        merge_field!(patch.email => self.profile.email);
        merge_field!(patch.nominee_name => self.profile.nominee_name);
        merge_field!(patch.nominee_relation => self.profile.nominee_relation);

        merge_field!(patch.members => self.health.members);
        merge_field!(patch.sum_insured => self.health.sum_insured);
        merge_field!(patch.health_conditions => self.health.conditions);
        merge_field!(patch.health_plan => self.health.plan);

        merge_field!(patch.vehicle_kind => self.motor.vehicle_kind);
        merge_field!(patch.registration => self.motor.registration);
        merge_field!(patch.make => self.motor.make);
        merge_field!(patch.year => self.motor.year);
        merge_field!(patch.idv => self.motor.idv);
        merge_field!(patch.addons => self.motor.addons);

        merge_field!(patch.smoker => self.life.smoker);
        merge_field!(patch.annual_income => self.life.annual_income);
        merge_field!(patch.cover => self.life.cover);
        merge_field!(patch.term_years => self.life.term_years);
        merge_field!(patch.life_plan => self.life.plan);
        merge_field!(patch.riders => self.life.riders);

        merge_field!(patch.kyc_method => self.kyc.method);
        merge_field!(patch.aadhaar_last4 => self.kyc.aadhaar_last4);
        if let Some(n) = patch.kyc_otp_attempts {
            self.kyc.otp_attempts = n;
        }
        merge_field!(patch.kyc_verified => self.kyc.verified);
        merge_field!(patch.pan => self.kyc.pan);
        merge_field!(patch.selfie_document => self.kyc.selfie_document);

        merge_field!(patch.employment => self.income.employment);
        merge_field!(patch.epfo_mobile => self.income.epfo_mobile);
        if let Some(n) = patch.epfo_otp_attempts {
            self.income.epfo_otp_attempts = n;
        }
        merge_field!(patch.epfo_verified => self.income.epfo_verified);
        merge_field!(patch.epfo_timed_out => self.income.epfo_timed_out);
        merge_field!(patch.gstin => self.income.gstin);
        if let Some(n) = patch.gstin_attempts {
            self.income.gstin_attempts = n;
        }
        merge_field!(patch.gst_verified => self.income.gst_verified);
        merge_field!(patch.itr_document => self.income.itr_document);
        merge_field!(patch.aa_bank => self.income.aa_bank);
        merge_field!(patch.aa_linked => self.income.aa_linked);
        merge_field!(patch.income_document => self.income.income_document);
        merge_field!(patch.income_verified_via => self.income.verified_via);

        merge_field!(patch.height_cm => self.medical.height_cm);
        merge_field!(patch.weight_kg => self.medical.weight_kg);
        merge_field!(patch.tobacco => self.medical.tobacco);
        merge_field!(patch.alcohol => self.medical.alcohol);
        merge_field!(patch.med_conditions => self.medical.conditions);
        merge_field!(patch.condition_details => self.medical.condition_details);
        merge_field!(patch.medications => self.medical.medications);
        merge_field!(patch.family_history => self.medical.family_history);
        merge_field!(patch.mer_required => self.medical.mer_required);
        merge_field!(patch.call_date => self.medical.call_date);
        merge_field!(patch.call_slot => self.medical.call_slot);
        merge_field!(patch.call_confirmed => self.medical.call_confirmed);

        merge_field!(patch.payment_method => self.payment.method);
        if let Some(n) = patch.payment_attempts {
            self.payment.attempts = n;
        }
        merge_field!(patch.paid => self.payment.paid);
        merge_field!(patch.payment_reference => self.payment.reference);

        merge_field!(patch.claim_type => self.servicing.claim_type);
        merge_field!(patch.claim_date => self.servicing.claim_date);
        merge_field!(patch.claim_description => self.servicing.claim_description);
        merge_field!(patch.claim_documents => self.servicing.claim_documents);
        merge_field!(patch.claim_reference => self.servicing.claim_reference);
        merge_field!(patch.edit_field => self.servicing.edit_field);
        merge_field!(patch.edit_value => self.servicing.edit_value);
        if let Some(n) = patch.edit_otp_attempts {
            self.servicing.edit_otp_attempts = n;
        }
        merge_field!(patch.faq_topic => self.servicing.faq_topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn merge_is_shallow_and_last_write_wins() {
        let mut answers = Answers::default();
        answers.merge(AnswersPatch {
            name: Some("Asha".to_string()),
            age: Some(31),
            ..Default::default()
        });
        answers.merge(AnswersPatch {
            age: Some(32),
            ..Default::default()
        });

        assert_eq!(answers.profile.name.as_deref(), Some("Asha"));
        assert_eq!(answers.profile.age, Some(32));
    }

    #[test]
    fn none_fields_leave_answers_untouched() {
        let mut answers = Answers::default();
        answers.merge(AnswersPatch {
            product: Some(Product::Life),
            cover: Some(dec!(5_000_000)),
            ..Default::default()
        });
        answers.merge(AnswersPatch::default());

        assert_eq!(answers.product, Some(Product::Life));
        assert_eq!(answers.life.cover, Some(dec!(5_000_000)));
    }

    #[test]
    fn attempt_counters_write_absolute_values() {
        let mut answers = Answers::default();
        answers.merge(AnswersPatch {
            epfo_otp_attempts: Some(1),
            ..Default::default()
        });
        answers.merge(AnswersPatch {
            epfo_otp_attempts: Some(2),
            ..Default::default()
        });
        assert_eq!(answers.income.epfo_otp_attempts, 2);
    }

    #[test]
    fn bmi_from_height_and_weight() {
        let medical = MedicalAnswers {
            height_cm: Some(170),
            weight_kg: Some(65),
            ..Default::default()
        };
        let bmi = medical.bmi().unwrap();
        assert!((bmi - 22.49).abs() < 0.01);

        assert!(MedicalAnswers::default().bmi().is_none());
    }
}

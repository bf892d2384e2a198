//! User responses, a closed tagged union keyed by widget type, plus the
//! widget-boundary validation and answer-label derivation that go with
//! them.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::pricing;
use crate::step::{Script, StepDef, TextPattern, WidgetType};

/// A user response, one variant per input widget. Processors and routers
/// pattern-match on this instead of casting loose payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UserResponse {
    Text(String),
    Number(i64),
    Amount(Decimal),
    Date(NaiveDate),
    Select(String),
    Multi(Vec<String>),
    Otp(String),
    /// Acknowledgement of a summary screen; carries no data.
    Ack,
    /// Simulated document upload; carries the file name only.
    Upload(String),
}

impl UserResponse {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Self::Amount(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&str> {
        match self {
            Self::Select(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[String]> {
        match self {
            Self::Multi(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_otp(&self) -> Option<&str> {
        match self {
            Self::Otp(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_upload(&self) -> Option<&str> {
        match self {
            Self::Upload(name) => Some(name),
            _ => None,
        }
    }
}

/// Whether a response variant matches the widget that is waiting for it.
pub fn widget_accepts(widget: WidgetType, response: &UserResponse) -> bool {
    matches!(
        (widget, response),
        (WidgetType::Text, UserResponse::Text(_))
            | (WidgetType::Number, UserResponse::Number(_))
            | (WidgetType::Amount, UserResponse::Amount(_))
            | (WidgetType::Date, UserResponse::Date(_))
            | (WidgetType::SingleSelect, UserResponse::Select(_))
            | (WidgetType::MultiSelect, UserResponse::Multi(_))
            | (WidgetType::Otp, UserResponse::Otp(_))
            | (WidgetType::Summary, UserResponse::Ack)
            | (WidgetType::Upload, UserResponse::Upload(_))
    )
}

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").unwrap());
static AADHAAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{12}$").unwrap());
static PAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static REGISTRATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z]{1,2}[0-9]{4}$").unwrap());
static PINCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

fn check_pattern(pattern: TextPattern, text: &str) -> Result<(), InputError> {
    let (re, what): (&Regex, &'static str) = match pattern {
        TextPattern::FreeText => return Ok(()),
        TextPattern::Mobile => (&MOBILE_RE, "mobile number"),
        TextPattern::Aadhaar => (&AADHAAR_RE, "Aadhaar number"),
        TextPattern::Pan => (&PAN_RE, "PAN"),
        TextPattern::Registration => (&REGISTRATION_RE, "registration number"),
        TextPattern::Pincode => (&PINCODE_RE, "PIN code"),
        TextPattern::Email => (&EMAIL_RE, "email address"),
    };
    if re.is_match(text) {
        Ok(())
    } else {
        Err(InputError::Pattern { what })
    }
}

/// Widget-boundary validation. Invalid input never reaches a response
/// processor; the widget refuses to submit instead. Assumes the shape
/// already passed [`widget_accepts`].
pub fn validate(script: &Script, response: &UserResponse) -> Result<(), InputError> {
    match response {
        UserResponse::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(InputError::Empty);
            }
            if let Some(pattern) = script.pattern {
                check_pattern(pattern, trimmed)?;
            }
            Ok(())
        }
        UserResponse::Number(n) => {
            let min = script.min.unwrap_or(i64::MIN);
            let max = script.max.unwrap_or(i64::MAX);
            if *n < min || *n > max {
                return Err(InputError::OutOfRange {
                    value: *n,
                    min,
                    max,
                });
            }
            Ok(())
        }
        UserResponse::Amount(a) => {
            if *a <= Decimal::ZERO {
                return Err(InputError::Empty);
            }
            Ok(())
        }
        UserResponse::Select(id) => {
            let choice = script
                .options
                .iter()
                .find(|c| c.id == *id)
                .ok_or_else(|| InputError::UnknownOption { id: id.clone() })?;
            if choice.disabled {
                return Err(InputError::DisabledOption { id: id.clone() });
            }
            Ok(())
        }
        UserResponse::Multi(ids) => {
            for id in ids {
                let choice = script
                    .options
                    .iter()
                    .find(|c| c.id == *id)
                    .ok_or_else(|| InputError::UnknownOption { id: id.clone() })?;
                if choice.disabled {
                    return Err(InputError::DisabledOption { id: id.clone() });
                }
            }
            Ok(())
        }
        UserResponse::Otp(code) => {
            let expected = script.otp_len.unwrap_or(6);
            if code.len() != expected || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(InputError::BadOtpLength { expected });
            }
            Ok(())
        }
        UserResponse::Upload(name) => {
            if name.trim().is_empty() {
                return Err(InputError::Empty);
            }
            Ok(())
        }
        UserResponse::Date(_) | UserResponse::Ack => Ok(()),
    }
}

/// Human-readable label for a response, appended to history as the user's
/// message. Option ids resolve to their labels; widget-specific wording
/// covers responses with no literal text; a per-step override wins.
pub fn derive_label(step: &StepDef, script: &Script, response: &UserResponse) -> String {
    if let Some(label_fn) = step.label {
        return label_fn(response, script);
    }

    let option_label = |id: &str| {
        script
            .options
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| id.to_string())
    };

    match response {
        UserResponse::Text(s) => s.clone(),
        UserResponse::Number(n) => n.to_string(),
        UserResponse::Amount(a) => pricing::fmt_inr(*a),
        UserResponse::Date(d) => d.format("%d %b %Y").to_string(),
        UserResponse::Select(id) => option_label(id),
        UserResponse::Multi(ids) => {
            if ids.is_empty() {
                "None of these".to_string()
            } else {
                ids.iter()
                    .map(|id| option_label(id))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
        UserResponse::Otp(code) => "•".repeat(code.len()),
        UserResponse::Ack => "Looks good, continuing".to_string(),
        UserResponse::Upload(name) => format!("Uploaded {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{Choice, Module, StepCtx};
    use crate::state::JourneyState;

    fn select_script() -> Script {
        Script::say("pick one").with_options(vec![
            Choice::new("a", "Option A"),
            Choice::new("b", "Option B").disabled(true),
        ])
    }

    fn dummy_script(_: &StepCtx, _: &JourneyState) -> Script {
        Script::default()
    }

    fn step(widget: WidgetType) -> StepDef {
        StepDef::new("s", Module::Onboarding, widget, dummy_script)
    }

    #[test]
    fn widget_shape_matching() {
        assert!(widget_accepts(WidgetType::Text, &UserResponse::Text("x".into())));
        assert!(widget_accepts(WidgetType::Summary, &UserResponse::Ack));
        assert!(!widget_accepts(WidgetType::Otp, &UserResponse::Text("123456".into())));
        assert!(!widget_accepts(WidgetType::NoInput, &UserResponse::Ack));
    }

    #[test]
    fn otp_length_is_enforced() {
        let script = Script::say("otp").with_otp(6, 30);
        assert!(validate(&script, &UserResponse::Otp("123456".into())).is_ok());
        assert!(validate(&script, &UserResponse::Otp("123".into())).is_err());
        assert!(validate(&script, &UserResponse::Otp("12345a".into())).is_err());
    }

    #[test]
    fn mobile_pattern_is_enforced() {
        let script = Script::say("phone").with_pattern(TextPattern::Mobile);
        assert!(validate(&script, &UserResponse::Text("9999999999".into())).is_ok());
        assert!(validate(&script, &UserResponse::Text("12345".into())).is_err());
        assert!(validate(&script, &UserResponse::Text("1999999999".into())).is_err());
    }

    #[test]
    fn gstin_length_is_not_a_widget_concern() {
        // The 15-character predicate is a branch outcome, not validation:
        // a short GSTIN must reach the processor and route to the failure
        // step.
        let script = Script::say("gstin");
        assert!(validate(&script, &UserResponse::Text("SHORT".into())).is_ok());
    }

    #[test]
    fn disabled_options_are_refused() {
        let script = select_script();
        assert!(validate(&script, &UserResponse::Select("a".into())).is_ok());
        assert!(matches!(
            validate(&script, &UserResponse::Select("b".into())),
            Err(InputError::DisabledOption { .. })
        ));
        assert!(matches!(
            validate(&script, &UserResponse::Select("zz".into())),
            Err(InputError::UnknownOption { .. })
        ));
    }

    #[test]
    fn number_range_is_enforced() {
        let script = Script::say("age").with_range(18, 65);
        assert!(validate(&script, &UserResponse::Number(30)).is_ok());
        assert!(validate(&script, &UserResponse::Number(17)).is_err());
        assert!(validate(&script, &UserResponse::Number(70)).is_err());
    }

    #[test]
    fn labels_resolve_option_ids() {
        let script = select_script();
        let label = derive_label(&step(WidgetType::SingleSelect), &script, &UserResponse::Select("a".into()));
        assert_eq!(label, "Option A");
    }

    #[test]
    fn multi_labels_join_and_empty_reads_as_none() {
        let script = Script::say("pick").with_options(vec![
            Choice::new("x", "X"),
            Choice::new("y", "Y"),
        ]);
        let both = derive_label(
            &step(WidgetType::MultiSelect),
            &script,
            &UserResponse::Multi(vec!["x".into(), "y".into()]),
        );
        assert_eq!(both, "X, Y");

        let none = derive_label(&step(WidgetType::MultiSelect), &script, &UserResponse::Multi(vec![]));
        assert_eq!(none, "None of these");
    }

    #[test]
    fn otp_labels_are_masked() {
        let script = Script::say("otp").with_otp(6, 30);
        let label = derive_label(&step(WidgetType::Otp), &script, &UserResponse::Otp("123456".into()));
        assert_eq!(label, "••••••");
    }

    #[test]
    fn per_step_label_override_wins() {
        fn quote_label(_: &UserResponse, _: &Script) -> String {
            "Reviewed quote, continuing".to_string()
        }
        let step = step(WidgetType::Summary).label_with(quote_label);
        let label = derive_label(&step, &Script::default(), &UserResponse::Ack);
        assert_eq!(label, "Reviewed quote, continuing");
    }
}

//! Language tag and shared string tables.
//!
//! Script resolvers look shared phrases up here; the engine itself is
//! agnostic to the contents. Only the strings that recur across flows live
//! in the table; step-specific copy stays with the step.

use serde::{Deserialize, Serialize};

/// Supported conversation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Hi => write!(f, "hi"),
        }
    }
}

/// Phrases shared across step scripts.
#[derive(Debug)]
pub struct StringTable {
    pub greeting: &'static str,
    pub thanks: &'static str,
    pub otp_sent: &'static str,
    pub otp_retry: &'static str,
    pub verifying: &'static str,
    pub all_done: &'static str,
    pub try_other_way: &'static str,
    pub anything_else: &'static str,
}

static EN: StringTable = StringTable {
    greeting: "Hi! I'm Mira, your insurance assistant.",
    thanks: "Thank you!",
    otp_sent: "I've sent a 6-digit OTP to your mobile number.",
    otp_retry: "That code didn't match. Please check the SMS and try again.",
    verifying: "Give me a moment while I verify that…",
    all_done: "That's everything I needed.",
    try_other_way: "No problem — let's try another way.",
    anything_else: "Is there anything else I can help you with?",
};

static HI: StringTable = StringTable {
    greeting: "नमस्ते! मैं मीरा हूँ, आपकी बीमा सहायक।",
    thanks: "धन्यवाद!",
    otp_sent: "मैंने आपके मोबाइल नंबर पर 6 अंकों का OTP भेजा है।",
    otp_retry: "वह कोड मेल नहीं खाया। कृपया SMS देखकर फिर से कोशिश करें।",
    verifying: "एक क्षण दीजिए, मैं जाँच कर रही हूँ…",
    all_done: "मुझे जो चाहिए था वह सब मिल गया।",
    try_other_way: "कोई बात नहीं — चलिए दूसरा तरीका आज़माते हैं।",
    anything_else: "क्या मैं आपकी और किसी चीज़ में मदद कर सकती हूँ?",
};

/// Resolve the string table for a language.
pub fn table(lang: Language) -> &'static StringTable {
    match lang {
        Language::En => &EN,
        Language::Hi => &HI,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_resolve_per_language() {
        assert!(table(Language::En).greeting.contains("Mira"));
        assert!(table(Language::Hi).greeting.contains("मीरा"));
    }

    #[test]
    fn language_serde_matches_display() {
        let en: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(en, Language::En);
        assert_eq!(format!("{en}"), "en");
    }
}

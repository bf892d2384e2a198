//! Configuration types.

use std::time::Duration;

/// Conversation pacing. Delays are pure UX theatre (no I/O happens behind
/// any of them) but must be cancellable when the journey moves on.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Minimum "typing" time before a bot message appears.
    pub typing_base: Duration,
    /// Additional typing time per character of rendered content.
    pub typing_per_char: Duration,
    /// Upper bound on the typing delay.
    pub typing_max: Duration,
    /// Pause after a bot message on steps that take no input.
    pub auto_advance_pause: Duration,
    /// Pause between a user answer and the next bot turn.
    pub post_response_pause: Duration,
    /// Delay between reaching the terminal step and firing the completion
    /// callback.
    pub completion_delay: Duration,
    /// Tick interval for widget-local countdowns (OTP resend etc.).
    pub countdown_tick: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            typing_base: Duration::from_millis(400),
            typing_per_char: Duration::from_millis(8),
            typing_max: Duration::from_millis(2200),
            auto_advance_pause: Duration::from_millis(600),
            post_response_pause: Duration::from_millis(450),
            completion_delay: Duration::from_millis(1200),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

impl PacingConfig {
    /// Typing delay for a message of `content_len` characters:
    /// `clamp(base + len * per_char, base, max)`.
    pub fn typing_delay(&self, content_len: usize) -> Duration {
        let scaled = self.typing_base + self.typing_per_char * content_len as u32;
        scaled.clamp(self.typing_base, self.typing_max)
    }
}

/// Sentinel values and odds that stand in for absent backends. Every demo
/// branch in the step graph reads these through [`crate::step::StepCtx`],
/// so swapping a value here re-routes the simulation without touching any
/// step definition.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// OTP that makes Aadhaar e-KYC succeed.
    pub aadhaar_otp: String,
    /// OTP that makes the EPFO check report a mismatch.
    pub epfo_reject_otp: String,
    /// Mobile number that makes the EPFO lookup time out.
    pub epfo_timeout_mobile: String,
    /// OTP that confirms a policy-servicing edit.
    pub service_otp: String,
    /// A GSTIN is accepted when it has exactly this many characters.
    pub gstin_length: usize,
    /// Probability that the Account Aggregator link comes back unavailable.
    pub aa_unavailable_odds: f64,
    /// Probability that a tele-medical slot is already taken.
    pub slot_unavailable_odds: f64,
    /// Probability that the simulated payment gateway declines.
    pub payment_failure_odds: f64,
    /// Maximum OTP attempts before the flow offers an alternate path.
    pub max_otp_attempts: u8,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            aadhaar_otp: "123456".to_string(),
            epfo_reject_otp: "000000".to_string(),
            epfo_timeout_mobile: "9999999999".to_string(),
            service_otp: "123456".to_string(),
            gstin_length: 15,
            aa_unavailable_odds: 0.2,
            slot_unavailable_odds: 0.2,
            payment_failure_odds: 0.1,
            max_otp_attempts: 3,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pacing: PacingConfig,
    pub demo: DemoConfig,
    /// Upper bound on consecutive condition-skipped steps before the
    /// engine declares the graph broken.
    pub max_skip_chain: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            demo: DemoConfig::default(),
            max_skip_chain: 32,
        }
    }
}

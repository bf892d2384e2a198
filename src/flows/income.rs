//! Financial verification flow: EPFO for the salaried, GST for business
//! owners, ITR upload for professionals, with an Account Aggregator / bank
//! statement fallback. All external systems are simulated through the demo
//! sentinels in `DemoConfig`.

use crate::pricing;
use crate::state::{AnswersPatch, EmploymentType, JourneyState};
use crate::step::{
    Choice, Module, Script, StepCtx, StepDef, StepId, TextPattern, Transition, UserResponse,
    WidgetType,
};

pub const ENTRY: StepId = "income_intro";

const M: Module = Module::FinancialVerification;

pub fn steps() -> Vec<StepDef> {
    vec![
        StepDef::auto("income_intro", M, income_intro_script).to("employment_type"),
        StepDef::new("employment_type", M, WidgetType::SingleSelect, employment_script)
            .process(set_employment)
            .route(route_employment),
        // ── EPFO (salaried) ─────────────────────────────────────────
        StepDef::auto("epfo_intro", M, epfo_intro_script).to("epfo_mobile"),
        StepDef::new("epfo_mobile", M, WidgetType::Text, epfo_mobile_script)
            .process(set_epfo_mobile)
            .to("epfo_verifying"),
        StepDef::auto("epfo_verifying", M, verifying_script).route(route_epfo_lookup),
        StepDef::new("epfo_otp", M, WidgetType::Otp, epfo_otp_script)
            .process(process_epfo_otp)
            .route(route_epfo_otp),
        StepDef::auto("epfo_fetching", M, epfo_fetching_script).to("epfo_success"),
        StepDef::auto("epfo_success", M, epfo_success_script).to("income_summary"),
        StepDef::auto("epfo_failure", M, epfo_failure_script).route(route_epfo_failure),
        StepDef::auto("epfo_timeout", M, epfo_timeout_script).to("income_alt_method"),
        // ── Alternate methods ───────────────────────────────────────
        StepDef::new("income_alt_method", M, WidgetType::SingleSelect, alt_method_script)
            .route(route_alt_method),
        StepDef::new("aa_bank_select", M, WidgetType::SingleSelect, aa_bank_script)
            .process(set_aa_bank)
            .to("aa_consent"),
        StepDef::new("aa_consent", M, WidgetType::SingleSelect, aa_consent_script)
            .process(process_aa_consent)
            .route(route_aa_consent),
        StepDef::auto("aa_linking", M, aa_linking_script).route(route_aa_linking),
        StepDef::auto("aa_success", M, aa_success_script).to("income_summary"),
        StepDef::auto("aa_unavailable", M, aa_unavailable_script).to("income_manual_upload"),
        StepDef::new("income_manual_upload", M, WidgetType::Upload, manual_upload_script)
            .process(set_manual_document)
            .to("income_summary"),
        // ── GST (business) ──────────────────────────────────────────
        StepDef::auto("gst_intro", M, gst_intro_script).to("gst_number"),
        StepDef::new("gst_number", M, WidgetType::Text, gst_number_script)
            .process(process_gstin)
            .route(route_gstin),
        StepDef::auto("gst_success", M, gst_success_script).to("gst_confirm"),
        StepDef::new("gst_confirm", M, WidgetType::SingleSelect, gst_confirm_script)
            .route(route_gst_confirm),
        StepDef::auto("gst_failure", M, gst_failure_script).route(route_gst_failure),
        // ── ITR (professionals) ─────────────────────────────────────
        StepDef::auto("itr_intro", M, itr_intro_script).to("itr_upload"),
        StepDef::new("itr_upload", M, WidgetType::Upload, itr_upload_script)
            .process(set_itr_document)
            .to("itr_processing"),
        StepDef::auto("itr_processing", M, verifying_script).to("income_summary"),
        // ── Wrap-up ─────────────────────────────────────────────────
        StepDef::new("income_summary", M, WidgetType::Summary, income_summary_script)
            .label_with(income_reviewed_label)
            .to("income_complete"),
        StepDef::auto("income_complete", M, income_complete_script).to("medical_intro"),
    ]
}

// ── Scripts ─────────────────────────────────────────────────────────

fn income_intro_script(_: &StepCtx, state: &JourneyState) -> Script {
    let cover = state
        .answers
        .life
        .cover
        .map(pricing::fmt_inr)
        .unwrap_or_else(|| "this cover".to_string());
    Script::say(format!(
        "For {cover} of life cover the insurer needs proof of income. Two minutes, fully digital."
    ))
}

fn employment_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How do you earn? I'll pick the fastest verification route for you.").with_options(vec![
        Choice::new("salaried", "Salaried").with_sublabel("Verify instantly via EPFO"),
        Choice::new("business", "Business owner").with_sublabel("Verify with your GSTIN"),
        Choice::new("professional", "Self-employed professional").with_sublabel("Upload your latest ITR"),
    ])
}

fn epfo_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Easiest way: your EPFO (provident fund) record confirms both employer and salary. I just need the mobile number linked to your UAN.")
}

fn epfo_mobile_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Which mobile number is linked to your UAN?")
        .with_placeholder("10-digit mobile number")
        .with_pattern(TextPattern::Mobile)
}

fn verifying_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().verifying)
}

fn epfo_otp_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().otp_sent).with_otp(6, 30)
}

fn epfo_fetching_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("OTP verified. Pulling your PF contribution history…")
}

fn epfo_success_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Done ✅ Your employment and salary are verified against EPFO records.")
}

fn epfo_failure_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().otp_retry)
}

fn epfo_timeout_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("EPFO isn't responding right now — that happens outside business hours. Let's use another proof instead.")
}

fn alt_method_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Pick whichever is handy:").with_options(vec![
        Choice::new("bank_aa", "Link bank account").with_sublabel("Via the RBI Account Aggregator network"),
        Choice::new("upload_itr", "Upload latest ITR"),
        Choice::new("upload_statement", "Upload salary slips / bank statement"),
    ])
}

fn aa_bank_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Which bank receives your salary?").with_options(vec![
        Choice::new("hdfc", "HDFC Bank"),
        Choice::new("icici", "ICICI Bank"),
        Choice::new("sbi", "State Bank of India"),
        Choice::new("axis", "Axis Bank"),
    ])
}

fn aa_consent_script(_: &StepCtx, state: &JourneyState) -> Script {
    let bank = state.answers.income.aa_bank.as_deref().unwrap_or("your bank");
    Script::say(format!(
        "I'll request read-only access to 6 months of statements from {bank} through the Account Aggregator. You can revoke it any time. Shall I proceed?"
    ))
    .with_options(vec![
        Choice::new("approve", "Approve consent"),
        Choice::new("deny", "No, use something else"),
    ])
}

fn aa_linking_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Connecting to your bank through the Account Aggregator…")
}

fn aa_success_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Linked ✅ Your salary credits are visible and sufficient for this cover.")
}

fn aa_unavailable_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Your bank's Account Aggregator endpoint is unavailable right now. No problem — a statement upload works just as well.")
}

fn manual_upload_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Upload your last 3 salary slips or a 6-month bank statement (PDF).")
}

fn gst_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("For business owners the GST registration doubles as income proof — turnover comes straight from the GST network.")
}

fn gst_number_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What's your GSTIN?").with_placeholder("15-character GSTIN")
}

fn gst_success_script(_: &StepCtx, state: &JourneyState) -> Script {
    let gstin = state.answers.income.gstin.as_deref().unwrap_or("");
    Script::say(format!(
        "Found it ✅ GSTIN {gstin} — registered business, filings up to date, turnover adequate for this cover."
    ))
}

fn gst_confirm_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Does that look like your business?").with_options(vec![
        Choice::new("looks_right", "Yes, that's mine"),
        Choice::new("re_enter", "No, let me re-enter the GSTIN"),
    ])
}

fn gst_failure_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("That GSTIN doesn't match the GST network's records. A GSTIN has exactly 15 characters — check the certificate and try again.")
}

fn itr_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("For professionals the latest Income Tax Return is the cleanest proof.")
}

fn itr_upload_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Upload your latest ITR acknowledgement (PDF).")
}

fn income_summary_script(_: &StepCtx, state: &JourneyState) -> Script {
    let income = &state.answers.income;
    let method = match income.verified_via.as_deref() {
        Some("epfo") => "EPFO record",
        Some("gst") => "GST registration",
        Some("itr") => "Income Tax Return",
        Some("account_aggregator") => "bank account (Account Aggregator)",
        Some("bank_statement") => "uploaded statements",
        _ => "the documents provided",
    };
    Script::say(format!(
        "Income verification complete:\n• Verified via: {method}\n• Status: accepted for the chosen cover"
    ))
}

fn income_complete_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().all_done).and_say("Next up is the medical evaluation — the last gate before your policy is issued.")
}

// ── Processors ──────────────────────────────────────────────────────

fn set_employment(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    let employment = match r.as_select() {
        Some("business") => Some(EmploymentType::Business),
        Some("professional") => Some(EmploymentType::Professional),
        Some(_) => Some(EmploymentType::Salaried),
        None => None,
    };
    AnswersPatch {
        employment,
        ..Default::default()
    }
}

fn set_epfo_mobile(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        epfo_mobile: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn process_epfo_otp(ctx: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    if r.as_otp() == Some(ctx.demo.epfo_reject_otp.as_str()) {
        AnswersPatch {
            epfo_otp_attempts: Some(state.answers.income.epfo_otp_attempts + 1),
            ..Default::default()
        }
    } else {
        AnswersPatch {
            epfo_verified: Some(true),
            income_verified_via: Some("epfo".to_string()),
            ..Default::default()
        }
    }
}

fn set_aa_bank(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        aa_bank: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn process_aa_consent(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    if r.as_select() == Some("approve") {
        AnswersPatch {
            aa_linked: Some(true),
            income_verified_via: Some("account_aggregator".to_string()),
            ..Default::default()
        }
    } else {
        AnswersPatch::default()
    }
}

fn set_manual_document(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        income_document: r.as_upload().map(str::to_string),
        income_verified_via: Some("bank_statement".to_string()),
        ..Default::default()
    }
}

fn process_gstin(ctx: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    let gstin = r.as_text().map(str::trim).unwrap_or_default();
    if gstin.len() == ctx.demo.gstin_length {
        AnswersPatch {
            gstin: Some(gstin.to_string()),
            gst_verified: Some(true),
            income_verified_via: Some("gst".to_string()),
            ..Default::default()
        }
    } else {
        AnswersPatch {
            gstin: Some(gstin.to_string()),
            gstin_attempts: Some(state.answers.income.gstin_attempts + 1),
            ..Default::default()
        }
    }
}

fn set_itr_document(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        itr_document: r.as_upload().map(str::to_string),
        income_verified_via: Some("itr".to_string()),
        ..Default::default()
    }
}

// ── Routers ─────────────────────────────────────────────────────────

fn route_employment(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("business") => Transition::Goto("gst_intro"),
        Some("professional") => Transition::Goto("itr_intro"),
        _ => Transition::Goto("epfo_intro"),
    }
}

fn route_epfo_lookup(ctx: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    let mobile = state.answers.income.epfo_mobile.as_deref().unwrap_or("");
    if mobile == ctx.demo.epfo_timeout_mobile {
        Transition::Goto("epfo_timeout")
    } else {
        Transition::Goto("epfo_otp")
    }
}

fn route_epfo_otp(_: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    if state.answers.income.epfo_verified == Some(true) {
        Transition::Goto("epfo_fetching")
    } else {
        Transition::Goto("epfo_failure")
    }
}

fn route_epfo_failure(ctx: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    if state.answers.income.epfo_otp_attempts >= ctx.demo.max_otp_attempts {
        Transition::Goto("income_alt_method")
    } else {
        Transition::Goto("epfo_otp")
    }
}

fn route_alt_method(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("bank_aa") => Transition::Goto("aa_bank_select"),
        Some("upload_itr") => Transition::Goto("itr_upload"),
        _ => Transition::Goto("income_manual_upload"),
    }
}

fn route_aa_consent(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("approve") => Transition::Goto("aa_linking"),
        _ => Transition::Goto("income_alt_method"),
    }
}

/// The Account Aggregator endpoint is flaky by design: a configurable
/// slice of rolls comes back unavailable to exercise the fallback path.
fn route_aa_linking(ctx: &StepCtx, _: Option<&UserResponse>, _: &JourneyState) -> Transition {
    if ctx.roll < ctx.demo.aa_unavailable_odds {
        Transition::Goto("aa_unavailable")
    } else {
        Transition::Goto("aa_success")
    }
}

fn route_gstin(ctx: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    let len = r
        .and_then(UserResponse::as_text)
        .map(|s| s.trim().len())
        .unwrap_or(0);
    if len == ctx.demo.gstin_length {
        Transition::Goto("gst_success")
    } else {
        Transition::Goto("gst_failure")
    }
}

fn route_gst_confirm(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("re_enter") => Transition::Goto("gst_number"),
        _ => Transition::Goto("income_summary"),
    }
}

fn route_gst_failure(ctx: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    if state.answers.income.gstin_attempts >= ctx.demo.max_otp_attempts {
        Transition::Goto("income_alt_method")
    } else {
        Transition::Goto("gst_number")
    }
}

// ── Labels ──────────────────────────────────────────────────────────

fn income_reviewed_label(_: &UserResponse, _: &Script) -> String {
    "Reviewed income details, continuing".to_string()
}

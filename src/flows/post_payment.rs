//! Post-payment servicing flow: claims, policy edits, FAQs, and document
//! download, looping back through a service menu.

use crate::state::{AnswersPatch, JourneyState};
use crate::step::{
    Choice, Module, Script, StepCtx, StepDef, StepId, TextPattern, Transition, UserResponse,
    WidgetType,
};

use super::demo_ref;

pub const ENTRY: StepId = "service_menu";

const M: Module = Module::PostPayment;

pub fn steps() -> Vec<StepDef> {
    vec![
        StepDef::new("service_menu", M, WidgetType::SingleSelect, service_menu_script)
            .route(route_service_menu),
        // ── Claims ──────────────────────────────────────────────────
        StepDef::auto("claim_intro", M, claim_intro_script).to("claim_type"),
        StepDef::new("claim_type", M, WidgetType::SingleSelect, claim_type_script)
            .process(set_claim_type)
            .to("claim_date"),
        StepDef::new("claim_date", M, WidgetType::Date, claim_date_script)
            .process(set_claim_date)
            .to("claim_description"),
        StepDef::new("claim_description", M, WidgetType::Text, claim_description_script)
            .process(set_claim_description)
            .to("claim_documents"),
        StepDef::new("claim_documents", M, WidgetType::Upload, claim_documents_script)
            .process(set_claim_documents)
            .to("claim_review"),
        StepDef::new("claim_review", M, WidgetType::Summary, claim_review_script)
            .label_with(claim_confirmed_label)
            .process(process_claim_submission)
            .to("claim_processing"),
        StepDef::auto("claim_processing", M, claim_processing_script).to("claim_submitted"),
        StepDef::auto("claim_submitted", M, claim_submitted_script).to("service_again"),
        // ── Policy edits ────────────────────────────────────────────
        StepDef::new("edit_field", M, WidgetType::SingleSelect, edit_field_script)
            .process(set_edit_field)
            .to("edit_value"),
        StepDef::new("edit_value", M, WidgetType::Text, edit_value_script)
            .process(set_edit_value)
            .to("edit_otp"),
        StepDef::new("edit_otp", M, WidgetType::Otp, edit_otp_script)
            .process(process_edit_otp)
            .route(route_edit_otp),
        StepDef::auto("edit_otp_retry", M, edit_otp_retry_script).to("edit_otp"),
        StepDef::auto("edit_abandoned", M, edit_abandoned_script).to("service_again"),
        StepDef::auto("edit_done", M, edit_done_script).to("service_again"),
        // ── FAQs ────────────────────────────────────────────────────
        StepDef::new("faq_topic", M, WidgetType::SingleSelect, faq_topic_script)
            .process(set_faq_topic)
            .to("faq_answer"),
        StepDef::auto("faq_answer", M, faq_answer_script).to("faq_more"),
        StepDef::new("faq_more", M, WidgetType::SingleSelect, faq_more_script)
            .route(route_faq_more),
        // ── Documents & wrap-up ─────────────────────────────────────
        StepDef::auto("download_policy", M, download_policy_script).to("service_again"),
        StepDef::new("service_again", M, WidgetType::SingleSelect, service_again_script)
            .route(route_service_again),
        StepDef::auto("service_end", M, service_end_script).end(),
    ]
}

// ── Scripts ─────────────────────────────────────────────────────────

fn service_menu_script(_: &StepCtx, state: &JourneyState) -> Script {
    let name = state.answers.profile.name.as_deref().unwrap_or("there");
    Script::say(format!("Hi {name}! Your policy is active. What can I do for you today?")).with_options(vec![
        Choice::new("file_claim", "File a claim"),
        Choice::new("edit_policy", "Update policy details"),
        Choice::new("faq", "Ask a question"),
        Choice::new("download_policy", "Download policy document"),
        Choice::new("exit", "Nothing right now"),
    ])
}

fn claim_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("I'm sorry you need to claim — let's make this quick. Three questions and your documents, and I'll register it right away.")
}

fn claim_type_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What kind of claim is this?").with_options(vec![
        Choice::new("cashless", "Cashless hospitalisation").with_sublabel("Network hospital settles directly"),
        Choice::new("reimbursement", "Reimbursement").with_sublabel("You paid, we pay you back"),
        Choice::new("accident", "Accident / damage"),
    ])
}

fn claim_date_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("When did the event happen?")
}

fn claim_description_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Briefly, what happened?")
        .with_placeholder("A sentence or two is enough")
}

fn claim_documents_script(_: &StepCtx, state: &JourneyState) -> Script {
    let hint = match state.answers.servicing.claim_type.as_deref() {
        Some("cashless") => "the pre-authorisation form from the hospital desk",
        Some("reimbursement") => "discharge summary and all bills",
        _ => "photos of the damage and the FIR, if any",
    };
    Script::say(format!("Please upload {hint}."))
}

fn claim_review_script(_: &StepCtx, state: &JourneyState) -> Script {
    let servicing = &state.answers.servicing;
    let claim_type = servicing.claim_type.as_deref().unwrap_or("—");
    let date = servicing
        .claim_date
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "—".to_string());
    let description = servicing.claim_description.as_deref().unwrap_or("—");
    Script::say(format!(
        "Here's what I'll submit:\n• Type: {claim_type}\n• Date: {date}\n• Details: {description}"
    ))
    .and_say("All correct? You can tap any answer above to fix it before I file.")
}

fn claim_processing_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().verifying)
}

fn claim_submitted_script(_: &StepCtx, state: &JourneyState) -> Script {
    let reference = state
        .answers
        .servicing
        .claim_reference
        .clone()
        .unwrap_or_else(|| "CLM-000000".to_string());
    Script::say(format!(
        "Claim registered ✅ Reference {reference}. A claims specialist will reach out within 24 hours; cashless approvals usually land in 2–4 hours."
    ))
}

fn edit_field_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What would you like to update?").with_options(vec![
        Choice::new("nominee", "Nominee"),
        Choice::new("address", "Address"),
        Choice::new("phone", "Phone number"),
    ])
}

fn edit_value_script(_: &StepCtx, state: &JourneyState) -> Script {
    let field = state.answers.servicing.edit_field.as_deref().unwrap_or("that");
    Script::say(format!("What should the new {field} be?"))
        .with_placeholder("New value")
        .with_pattern(TextPattern::FreeText)
}

fn edit_otp_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Policy changes need a quick confirmation.")
        .and_say(ctx.strings().otp_sent)
        .with_otp(6, 30)
}

fn edit_otp_retry_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().otp_retry)
}

fn edit_abandoned_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("I couldn't verify the change. For your safety the policy stays as-is — our support team at 1800-000-000 can update it after a manual check.")
}

fn edit_done_script(_: &StepCtx, state: &JourneyState) -> Script {
    let servicing = &state.answers.servicing;
    let field = servicing.edit_field.as_deref().unwrap_or("detail");
    let value = servicing.edit_value.as_deref().unwrap_or("the new value");
    Script::say(format!(
        "Done ✅ Your {field} is now \"{value}\". The updated policy document is on its way to your email."
    ))
}

fn faq_topic_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What would you like to know about?").with_options(vec![
        Choice::new("claim_process", "How claims work"),
        Choice::new("renewal", "Renewal & grace period"),
        Choice::new("coverage", "What's covered"),
        Choice::new("tax_benefits", "Tax benefits"),
    ])
}

fn faq_answer_script(_: &StepCtx, state: &JourneyState) -> Script {
    let answer = match state.answers.servicing.faq_topic.as_deref() {
        Some("renewal") => {
            "Your policy renews yearly. You get a 30-day grace period after the due date — \
             claims during grace are honoured for most covers, but don't cut it close."
        }
        Some("coverage") => {
            "Hospitalisation over 24 hours, day-care procedures, ambulance charges, and \
             pre/post-hospitalisation expenses are covered. Cosmetic treatment and \
             self-inflicted injuries are the big exclusions."
        }
        Some("tax_benefits") => {
            "Health premiums qualify under Section 80D (up to ₹25,000, ₹50,000 for senior \
             citizens). Life premiums qualify under Section 80C up to ₹1.5 lakh."
        }
        _ => {
            "File from this chat any time. Cashless: show your policy card at a network \
             hospital and we settle directly. Reimbursement: upload bills here and money \
             reaches your account in 3–5 working days."
        }
    };
    Script::say(answer)
}

fn faq_more_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Did that answer it?").with_options(vec![
        Choice::new("another_question", "I have another question"),
        Choice::new("all_good", "All good, thanks"),
    ])
}

fn download_policy_script(_: &StepCtx, state: &JourneyState) -> Script {
    let reference = demo_ref(
        "POL",
        &[
            state.answers.profile.name.as_deref().unwrap_or(""),
            state.answers.profile.email.as_deref().unwrap_or(""),
        ],
    );
    Script::say(format!(
        "Here's your policy document: insure.example/docs/{reference}.pdf (simulated link). It's also in your email from day one."
    ))
}

fn service_again_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().anything_else).with_options(vec![
        Choice::new("yes", "Yes, something else"),
        Choice::new("no", "No, that's all"),
    ])
}

fn service_end_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().thanks).and_say("I'm here whenever you need me. Take care!")
}

// ── Processors ──────────────────────────────────────────────────────

fn set_claim_type(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        claim_type: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_claim_date(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        claim_date: r.as_date(),
        ..Default::default()
    }
}

fn set_claim_description(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        claim_description: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_claim_documents(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        claim_documents: r.as_upload().map(|name| vec![name.to_string()]),
        ..Default::default()
    }
}

fn process_claim_submission(_: &StepCtx, _: &UserResponse, state: &JourneyState) -> AnswersPatch {
    let servicing = &state.answers.servicing;
    let reference = demo_ref(
        "CLM",
        &[
            servicing.claim_type.as_deref().unwrap_or(""),
            servicing.claim_description.as_deref().unwrap_or(""),
        ],
    );
    AnswersPatch {
        claim_reference: Some(reference),
        ..Default::default()
    }
}

fn set_edit_field(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        edit_field: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_edit_value(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        edit_value: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn process_edit_otp(ctx: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    if r.as_otp() == Some(ctx.demo.service_otp.as_str()) {
        AnswersPatch {
            edit_otp_attempts: Some(0),
            ..Default::default()
        }
    } else {
        AnswersPatch {
            edit_otp_attempts: Some(state.answers.servicing.edit_otp_attempts + 1),
            ..Default::default()
        }
    }
}

fn set_faq_topic(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        faq_topic: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

// ── Routers ─────────────────────────────────────────────────────────

fn route_service_menu(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("file_claim") => Transition::Goto("claim_intro"),
        Some("edit_policy") => Transition::Goto("edit_field"),
        Some("faq") => Transition::Goto("faq_topic"),
        Some("download_policy") => Transition::Goto("download_policy"),
        _ => Transition::Goto("service_end"),
    }
}

fn route_edit_otp(ctx: &StepCtx, r: Option<&UserResponse>, state: &JourneyState) -> Transition {
    let matched = r.and_then(UserResponse::as_otp) == Some(ctx.demo.service_otp.as_str());
    if matched {
        Transition::Goto("edit_done")
    } else if state.answers.servicing.edit_otp_attempts >= ctx.demo.max_otp_attempts {
        Transition::Goto("edit_abandoned")
    } else {
        Transition::Goto("edit_otp_retry")
    }
}

fn route_faq_more(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("another_question") => Transition::Goto("faq_topic"),
        _ => Transition::Goto("service_again"),
    }
}

fn route_service_again(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("yes") => Transition::Goto("service_menu"),
        _ => Transition::Goto("service_end"),
    }
}

// ── Labels ──────────────────────────────────────────────────────────

fn claim_confirmed_label(_: &UserResponse, _: &Script) -> String {
    "Confirmed claim details".to_string()
}

//! Dashboard flow: policy overview, renewal, and hand-off into servicing.

use crate::persona::Persona;
use crate::pricing;
use crate::state::{AnswersPatch, JourneyState};
use crate::step::{
    Choice, Module, Script, StepCtx, StepDef, StepId, Transition, UserResponse, WidgetType,
};

pub const ENTRY: StepId = "dashboard_home";

const M: Module = Module::Dashboard;

pub fn steps() -> Vec<StepDef> {
    vec![
        StepDef::auto("dashboard_home", M, dashboard_home_script).to("dashboard_overview"),
        StepDef::new("dashboard_overview", M, WidgetType::Summary, overview_script)
            .label_with(overview_label)
            .to("dashboard_action"),
        StepDef::new("dashboard_action", M, WidgetType::SingleSelect, action_script)
            .route(route_action),
        StepDef::auto("policy_details", M, policy_details_script).to("dashboard_action"),
        StepDef::auto("renewal_notice", M, renewal_notice_script).to("renew_decision"),
        StepDef::new("renew_decision", M, WidgetType::SingleSelect, renew_decision_script)
            .process(process_renewal)
            .route(route_renew_decision),
        StepDef::auto("renew_processing", M, renew_processing_script).to("renew_done"),
        StepDef::auto("renew_done", M, renew_done_script).to("dashboard_action"),
        StepDef::auto("support_contact", M, support_script).to("dashboard_action"),
        StepDef::auto("dashboard_exit", M, exit_script).end(),
    ]
}

// ── Scripts ─────────────────────────────────────────────────────────

fn dashboard_home_script(ctx: &StepCtx, state: &JourneyState) -> Script {
    let name = state.answers.profile.name.as_deref().unwrap_or("there");
    let opener = match ctx.persona {
        Persona::Senior => format!("Welcome back, {name}. Everything's in order with your cover."),
        Persona::FamilyOriented => format!("Welcome back, {name}! Your family's cover is all in one place here."),
        _ => format!("Welcome back, {name}!"),
    };
    Script::say(opener)
}

fn overview_script(_: &StepCtx, state: &JourneyState) -> Script {
    let product = state
        .answers
        .product
        .map(|p| p.to_string())
        .unwrap_or_else(|| "insurance".to_string());
    let premium = state
        .quote
        .as_ref()
        .map(|q| format!("{} / year", pricing::fmt_inr(q.total)))
        .unwrap_or_else(|| "—".to_string());
    Script::say(format!(
        "Your {product} policy at a glance:\n• Status: Active\n• Premium: {premium}\n• Next renewal: 11 months away"
    ))
}

fn action_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("What would you like to do?").with_options(vec![
        Choice::new("view_policy", "View policy details"),
        Choice::new("renew", "Renew early"),
        Choice::new("start_claim", "File a claim"),
        Choice::new("support", "Talk to a human"),
        Choice::new("exit", "I'm done"),
    ])
}

fn policy_details_script(_: &StepCtx, state: &JourneyState) -> Script {
    let answers = &state.answers;
    let nominee = answers.profile.nominee_name.as_deref().unwrap_or("not set");
    let email = answers.profile.email.as_deref().unwrap_or("not set");
    Script::say(format!(
        "Policy details:\n• Nominee: {nominee}\n• Documents sent to: {email}\n• Claims filed: none this year"
    ))
}

fn renewal_notice_script(_: &StepCtx, state: &JourneyState) -> Script {
    let premium = state
        .quote
        .as_ref()
        .map(|q| pricing::fmt_inr(q.total))
        .unwrap_or_else(|| "your current premium".to_string());
    Script::say(format!(
        "Renewing early locks your rate at {premium} and keeps your no-claim benefits intact."
    ))
}

fn renew_decision_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Shall I renew it now?").with_options(vec![
        Choice::new("pay_now", "Yes, renew now"),
        Choice::new("remind_later", "Remind me closer to the date"),
    ])
}

fn renew_processing_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().verifying)
}

fn renew_done_script(_: &StepCtx, state: &JourneyState) -> Script {
    let reference = state
        .answers
        .payment
        .reference
        .clone()
        .unwrap_or_else(|| "PAY-000000".to_string());
    Script::say(format!(
        "Renewed ✅ Receipt {reference}. Your cover now runs for another year without a break."
    ))
}

fn support_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Of course. Call 1800-000-000 (24×7) or write to care@insure.example — mention your registered mobile number and they'll pull up everything instantly.")
}

fn exit_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().thanks).and_say("See you at renewal time — I'll remind you well in advance.")
}

// ── Processors ──────────────────────────────────────────────────────

fn process_renewal(_: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    if r.as_select() == Some("pay_now") {
        let reference = super::demo_ref(
            "PAY",
            &[
                state.answers.profile.name.as_deref().unwrap_or(""),
                "renewal",
            ],
        );
        AnswersPatch {
            paid: Some(true),
            payment_reference: Some(reference),
            ..Default::default()
        }
    } else {
        AnswersPatch::default()
    }
}

// ── Routers ─────────────────────────────────────────────────────────

fn route_action(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("view_policy") => Transition::Goto("policy_details"),
        Some("renew") => Transition::Goto("renewal_notice"),
        Some("start_claim") => Transition::Goto("service_menu"),
        Some("support") => Transition::Goto("support_contact"),
        _ => Transition::Goto("dashboard_exit"),
    }
}

fn route_renew_decision(_: &StepCtx, r: Option<&UserResponse>, _: &JourneyState) -> Transition {
    match r.and_then(UserResponse::as_select) {
        Some("pay_now") => Transition::Goto("renew_processing"),
        _ => Transition::Goto("dashboard_action"),
    }
}

// ── Labels ──────────────────────────────────────────────────────────

fn overview_label(_: &UserResponse, _: &Script) -> String {
    "Viewed policy summary".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::i18n::Language;
    use crate::state::StateStore;

    fn ctx(demo: &DemoConfig) -> StepCtx<'_> {
        StepCtx {
            demo,
            persona: Persona::FirstTimer,
            lang: Language::En,
            roll: 0.5,
        }
    }

    #[test]
    fn actions_route_into_servicing_and_renewal() {
        let demo = DemoConfig::default();
        let c = ctx(&demo);
        let store = StateStore::new(ENTRY, M);

        assert_eq!(
            route_action(&c, Some(&UserResponse::Select("start_claim".into())), store.state()),
            Transition::Goto("service_menu")
        );
        assert_eq!(
            route_action(&c, Some(&UserResponse::Select("renew".into())), store.state()),
            Transition::Goto("renewal_notice")
        );
        assert_eq!(
            route_action(&c, Some(&UserResponse::Select("exit".into())), store.state()),
            Transition::Goto("dashboard_exit")
        );
    }

    #[test]
    fn renewal_records_a_payment_reference() {
        let demo = DemoConfig::default();
        let c = ctx(&demo);
        let mut store = StateStore::new(ENTRY, M);
        store.apply(AnswersPatch {
            name: Some("Asha".to_string()),
            ..Default::default()
        });

        let patch = process_renewal(&c, &UserResponse::Select("pay_now".into()), store.state());
        assert_eq!(patch.paid, Some(true));
        assert!(patch.payment_reference.is_some());

        let skip = process_renewal(&c, &UserResponse::Select("remind_later".into()), store.state());
        assert_eq!(skip, AnswersPatch::default());
    }
}

//! Medical evaluation flow: health declaration, automatic assessment, and
//! tele-medical scheduling when the declaration needs a doctor's call.

use chrono::Datelike;

use crate::state::{AnswersPatch, JourneyState};
use crate::step::{
    Choice, Module, Script, StepCtx, StepDef, StepId, Transition, UserResponse, WidgetType,
};

pub const ENTRY: StepId = "medical_intro";

const M: Module = Module::MedicalEvaluation;

pub fn steps() -> Vec<StepDef> {
    vec![
        StepDef::auto("medical_intro", M, medical_intro_script).to("med_height"),
        StepDef::new("med_height", M, WidgetType::Number, height_script)
            .process(set_height)
            .to("med_weight"),
        StepDef::new("med_weight", M, WidgetType::Number, weight_script)
            .process(set_weight)
            .to("med_tobacco"),
        StepDef::new("med_tobacco", M, WidgetType::SingleSelect, tobacco_script)
            .process(set_tobacco)
            .to("med_alcohol"),
        StepDef::new("med_alcohol", M, WidgetType::SingleSelect, alcohol_script)
            .process(set_alcohol)
            .to("med_conditions"),
        StepDef::new("med_conditions", M, WidgetType::MultiSelect, conditions_script)
            .process(set_conditions)
            .to("med_condition_details"),
        StepDef::new("med_condition_details", M, WidgetType::Text, condition_details_script)
            .when(has_conditions)
            .process(set_condition_details)
            .to("med_medications"),
        StepDef::new("med_medications", M, WidgetType::Text, medications_script)
            .when(has_conditions)
            .process(set_medications)
            .to("med_family_history"),
        StepDef::new("med_family_history", M, WidgetType::MultiSelect, family_history_script)
            .process(set_family_history)
            .to("med_assessment"),
        StepDef::auto("med_assessment", M, assessment_script).route(route_assessment),
        StepDef::auto("med_waived", M, waived_script).to("medical_complete"),
        StepDef::auto("tele_intro", M, tele_intro_script).to("tele_date"),
        StepDef::new("tele_date", M, WidgetType::Date, tele_date_script)
            .process(set_call_date)
            .to("tele_slot"),
        StepDef::new("tele_slot", M, WidgetType::SingleSelect, tele_slot_script)
            .process(set_call_slot)
            .to("tele_availability"),
        StepDef::auto("tele_availability", M, availability_script).route(route_availability),
        StepDef::auto("tele_slot_taken", M, slot_taken_script).to("tele_slot"),
        StepDef::auto("tele_confirmed", M, confirmed_script).to("medical_complete"),
        StepDef::auto("medical_complete", M, medical_complete_script).to("journey_complete"),
    ]
}

/// Whether the declaration so far requires a doctor's call: tobacco use,
/// any declared condition, an out-of-range BMI, or age past 50.
fn needs_mer(state: &JourneyState) -> bool {
    let answers = &state.answers;
    let medical = &answers.medical;
    if medical.tobacco == Some(true) {
        return true;
    }
    if medical
        .conditions
        .as_ref()
        .is_some_and(|c| c.iter().any(|c| c != "none"))
    {
        return true;
    }
    if medical.bmi().is_some_and(|bmi| !(18.0..=32.0).contains(&bmi)) {
        return true;
    }
    answers.profile.age.unwrap_or(0) > 50
}

fn has_conditions(state: &JourneyState) -> bool {
    state
        .answers
        .medical
        .conditions
        .as_ref()
        .is_some_and(|c| c.iter().any(|c| c != "none"))
}

// ── Scripts ─────────────────────────────────────────────────────────

fn medical_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Last stretch: a short health declaration. Most people finish without any tests — I'll tell you immediately if a doctor's call is needed.")
}

fn height_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Your height, in centimetres?")
        .with_placeholder("e.g. 170")
        .with_range(120, 220)
}

fn weight_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("And your weight, in kilograms?")
        .with_placeholder("e.g. 68")
        .with_range(35, 200)
}

fn tobacco_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Any tobacco in any form — cigarettes, gutkha, vaping — in the last year?").with_options(vec![
        Choice::new("no", "No"),
        Choice::new("yes", "Yes"),
    ])
}

fn alcohol_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("How often do you drink alcohol?").with_options(vec![
        Choice::new("never", "Never"),
        Choice::new("occasional", "Occasionally"),
        Choice::new("regular", "Regularly"),
    ])
}

fn conditions_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Have you ever been diagnosed with any of these?").with_options(vec![
        Choice::new("none", "None of these"),
        Choice::new("diabetes", "Diabetes"),
        Choice::new("hypertension", "High blood pressure"),
        Choice::new("thyroid", "Thyroid disorder"),
        Choice::new("cardiac", "Heart condition"),
        Choice::new("cancer_history", "Cancer (past or present)"),
    ])
}

fn condition_details_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Tell me a little more — when was it diagnosed, and is it under control?")
        .with_placeholder("e.g. Type 2 diabetes since 2019, controlled by diet")
}

fn medications_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Any regular medications for it?")
        .with_placeholder("Names and doses, roughly")
}

fn family_history_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Any of these in your immediate family (parents, siblings) before age 60?").with_options(vec![
        Choice::new("none", "None of these"),
        Choice::new("diabetes", "Diabetes"),
        Choice::new("cardiac", "Heart disease"),
        Choice::new("cancer", "Cancer"),
    ])
}

fn assessment_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().verifying)
}

fn waived_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Good news — based on your declaration, no medical tests are needed. The insurer accepts it as-is ✅")
}

fn tele_intro_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Based on your declaration the insurer wants a short tele-medical call — a doctor asks the same questions over video, about 15 minutes. No clinic visit, no blood tests yet.")
}

fn tele_date_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Which date works for the call?")
}

fn tele_slot_script(_: &StepCtx, state: &JourneyState) -> Script {
    let date = state
        .answers
        .medical
        .call_date
        .map(|d| format!("{} {}", d.day(), d.format("%B")))
        .unwrap_or_else(|| "that day".to_string());
    Script::say(format!("These slots are open on {date}:")).with_options(vec![
        Choice::new("slot_9_10", "9:00 – 10:00 am"),
        Choice::new("slot_11_12", "11:00 am – 12:00 pm"),
        Choice::new("slot_16_17", "4:00 – 5:00 pm"),
        Choice::new("slot_18_19", "6:00 – 7:00 pm"),
    ])
}

fn availability_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Checking the doctor's calendar…")
}

fn slot_taken_script(_: &StepCtx, _: &JourneyState) -> Script {
    Script::say("Ah — that slot was just booked by someone else. Let's pick another.")
}

fn confirmed_script(_: &StepCtx, state: &JourneyState) -> Script {
    let medical = &state.answers.medical;
    let date = medical
        .call_date
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "the chosen date".to_string());
    let slot = medical.call_slot.as_deref().unwrap_or("the chosen slot");
    Script::say(format!(
        "Booked ✅ A doctor will call you on {date} ({slot}). You'll get an SMS with the video link."
    ))
}

fn medical_complete_script(ctx: &StepCtx, _: &JourneyState) -> Script {
    Script::say(ctx.strings().all_done)
}

// ── Processors ──────────────────────────────────────────────────────

fn set_height(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        height_cm: r.as_number().map(|n| n as u32),
        ..Default::default()
    }
}

fn set_weight(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        weight_kg: r.as_number().map(|n| n as u32),
        ..Default::default()
    }
}

fn set_tobacco(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        tobacco: r.as_select().map(|id| id == "yes"),
        ..Default::default()
    }
}

fn set_alcohol(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        alcohol: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

fn set_conditions(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        med_conditions: r.as_multi().map(<[String]>::to_vec),
        ..Default::default()
    }
}

fn set_condition_details(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        condition_details: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

fn set_medications(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        medications: r.as_text().map(str::to_string),
        ..Default::default()
    }
}

/// The final declaration answer also records whether a tele-medical call
/// is required, computed from the declaration as a whole.
fn set_family_history(_: &StepCtx, r: &UserResponse, state: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        family_history: r.as_multi().map(<[String]>::to_vec),
        mer_required: Some(needs_mer(state)),
        ..Default::default()
    }
}

fn set_call_date(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        call_date: r.as_date(),
        ..Default::default()
    }
}

fn set_call_slot(_: &StepCtx, r: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch {
        call_slot: r.as_select().map(str::to_string),
        ..Default::default()
    }
}

// ── Routers ─────────────────────────────────────────────────────────

fn route_assessment(_: &StepCtx, _: Option<&UserResponse>, state: &JourneyState) -> Transition {
    if state.answers.medical.mer_required == Some(true) {
        Transition::Goto("tele_intro")
    } else {
        Transition::Goto("med_waived")
    }
}

/// Slots are flaky on purpose: a configurable slice of rolls finds the
/// slot already taken and loops back to selection.
fn route_availability(ctx: &StepCtx, _: Option<&UserResponse>, _: &JourneyState) -> Transition {
    if ctx.roll < ctx.demo.slot_unavailable_odds {
        Transition::Goto("tele_slot_taken")
    } else {
        Transition::Goto("tele_confirmed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::i18n::Language;
    use crate::persona::Persona;
    use crate::state::StateStore;

    fn ctx(demo: &DemoConfig, roll: f64) -> StepCtx<'_> {
        StepCtx {
            demo,
            persona: Persona::FirstTimer,
            lang: Language::En,
            roll,
        }
    }

    #[test]
    fn clean_declaration_waives_the_medical() {
        let mut store = StateStore::new(ENTRY, M);
        store.apply(AnswersPatch {
            age: Some(32),
            height_cm: Some(175),
            weight_kg: Some(70),
            tobacco: Some(false),
            med_conditions: Some(vec!["none".to_string()]),
            ..Default::default()
        });
        assert!(!needs_mer(store.state()));

        let demo = DemoConfig::default();
        let c = ctx(&demo, 0.5);
        store.apply(AnswersPatch {
            mer_required: Some(false),
            ..Default::default()
        });
        assert_eq!(
            route_assessment(&c, None, store.state()),
            Transition::Goto("med_waived")
        );
    }

    #[test]
    fn tobacco_or_conditions_require_the_call() {
        let mut smoker = StateStore::new(ENTRY, M);
        smoker.apply(AnswersPatch {
            tobacco: Some(true),
            ..Default::default()
        });
        assert!(needs_mer(smoker.state()));

        let mut diabetic = StateStore::new(ENTRY, M);
        diabetic.apply(AnswersPatch {
            med_conditions: Some(vec!["diabetes".to_string()]),
            ..Default::default()
        });
        assert!(needs_mer(diabetic.state()));
    }

    #[test]
    fn out_of_range_bmi_requires_the_call() {
        let mut store = StateStore::new(ENTRY, M);
        store.apply(AnswersPatch {
            height_cm: Some(160),
            weight_kg: Some(95),
            tobacco: Some(false),
            ..Default::default()
        });
        assert!(needs_mer(store.state()));
    }

    #[test]
    fn condition_detail_steps_are_skipped_without_conditions() {
        let mut store = StateStore::new(ENTRY, M);
        store.apply(AnswersPatch {
            med_conditions: Some(vec!["none".to_string()]),
            ..Default::default()
        });
        assert!(!has_conditions(store.state()));

        store.apply(AnswersPatch {
            med_conditions: Some(vec!["thyroid".to_string()]),
            ..Default::default()
        });
        assert!(has_conditions(store.state()));
    }

    #[test]
    fn slot_availability_follows_the_roll() {
        let demo = DemoConfig::default();
        let store = StateStore::new(ENTRY, M);

        let taken = ctx(&demo, 0.1);
        assert_eq!(
            route_availability(&taken, None, store.state()),
            Transition::Goto("tele_slot_taken")
        );

        let free = ctx(&demo, 0.9);
        assert_eq!(
            route_availability(&free, None, store.state()),
            Transition::Goto("tele_confirmed")
        );
    }
}

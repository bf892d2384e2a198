//! Step registry — the union of all flow registries, plus the startup
//! graph-validation pass.
//!
//! Validation probes every step's transition space (option ids, demo
//! sentinels, boundary rolls, the no-response case) against a handful of
//! representative states and asserts that every reachable target resolves
//! to a registered step or the terminal marker. Broken graphs fail at
//! startup, not mid-conversation.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use crate::config::DemoConfig;
use crate::error::GraphError;
use crate::i18n::Language;
use crate::state::{AnswersPatch, EmploymentType, JourneyState, Product, StateStore, VehicleKind};
use crate::step::{Module, StepCtx, StepDef, StepId, Transition, UserResponse, WidgetType};

/// Immutable union of the per-module step registries.
pub struct StepRegistry {
    steps: HashMap<StepId, StepDef>,
    entries: Vec<StepId>,
}

impl StepRegistry {
    /// Union flow registries. Step ids must be globally unique; every
    /// entry point must be registered.
    pub fn from_flows(
        flows: Vec<Vec<StepDef>>,
        entries: Vec<StepId>,
    ) -> Result<Self, GraphError> {
        let mut steps = HashMap::new();
        for flow in flows {
            for step in flow {
                if steps.insert(step.id, step).is_some() {
                    return Err(GraphError::DuplicateStep { id: step.id });
                }
            }
        }
        for &entry in &entries {
            if !steps.contains_key(entry) {
                return Err(GraphError::MissingEntry { id: entry });
            }
        }
        Ok(Self { steps, entries })
    }

    pub fn get(&self, id: &str) -> Option<&StepDef> {
        self.steps.get(id)
    }

    pub fn entries(&self) -> &[StepId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Startup graph validation: closure of every probed transition, plus
    /// the no-self-loop rule for auto-advancing steps. Unreachable steps
    /// are logged, not fatal; the union registry is entered from several
    /// points and some sub-flows are only linked at runtime.
    pub fn validate(&self, demo: &DemoConfig) -> Result<(), GraphError> {
        let states = probe_states(demo);
        let mut edges: HashMap<StepId, HashSet<StepId>> = HashMap::new();

        for step in self.steps.values() {
            let mut targets = HashSet::new();

            for state in &states {
                for roll in [0.0, 0.99] {
                    let ctx = StepCtx {
                        demo,
                        persona: crate::persona::resolve(&state.answers),
                        lang: Language::En,
                        roll,
                    };

                    let mut transitions = vec![step.next.resolve(&ctx, None, state)];
                    for response in probe_responses(step, &ctx, state, demo) {
                        transitions.push(step.next.resolve(&ctx, Some(&response), state));
                    }

                    for transition in transitions {
                        if let Transition::Goto(target) = transition {
                            if step.widget == WidgetType::NoInput && target == step.id {
                                return Err(GraphError::AutoAdvanceSelfLoop { id: step.id });
                            }
                            if !self.steps.contains_key(target) {
                                return Err(GraphError::UnknownStep {
                                    id: target.to_string(),
                                    referenced_by: step.id,
                                });
                            }
                            targets.insert(target);
                        }
                    }
                }
            }

            edges.insert(step.id, targets);
        }

        // Reachability sweep from the entry points.
        let mut seen: HashSet<StepId> = HashSet::new();
        let mut queue: VecDeque<StepId> = self.entries.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(targets) = edges.get(id) {
                queue.extend(targets.iter().copied());
            }
        }
        for id in self.steps.keys() {
            if !seen.contains(id) {
                tracing::warn!(step = %id, "Step not reachable from any entry under probing");
            }
        }

        tracing::debug!(
            steps = self.steps.len(),
            reachable = seen.len(),
            "Step graph validated"
        );
        Ok(())
    }
}

/// Representative states covering the main branch dimensions: fresh,
/// mid-life-purchase on the happy path, high-loading/exhausted-retries,
/// and motor.
fn probe_states(demo: &DemoConfig) -> Vec<JourneyState> {
    let fresh = StateStore::new("probe", Module::Onboarding);

    let mut life = StateStore::new("probe", Module::Onboarding);
    life.apply(AnswersPatch {
        product: Some(Product::Life),
        name: Some("Probe".to_string()),
        age: Some(32),
        smoker: Some(false),
        annual_income: Some(dec!(1_200_000)),
        cover: Some(dec!(5_000_000)),
        term_years: Some(20),
        life_plan: Some("life_basic".to_string()),
        employment: Some(EmploymentType::Salaried),
        epfo_verified: Some(true),
        kyc_verified: Some(true),
        ..Default::default()
    });

    let mut loaded = StateStore::new("probe", Module::Onboarding);
    loaded.apply(AnswersPatch {
        product: Some(Product::Health),
        age: Some(61),
        members: Some(vec!["self".to_string(), "spouse".to_string()]),
        sum_insured: Some(dec!(1_000_000)),
        health_conditions: Some(vec!["diabetes".to_string()]),
        employment: Some(EmploymentType::Business),
        epfo_mobile: Some(demo.epfo_timeout_mobile.clone()),
        kyc_otp_attempts: Some(demo.max_otp_attempts),
        epfo_otp_attempts: Some(demo.max_otp_attempts),
        gstin_attempts: Some(demo.max_otp_attempts),
        edit_otp_attempts: Some(demo.max_otp_attempts),
        payment_attempts: Some(3),
        tobacco: Some(true),
        mer_required: Some(true),
        med_conditions: Some(vec!["hypertension".to_string()]),
        ..Default::default()
    });

    let mut motor = StateStore::new("probe", Module::Onboarding);
    motor.apply(AnswersPatch {
        product: Some(Product::Motor),
        vehicle_kind: Some(VehicleKind::Car),
        idv: Some(dec!(600_000)),
        ..Default::default()
    });

    vec![
        fresh.state().clone(),
        life.state().clone(),
        loaded.state().clone(),
        motor.state().clone(),
    ]
}

/// Candidate responses for a step, spanning its option space and the demo
/// sentinels that trigger alternate branches.
fn probe_responses(
    step: &StepDef,
    ctx: &StepCtx,
    state: &JourneyState,
    demo: &DemoConfig,
) -> Vec<UserResponse> {
    let script = (step.script)(ctx, state);
    match step.widget {
        WidgetType::NoInput => Vec::new(),
        WidgetType::Text => vec![
            UserResponse::Text("Asha".to_string()),
            UserResponse::Text(demo.epfo_timeout_mobile.clone()),
            UserResponse::Text("9876543210".to_string()),
            UserResponse::Text("X".repeat(demo.gstin_length)),
            UserResponse::Text("GST12".to_string()),
        ],
        WidgetType::Number => {
            let mut probes = vec![UserResponse::Number(30)];
            if let Some(min) = script.min {
                probes.push(UserResponse::Number(min));
            }
            if let Some(max) = script.max {
                probes.push(UserResponse::Number(max));
            }
            probes
        }
        WidgetType::Amount => vec![UserResponse::Amount(dec!(500_000))],
        WidgetType::Date => vec![UserResponse::Date(
            NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid probe date"),
        )],
        WidgetType::SingleSelect => script
            .options
            .iter()
            .map(|c| UserResponse::Select(c.id.clone()))
            .collect(),
        WidgetType::MultiSelect => {
            let all: Vec<String> = script.options.iter().map(|c| c.id.clone()).collect();
            let mut probes = vec![UserResponse::Multi(Vec::new())];
            if let Some(first) = all.first() {
                probes.push(UserResponse::Multi(vec![first.clone()]));
            }
            probes.push(UserResponse::Multi(all));
            probes
        }
        WidgetType::Otp => {
            let len = script.otp_len.unwrap_or(6);
            vec![
                UserResponse::Otp(demo.aadhaar_otp.clone()),
                UserResponse::Otp(demo.epfo_reject_otp.clone()),
                UserResponse::Otp(demo.service_otp.clone()),
                UserResponse::Otp("1".repeat(len)),
            ]
        }
        WidgetType::Summary => vec![UserResponse::Ack],
        WidgetType::Upload => vec![UserResponse::Upload("document.pdf".to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Script;

    fn say(_: &StepCtx, _: &JourneyState) -> Script {
        Script::say("hi")
    }

    fn step(id: StepId) -> StepDef {
        StepDef::new(id, Module::Onboarding, WidgetType::Text, say)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = StepRegistry::from_flows(
            vec![vec![step("a").to("b")], vec![step("a").end(), step("b").end()]],
            vec!["a"],
        );
        assert!(matches!(result, Err(GraphError::DuplicateStep { id: "a" })));
    }

    #[test]
    fn missing_entry_is_rejected() {
        let result = StepRegistry::from_flows(vec![vec![step("a").end()]], vec!["nope"]);
        assert!(matches!(result, Err(GraphError::MissingEntry { id: "nope" })));
    }

    #[test]
    fn unknown_transition_target_fails_validation() {
        let registry =
            StepRegistry::from_flows(vec![vec![step("a").to("ghost")]], vec!["a"]).unwrap();
        let result = registry.validate(&DemoConfig::default());
        assert!(matches!(result, Err(GraphError::UnknownStep { .. })));
    }

    #[test]
    fn auto_advance_self_loop_fails_validation() {
        let auto = StepDef::auto("a", Module::Onboarding, say).to("a");
        let registry = StepRegistry::from_flows(vec![vec![auto]], vec!["a"]).unwrap();
        let result = registry.validate(&DemoConfig::default());
        assert!(matches!(result, Err(GraphError::AutoAdvanceSelfLoop { id: "a" })));
    }

    #[test]
    fn widget_self_loop_is_allowed() {
        // A widget step may route back to itself (e.g. a rider selector
        // refusing to advance while over cap).
        let registry =
            StepRegistry::from_flows(vec![vec![step("a").to("a")]], vec!["a"]).unwrap();
        assert!(registry.validate(&DemoConfig::default()).is_ok());
    }

    #[test]
    fn linear_chain_validates() {
        let registry = StepRegistry::from_flows(
            vec![vec![step("a").to("b"), step("b").end()]],
            vec!["a"],
        )
        .unwrap();
        assert!(registry.validate(&DemoConfig::default()).is_ok());
        assert_eq!(registry.len(), 2);
    }
}

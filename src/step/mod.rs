//! Step definitions — the nodes of the conversation graph.
//!
//! A step bundles four pure functions over the journey state: an optional
//! guard, a script resolver, a response processor, and a router. Steps are
//! static data registered at startup; the engine owns all sequencing and
//! effects.

pub mod registry;
pub mod response;

use serde::{Deserialize, Serialize};

use crate::config::DemoConfig;
use crate::i18n::{self, Language, StringTable};
use crate::persona::Persona;
use crate::state::{AnswersPatch, JourneyState};

pub use registry::StepRegistry;
pub use response::UserResponse;

/// Step identifier. All steps are static data, so ids are static too.
pub type StepId = &'static str;

/// Which journey module a step belongs to. Display/progress tag only;
/// routing never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Onboarding,
    FinancialVerification,
    MedicalEvaluation,
    PostPayment,
    Dashboard,
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Onboarding => "onboarding",
            Self::FinancialVerification => "financial_verification",
            Self::MedicalEvaluation => "medical_evaluation",
            Self::PostPayment => "post_payment",
            Self::Dashboard => "dashboard",
        };
        write!(f, "{s}")
    }
}

/// Input control the UI renders for a step. `NoInput` steps auto-advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    NoInput,
    Text,
    Number,
    Amount,
    Date,
    SingleSelect,
    MultiSelect,
    Otp,
    Summary,
    Upload,
}

impl std::fmt::Display for WidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoInput => "no_input",
            Self::Text => "text",
            Self::Number => "number",
            Self::Amount => "amount",
            Self::Date => "date",
            Self::SingleSelect => "single_select",
            Self::MultiSelect => "multi_select",
            Self::Otp => "otp",
            Self::Summary => "summary",
            Self::Upload => "upload",
        };
        write!(f, "{s}")
    }
}

/// Shape constraint for text widgets, enforced at the widget boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPattern {
    FreeText,
    Mobile,
    Aadhaar,
    Pan,
    Registration,
    Pincode,
    Email,
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub sublabel: Option<String>,
    pub disabled: bool,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sublabel: None,
            disabled: false,
        }
    }

    pub fn with_sublabel(mut self, sublabel: impl Into<String>) -> Self {
        self.sublabel = Some(sublabel.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Rendered content for a step: bot messages plus widget parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub bot_messages: Vec<String>,
    pub options: Vec<Choice>,
    pub placeholder: Option<String>,
    pub pattern: Option<TextPattern>,
    pub otp_len: Option<usize>,
    /// Widget-local countdown (OTP resend, slot hold) in seconds.
    pub countdown_secs: Option<u64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Script {
    pub fn say(message: impl Into<String>) -> Self {
        Self {
            bot_messages: vec![message.into()],
            ..Default::default()
        }
    }

    pub fn and_say(mut self, message: impl Into<String>) -> Self {
        self.bot_messages.push(message.into());
        self
    }

    pub fn with_options(mut self, options: Vec<Choice>) -> Self {
        self.options = options;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_pattern(mut self, pattern: TextPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_otp(mut self, len: usize, countdown_secs: u64) -> Self {
        self.otp_len = Some(len);
        self.countdown_secs = Some(countdown_secs);
        self
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// The full rendered bot content, paragraph-joined.
    pub fn content(&self) -> String {
        self.bot_messages.join("\n\n")
    }
}

/// Context handed to every step function. Carries the demo sentinels, the
/// resolved persona/language, and one uniform roll so the functions stay
/// pure given their inputs.
#[derive(Debug, Clone, Copy)]
pub struct StepCtx<'a> {
    pub demo: &'a DemoConfig,
    pub persona: Persona,
    pub lang: Language,
    pub roll: f64,
}

impl StepCtx<'_> {
    pub fn strings(&self) -> &'static StringTable {
        i18n::table(self.lang)
    }
}

/// Where a step routes after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Goto(StepId),
    End,
}

pub type ConditionFn = fn(&JourneyState) -> bool;
pub type ScriptFn = fn(&StepCtx, &JourneyState) -> Script;
pub type ProcessFn = fn(&StepCtx, &UserResponse, &JourneyState) -> AnswersPatch;
pub type RouteFn = fn(&StepCtx, Option<&UserResponse>, &JourneyState) -> Transition;
pub type LabelFn = fn(&UserResponse, &Script) -> String;

/// Transition policy. Linear hops stay declarative; only genuine branching
/// pays for a router function.
#[derive(Debug, Clone, Copy)]
pub enum NextStep {
    To(StepId),
    End,
    Route(RouteFn),
}

impl NextStep {
    /// Resolve against the *post-merge* state. Routers never see the
    /// pre-merge state, which rules out stale branching.
    pub fn resolve(
        &self,
        ctx: &StepCtx,
        response: Option<&UserResponse>,
        state: &JourneyState,
    ) -> Transition {
        match *self {
            Self::To(id) => Transition::Goto(id),
            Self::End => Transition::End,
            Self::Route(f) => f(ctx, response, state),
        }
    }
}

fn no_patch(_: &StepCtx, _: &UserResponse, _: &JourneyState) -> AnswersPatch {
    AnswersPatch::default()
}

/// One node of the conversation graph.
#[derive(Debug, Clone, Copy)]
pub struct StepDef {
    pub id: StepId,
    pub module: Module,
    pub widget: WidgetType,
    /// If present and false for the current state, the step is skipped
    /// entirely: no script, no widget, immediate transition.
    pub condition: Option<ConditionFn>,
    pub script: ScriptFn,
    pub process: ProcessFn,
    pub next: NextStep,
    /// Override for the user-visible answer label.
    pub label: Option<LabelFn>,
}

impl StepDef {
    pub fn new(id: StepId, module: Module, widget: WidgetType, script: ScriptFn) -> Self {
        Self {
            id,
            module,
            widget,
            condition: None,
            script,
            process: no_patch,
            next: NextStep::End,
            label: None,
        }
    }

    /// A step with no input widget; the engine auto-advances it.
    pub fn auto(id: StepId, module: Module, script: ScriptFn) -> Self {
        Self::new(id, module, WidgetType::NoInput, script)
    }

    pub fn when(mut self, condition: ConditionFn) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn process(mut self, process: ProcessFn) -> Self {
        self.process = process;
        self
    }

    pub fn to(mut self, id: StepId) -> Self {
        self.next = NextStep::To(id);
        self
    }

    pub fn end(mut self) -> Self {
        self.next = NextStep::End;
        self
    }

    pub fn route(mut self, route: RouteFn) -> Self {
        self.next = NextStep::Route(route);
        self
    }

    pub fn label_with(mut self, label: LabelFn) -> Self {
        self.label = Some(label);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;

    fn script(_: &StepCtx, _: &JourneyState) -> Script {
        Script::say("hello")
    }

    #[test]
    fn script_content_joins_paragraphs() {
        let s = Script::say("one").and_say("two");
        assert_eq!(s.content(), "one\n\ntwo");
    }

    #[test]
    fn next_step_resolves_linear_hops_without_a_router() {
        let demo = DemoConfig::default();
        let ctx = StepCtx {
            demo: &demo,
            persona: Persona::FirstTimer,
            lang: Language::En,
            roll: 0.0,
        };
        let store = StateStore::new("a", Module::Onboarding);

        let next = NextStep::To("b");
        assert_eq!(next.resolve(&ctx, None, store.state()), Transition::Goto("b"));
        assert_eq!(NextStep::End.resolve(&ctx, None, store.state()), Transition::End);
    }

    #[test]
    fn step_builder_defaults() {
        let step = StepDef::new("a", Module::Onboarding, WidgetType::Text, script).to("b");
        assert!(step.condition.is_none());
        assert!(step.label.is_none());
        assert!(matches!(step.next, NextStep::To("b")));

        let auto = StepDef::auto("c", Module::Onboarding, script);
        assert_eq!(auto.widget, WidgetType::NoInput);
    }
}

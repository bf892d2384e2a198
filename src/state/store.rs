//! The journey state store.
//!
//! Holds the single mutable aggregate for a conversation and owns the only
//! ways it changes: shallow patch merges, history appends, trim-based
//! rewind, and full reset. The derived quote is recomputed after every
//! merge so it can never drift from its inputs.

use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::pricing::{self, Quote};
use crate::state::answers::{Answers, AnswersPatch};
use crate::state::history::ChatMessage;
use crate::step::{Module, StepId};

/// The evolving journey state.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyState {
    pub current_step: StepId,
    pub current_module: Module,
    pub history: Vec<ChatMessage>,
    pub answers: Answers,
    pub quote: Option<Quote>,
    /// Transient UI flags; never meaningful across a reset.
    pub is_typing: bool,
    pub show_widget: bool,
    pub ended: bool,
    pub fault: Option<String>,
}

impl JourneyState {
    fn new(entry: StepId, module: Module) -> Self {
        Self {
            current_step: entry,
            current_module: module,
            history: Vec::new(),
            answers: Answers::default(),
            quote: None,
            is_typing: false,
            show_widget: false,
            ended: false,
            fault: None,
        }
    }
}

/// Owner of [`JourneyState`]. Only the engine holds one.
#[derive(Debug)]
pub struct StateStore {
    state: JourneyState,
    entry: StepId,
    entry_module: Module,
}

impl StateStore {
    pub fn new(entry: StepId, entry_module: Module) -> Self {
        Self {
            state: JourneyState::new(entry, entry_module),
            entry,
            entry_module,
        }
    }

    pub fn state(&self) -> &JourneyState {
        &self.state
    }

    /// Shallow-merge a patch, then recompute the derived quote.
    pub fn apply(&mut self, patch: AnswersPatch) {
        self.state.answers.merge(patch);
        self.state.quote = pricing::recompute(&self.state.answers);
    }

    pub fn push_message(&mut self, msg: ChatMessage) -> Uuid {
        let id = msg.id;
        self.state.history.push(msg);
        id
    }

    pub fn set_step(&mut self, step: StepId, module: Module) {
        self.state.current_step = step;
        self.state.current_module = module;
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.state.is_typing = typing;
    }

    pub fn set_widget_shown(&mut self, shown: bool) {
        self.state.show_widget = shown;
    }

    pub fn mark_ended(&mut self) {
        self.state.ended = true;
    }

    pub fn clear_ended(&mut self) {
        self.state.ended = false;
    }

    pub fn set_fault(&mut self, message: impl Into<String>) {
        self.state.fault = Some(message.into());
    }

    /// Truncate history for a rewind to `step`: everything from the step's
    /// original user answer onward is removed, keeping the step's bot
    /// prompt in place. The caller follows up with a fresh user message
    /// carrying the edited answer, so replaying the same answer reproduces
    /// the same transcript.
    ///
    /// A step id can recur in loop-back flows; the rewind targets the
    /// *last* contiguous block tagged with it, the occurrence the user
    /// most recently saw.
    pub fn trim_from_step(&mut self, step: StepId) -> Result<usize, StoreError> {
        let history = &self.state.history;
        let mut block_start = None;
        for (i, msg) in history.iter().enumerate() {
            if msg.step == step && (i == 0 || history[i - 1].step != step) {
                block_start = Some(i);
            }
        }
        let start = block_start.ok_or(StoreError::StepNotInHistory { step })?;

        let history = &self.state.history;
        let block_end = history[start..]
            .iter()
            .position(|m| m.step != step)
            .map(|offset| start + offset)
            .unwrap_or(history.len());

        // Cut at the step's original user answer; a block with no answer
        // yet keeps its bot prompt and loses only what follows.
        let cut = history[start..block_end]
            .iter()
            .position(|m| m.sender == crate::state::Sender::User)
            .map(|offset| start + offset)
            .unwrap_or(block_end);
        self.state.history.truncate(cut);
        Ok(self.state.history.len())
    }

    /// Reinitialize to the entry step with empty history and answers.
    pub fn reset(&mut self) {
        self.state = JourneyState::new(self.entry, self.entry_module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Product;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn store() -> StateStore {
        StateStore::new("welcome", Module::Onboarding)
    }

    fn push_pair(store: &mut StateStore, step: StepId, bot: &str, user: &str) {
        store.push_message(ChatMessage::bot(step, Module::Onboarding, bot));
        store.push_message(ChatMessage::user(step, Module::Onboarding, user));
    }

    #[test]
    fn apply_recomputes_quote_from_scratch() {
        let mut store = store();
        assert!(store.state().quote.is_none());

        store.apply(AnswersPatch {
            product: Some(Product::Life),
            age: Some(32),
            cover: Some(dec!(5_000_000)),
            ..Default::default()
        });
        let quote = store.state().quote.clone().unwrap();
        assert!(quote.base_premium > Decimal::ZERO);

        // Unrelated patch leaves the quote identical.
        store.apply(AnswersPatch {
            name: Some("Asha".to_string()),
            ..Default::default()
        });
        assert_eq!(store.state().quote.clone().unwrap(), quote);
    }

    #[test]
    fn trim_cuts_at_the_original_user_answer_keeping_the_prompt() {
        let mut store = store();
        push_pair(&mut store, "step_one", "q1", "a1");
        push_pair(&mut store, "step_two", "q2", "a2");
        push_pair(&mut store, "step_three", "q3", "a3");

        let len = store.trim_from_step("step_two").unwrap();
        assert_eq!(len, 3);
        let last = store.state().history.last().unwrap();
        assert_eq!(last.step, "step_two");
        assert_eq!(last.sender, crate::state::Sender::Bot);
    }

    #[test]
    fn trim_matches_the_five_step_rewind_arithmetic() {
        // An auto first step contributes only a bot message; rewinding the
        // second step then leaves exactly two entries.
        let mut store = store();
        store.push_message(ChatMessage::bot("intro", Module::Onboarding, "welcome"));
        push_pair(&mut store, "step_two", "q2", "a2");
        push_pair(&mut store, "step_three", "q3", "a3");
        push_pair(&mut store, "step_four", "q4", "a4");
        push_pair(&mut store, "step_five", "q5", "a5");

        let len = store.trim_from_step("step_two").unwrap();
        assert_eq!(len, 2);
    }

    #[test]
    fn trim_targets_the_last_occurrence_of_a_recurring_step() {
        let mut store = store();
        push_pair(&mut store, "faq_topic", "which topic?", "claims");
        push_pair(&mut store, "faq_answer", "here you go", "ok");
        push_pair(&mut store, "faq_topic", "which topic?", "renewal");

        let len = store.trim_from_step("faq_topic").unwrap();
        assert_eq!(len, 5);
        let last = store.state().history.last().unwrap();
        assert_eq!(last.step, "faq_topic");
        assert_eq!(last.sender, crate::state::Sender::Bot);
    }

    #[test]
    fn trim_unknown_step_is_an_error() {
        let mut store = store();
        push_pair(&mut store, "step_one", "q1", "a1");
        assert!(store.trim_from_step("never_ran").is_err());
    }

    #[test]
    fn reset_reinitializes_everything() {
        let mut store = store();
        push_pair(&mut store, "step_one", "q1", "a1");
        store.apply(AnswersPatch {
            name: Some("Asha".to_string()),
            ..Default::default()
        });
        store.set_step("step_two", Module::Dashboard);
        store.mark_ended();

        store.reset();
        let state = store.state();
        assert_eq!(state.current_step, "welcome");
        assert_eq!(state.current_module, Module::Onboarding);
        assert!(state.history.is_empty());
        assert!(state.answers.profile.name.is_none());
        assert!(!state.ended);
    }
}

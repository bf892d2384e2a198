//! The conversation engine — owns the journey state and drives the step
//! graph in response to UI commands and its own delayed timer commands.
//!
//! All handlers are synchronous: every delay is an epoch-tagged timer
//! scheduled through [`Timers`], so the engine never blocks and stale
//! callbacks from an abandoned step are dropped on receipt.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::config::{DemoConfig, EngineConfig};
use crate::engine::timers::{TimerKind, Timers};
use crate::engine::view::{ActiveWidget, EditPrompt, EngineView};
use crate::engine::{Command, CompletionSummary};
use crate::error::EngineError;
use crate::i18n::Language;
use crate::persona;
use crate::sim::RandomSource;
use crate::state::{ChatMessage, StateStore};
use crate::step::{
    response, Script, StepCtx, StepDef, StepId, StepRegistry, Transition, UserResponse, WidgetType,
};

/// Where the engine is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Bot message pending its typing delay.
    Typing,
    /// No-input step waiting out its pause before advancing.
    AwaitingAdvance,
    /// Widget shown, waiting on the user.
    AwaitingResponse,
    /// User answered, waiting out the pause before the next bot turn.
    AwaitingResume,
    /// Terminal step reached.
    Ended,
    /// A no-input step routed to itself; the journey is stalled on
    /// purpose rather than looping.
    Halted,
    /// Broken graph at runtime; only reset recovers.
    Faulted,
}

pub(crate) struct ConversationEngine {
    registry: Arc<StepRegistry>,
    cfg: EngineConfig,
    random: Arc<dyn RandomSource>,
    default_lang: Language,
    entry: StepId,
    store: StateStore,
    timers: Timers,
    view_tx: watch::Sender<EngineView>,
    completion: Option<oneshot::Sender<CompletionSummary>>,
    phase: Phase,
    /// Dedup keys for step entry: (step id, history length at entry).
    seen: HashSet<(StepId, usize)>,
    active_script: Option<Script>,
    countdown_remaining: Option<u64>,
}

impl ConversationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<StepRegistry>,
        cfg: EngineConfig,
        random: Arc<dyn RandomSource>,
        default_lang: Language,
        entry: StepId,
        store: StateStore,
        timers: Timers,
        view_tx: watch::Sender<EngineView>,
        completion: oneshot::Sender<CompletionSummary>,
    ) -> Self {
        Self {
            registry,
            cfg,
            random,
            default_lang,
            entry,
            store,
            timers,
            view_tx,
            completion: Some(completion),
            phase: Phase::Typing,
            seen: HashSet::new(),
            active_script: None,
            countdown_remaining: None,
        }
    }

    /// Enter the journey at its entry step.
    pub fn begin(&mut self) {
        self.enter_step(self.entry);
    }

    /// Dispatch one command.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Submit(response) => self.on_submit(response),
            Command::ConfirmEdit { step, response } => self.on_confirm_edit(step, response),
            Command::RequestEdit { step, reply } => self.on_request_edit(step, reply),
            Command::Reset => self.on_reset(),
            Command::Timer { epoch, kind } => {
                if epoch != self.timers.epoch() {
                    tracing::trace!(?kind, epoch, "dropping stale timer");
                    return;
                }
                match kind {
                    TimerKind::TypingDone => self.on_typing_done(),
                    TimerKind::AutoAdvance => self.on_auto_advance(),
                    TimerKind::Resume(next) => self.on_resume(next),
                    TimerKind::Countdown => self.on_countdown_tick(),
                    TimerKind::Complete => self.on_complete(),
                }
            }
            Command::Shutdown => {
                // Handled by the run loop; nothing to do here.
            }
        }
    }

    fn make_ctx<'a>(&self, demo: &'a DemoConfig) -> StepCtx<'a> {
        let answers = &self.store.state().answers;
        StepCtx {
            demo,
            persona: persona::resolve(answers),
            lang: answers.profile.language.unwrap_or(self.default_lang),
            roll: self.random.roll(),
        }
    }

    // ── Step entry ──────────────────────────────────────────────────

    fn enter_step(&mut self, start: StepId) {
        let demo = self.cfg.demo.clone();
        let mut step_id = start;
        let mut skips = 0usize;

        loop {
            let Some(step) = self.registry.get(step_id).copied() else {
                self.fault(format!("transition to unknown step '{step_id}'"));
                return;
            };

            // Guarded steps skip invisibly: no message, no delay, route as
            // if no response arrived.
            if let Some(condition) = step.condition {
                if !condition(self.store.state()) {
                    skips += 1;
                    if skips > self.cfg.max_skip_chain {
                        self.fault(format!(
                            "runaway skip chain of {skips} steps at '{}'",
                            step.id
                        ));
                        return;
                    }
                    let ctx = self.make_ctx(&demo);
                    match step.next.resolve(&ctx, None, self.store.state()) {
                        Transition::Goto(next) if next == step.id => {
                            tracing::warn!(step = %step.id, "skipped step routes to itself; halting");
                            self.phase = Phase::Halted;
                            self.publish();
                            return;
                        }
                        Transition::Goto(next) => {
                            step_id = next;
                            continue;
                        }
                        Transition::End => {
                            self.finish();
                            return;
                        }
                    }
                }
            }

            // Re-entry dedup: the same step at the same history position
            // renders identically, so a second entry is a no-op.
            let key = (step.id, self.store.state().history.len());
            if !self.seen.insert(key) {
                tracing::debug!(step = %step.id, "suppressing duplicate step entry");
                return;
            }

            self.store.set_step(step.id, step.module);
            let ctx = self.make_ctx(&demo);
            let script = (step.script)(&ctx, self.store.state());
            let delay = self.cfg.pacing.typing_delay(script.content().chars().count());

            tracing::debug!(step = %step.id, module = %step.module, "entering step");
            self.active_script = Some(script);
            self.store.set_typing(true);
            self.phase = Phase::Typing;
            self.timers.schedule(delay, TimerKind::TypingDone);
            self.publish();
            return;
        }
    }

    fn on_typing_done(&mut self) {
        if self.phase != Phase::Typing {
            return;
        }
        let Some(step) = self.current_step() else {
            return;
        };
        let script = self.active_script.clone().unwrap_or_default();

        self.store.set_typing(false);
        self.store
            .push_message(ChatMessage::bot(step.id, step.module, script.content()));

        if step.widget == WidgetType::NoInput {
            self.phase = Phase::AwaitingAdvance;
            self.timers
                .schedule(self.cfg.pacing.auto_advance_pause, TimerKind::AutoAdvance);
        } else {
            self.store.set_widget_shown(true);
            self.countdown_remaining = script.countdown_secs;
            if self.countdown_remaining.is_some() {
                self.timers
                    .schedule(self.cfg.pacing.countdown_tick, TimerKind::Countdown);
            }
            self.phase = Phase::AwaitingResponse;
        }
        self.publish();
    }

    fn on_auto_advance(&mut self) {
        if self.phase != Phase::AwaitingAdvance {
            return;
        }
        let Some(step) = self.current_step() else {
            return;
        };
        let demo = self.cfg.demo.clone();
        let ctx = self.make_ctx(&demo);
        match step.next.resolve(&ctx, None, self.store.state()) {
            Transition::Goto(next) if next == step.id => {
                tracing::warn!(step = %step.id, "auto-advance self-loop; halting");
                self.phase = Phase::Halted;
                self.publish();
            }
            Transition::Goto(next) => {
                self.timers.bump();
                self.enter_step(next);
            }
            Transition::End => self.finish(),
        }
    }

    fn on_resume(&mut self, next: StepId) {
        if self.phase != Phase::AwaitingResume {
            return;
        }
        self.enter_step(next);
    }

    // ── Responses ───────────────────────────────────────────────────

    fn on_submit(&mut self, response: UserResponse) {
        if self.phase != Phase::AwaitingResponse {
            tracing::warn!(?response, "response arrived with no widget awaiting input");
            return;
        }
        let Some(step) = self.current_step() else {
            return;
        };
        if !response::widget_accepts(step.widget, &response) {
            tracing::warn!(step = %step.id, widget = %step.widget, "response shape mismatch");
            return;
        }
        if let Some(script) = &self.active_script {
            if let Err(err) = response::validate(script, &response) {
                // Invalid payloads never reach a response processor.
                tracing::warn!(step = %step.id, %err, "rejected invalid response");
                return;
            }
        }
        self.apply_response(step, response);
    }

    fn on_confirm_edit(&mut self, step_id: StepId, response: UserResponse) {
        if self.phase == Phase::Faulted {
            return;
        }
        let Some(step) = self.registry.get(step_id).copied() else {
            tracing::warn!(step = %step_id, "edit for unknown step ignored");
            return;
        };
        if !response::widget_accepts(step.widget, &response) {
            tracing::warn!(step = %step_id, "edited response shape mismatch");
            return;
        }

        let demo = self.cfg.demo.clone();
        let ctx = self.make_ctx(&demo);
        let script = (step.script)(&ctx, self.store.state());
        if let Err(err) = response::validate(&script, &response) {
            tracing::warn!(step = %step_id, %err, "rejected invalid edit");
            return;
        }

        if !self.store.state().history.iter().any(|m| m.step == step_id) {
            tracing::warn!(step = %step_id, "edit for step not in history ignored");
            return;
        }

        // Cancel anything in flight (typing, countdowns, pending resume)
        // before history is touched.
        self.timers.bump();

        match self.store.trim_from_step(step_id) {
            Ok(len) => tracing::debug!(step = %step_id, history_len = len, "history rewound"),
            Err(err) => {
                tracing::warn!(step = %step_id, %err, "edit failed after precheck");
                return;
            }
        }

        self.seen.clear();
        self.store.set_typing(false);
        self.store.clear_ended();
        self.apply_response(step, response);
    }

    /// Shared tail of submit and edit: append the user's answer, merge the
    /// state delta, route on the *merged* state, then pause before the
    /// next bot turn.
    fn apply_response(&mut self, step: StepDef, response: UserResponse) {
        let demo = self.cfg.demo.clone();
        let ctx = self.make_ctx(&demo);

        let script = if self.store.state().current_step == step.id {
            self.active_script
                .clone()
                .unwrap_or_else(|| (step.script)(&ctx, self.store.state()))
        } else {
            (step.script)(&ctx, self.store.state())
        };

        // Ordering: the user message lands in history before its response
        // is processed into state.
        let label = response::derive_label(&step, &script, &response);
        self.store
            .push_message(ChatMessage::user(step.id, step.module, label));

        let patch = (step.process)(&ctx, &response, self.store.state());
        self.store.apply(patch);

        let transition = step.next.resolve(&ctx, Some(&response), self.store.state());

        self.store.set_widget_shown(false);
        self.active_script = None;
        self.countdown_remaining = None;
        self.timers.bump();

        match transition {
            Transition::Goto(next) => {
                self.phase = Phase::AwaitingResume;
                self.timers
                    .schedule(self.cfg.pacing.post_response_pause, TimerKind::Resume(next));
            }
            Transition::End => {
                self.finish();
                return;
            }
        }
        self.publish();
    }

    fn on_request_edit(
        &mut self,
        step_id: StepId,
        reply: oneshot::Sender<Result<EditPrompt, EngineError>>,
    ) {
        let result = self.edit_prompt(step_id);
        let _ = reply.send(result);
    }

    fn edit_prompt(&self, step_id: StepId) -> Result<EditPrompt, EngineError> {
        let step = self
            .registry
            .get(step_id)
            .copied()
            .ok_or_else(|| EngineError::EditRejected {
                step: step_id.to_string(),
            })?;
        let has_answer = self
            .store
            .state()
            .history
            .iter()
            .any(|m| m.step == step_id && m.editable);
        if !has_answer {
            return Err(EngineError::EditRejected {
                step: step_id.to_string(),
            });
        }
        let demo = self.cfg.demo.clone();
        let ctx = self.make_ctx(&demo);
        let script = (step.script)(&ctx, self.store.state());
        Ok(EditPrompt {
            step: step.id,
            widget: step.widget,
            script,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    fn on_reset(&mut self) {
        tracing::info!("journey reset");
        self.timers.bump();
        self.store.reset();
        self.seen.clear();
        self.active_script = None;
        self.countdown_remaining = None;
        self.begin();
    }

    fn on_countdown_tick(&mut self) {
        if self.phase != Phase::AwaitingResponse {
            return;
        }
        let Some(remaining) = self.countdown_remaining else {
            return;
        };
        let next = remaining.saturating_sub(1);
        self.countdown_remaining = Some(next);
        if next > 0 {
            self.timers
                .schedule(self.cfg.pacing.countdown_tick, TimerKind::Countdown);
        }
        self.publish();
    }

    fn finish(&mut self) {
        tracing::info!("journey reached terminal step");
        self.store.mark_ended();
        self.store.set_widget_shown(false);
        self.active_script = None;
        self.countdown_remaining = None;
        self.phase = Phase::Ended;
        self.timers
            .schedule(self.cfg.pacing.completion_delay, TimerKind::Complete);
        self.publish();
    }

    fn on_complete(&mut self) {
        let Some(tx) = self.completion.take() else {
            return;
        };
        let state = self.store.state();
        let summary = CompletionSummary {
            product: state.answers.product,
            total_premium: state.quote.as_ref().map(|q| q.total),
            messages: state.history.len(),
        };
        tracing::info!(messages = summary.messages, "journey completed");
        let _ = tx.send(summary);
    }

    fn fault(&mut self, message: String) {
        tracing::error!(%message, "journey fault, halting visibly");
        self.store.set_fault(message);
        self.store.set_typing(false);
        self.store.set_widget_shown(false);
        self.active_script = None;
        self.countdown_remaining = None;
        self.phase = Phase::Faulted;
        self.publish();
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn current_step(&mut self) -> Option<StepDef> {
        let id = self.store.state().current_step;
        match self.registry.get(id).copied() {
            Some(step) => Some(step),
            None => {
                self.fault(format!("current step '{id}' vanished from registry"));
                None
            }
        }
    }

    fn publish(&self) {
        let state = self.store.state();
        let widget = if state.show_widget {
            self.active_script.clone().map(|script| ActiveWidget {
                step: state.current_step,
                widget: self
                    .registry
                    .get(state.current_step)
                    .map(|s| s.widget)
                    .unwrap_or(WidgetType::NoInput),
                script,
                countdown_remaining: self.countdown_remaining,
            })
        } else {
            None
        };
        let view = EngineView {
            messages: state.history.clone(),
            is_typing: state.is_typing,
            widget,
            module: state.current_module,
            quote: state.quote.clone(),
            ended: state.ended,
            fault: state.fault.clone(),
        };
        self.view_tx.send_replace(view);
    }
}

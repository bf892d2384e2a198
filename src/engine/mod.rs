//! Conversation engine: the task that drives the step graph, and the
//! handle the UI talks to.
//!
//! The engine runs as a single task owning all journey state. The UI sends
//! commands through a channel and observes state through a `watch`
//! snapshot; journey completion arrives on a `oneshot`. Delayed effects
//! (typing, pauses, countdowns) are epoch-tagged timer commands; see
//! [`timers`].

mod engine;
mod timers;
pub mod view;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::{EngineError, Error, GraphError, Result};
use crate::i18n::Language;
use crate::sim::RandomSource;
use crate::state::{Product, StateStore};
use crate::step::{response, StepId, StepRegistry, UserResponse};

use engine::ConversationEngine;
use timers::{TimerKind, Timers};

pub use view::{ActiveWidget, EditPrompt, EngineView};

/// Commands processed by the engine task. UI calls and internal timers
/// share one channel so everything serializes through a single owner.
#[derive(Debug)]
pub(crate) enum Command {
    Submit(UserResponse),
    ConfirmEdit {
        step: StepId,
        response: UserResponse,
    },
    RequestEdit {
        step: StepId,
        reply: oneshot::Sender<std::result::Result<EditPrompt, EngineError>>,
    },
    Reset,
    Shutdown,
    Timer {
        epoch: u64,
        kind: TimerKind,
    },
}

/// Sent exactly once when the journey reaches its terminal step and the
/// completion delay elapses.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub product: Option<Product>,
    pub total_premium: Option<Decimal>,
    pub messages: usize,
}

/// Everything needed to spawn a journey.
pub struct EngineDeps {
    pub registry: Arc<StepRegistry>,
    pub entry: StepId,
    pub config: EngineConfig,
    pub random: Arc<dyn RandomSource>,
    pub language: Language,
}

/// A spawned journey: the UI handle, the completion receiver, and the
/// engine task itself.
pub struct JourneySpawn {
    pub handle: JourneyHandle,
    pub completion: oneshot::Receiver<CompletionSummary>,
    pub task: JoinHandle<()>,
}

/// Validate the graph and spawn the engine task.
pub fn spawn(deps: EngineDeps) -> Result<JourneySpawn> {
    deps.registry.validate(&deps.config.demo)?;
    let entry_def = deps
        .registry
        .get(deps.entry)
        .copied()
        .ok_or(GraphError::MissingEntry { id: deps.entry })?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (completion_tx, completion_rx) = oneshot::channel();
    let (view_tx, view_rx) = watch::channel(EngineView::initial(entry_def.module));

    let store = StateStore::new(deps.entry, entry_def.module);
    let engine = ConversationEngine::new(
        deps.registry,
        deps.config,
        deps.random,
        deps.language,
        deps.entry,
        store,
        Timers::new(cmd_tx.clone()),
        view_tx,
        completion_tx,
    );

    let task = tokio::spawn(run(engine, cmd_rx));
    Ok(JourneySpawn {
        handle: JourneyHandle { cmd_tx, view_rx },
        completion: completion_rx,
        task,
    })
}

async fn run(mut engine: ConversationEngine, mut rx: mpsc::Receiver<Command>) {
    engine.begin();
    while let Some(command) = rx.recv().await {
        if matches!(command, Command::Shutdown) {
            break;
        }
        engine.handle(command);
    }
    tracing::debug!("engine task exiting");
}

/// The UI boundary. Cheap to clone. All methods fire-and-validate;
/// state arrives through the watch snapshot, not return values.
#[derive(Clone)]
pub struct JourneyHandle {
    cmd_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<EngineView>,
}

impl JourneyHandle {
    /// Current render snapshot.
    pub fn view(&self) -> EngineView {
        self.view_rx.borrow().clone()
    }

    /// A watch receiver for change-driven rendering.
    pub fn watch(&self) -> watch::Receiver<EngineView> {
        self.view_rx.clone()
    }

    /// Submit the response for the active widget. Refuses invalid input at
    /// the boundary: the widget "disables its submit action" rather than
    /// letting a bad payload reach a response processor.
    pub async fn submit(&self, response: UserResponse) -> Result<()> {
        let view = self.view();
        if let Some(fault) = view.fault {
            return Err(EngineError::Faulted(fault).into());
        }
        if view.ended {
            return Err(EngineError::JourneyEnded.into());
        }
        let widget = view.widget.as_ref().ok_or(EngineError::NoActiveWidget)?;
        if !response::widget_accepts(widget.widget, &response) {
            return Err(EngineError::WidgetMismatch {
                widget: widget.widget.to_string(),
            }
            .into());
        }
        response::validate(&widget.script, &response).map_err(Error::Input)?;

        self.send(Command::Submit(response)).await
    }

    /// Ask to edit a past answer; returns the widget to re-render.
    pub async fn request_edit(&self, step: StepId) -> Result<EditPrompt> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::RequestEdit {
            step,
            reply: reply_tx,
        })
        .await?;
        let prompt = reply_rx
            .await
            .map_err(|_| Error::Engine(EngineError::ChannelClosed))??;
        Ok(prompt)
    }

    /// Rewind to `step` and process a replacement answer. Everything the
    /// user answered after that step is discarded, not hidden.
    pub async fn confirm_edit(&self, step: StepId, response: UserResponse) -> Result<()> {
        self.send(Command::ConfirmEdit { step, response }).await
    }

    /// Restart the journey from its entry step with empty state.
    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    /// Stop the engine task.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| Error::Engine(EngineError::ChannelClosed))
    }
}

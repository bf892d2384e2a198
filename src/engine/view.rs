//! Read-only snapshots the UI renders from.

use serde::Serialize;

use crate::pricing::Quote;
use crate::state::ChatMessage;
use crate::step::{Module, Script, StepId, WidgetType};

/// The widget currently awaiting input, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveWidget {
    pub step: StepId,
    pub widget: WidgetType,
    pub script: Script,
    /// Seconds left on the widget-local countdown, if one is running.
    pub countdown_remaining: Option<u64>,
}

/// Everything the UI needs to render a frame. Published through a `watch`
/// channel after every engine mutation.
#[derive(Debug, Clone, Serialize)]
pub struct EngineView {
    pub messages: Vec<ChatMessage>,
    pub is_typing: bool,
    pub widget: Option<ActiveWidget>,
    pub module: Module,
    pub quote: Option<Quote>,
    pub ended: bool,
    pub fault: Option<String>,
}

impl EngineView {
    pub(crate) fn initial(module: Module) -> Self {
        Self {
            messages: Vec::new(),
            is_typing: false,
            widget: None,
            module,
            quote: None,
            ended: false,
            fault: None,
        }
    }
}

/// What the UI re-renders when the user asks to edit a past answer.
#[derive(Debug, Clone, Serialize)]
pub struct EditPrompt {
    pub step: StepId,
    pub widget: WidgetType,
    pub script: Script,
}

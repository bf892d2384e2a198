//! Error types for the journey engine.

use crate::step::StepId;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Step graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),
}

/// Step-graph configuration errors. These are programming errors in the
/// flow definitions, caught by the startup validation pass rather than
/// surfaced to a running conversation.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate step id '{id}' across flow registries")]
    DuplicateStep { id: StepId },

    #[error("Step '{referenced_by}' routes to unknown step '{id}'")]
    UnknownStep { id: String, referenced_by: StepId },

    #[error("Entry step '{id}' is not registered")]
    MissingEntry { id: StepId },

    #[error("Auto-advancing step '{id}' transitions to itself")]
    AutoAdvanceSelfLoop { id: StepId },
}

/// Runtime engine errors. Most of these indicate a misuse of the UI
/// boundary (submitting without a widget, editing a step that never ran);
/// the engine degrades to a visible fault state rather than panicking.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No widget is awaiting a response")]
    NoActiveWidget,

    #[error("Response shape does not match the active '{widget}' widget")]
    WidgetMismatch { widget: String },

    #[error("Journey has already ended")]
    JourneyEnded,

    #[error("Step '{step}' has no editable answer in history")]
    EditRejected { step: String },

    #[error("Engine is in a fault state: {0}")]
    Faulted(String),

    #[error("Engine task is no longer running")]
    ChannelClosed,
}

/// Conversation-history errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Step '{step}' does not appear in conversation history")]
    StepNotInHistory { step: StepId },
}

/// Widget-boundary input rejections. These never reach a response
/// processor; the widget refuses to submit instead.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input must not be empty")]
    Empty,

    #[error("Expected exactly {expected} digits")]
    BadOtpLength { expected: usize },

    #[error("Input does not look like a valid {what}")]
    Pattern { what: &'static str },

    #[error("Value {value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("'{id}' is not one of the offered options")]
    UnknownOption { id: String },

    #[error("'{id}' is currently disabled")]
    DisabledOption { id: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

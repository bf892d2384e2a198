//! Conversation history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::{Module, StepId};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Bot,
    User,
}

/// One transcript entry. Every message is tagged with the step that
/// produced it; edit/rewind depends on that tag to find the truncation
/// boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub step: StepId,
    pub module: Module,
    /// User answers can be edited; bot messages never.
    pub editable: bool,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn bot(step: StepId, module: Module, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Bot,
            text: text.into(),
            step,
            module,
            editable: false,
            at: Utc::now(),
        }
    }

    pub fn user(step: StepId, module: Module, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            step,
            module,
            editable: true,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_messages_are_not_editable() {
        let msg = ChatMessage::bot("welcome", Module::Onboarding, "Hi!");
        assert_eq!(msg.sender, Sender::Bot);
        assert!(!msg.editable);
    }

    #[test]
    fn user_messages_are_editable() {
        let msg = ChatMessage::user("ask_name", Module::Onboarding, "Asha");
        assert_eq!(msg.sender, Sender::User);
        assert!(msg.editable);
    }
}

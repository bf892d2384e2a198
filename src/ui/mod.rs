//! Frontend abstraction for driving a journey.
//!
//! The engine exposes snapshots and accepts responses; a [`Frontend`]
//! renders the one and collects the other. The CLI implementation is the
//! only one in-tree; the real product would put a visual chat surface
//! behind the same seam.

pub mod cli;

use async_trait::async_trait;

use crate::engine::EngineView;
use crate::step::{StepId, UserResponse};

pub use cli::CliFrontend;

/// What the user did with the active widget.
#[derive(Debug, Clone)]
pub enum FrontendInput {
    /// Answer the active widget.
    Response(UserResponse),
    /// Rewind to a past step and answer it again.
    Edit(StepId),
    /// Start the journey over.
    Reset,
}

/// A rendering surface plus input source for one journey.
#[async_trait]
pub trait Frontend: Send + Sync {
    /// Render whatever changed since the last call.
    async fn render(&self, view: &EngineView);

    /// Collect the user's next action for the active widget. `None` means
    /// the user wants to leave.
    async fn read_input(&self, view: &EngineView) -> Option<FrontendInput>;
}

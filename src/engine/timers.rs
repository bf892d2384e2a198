//! Epoch-keyed delayed commands.
//!
//! Every pacing delay is a spawned sleep that feeds a timer command back
//! into the engine's own channel, tagged with the epoch current at
//! schedule time. The engine bumps the epoch whenever the journey moves on
//! (transition, edit, reset), so a stale timer can never resurrect an
//! abandoned step; it is simply dropped on receipt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::engine::Command;
use crate::step::StepId;

/// Delayed effect kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// The bot has finished "typing" the pending message.
    TypingDone,
    /// Pause after a no-input step's message, before it advances.
    AutoAdvance,
    /// Pause after a user answer, before entering the given step.
    Resume(StepId),
    /// One tick of the widget-local countdown.
    Countdown,
    /// Fire the journey completion callback.
    Complete,
}

/// Scheduler handle owned by the engine.
pub(crate) struct Timers {
    tx: mpsc::Sender<Command>,
    epoch: Arc<AtomicU64>,
}

impl Timers {
    pub fn new(tx: mpsc::Sender<Command>) -> Self {
        Self {
            tx,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate every timer scheduled before this call.
    pub fn bump(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Schedule `kind` to fire after `delay`, tagged with the current
    /// epoch. The send fails only when the engine has shut down, which is
    /// fine to ignore.
    pub fn schedule(&self, delay: Duration, kind: TimerKind) {
        let epoch = self.epoch();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::Timer { epoch, kind }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timers_fire_with_the_scheduling_epoch() {
        let (tx, mut rx) = mpsc::channel(8);
        let timers = Timers::new(tx);

        timers.schedule(Duration::from_millis(100), TimerKind::TypingDone);
        let cmd = rx.recv().await.unwrap();
        match cmd {
            Command::Timer { epoch, kind } => {
                assert_eq!(epoch, 0);
                assert_eq!(kind, TimerKind::TypingDone);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bump_invalidates_earlier_timers() {
        let (tx, mut rx) = mpsc::channel(8);
        let timers = Timers::new(tx);

        timers.schedule(Duration::from_millis(100), TimerKind::AutoAdvance);
        let bumped = timers.bump();
        assert_eq!(bumped, 1);

        // The timer still fires, but with the old epoch, so receivers drop it.
        let Command::Timer { epoch, .. } = rx.recv().await.unwrap() else {
            panic!("expected timer");
        };
        assert_ne!(epoch, timers.epoch());
    }
}

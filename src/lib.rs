//! insurechat — a scripted, chat-driven insurance purchase and servicing
//! journey, simulated end-to-end in process.
//!
//! The core is a declarative step-graph engine: flows register static step
//! definitions (script resolver, response processor, router), and the
//! engine threads the accumulating journey state through them with typing
//! delays, auto-advance, edit/rewind, and epoch-cancelled timers on top.

pub mod config;
pub mod engine;
pub mod error;
pub mod flows;
pub mod i18n;
pub mod persona;
pub mod pricing;
pub mod sim;
pub mod state;
pub mod step;
pub mod ui;

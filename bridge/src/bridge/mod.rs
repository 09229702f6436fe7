//! Process registry and lifecycle orchestration.

mod core;
mod state;

pub use core::{Bridge, ShowOptions, WeakBridge};

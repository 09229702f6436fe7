//! Pyblish Bridge - host-side orchestration for the publishing GUI
//!
//! This crate embeds the Pyblish publishing workflow inside a DCC host
//! application. The interactive UI runs in a separate GUI subprocess;
//! the bridge owns that subprocess's lifecycle, marshals every
//! host-mutating call onto the host's main thread, and keeps the single
//! process-wide registry of server, proxy, wrapper and paths.

pub mod bridge;
pub mod constants;
pub mod control;
pub mod dispatch;
pub mod errors;
pub mod host;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod settings;

mod overlay;

// Lifecycle entry points
pub use bridge::{Bridge, ShowOptions, WeakBridge};
pub use errors::{BridgeError, BridgeResult, ProxyError};

// Main-thread dispatch
pub use dispatch::{DispatchWrapper, ExecutorWrapper, HostCall};

// Host detection and environment seams
pub use host::{Detection, HostKind};

// GUI subprocess and its presentation settings
pub use server::Server;
pub use settings::Settings;

// Pipeline callback contract
pub use pipeline::{CallbackFn, CallbackRegistry, Instance, PipelineEvent, Plugin};

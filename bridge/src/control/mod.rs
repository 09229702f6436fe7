//! Control-channel seam between the bridge and the GUI subprocess.
//!
//! The bridge speaks in [`ControlRequest`] values; how those travel to
//! the subprocess (and in what encoding) is the transport's business and
//! deliberately not defined here.

pub mod proxy;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use crate::errors::ProxyError;
use crate::server::Server;

/// Commands the bridge issues to the GUI subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Bring the window up with a presentation-settings snapshot.
    Show {
        settings: Map<String, Value>,
        modal: bool,
    },
    /// Refresh the GUI's view of the server it belongs to.
    Update { modal: bool },
    /// Run the full publish pass.
    Publish,
    /// Run collection and validation only.
    Validate,
    /// Ask the GUI to quit on its own.
    Kill,
}

/// Answers from the GUI subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlReply {
    Ack,
    /// Command-specific payload, opaque to the bridge.
    Value(Value),
}

/// Bidirectional command channel to one GUI subprocess.
pub trait ControlChannel: Send {
    fn send(&mut self, request: &ControlRequest) -> Result<ControlReply, ProxyError>;
}

/// Connects a [`ControlChannel`] to a freshly spawned GUI subprocess.
pub trait ControlTransport: Send + Sync {
    fn connect(&self, server: &Server) -> Result<Box<dyn ControlChannel>, ProxyError>;
}

//! Client-side handle to one GUI subprocess.

use std::fmt;
use std::sync::Arc;

use crate::control::{ControlChannel, ControlRequest};
use crate::errors::ProxyError;
use crate::server::Server;
use crate::settings::Settings;

/// Issues commands to the GUI on behalf of the bridge.
///
/// Shares the server's identity, owns the channel. Lives exactly as long
/// as the registry entry it is stored in.
pub struct Proxy {
    channel: Box<dyn ControlChannel>,
    server: Arc<Server>,
}

impl Proxy {
    pub(crate) fn new(channel: Box<dyn ControlChannel>, server: Arc<Server>) -> Self {
        Self { channel, server }
    }

    /// Points the GUI at `server`'s current state; modality may have
    /// changed since the last command.
    pub(crate) fn update(&mut self, server: &Arc<Server>) -> Result<(), ProxyError> {
        self.server = Arc::clone(server);
        self.channel.send(&ControlRequest::Update {
            modal: server.is_modal(),
        })?;
        Ok(())
    }

    pub(crate) fn show(&mut self, settings: &Settings) -> Result<(), ProxyError> {
        self.channel.send(&ControlRequest::Show {
            settings: settings.to_map(),
            modal: self.server.is_modal(),
        })?;
        Ok(())
    }

    pub(crate) fn publish(&mut self) -> Result<(), ProxyError> {
        self.channel.send(&ControlRequest::Publish)?;
        Ok(())
    }

    pub(crate) fn validate(&mut self) -> Result<(), ProxyError> {
        self.channel.send(&ControlRequest::Validate)?;
        Ok(())
    }

    /// Polite quit request. The hard kill on [`Server`] is the fallback
    /// when the channel itself is gone.
    pub(crate) fn kill(&mut self) -> Result<(), ProxyError> {
        self.channel.send(&ControlRequest::Kill)?;
        Ok(())
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("server_id", &self.server.id())
            .finish()
    }
}

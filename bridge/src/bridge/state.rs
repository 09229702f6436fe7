//! Registry state behind the bridge handle.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::control::proxy::Proxy;
use crate::dispatch::DispatchWrapper;
use crate::host::HostKind;
use crate::host::env::WindowHandle;
use crate::pipeline::CallbackFn;
use crate::server::Server;

/// A live GUI subprocess and the proxy commanding it.
///
/// The two always travel together. Storing them as one value is what
/// keeps the registry from ever holding a server without its proxy.
pub(crate) struct LiveSession {
    pub(crate) server: Arc<Server>,
    pub(crate) proxy: Mutex<Proxy>,
}

/// Everything the bridge tracks for one process.
///
/// All fields start absent. Install/uninstall and the show, publish and
/// validate entry points are the only writers.
#[derive(Default)]
pub(crate) struct BridgeState {
    pub(crate) installed: bool,
    pub(crate) host: Option<HostKind>,
    pub(crate) session: Option<Arc<LiveSession>>,
    pub(crate) wrapper: Option<Arc<dyn DispatchWrapper>>,
    pub(crate) python_executable: Option<PathBuf>,
    pub(crate) gui_runtime: Option<PathBuf>,
    pub(crate) host_window: Option<WindowHandle>,
    /// Handlers installed on the pipeline registry, kept for
    /// identity-matched deregistration.
    pub(crate) hooks: Vec<(&'static str, CallbackFn)>,
}

//! The process-wide bridge between the pipeline and the GUI subprocess.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::bridge::state::{BridgeState, LiveSession};
use crate::constants::{callbacks, envs};
use crate::control::ControlTransport;
use crate::control::proxy::Proxy;
use crate::dispatch::{self, DispatchWrapper, HostCall};
use crate::errors::{BridgeError, BridgeResult, ProxyError};
use crate::host::adapters;
use crate::host::env::{HostEnvironment, WindowHandle};
use crate::host::HostKind;
use crate::logging;
use crate::overlay::Overlay;
use crate::pipeline::{self, CallbackFn, CallbackRegistry};
use crate::server::spawn::SpawnSpec;
use crate::server::Server;
use crate::settings::Settings;

// ============================================================================
// GLOBAL DEFAULT BRIDGE
// ============================================================================

/// Process-wide bridge instance for embedders that want module-level
/// entry points rather than passing a handle around.
static DEFAULT_BRIDGE: OnceLock<Bridge> = OnceLock::new();

// ============================================================================
// PUBLIC API
// ============================================================================

/// Orchestrates one GUI subprocess on behalf of the host application.
///
/// Holds the process registry: at most one live subprocess session, the
/// installed dispatch wrapper, registered paths and the captured host
/// window. Cheaply cloneable; all clones share the same state.
///
/// The host integration constructs one `Bridge` with its environment,
/// the pipeline's callback registry and a control transport, then calls
/// [`install`](Bridge::install) followed by [`show`](Bridge::show).
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

/// Non-owning bridge reference for host-lifetime hooks.
///
/// The quit hook holds one of these so the hook itself never keeps the
/// bridge alive.
#[derive(Clone)]
pub struct WeakBridge {
    inner: Weak<BridgeInner>,
}

impl WeakBridge {
    pub fn upgrade(&self) -> Option<Bridge> {
        self.inner.upgrade().map(|inner| Bridge { inner })
    }
}

struct BridgeInner {
    env: Arc<dyn HostEnvironment>,
    callbacks: Arc<dyn CallbackRegistry>,
    transport: Arc<dyn ControlTransport>,
    settings: RwLock<Settings>,
    state: RwLock<BridgeState>,
}

/// Arguments to [`Bridge::show`].
#[derive(Debug, Default)]
pub struct ShowOptions {
    /// Window to treat as the host main window for this and later
    /// sessions, overriding whatever the adapter captured.
    pub parent: Option<WindowHandle>,
    /// Publish targets the GUI session is restricted to. A fresh empty
    /// sequence per call; never shared between calls.
    pub targets: Vec<String>,
    /// Modality override. `None` falls back to `PYBLISH_QML_MODAL`.
    pub modal: Option<bool>,
}

impl Bridge {
    pub fn new(
        env: Arc<dyn HostEnvironment>,
        callbacks: Arc<dyn CallbackRegistry>,
        transport: Arc<dyn ControlTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                env,
                callbacks,
                transport,
                settings: RwLock::new(Settings::default()),
                state: RwLock::new(BridgeState::default()),
            }),
        }
    }

    /// Installs `bridge` as the process-wide default.
    ///
    /// Call once, early in host startup. Fails if a default was already
    /// installed.
    pub fn init_default(bridge: Bridge) -> BridgeResult<()> {
        DEFAULT_BRIDGE.set(bridge).map_err(|_| {
            BridgeError::InvalidState("default bridge already initialized".into())
        })
    }

    /// The process-wide default bridge, when one was installed.
    pub fn try_default() -> Option<&'static Bridge> {
        DEFAULT_BRIDGE.get()
    }

    /// First-time install: registers the pipeline toggle handlers and
    /// walks the host adapter chain.
    ///
    /// Calling it again first uninstalls, so repeated installs leave
    /// exactly one active registration set. Returns the detected host,
    /// or `None` when no supported host embeds this process.
    pub fn install(&self) -> BridgeResult<Option<HostKind>> {
        logging::init();

        if self.installed() {
            tracing::info!("already installed, uninstalling first");
            self.uninstall();
        }

        self.install_callbacks();
        let host = match adapters::install_host(self) {
            Ok(host) => host,
            Err(e) => {
                self.uninstall_callbacks();
                return Err(e);
            }
        };

        {
            let mut state = self.inner.state.write();
            state.installed = true;
            state.host = host;
        }

        match host {
            Some(kind) => tracing::info!(host = %kind, "bridge installed"),
            None => tracing::info!("bridge installed without a host adapter"),
        }
        Ok(host)
    }

    /// Removes the callback handlers and the dispatch wrapper.
    ///
    /// Registered paths, the captured host window and any live session
    /// stay in place until explicitly replaced or killed.
    pub fn uninstall(&self) {
        self.uninstall_callbacks();

        {
            let mut state = self.inner.state.write();
            state.wrapper = None;
            state.installed = false;
            state.host = None;
        }

        tracing::info!("bridge uninstalled");
    }

    pub fn installed(&self) -> bool {
        self.inner.state.read().installed
    }

    /// The host whose adapter is currently installed.
    pub fn installed_host(&self) -> Option<HostKind> {
        self.inner.state.read().host
    }

    /// Registers `wrapper` as the route for host-affine calls.
    ///
    /// The wrapper is probed before it is stored; a wrapper that breaks
    /// the dispatch contract fails here and nothing is installed.
    pub fn register_dispatch_wrapper(&self, wrapper: Arc<dyn DispatchWrapper>) -> BridgeResult<()> {
        dispatch::validate_wrapper(wrapper.as_ref())?;
        self.inner.state.write().wrapper = Some(wrapper);
        Ok(())
    }

    /// Removes the active wrapper. Fails when none is registered, so a
    /// double deregistration is caught rather than ignored.
    pub fn deregister_dispatch_wrapper(&self) -> BridgeResult<()> {
        match self.inner.state.write().wrapper.take() {
            Some(_) => Ok(()),
            None => Err(BridgeError::InvalidState(
                "no dispatch wrapper registered".into(),
            )),
        }
    }

    pub fn dispatch_wrapper(&self) -> Option<Arc<dyn DispatchWrapper>> {
        self.inner.state.read().wrapper.clone()
    }

    /// Runs `call` through the registered wrapper, directly when none is
    /// registered.
    ///
    /// A failing call kills the GUI subprocess before the error reaches
    /// the caller: a broken host-thread call must not leave an orphaned
    /// GUI believing the scene is still consistent. The wrapper itself
    /// stays registered.
    pub fn dispatch(&self, call: HostCall) -> BridgeResult<Value> {
        let op = call.op().to_string();
        let wrapper = self.inner.state.read().wrapper.clone();

        let outcome = match wrapper {
            Some(wrapper) => wrapper.dispatch(call),
            None => call.invoke(),
        };

        outcome.map_err(|e| {
            self.kill_current_server();
            tracing::error!(op = %op, error = %e, "host call failed, GUI subprocess killed");
            BridgeError::HostCall(format!("{op}: {e}"))
        })
    }

    /// Terminates the live GUI subprocess, if any.
    ///
    /// A polite quit command goes out first; the hard process kill that
    /// follows is a no-op when the GUI already obeyed or already died.
    /// Never fails: "nothing to kill" and "already dead" are both fine.
    pub fn kill_current_server(&self) {
        let session = self.inner.state.read().session.clone();
        let Some(session) = session else {
            return;
        };

        if let Err(e) = session.proxy.lock().kill() {
            tracing::debug!(error = %e, "quit command not delivered");
        }
        session.server.kill();
    }

    /// Registers the Python interpreter used to boot the GUI subprocess.
    /// Must point at an existing file.
    pub fn register_python_executable(&self, path: impl Into<PathBuf>) -> BridgeResult<()> {
        let path = path.into();
        if !path.is_file() {
            return Err(BridgeError::Config(format!(
                "python executable does not exist: {}",
                path.display()
            )));
        }
        self.inner.state.write().python_executable = Some(path);
        Ok(())
    }

    pub fn registered_python_executable(&self) -> Option<PathBuf> {
        self.inner.state.read().python_executable.clone()
    }

    /// Registers the directory holding the GUI runtime package, exposed
    /// to the subprocess through `PYTHONPATH`.
    pub fn register_gui_runtime(&self, path: impl Into<PathBuf>) {
        self.inner.state.write().gui_runtime = Some(path.into());
    }

    pub fn registered_gui_runtime(&self) -> Option<PathBuf> {
        self.inner.state.read().gui_runtime.clone()
    }

    /// The live GUI server, when one is registered.
    pub fn current_server(&self) -> Option<Arc<Server>> {
        self.inner
            .state
            .read()
            .session
            .as_ref()
            .map(|session| Arc::clone(&session.server))
    }

    pub fn host_window(&self) -> Option<WindowHandle> {
        self.inner.state.read().host_window.clone()
    }

    /// Snapshot of the presentation settings.
    pub fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    /// Edits the presentation settings in place.
    pub fn update_settings(&self, edit: impl FnOnce(&mut Settings)) {
        edit(&mut self.inner.settings.write());
    }

    /// Brings the GUI up, starting the subprocess when none is running.
    ///
    /// With a live subprocess this updates its modality and asks it to
    /// re-display itself, returning immediately. Otherwise a fresh
    /// subprocess is spawned and this call does not return until that
    /// session ends. A subprocess that failed to construct is logged and
    /// reported as `Ok(None)`, never as an error.
    pub fn show(&self, options: ShowOptions) -> BridgeResult<Option<Arc<Server>>> {
        let modal = options
            .modal
            .unwrap_or_else(|| env_flag(envs::PYBLISH_QML_MODAL));

        if !self.installed() {
            self.install()?;
        }

        if let Some(parent) = options.parent {
            self.inner.state.write().host_window = Some(parent);
        }

        let existing = self.inner.state.read().session.clone();
        match existing {
            Some(session) => self.reshow(&session, modal),
            None => self.start_session(options.targets, modal),
        }
    }

    /// Runs a full publish pass in the GUI. A no-op without a live
    /// subprocess.
    pub fn publish(&self) -> BridgeResult<()> {
        self.session_command("publish", Proxy::publish)
    }

    /// Runs collection and validation in the GUI. A no-op without a live
    /// subprocess.
    pub fn validate(&self) -> BridgeResult<()> {
        self.session_command("validate", Proxy::validate)
    }
}

// ============================================================================
// SESSION INTERNALS
// ============================================================================

impl Bridge {
    pub(crate) fn env(&self) -> &dyn HostEnvironment {
        self.inner.env.as_ref()
    }

    pub(crate) fn weak(&self) -> WeakBridge {
        WeakBridge {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn set_host_window(&self, window: WindowHandle) {
        self.inner.state.write().host_window = Some(window);
    }

    fn install_callbacks(&self) {
        let toggle_instance: CallbackFn = Arc::new(pipeline::toggle_instance);
        let toggle_plugin: CallbackFn = Arc::new(pipeline::toggle_plugin);

        let registry = &self.inner.callbacks;
        registry.register_callback(callbacks::INSTANCE_TOGGLED, Arc::clone(&toggle_instance));
        registry.register_callback(callbacks::PLUGIN_TOGGLED, Arc::clone(&toggle_plugin));

        let mut state = self.inner.state.write();
        state.hooks.push((callbacks::INSTANCE_TOGGLED, toggle_instance));
        state.hooks.push((callbacks::PLUGIN_TOGGLED, toggle_plugin));
    }

    fn uninstall_callbacks(&self) {
        let hooks: Vec<_> = self.inner.state.write().hooks.drain(..).collect();
        for (name, handler) in hooks {
            if !self.inner.callbacks.deregister_callback(name, &handler) {
                tracing::debug!(callback = name, "handler was already deregistered");
            }
        }
    }

    /// Reuse path: a server is registered, so update its modality and
    /// ask the GUI to re-display itself with current settings.
    fn reshow(
        &self,
        session: &Arc<LiveSession>,
        modal: bool,
    ) -> BridgeResult<Option<Arc<Server>>> {
        session.server.set_modal(modal);
        let settings = self.settings();

        let outcome = {
            let mut proxy = session.proxy.lock();
            proxy
                .update(&session.server)
                .and_then(|()| proxy.show(&settings))
        };

        match outcome {
            Ok(()) => Ok(Some(Arc::clone(&session.server))),
            Err(e) if e.is_stale() => {
                tracing::warn!(error = %e, "GUI subprocess is gone, forgetting it");
                self.forget_session(session);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fresh path: spawn the subprocess, connect its proxy, register the
    /// pair, then block until the session ends.
    fn start_session(
        &self,
        targets: Vec<String>,
        modal: bool,
    ) -> BridgeResult<Option<Arc<Server>>> {
        let headless = self.inner.env.active_window().is_none();
        let on_shown = self.arm_shown_hook(headless);

        let session = match self.construct_session(targets, modal) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "GUI failed to start");
                on_shown();
                return Ok(None);
            }
        };

        let server = Arc::clone(&session.server);
        self.inner.state.write().session = Some(session);
        tracing::info!(
            server_id = %server.id(),
            "GUI server available through Bridge::current_server()"
        );

        let _ = server.listen()?;
        Ok(Some(server))
    }

    /// Builds the server/proxy pair, or tears the half-built parts down.
    fn construct_session(
        &self,
        targets: Vec<String>,
        modal: bool,
    ) -> BridgeResult<Arc<LiveSession>> {
        let (python_executable, gui_runtime) = {
            let state = self.inner.state.read();
            (state.python_executable.clone(), state.gui_runtime.clone())
        };
        let python_executable = python_executable
            .ok_or_else(|| BridgeError::Config("no python executable registered".into()))?;

        let server = Arc::new(Server::start(SpawnSpec {
            python_executable,
            gui_runtime,
            targets,
            modal,
        })?);

        let channel = match self.inner.transport.connect(&server) {
            Ok(channel) => channel,
            Err(e) => {
                server.kill();
                return Err(e.into());
            }
        };
        let mut proxy = Proxy::new(channel, Arc::clone(&server));

        // First display doubles as the handshake. A subprocess that
        // cannot even show is not worth registering.
        let settings = self.settings();
        if let Err(e) = proxy.show(&settings) {
            server.kill();
            return Err(e.into());
        }

        Ok(Arc::new(LiveSession {
            server,
            proxy: Mutex::new(proxy),
        }))
    }

    /// Drops the registry entry for `session`, unless a newer session
    /// already replaced it.
    fn forget_session(&self, session: &Arc<LiveSession>) {
        let mut state = self.inner.state.write();
        if let Some(current) = &state.session
            && Arc::ptr_eq(current, session)
        {
            state.session = None;
        }
    }

    /// Prepares the one-shot completion hook for a GUI start attempt.
    ///
    /// Interactive sessions get an overlay plus a `pyblishQmlShown`
    /// handler that closes it and deregisters itself. The returned
    /// closure performs the same teardown for attempts that die before
    /// the GUI ever reports in. Headless sessions get a no-op and no
    /// overlay.
    fn arm_shown_hook(&self, headless: bool) -> impl FnOnce() {
        let overlay = if headless {
            tracing::debug!("headless session, skipping overlay");
            None
        } else {
            Overlay::open(self.inner.env.as_ref())
        };

        let handler = overlay.clone().map(|overlay| {
            let registry = Arc::clone(&self.inner.callbacks);
            let slot: Arc<OnceLock<CallbackFn>> = Arc::new(OnceLock::new());
            let handler: CallbackFn = {
                let slot = Arc::clone(&slot);
                Arc::new(move |_event: &pipeline::PipelineEvent| {
                    overlay.close();
                    if let Some(own) = slot.get() {
                        registry.deregister_callback(callbacks::GUI_SHOWN, own);
                    }
                })
            };
            let _ = slot.set(Arc::clone(&handler));
            self.inner
                .callbacks
                .register_callback(callbacks::GUI_SHOWN, Arc::clone(&handler));
            handler
        });

        let registry = Arc::clone(&self.inner.callbacks);
        move || {
            if let Some(overlay) = overlay {
                overlay.close();
            }
            if let Some(handler) = handler {
                registry.deregister_callback(callbacks::GUI_SHOWN, &handler);
            }
        }
    }

    /// Shared delivery for publish and validate.
    fn session_command(
        &self,
        op: &'static str,
        send: impl FnOnce(&mut Proxy) -> Result<(), ProxyError>,
    ) -> BridgeResult<()> {
        let session = self.inner.state.read().session.clone();
        let Some(session) = session else {
            tracing::debug!(op, "no GUI subprocess, nothing to do");
            return Ok(());
        };

        let outcome = {
            let mut proxy = session.proxy.lock();
            proxy
                .update(&session.server)
                .and_then(|()| send(&mut proxy))
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_stale() => {
                tracing::warn!(op, error = %e, "GUI subprocess is gone, forgetting it");
                self.forget_session(&session);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Bridge")
            .field("installed", &state.installed)
            .field("host", &state.host)
            .field("live_session", &state.session.is_some())
            .finish()
    }
}

/// Boolean-ish environment flag. Unset, empty and the usual spellings
/// of "off" read as `false`; anything else as `true`.
pub(crate) fn env_flag(name: &str) -> bool {
    flag_enabled(std::env::var(name).ok().as_deref())
}

fn flag_enabled(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let value = value.trim();
    !value.is_empty()
        && !["0", "false", "no", "off"]
            .iter()
            .any(|off| value.eq_ignore_ascii_case(off))
}

// ============================================================================
// THREAD SAFETY ASSERTIONS
// ============================================================================

// The bridge is handed to quit hooks and host schedulers, so it must be
// usable from any thread.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Bridge>;
    let _ = assert_send_sync::<WeakBridge>;
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_and_off_spellings_read_false() {
        for value in [None, Some(""), Some("  "), Some("0"), Some("false"), Some("No"), Some("OFF")] {
            assert!(!flag_enabled(value), "{value:?} should read false");
        }
    }

    #[test]
    fn set_values_read_true() {
        for value in [Some("1"), Some("true"), Some("yes"), Some("anything")] {
            assert!(flag_enabled(value), "{value:?} should read true");
        }
    }

    #[test]
    fn show_options_default_to_env_driven_modality() {
        let options = ShowOptions::default();
        assert!(options.parent.is_none());
        assert!(options.targets.is_empty());
        assert_eq!(options.modal, None);
    }
}

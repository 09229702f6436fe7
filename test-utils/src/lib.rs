//! Test doubles for the pyblish-bridge crate.
//!
//! A scriptable [`MockHost`] standing in for the embedding application,
//! an in-memory pipeline callback registry, and a recording control
//! transport. Everything here is observation-friendly: what the bridge
//! did to the host can be asserted after the fact.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;

use pyblish_bridge::control::{ControlChannel, ControlReply, ControlRequest, ControlTransport};
use pyblish_bridge::host::env::{
    HostEnvironment, HostWindow, MainThreadExecutor, SplashScreen, TimerHandle, WindowHandle,
};
use pyblish_bridge::{CallbackFn, CallbackRegistry, HostCall, PipelineEvent, ProxyError, Server};

// ============================================================================
// MOCK HOST
// ============================================================================

/// A pretend DCC application.
///
/// Starts out headless with no importable modules and a faithful
/// recording main-thread executor. Tests shape it with the builder-ish
/// setters, then probe what the bridge did through the inspection
/// methods.
pub struct MockHost {
    modules: RwLock<HashSet<String>>,
    args: RwLock<Vec<String>>,
    executor: Mutex<Option<Arc<RecordingExecutor>>>,
    active: Mutex<Option<WindowHandle>>,
    top_level: Mutex<Vec<WindowHandle>>,
    quit_hooks: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    tickers: Mutex<Vec<Arc<TickerSlot>>>,
    splash: Arc<SplashState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashSet::new()),
            args: RwLock::new(Vec::new()),
            executor: Mutex::new(Some(Arc::new(RecordingExecutor::default()))),
            active: Mutex::new(None),
            top_level: Mutex::new(Vec::new()),
            quit_hooks: Mutex::new(Vec::new()),
            tickers: Mutex::new(Vec::new()),
            splash: Arc::new(SplashState::default()),
        }
    }

    /// Makes `name` importable, so the matching host detector fires.
    pub fn add_module(&self, name: &str) {
        self.modules.write().insert(name.to_string());
    }

    pub fn set_args(&self, args: &[&str]) {
        *self.args.write() = args.iter().map(|a| a.to_string()).collect();
    }

    /// Creates a window. Windows without a parent count as top-level.
    pub fn add_window(&self, name: &str, parent: Option<&WindowHandle>) -> WindowHandle {
        let window = WindowHandle::new(Arc::new(MockWindow {
            name: name.to_string(),
            parent: parent.cloned(),
        }));
        if parent.is_none() {
            self.top_level.lock().push(window.clone());
        }
        window
    }

    pub fn set_active_window(&self, window: &WindowHandle) {
        *self.active.lock() = Some(window.clone());
    }

    /// Drops the main-thread executor, as a host without one would.
    pub fn remove_executor(&self) {
        *self.executor.lock() = None;
    }

    /// Operations the recording executor ran, in order.
    pub fn executor_calls(&self) -> Vec<String> {
        match self.executor.lock().as_ref() {
            Some(executor) => executor.calls.lock().clone(),
            None => Vec::new(),
        }
    }

    /// Runs every quit hook, the way the host would on shutdown.
    pub fn fire_quit_hooks(&self) {
        for hook in self.quit_hooks.lock().iter() {
            hook();
        }
    }

    pub fn quit_hook_count(&self) -> usize {
        self.quit_hooks.lock().len()
    }

    /// Fires every still-active timer once.
    pub fn tick(&self) {
        let slots: Vec<_> = self.tickers.lock().clone();
        for slot in slots {
            if slot.active.load(Ordering::SeqCst) {
                let mut tick = slot.tick.lock();
                (*tick)();
            }
        }
    }

    pub fn active_ticker_count(&self) -> usize {
        self.tickers
            .lock()
            .iter()
            .filter(|slot| slot.active.load(Ordering::SeqCst))
            .count()
    }

    pub fn ticker_intervals(&self) -> Vec<Duration> {
        self.tickers.lock().iter().map(|slot| slot.interval).collect()
    }

    pub fn splashes_created(&self) -> usize {
        self.splash.created.load(Ordering::SeqCst)
    }

    pub fn splash_labels(&self) -> Vec<String> {
        self.splash.labels.lock().clone()
    }

    pub fn splash_close_count(&self) -> usize {
        self.splash.closes.load(Ordering::SeqCst)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment for MockHost {
    fn has_module(&self, name: &str) -> bool {
        self.modules.read().contains(name)
    }

    fn launch_args(&self) -> Vec<String> {
        self.args.read().clone()
    }

    fn main_thread_executor(&self) -> Option<Arc<dyn MainThreadExecutor>> {
        self.executor
            .lock()
            .clone()
            .map(|executor| executor as Arc<dyn MainThreadExecutor>)
    }

    fn active_window(&self) -> Option<WindowHandle> {
        self.active.lock().clone()
    }

    fn top_level_windows(&self) -> Vec<WindowHandle> {
        self.top_level.lock().clone()
    }

    fn on_about_to_quit(&self, hook: Box<dyn Fn() + Send + Sync>) {
        self.quit_hooks.lock().push(hook);
    }

    fn spawn_ticker(
        &self,
        interval: Duration,
        tick: Box<dyn FnMut() + Send>,
    ) -> Box<dyn TimerHandle> {
        let slot = Arc::new(TickerSlot {
            interval,
            active: AtomicBool::new(true),
            tick: Mutex::new(tick),
        });
        self.tickers.lock().push(Arc::clone(&slot));
        Box::new(MockTimer { slot })
    }

    fn create_splash(&self) -> Option<Box<dyn SplashScreen>> {
        self.splash.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MockSplash {
            state: Arc::clone(&self.splash),
        }))
    }
}

struct MockWindow {
    name: String,
    parent: Option<WindowHandle>,
}

impl HostWindow for MockWindow {
    fn object_name(&self) -> String {
        self.name.clone()
    }

    fn parent(&self) -> Option<WindowHandle> {
        self.parent.clone()
    }
}

/// Faithful executor: runs the call in place and records its op name.
#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
}

impl MainThreadExecutor for RecordingExecutor {
    fn execute(&self, call: HostCall) -> pyblish_bridge::BridgeResult<serde_json::Value> {
        self.calls.lock().push(call.op().to_string());
        call.invoke()
    }
}

struct TickerSlot {
    interval: Duration,
    active: AtomicBool,
    tick: Mutex<Box<dyn FnMut() + Send>>,
}

struct MockTimer {
    slot: Arc<TickerSlot>,
}

impl TimerHandle for MockTimer {
    fn cancel(&self) {
        self.slot.active.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct SplashState {
    created: AtomicUsize,
    labels: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

struct MockSplash {
    state: Arc<SplashState>,
}

impl SplashScreen for MockSplash {
    fn set_label(&self, text: &str) {
        self.state.labels.lock().push(text.to_string());
    }

    fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// IN-MEMORY CALLBACK REGISTRY
// ============================================================================

/// Pipeline callback registry backed by a map.
///
/// Matches handlers by allocation identity, and snapshots the handler
/// list before delivery so a handler may deregister itself mid-emit.
#[derive(Default)]
pub struct MemoryCallbacks {
    handlers: RwLock<HashMap<String, Vec<CallbackFn>>>,
}

impl MemoryCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }
}

impl CallbackRegistry for MemoryCallbacks {
    fn register_callback(&self, name: &str, handler: CallbackFn) {
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    fn deregister_callback(&self, name: &str, handler: &CallbackFn) -> bool {
        let mut map = self.handlers.write();
        let Some(list) = map.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|known| !std::ptr::addr_eq(Arc::as_ptr(known), Arc::as_ptr(handler)));
        before != list.len()
    }

    fn emit(&self, event: &PipelineEvent) {
        let snapshot = self
            .handlers
            .read()
            .get(event.name())
            .cloned()
            .unwrap_or_default();
        for handler in snapshot {
            handler(event);
        }
    }
}

// ============================================================================
// RECORDING CONTROL TRANSPORT
// ============================================================================

/// Control transport that delivers into a log instead of a subprocess.
///
/// Failure scripting covers the interesting cases: refuse the next
/// connect, go stale (every send fails like a vanished subprocess), or
/// reject the next command the way a live GUI would refuse bad input.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<TransportState>,
}

#[derive(Default)]
struct TransportState {
    requests: Mutex<Vec<ControlRequest>>,
    connects: AtomicUsize,
    fail_connects: AtomicUsize,
    stale: AtomicBool,
    reject_next: Mutex<Option<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request a channel delivered, oldest first.
    pub fn requests(&self) -> Vec<ControlRequest> {
        self.state.requests.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Makes the next `connect` fail, as when the GUI dies mid-boot.
    pub fn fail_next_connect(&self) {
        self.state.fail_connects.fetch_add(1, Ordering::SeqCst);
    }

    /// While stale, every send fails the way a closed pipe would.
    pub fn set_stale(&self, stale: bool) {
        self.state.stale.store(stale, Ordering::SeqCst);
    }

    /// Makes the next send fail with a GUI-side rejection.
    pub fn reject_next(&self, reason: &str) {
        *self.state.reject_next.lock() = Some(reason.to_string());
    }
}

impl ControlTransport for MemoryTransport {
    fn connect(&self, _server: &Server) -> Result<Box<dyn ControlChannel>, ProxyError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connects.load(Ordering::SeqCst) > 0 {
            self.state.fail_connects.fetch_sub(1, Ordering::SeqCst);
            return Err(ProxyError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted connect failure",
            )));
        }
        Ok(Box::new(MemoryChannel {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryChannel {
    state: Arc<TransportState>,
}

impl ControlChannel for MemoryChannel {
    fn send(&mut self, request: &ControlRequest) -> Result<ControlReply, ProxyError> {
        if let Some(reason) = self.state.reject_next.lock().take() {
            return Err(ProxyError::Rejected(reason));
        }
        if self.state.stale.load(Ordering::SeqCst) {
            return Err(ProxyError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "GUI subprocess is gone",
            )));
        }
        self.state.requests.lock().push(request.clone());
        Ok(ControlReply::Ack)
    }
}

// ============================================================================
// FILESYSTEM HELPERS
// ============================================================================

/// An existing file on disk, for registrations that demand one.
pub fn scratch_file() -> NamedTempFile {
    NamedTempFile::new().expect("failed to create temp file")
}

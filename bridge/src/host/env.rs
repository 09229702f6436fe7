//! Contracts the embedding host application provides.
//!
//! Exactly one [`HostEnvironment`] exists per process. Everything the
//! bridge needs from the surrounding application passes through these
//! traits; host API bindings implement them on their side.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::dispatch::HostCall;
use crate::errors::BridgeResult;

/// Executes a call synchronously on the host's main thread.
///
/// Blocks the caller until the call ran (or failed) on the main thread.
pub trait MainThreadExecutor: Send + Sync {
    fn execute(&self, call: HostCall) -> BridgeResult<Value>;
}

/// A top-level window of the host application.
pub trait HostWindow: Send + Sync {
    /// Widget object name; empty when unnamed.
    fn object_name(&self) -> String;

    fn parent(&self) -> Option<WindowHandle>;
}

/// Cloneable handle to a host window.
#[derive(Clone)]
pub struct WindowHandle(Arc<dyn HostWindow>);

impl WindowHandle {
    pub fn new(window: Arc<dyn HostWindow>) -> Self {
        Self(window)
    }

    pub fn object_name(&self) -> String {
        self.0.object_name()
    }

    pub fn parent(&self) -> Option<WindowHandle> {
        self.0.parent()
    }

    /// Whether both handles refer to the same window object.
    pub fn same_window(&self, other: &WindowHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WindowHandle")
            .field(&self.object_name())
            .finish()
    }
}

/// Cancellation handle for a repeating timer.
pub trait TimerHandle: Send {
    fn cancel(&self);
}

/// Splash surface drawn by the host toolkit while the GUI boots.
///
/// Implementations must tolerate `close` on a surface the toolkit has
/// already torn down.
pub trait SplashScreen: Send + Sync {
    fn set_label(&self, text: &str);
    fn close(&self);
}

/// The embedding host application.
pub trait HostEnvironment: Send + Sync {
    /// Whether the named Python module is importable in-process. This is
    /// the primary host detection signal.
    fn has_module(&self, name: &str) -> bool;

    /// Arguments the host process was launched with, used to tell sibling
    /// launch modes of one executable apart.
    fn launch_args(&self) -> Vec<String>;

    /// The host's scheduler for main-thread work, when it has one.
    fn main_thread_executor(&self) -> Option<Arc<dyn MainThreadExecutor>>;

    /// The active top-level window. `None` means the session is headless.
    fn active_window(&self) -> Option<WindowHandle>;

    /// All top-level windows, for lookups by object name.
    fn top_level_windows(&self) -> Vec<WindowHandle>;

    /// Runs `hook` when the host application begins shutting down.
    fn on_about_to_quit(&self, hook: Box<dyn Fn() + Send + Sync>);

    /// Starts a repeating timer on the host's event loop.
    fn spawn_ticker(
        &self,
        interval: Duration,
        tick: Box<dyn FnMut() + Send>,
    ) -> Box<dyn TimerHandle>;

    /// Creates a splash surface, when the toolkit can draw one.
    fn create_splash(&self) -> Option<Box<dyn SplashScreen>>;
}

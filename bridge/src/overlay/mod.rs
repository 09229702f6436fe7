//! Startup overlay shown while the GUI subprocess boots.
//!
//! A thin animation driver over the host-drawn splash surface: one label,
//! four frames, closed exactly once when the GUI reports itself visible
//! or the start attempt dies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::constants::timing;
use crate::host::env::{HostEnvironment, SplashScreen, TimerHandle};

/// Animated splash kept up until the GUI reports itself visible.
///
/// Cheap to clone; clones share the close flag, so any holder may
/// dismiss it and repeats are no-ops.
#[derive(Clone)]
pub struct Overlay {
    inner: Arc<OverlayInner>,
}

struct OverlayInner {
    splash: Box<dyn SplashScreen>,
    ticks: AtomicUsize,
    closed: AtomicBool,
    ticker: Mutex<Option<Box<dyn TimerHandle>>>,
}

impl Overlay {
    /// Creates and starts the overlay, when the host can draw one.
    pub(crate) fn open(env: &dyn HostEnvironment) -> Option<Overlay> {
        let splash = env.create_splash()?;
        let inner = Arc::new(OverlayInner {
            splash,
            ticks: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            ticker: Mutex::new(None),
        });

        // First frame right away; the ticker takes over from there.
        inner.animate();
        let tick_target = Arc::clone(&inner);
        let handle = env.spawn_ticker(
            timing::SPLASH_TICK,
            Box::new(move || tick_target.animate()),
        );
        *inner.ticker.lock() = Some(handle);

        Some(Overlay { inner })
    }

    /// Dismisses the overlay. Safe to call any number of times, from the
    /// shown hook and from failure paths alike.
    pub(crate) fn close(&self) {
        self.inner.close();
    }

    #[cfg(test)]
    fn for_test(splash: Box<dyn SplashScreen>) -> Overlay {
        Overlay {
            inner: Arc::new(OverlayInner {
                splash,
                ticks: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                ticker: Mutex::new(None),
            }),
        }
    }

    #[cfg(test)]
    fn animate(&self) {
        self.inner.animate();
    }
}

impl OverlayInner {
    /// One animation frame: `loading` plus zero to three dots.
    fn animate(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let count = self.ticks.fetch_add(1, Ordering::SeqCst);
        let label = format!("loading{}", ".".repeat(count % 4));
        self.splash.set_label(&label);
    }

    fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.cancel();
        }
        self.splash.close();
    }
}

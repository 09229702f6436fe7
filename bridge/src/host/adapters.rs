//! Per-host install side effects.

use std::sync::Arc;

use crate::bridge::Bridge;
use crate::dispatch::ExecutorWrapper;
use crate::errors::{BridgeError, BridgeResult};
use crate::host::env::{HostEnvironment, WindowHandle};
use crate::host::{Detection, HostKind, detect};

/// Object name Maya gives its main window.
const MAYA_MAIN_WINDOW: &str = "MayaWindow";

/// Walks the adapter chain and installs the first detected host.
///
/// Returns the installed host, or `None` when this process is not
/// embedded in one the bridge recognizes.
pub(crate) fn install_host(bridge: &Bridge) -> BridgeResult<Option<HostKind>> {
    for kind in HostKind::PRIORITY {
        match detect(kind, bridge.env())? {
            Detection::Detected => {
                install_adapter(bridge, kind)?;
                return Ok(Some(kind));
            }
            Detection::NotThisHost => {}
        }
    }
    tracing::debug!("no supported host detected");
    Ok(None)
}

/// One adapter's install side effects. Runs at most once per process.
fn install_adapter(bridge: &Bridge, kind: HostKind) -> BridgeResult<()> {
    tracing::info!(host = %kind, "installing host adapter");

    let executor = bridge.env().main_thread_executor().ok_or_else(|| {
        BridgeError::Config(format!(
            "host '{kind}' detected but it exposes no main-thread executor"
        ))
    })?;
    bridge.register_dispatch_wrapper(Arc::new(ExecutorWrapper::new(executor)))?;

    if let Some(active) = bridge.env().active_window() {
        install_quit_hook(bridge);
        let window = acquire_main_window(bridge.env(), kind, &active);
        bridge.set_host_window(window);
    } else {
        tracing::debug!(host = %kind, "headless session, skipping window capture");
    }

    bridge.update_settings(|settings| {
        if settings.context_label_is_default() {
            settings.context_label = kind.context_label().to_string();
        }
        if settings.window_title_is_default() {
            settings.window_title = kind.window_title().to_string();
        }
    });

    Ok(())
}

/// Kills any live GUI subprocess when the host application shuts down.
/// Holding the bridge weakly keeps the hook from pinning it alive.
fn install_quit_hook(bridge: &Bridge) {
    let weak = bridge.weak();
    bridge.env().on_about_to_quit(Box::new(move || {
        if let Some(bridge) = weak.upgrade() {
            tracing::debug!("host is quitting, killing GUI subprocess");
            bridge.kill_current_server();
        }
    }));
}

/// Finds the host's main window.
///
/// Maya names its main window, so it is looked up directly; everywhere
/// else the main window is the top of the active window's parent chain.
fn acquire_main_window(
    env: &dyn HostEnvironment,
    kind: HostKind,
    active: &WindowHandle,
) -> WindowHandle {
    if kind == HostKind::Maya
        && let Some(main) = env
            .top_level_windows()
            .into_iter()
            .find(|window| window.object_name() == MAYA_MAIN_WINDOW)
    {
        return main;
    }

    let mut current = active.clone();
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

//! Integration tests for the GUI session lifecycle (show, reuse, publish,
//! kill), run against the real mock GUI subprocess.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pyblish_bridge::constants::callbacks;
use pyblish_bridge::control::ControlRequest;
use pyblish_bridge::host::env::WindowHandle;
use pyblish_bridge::{
    Bridge, BridgeError, BridgeResult, CallbackRegistry, HostCall, PipelineEvent, Server,
    ShowOptions,
};
use pyblish_bridge_test_utils::{MemoryCallbacks, MemoryTransport, MockHost};

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// The GUI stand-in spawned in place of a Python interpreter.
const MOCK_GUI: &str = env!("CARGO_BIN_EXE_pyblish-mock-gui");

/// One bridge wired to a scriptable host, registry and transport, with
/// the mock GUI registered as its interpreter.
struct TestContext {
    host: Arc<MockHost>,
    callbacks: Arc<MemoryCallbacks>,
    transport: MemoryTransport,
    bridge: Bridge,
}

impl TestContext {
    /// Headless context with no interpreter registered.
    fn bare() -> Self {
        let host = Arc::new(MockHost::new());
        let callbacks = Arc::new(MemoryCallbacks::new());
        let transport = MemoryTransport::new();
        // Method-call clone, so each Arc coerces to its trait object here.
        let bridge = Bridge::new(host.clone(), callbacks.clone(), Arc::new(transport.clone()));
        Self {
            host,
            callbacks,
            transport,
            bridge,
        }
    }

    fn new() -> Self {
        let ctx = Self::bare();
        ctx.bridge
            .register_python_executable(MOCK_GUI)
            .expect("mock GUI binary missing");
        ctx
    }

    /// Context that detects as Maya, so a dispatch wrapper gets installed.
    fn maya() -> Self {
        let ctx = Self::new();
        ctx.host.add_module("maya");
        ctx
    }

    /// Adds a main window and makes it active.
    fn windowed(&self) -> WindowHandle {
        let main = self.host.add_window("hostMain", None);
        self.host.set_active_window(&main);
        main
    }

    /// Runs `show` on its own thread; the fresh path blocks until the
    /// GUI session ends.
    fn show_in_background(
        &self,
        options: ShowOptions,
    ) -> thread::JoinHandle<BridgeResult<Option<Arc<Server>>>> {
        let bridge = self.bridge.clone();
        thread::spawn(move || bridge.show(options))
    }

    /// Polls until the background `show` has registered its server.
    fn wait_for_server(&self) -> Arc<Server> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(server) = self.bridge.current_server() {
                return server;
            }
            assert!(
                Instant::now() < deadline,
                "no GUI server appeared within 10s"
            );
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Kills the live session and collects the background `show`.
    fn finish(
        &self,
        worker: thread::JoinHandle<BridgeResult<Option<Arc<Server>>>>,
    ) -> Option<Arc<Server>> {
        self.bridge.kill_current_server();
        worker
            .join()
            .expect("show thread panicked")
            .expect("show failed")
    }
}

fn show_options(modal: bool) -> ShowOptions {
    ShowOptions {
        modal: Some(modal),
        ..Default::default()
    }
}

fn kill_count(transport: &MemoryTransport) -> usize {
    transport
        .requests()
        .iter()
        .filter(|request| matches!(request, ControlRequest::Kill))
        .count()
}

// ============================================================================
// FRESH SHOW TESTS
// ============================================================================

#[test]
fn fresh_show_spawns_and_registers_one_server() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    let server = ctx.wait_for_server();

    assert!(server.is_alive());
    assert!(!server.is_modal());
    assert!(ctx.bridge.installed());
    assert_eq!(ctx.transport.connect_count(), 1);

    let requests = ctx.transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(matches!(
        requests[0],
        ControlRequest::Show { modal: false, .. }
    ));

    let finished = ctx.finish(worker);
    assert!(finished.is_some());
    assert!(!server.is_alive());

    // The registry entry outlives the session's end.
    assert!(ctx.bridge.current_server().is_some());
}

#[test]
fn targets_are_fixed_per_session() {
    let ctx = TestContext::new();

    let options = ShowOptions {
        targets: vec!["film".to_string(), "review".to_string()],
        modal: Some(false),
        ..Default::default()
    };
    let worker = ctx.show_in_background(options);
    let server = ctx.wait_for_server();

    assert_eq!(
        server.targets().to_vec(),
        vec!["film".to_string(), "review".to_string()]
    );
    ctx.finish(worker);
}

#[test]
fn show_without_an_interpreter_reports_none() {
    let ctx = TestContext::bare();

    let outcome = ctx
        .bridge
        .show(show_options(false))
        .expect("a failed start must not error");
    assert!(outcome.is_none());
    assert!(ctx.bridge.current_server().is_none());
    assert_eq!(ctx.transport.connect_count(), 0);
}

#[test]
fn failed_gui_boot_reports_none_and_tears_the_overlay_down() {
    let ctx = TestContext::new();
    ctx.windowed();
    ctx.transport.fail_next_connect();

    let outcome = ctx
        .bridge
        .show(show_options(false))
        .expect("a failed start must not error");
    assert!(outcome.is_none());
    assert!(ctx.bridge.current_server().is_none());
    assert_eq!(ctx.transport.connect_count(), 1);

    // The overlay armed for the attempt went down with it.
    assert_eq!(ctx.host.splashes_created(), 1);
    assert_eq!(ctx.host.splash_close_count(), 1);
    assert_eq!(ctx.callbacks.handler_count(callbacks::GUI_SHOWN), 0);
}

#[test]
fn parent_override_replaces_the_captured_window() {
    let ctx = TestContext::maya();
    ctx.windowed();
    let override_window = ctx.host.add_window("customParent", None);

    let options = ShowOptions {
        parent: Some(override_window.clone()),
        modal: Some(false),
        ..Default::default()
    };
    let worker = ctx.show_in_background(options);
    ctx.wait_for_server();

    let captured = ctx.bridge.host_window().expect("no host window");
    assert!(captured.same_window(&override_window));
    ctx.finish(worker);
}

// ============================================================================
// REUSE TESTS
// ============================================================================

#[test]
fn show_reuses_the_live_server() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    let first = ctx.wait_for_server();

    let second = ctx
        .bridge
        .show(show_options(true))
        .expect("reshow failed")
        .expect("reshow lost the server");

    assert_eq!(first.id(), second.id());
    assert!(second.is_modal());
    assert_eq!(ctx.transport.connect_count(), 1);

    let requests = ctx.transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(matches!(requests[1], ControlRequest::Update { modal: true }));
    assert!(matches!(
        requests[2],
        ControlRequest::Show { modal: true, .. }
    ));

    ctx.finish(worker);
}

#[test]
fn stale_server_is_forgotten_on_show() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    let server = ctx.wait_for_server();

    ctx.transport.set_stale(true);
    let outcome = ctx
        .bridge
        .show(show_options(false))
        .expect("a stale reshow must not error");
    assert!(outcome.is_none());
    assert!(ctx.bridge.current_server().is_none());

    // Cleanup
    server.kill();
    worker
        .join()
        .expect("show thread panicked")
        .expect("show failed");
}

// ============================================================================
// PUBLISH / VALIDATE TESTS
// ============================================================================

#[test]
fn publish_and_validate_flow_through_the_proxy() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    ctx.wait_for_server();

    ctx.bridge.publish().expect("publish failed");
    ctx.bridge.validate().expect("validate failed");

    let requests = ctx.transport.requests();
    assert_eq!(requests.len(), 5);
    assert!(matches!(requests[2], ControlRequest::Publish));
    assert!(matches!(requests[4], ControlRequest::Validate));

    ctx.finish(worker);
}

#[test]
fn publish_without_a_server_is_a_no_op() {
    let ctx = TestContext::new();

    ctx.bridge.publish().expect("publish failed");
    ctx.bridge.validate().expect("validate failed");
    ctx.bridge.kill_current_server();

    assert!(ctx.transport.requests().is_empty());
    assert_eq!(ctx.transport.connect_count(), 0);
}

#[test]
fn stale_server_is_forgotten_on_publish() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    let server = ctx.wait_for_server();

    ctx.transport.set_stale(true);
    ctx.bridge
        .publish()
        .expect("a stale publish must not error");
    assert!(ctx.bridge.current_server().is_none());

    // Cleanup
    server.kill();
    worker
        .join()
        .expect("show thread panicked")
        .expect("show failed");
}

#[test]
fn rejected_command_escalates_and_keeps_the_server() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(false));
    ctx.wait_for_server();

    ctx.transport.reject_next("publish already in progress");
    let err = ctx.bridge.publish().unwrap_err();
    assert!(matches!(err, BridgeError::Proxy(_)));
    assert!(err.to_string().contains("publish already in progress"));

    // A refusal is not staleness; the session stays registered.
    assert!(ctx.bridge.current_server().is_some());

    ctx.finish(worker);
}

// ============================================================================
// KILL TESTS
// ============================================================================

#[test]
fn failing_host_call_kills_the_gui() {
    let ctx = TestContext::maya();

    let worker = ctx.show_in_background(show_options(false));
    let server = ctx.wait_for_server();

    let err = ctx
        .bridge
        .dispatch(HostCall::new("set-attribute", || {
            Err(BridgeError::Internal("attribute locked".into()))
        }))
        .unwrap_err();
    assert!(matches!(err, BridgeError::HostCall(_)));
    assert!(err.to_string().contains("set-attribute"));

    // Exactly one quit command went out, and the wrapper survived.
    assert_eq!(kill_count(&ctx.transport), 1);
    assert!(ctx.bridge.dispatch_wrapper().is_some());

    let finished = worker
        .join()
        .expect("show thread panicked")
        .expect("show failed");
    assert!(finished.is_some());
    assert!(!server.is_alive());
}

#[test]
fn host_quit_hook_kills_the_gui() {
    let ctx = TestContext::maya();
    ctx.windowed();

    let worker = ctx.show_in_background(show_options(false));
    let server = ctx.wait_for_server();
    assert_eq!(ctx.host.quit_hook_count(), 1);

    ctx.host.fire_quit_hooks();

    worker
        .join()
        .expect("show thread panicked")
        .expect("show failed");
    assert_eq!(kill_count(&ctx.transport), 1);
    assert!(!server.is_alive());
}

#[test]
fn mock_gui_exits_when_stdin_closes() {
    let mut child = std::process::Command::new(MOCK_GUI)
        .args(["-u", "-m", "pyblish_qml", "--aschild"])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("failed to spawn mock GUI");

    drop(child.stdin.take());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().expect("wait failed") {
            break status;
        }
        assert!(Instant::now() < deadline, "mock GUI ignored stdin EOF");
        thread::sleep(Duration::from_millis(10));
    };
    assert!(status.success());
}

// ============================================================================
// OVERLAY TESTS
// ============================================================================

#[test]
fn headless_session_skips_the_overlay() {
    let ctx = TestContext::new();

    let worker = ctx.show_in_background(show_options(true));
    let server = ctx.wait_for_server();

    assert!(server.is_modal());
    assert_eq!(ctx.host.splashes_created(), 0);
    assert_eq!(ctx.callbacks.handler_count(callbacks::GUI_SHOWN), 0);

    ctx.finish(worker);
}

#[test]
fn overlay_lives_until_the_gui_reports_shown() {
    let ctx = TestContext::new();
    ctx.windowed();

    let worker = ctx.show_in_background(show_options(false));
    ctx.wait_for_server();

    assert_eq!(ctx.host.splashes_created(), 1);
    assert_eq!(ctx.callbacks.handler_count(callbacks::GUI_SHOWN), 1);

    ctx.host.tick();
    ctx.host.tick();
    let labels = ctx.host.splash_labels();
    assert_eq!(labels.first().map(String::as_str), Some("loading"));
    assert_eq!(labels.len(), 3);

    ctx.callbacks.emit(&PipelineEvent::GuiShown);
    assert_eq!(ctx.host.splash_close_count(), 1);
    assert_eq!(ctx.callbacks.handler_count(callbacks::GUI_SHOWN), 0);
    assert_eq!(ctx.host.active_ticker_count(), 0);

    // A repeated report must not close anything twice.
    ctx.callbacks.emit(&PipelineEvent::GuiShown);
    assert_eq!(ctx.host.splash_close_count(), 1);

    ctx.finish(worker);
}

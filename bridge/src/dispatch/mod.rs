//! Marshaling of host-affine calls onto the host main thread.
//!
//! Host scene models are not thread safe, so every call that mutates host
//! state travels through a registered [`DispatchWrapper`]. The wrapper is
//! host-specific; the contract it must honor is checked with a live probe
//! at registration time, and the kill-on-failure policy around dispatched
//! calls lives on [`crate::Bridge::dispatch`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use crate::errors::{BridgeError, BridgeResult};
use crate::host::env::MainThreadExecutor;

/// One host-affine unit of work.
///
/// Arguments are closure captures; the call can run at most once.
pub struct HostCall {
    op: String,
    func: Box<dyn FnOnce() -> BridgeResult<Value> + Send>,
}

impl HostCall {
    pub fn new<F>(op: impl Into<String>, func: F) -> Self
    where
        F: FnOnce() -> BridgeResult<Value> + Send + 'static,
    {
        Self {
            op: op.into(),
            func: Box::new(func),
        }
    }

    /// Operation name, for logs.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Runs the call, consuming it.
    pub fn invoke(self) -> BridgeResult<Value> {
        (self.func)()
    }
}

impl fmt::Debug for HostCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCall").field("op", &self.op).finish()
    }
}

/// Routes a [`HostCall`] onto the host application's main thread.
///
/// Implementations hand the call to the host's scheduler, block until it
/// ran, and return its result unchanged. A wrapper that drops the call or
/// substitutes the result fails registration.
pub trait DispatchWrapper: Send + Sync {
    fn dispatch(&self, call: HostCall) -> BridgeResult<Value>;
}

/// The wrapper host adapters install: forwards every call to the host's
/// main-thread executor.
pub struct ExecutorWrapper {
    executor: Arc<dyn MainThreadExecutor>,
}

impl ExecutorWrapper {
    pub fn new(executor: Arc<dyn MainThreadExecutor>) -> Self {
        Self { executor }
    }
}

impl DispatchWrapper for ExecutorWrapper {
    fn dispatch(&self, call: HostCall) -> BridgeResult<Value> {
        self.executor.execute(call)
    }
}

/// Probe operation name; shows up in host schedulers during registration.
const PROBE_OP: &str = "dispatch-wrapper-probe";

/// Checks that `wrapper` honors the dispatch contract before it is
/// allowed anywhere near real host calls.
///
/// The probe must run exactly once and its token must come back
/// unchanged. Running twice is unrepresentable because the call consumes
/// itself.
pub(crate) fn validate_wrapper(wrapper: &dyn DispatchWrapper) -> BridgeResult<()> {
    let invocations = Arc::new(AtomicUsize::new(0));
    let token = Value::String(ulid::Ulid::new().to_string());

    let expected = token.clone();
    let counter = Arc::clone(&invocations);
    let probe = HostCall::new(PROBE_OP, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(token)
    });

    let outcome = wrapper
        .dispatch(probe)
        .map_err(|e| BridgeError::WrapperContract(format!("probe call failed: {e}")))?;

    if invocations.load(Ordering::SeqCst) == 0 {
        return Err(BridgeError::WrapperContract(
            "wrapper returned without invoking the call".into(),
        ));
    }
    if outcome != expected {
        return Err(BridgeError::WrapperContract(
            "wrapper did not return the call's own result".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Forwards faithfully, like a real main-thread executor would.
    struct Faithful;

    impl DispatchWrapper for Faithful {
        fn dispatch(&self, call: HostCall) -> BridgeResult<Value> {
            call.invoke()
        }
    }

    /// Never runs the call.
    struct DropsCall;

    impl DispatchWrapper for DropsCall {
        fn dispatch(&self, _call: HostCall) -> BridgeResult<Value> {
            Ok(Value::Null)
        }
    }

    /// Runs the call but reports its own answer.
    struct SwallowsResult;

    impl DispatchWrapper for SwallowsResult {
        fn dispatch(&self, call: HostCall) -> BridgeResult<Value> {
            let _ = call.invoke();
            Ok(Value::String("not the token".into()))
        }
    }

    struct AlwaysErrs;

    impl DispatchWrapper for AlwaysErrs {
        fn dispatch(&self, _call: HostCall) -> BridgeResult<Value> {
            Err(BridgeError::Internal("scheduler offline".into()))
        }
    }

    #[test]
    fn faithful_wrapper_passes_validation() {
        assert!(validate_wrapper(&Faithful).is_ok());
    }

    #[test]
    fn dropping_the_call_fails_validation() {
        let err = validate_wrapper(&DropsCall).unwrap_err();
        assert!(matches!(err, BridgeError::WrapperContract(_)));
    }

    #[test]
    fn swallowing_the_result_fails_validation() {
        let err = validate_wrapper(&SwallowsResult).unwrap_err();
        assert!(matches!(err, BridgeError::WrapperContract(_)));
    }

    #[test]
    fn erroring_wrapper_fails_validation() {
        let err = validate_wrapper(&AlwaysErrs).unwrap_err();
        assert!(matches!(err, BridgeError::WrapperContract(_)));
    }

    #[test]
    fn host_call_runs_its_closure_once() {
        let call = HostCall::new("toggle", || Ok(Value::Bool(true)));
        assert_eq!(call.op(), "toggle");
        assert_eq!(call.invoke().unwrap(), Value::Bool(true));
    }
}

//! Error types for the bridge.

/// Result alias used across the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced to callers of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A dispatch wrapper failed its registration contract.
    #[error("dispatch wrapper contract: {0}")]
    WrapperContract(String),

    /// A call routed to the host main thread failed.
    ///
    /// The GUI subprocess has already been killed (best-effort) by the
    /// time this reaches the caller.
    #[error("host call failed: {0}")]
    HostCall(String),

    /// Bad registration input or a missing prerequisite.
    #[error("configuration error: {0}")]
    Config(String),

    /// The GUI subprocess could not be created or waited on.
    #[error("subprocess error: {0}")]
    Subprocess(String),

    /// A live GUI refused a command.
    #[error("control proxy error: {0}")]
    Proxy(String),

    /// An operation was issued in a state that cannot honor it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Bug guard for conditions that should not happen.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProxyError> for BridgeError {
    fn from(err: ProxyError) -> Self {
        BridgeError::Proxy(err.to_string())
    }
}

/// Failures on the control channel to the GUI subprocess.
///
/// The split between liveness failures and command failures is load
/// bearing: [`ProxyError::is_stale`] decides whether the session is
/// quietly forgotten or the error escalates to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The channel broke or the subprocess is gone.
    #[error("control channel i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The subprocess did not answer in time.
    #[error("control channel timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The GUI is alive and answered, but refused the command.
    #[error("gui rejected command: {0}")]
    Rejected(String),
}

impl ProxyError {
    /// True when the failure concerns session liveness rather than the
    /// command itself. Stale sessions are forgotten, not escalated.
    pub fn is_stale(&self) -> bool {
        matches!(self, ProxyError::Io(_) | ProxyError::Timeout(_))
    }
}

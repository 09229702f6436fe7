//! The GUI subprocess handle.

pub(crate) mod log_relay;
pub(crate) mod spawn;

use std::fmt;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ulid::Ulid;

use crate::constants::timing;
use crate::errors::{BridgeError, BridgeResult};

use self::log_relay::LogRelay;
use self::spawn::SpawnSpec;

/// A running GUI subprocess.
///
/// Owned by the process registry and shared with the proxy and with the
/// host's quit hook through `Arc`. Targets are fixed per session;
/// modality can be flipped on reuse.
pub struct Server {
    id: Ulid,
    pid: u32,
    targets: Vec<String>,
    modal: AtomicBool,
    started_at: DateTime<Utc>,
    child: Mutex<std::process::Child>,
    relay: Mutex<Option<LogRelay>>,
}

impl Server {
    /// Spawns the GUI subprocess described by `spec` and starts relaying
    /// its output.
    pub(crate) fn start(spec: SpawnSpec) -> BridgeResult<Self> {
        let mut child = spawn::spawn_gui(&spec)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Internal("GUI stdout pipe missing".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::Internal("GUI stderr pipe missing".into()))?;
        let relay = LogRelay::start(stdout, stderr).inspect_err(|_| {
            let _ = child.kill();
        })?;

        let id = Ulid::new();
        let pid = child.id();
        tracing::info!(
            server_id = %id,
            pid,
            targets = ?spec.targets,
            modal = spec.modal,
            "GUI subprocess started"
        );

        Ok(Self {
            id,
            pid,
            targets: spec.targets,
            modal: AtomicBool::new(spec.modal),
            started_at: Utc::now(),
            child: Mutex::new(child),
            relay: Mutex::new(Some(relay)),
        })
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Plug-in targets this session publishes for. Empty means all.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn is_modal(&self) -> bool {
        self.modal.load(Ordering::SeqCst)
    }

    pub(crate) fn set_modal(&self, modal: bool) {
        self.modal.store(modal, Ordering::SeqCst);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True while the subprocess runs.
    pub fn is_alive(&self) -> bool {
        matches!(self.child.lock().try_wait(), Ok(None))
    }

    /// Blocks until the GUI session ends, then drains the log relay.
    ///
    /// Waits in a poll loop so `kill` can run from another thread while
    /// this one sleeps between polls.
    pub fn listen(&self) -> BridgeResult<ExitStatus> {
        let status = loop {
            let polled = self.child.lock().try_wait().map_err(|e| {
                BridgeError::Subprocess(format!("failed to wait on GUI subprocess: {e}"))
            })?;
            if let Some(status) = polled {
                break status;
            }
            std::thread::sleep(timing::LISTEN_POLL);
        };

        if let Some(relay) = self.relay.lock().take() {
            relay.join();
        }
        tracing::info!(server_id = %self.id, code = ?status.code(), "GUI session ended");
        Ok(status)
    }

    /// Best-effort hard kill. Already-exited and never-started conditions
    /// are benign.
    pub fn kill(&self) {
        let mut child = self.child.lock();
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        if let Err(e) = child.kill() {
            tracing::debug!(server_id = %self.id, "kill failed: {}", e);
            return;
        }
        let _ = child.wait();
        tracing::debug!(server_id = %self.id, "GUI subprocess killed");
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("targets", &self.targets)
            .field("modal", &self.is_modal())
            .finish()
    }
}
